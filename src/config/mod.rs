use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub database: DatabaseConfig,
    pub sources: SourcesConfig,
    pub import: ImportConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: Option<u32>,
}

/// Layout of the delimited source files, one per entity level.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourcesConfig {
    pub dir: PathBuf,
    pub brands_file: String,
    pub models_file: String,
    pub kits_file: String,
    pub tyre_sizes_file: String,
    /// Single-character field delimiter.
    pub delimiter: String,
    /// Byte encoding label understood by encoding_rs, e.g. "windows-1251" or "utf-8".
    pub encoding: String,
}

impl SourcesConfig {
    pub fn delimiter_byte(&self) -> u8 {
        self.delimiter.as_bytes().first().copied().unwrap_or(b';')
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportConfig {
    /// Kits older than this model year are dropped, and models whose newest
    /// kit is older are dropped entirely.
    pub min_year: i32,
    /// Rows per multi-row INSERT statement.
    pub batch_size: usize,
    /// Rows between progress tracker updates.
    pub progress_update_interval: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: "sqlite://./fitment.db".to_string(),
                max_connections: Some(10),
            },
            sources: SourcesConfig {
                dir: PathBuf::from("./data/sources"),
                brands_file: "brands.csv".to_string(),
                models_file: "models.csv".to_string(),
                kits_file: "kits.csv".to_string(),
                tyre_sizes_file: "tyre_sizes.csv".to_string(),
                delimiter: ";".to_string(),
                encoding: "windows-1251".to_string(),
            },
            import: ImportConfig {
                min_year: 2000,
                batch_size: 500,
                progress_update_interval: 1000,
            },
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_file =
            std::env::var("CONFIG_FILE").unwrap_or_else(|_| "config.toml".to_string());

        if std::path::Path::new(&config_file).exists() {
            let contents = std::fs::read_to_string(&config_file)?;
            Ok(toml::from_str(&contents)?)
        } else {
            let default_config = Self::default();
            let contents = toml::to_string_pretty(&default_config)?;
            std::fs::create_dir_all(&default_config.sources.dir)?;
            std::fs::write(&config_file, contents)?;
            Ok(default_config)
        }
    }
}
