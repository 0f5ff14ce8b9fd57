//! Streaming reader for the delimited source files.
//!
//! Each `open()` call gets its own file handle and buffer, so a stage can
//! re-read the same file from the top (the kit stage depends on this). Only
//! a small fixed window of the file is ever held in memory.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::Result;
use csv_async::{AsyncReaderBuilder, ByteRecord};
use encoding_rs::Encoding;
use tokio::fs::File;
use tokio::io::BufReader;

use crate::errors::types::ImportError;

#[derive(Debug)]
pub struct CsvFileReader {
    path: PathBuf,
    delimiter: u8,
    encoding: &'static Encoding,
}

impl CsvFileReader {
    pub fn new(
        path: impl Into<PathBuf>,
        delimiter: u8,
        encoding_label: &str,
    ) -> Result<Self, ImportError> {
        let encoding = Encoding::for_label(encoding_label.as_bytes()).ok_or_else(|| {
            ImportError::UnknownEncoding {
                label: encoding_label.to_string(),
            }
        })?;

        Ok(Self {
            path: path.into(),
            delimiter,
            encoding,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Opens a fresh stream over the file, positioned after the header row.
    pub async fn open(&self) -> Result<CsvRowStream> {
        let file = File::open(&self.path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                anyhow::Error::new(ImportError::source_missing(self.path.display().to_string()))
            } else {
                anyhow::Error::new(e)
            }
        })?;

        let mut reader = AsyncReaderBuilder::new()
            .delimiter(self.delimiter)
            .has_headers(true)
            .flexible(true)
            .buffer_capacity(1 << 20)
            .create_reader(BufReader::new(file));

        // Column lookup is by normalized name; duplicate headers keep the
        // first occurrence.
        let headers = reader.byte_headers().await?.clone();
        let mut columns = HashMap::new();
        for (idx, raw) in headers.iter().enumerate() {
            let name = decode_field(self.encoding, raw).to_lowercase();
            columns.entry(name).or_insert(idx);
        }

        Ok(CsvRowStream {
            reader,
            columns,
            encoding: self.encoding,
            record: ByteRecord::new(),
            path: self.path.clone(),
        })
    }
}

#[derive(Debug)]
pub struct CsvRowStream {
    reader: csv_async::AsyncReader<BufReader<File>>,
    columns: HashMap<String, usize>,
    encoding: &'static Encoding,
    record: ByteRecord,
    path: PathBuf,
}

impl CsvRowStream {
    /// Index of a column the stage cannot work without.
    pub fn column(&self, name: &str) -> Result<usize> {
        self.columns.get(name).copied().ok_or_else(|| {
            ImportError::missing_column(self.path.display().to_string(), name).into()
        })
    }

    /// Index of a column that may legitimately be absent from the export.
    pub fn optional_column(&self, name: &str) -> Option<usize> {
        self.columns.get(name).copied()
    }

    /// Next record, decoded and cleaned. A ragged row simply yields fewer
    /// fields; classification is the caller's job.
    pub async fn next_row(&mut self) -> Result<Option<CsvRow>> {
        if !self.reader.read_byte_record(&mut self.record).await? {
            return Ok(None);
        }

        let fields = self
            .record
            .iter()
            .map(|raw| decode_field(self.encoding, raw))
            .collect();
        Ok(Some(CsvRow { fields }))
    }
}

pub struct CsvRow {
    fields: Vec<String>,
}

impl CsvRow {
    pub fn get(&self, idx: usize) -> Option<&str> {
        self.fields.get(idx).map(|s| s.as_str())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Decodes one cell from the source encoding and strips the whitespace and
/// stray quoting the exports are known to carry.
fn decode_field(encoding: &'static Encoding, raw: &[u8]) -> String {
    let (text, _, _) = encoding.decode(raw);
    text.trim().trim_matches('"').trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn fixture(contents: &[u8]) -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fixture.csv");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(contents).unwrap();
        (dir, path)
    }

    #[tokio::test]
    async fn test_reads_and_cleans_fields() {
        let (_dir, path) = fixture(b"id;name\n1; \"Audi\" \n2;BMW\n");
        let reader = CsvFileReader::new(&path, b';', "utf-8").unwrap();
        let mut stream = reader.open().await.unwrap();

        let id_col = stream.column("id").unwrap();
        let name_col = stream.column("name").unwrap();

        let row = stream.next_row().await.unwrap().unwrap();
        assert_eq!(row.get(id_col), Some("1"));
        assert_eq!(row.get(name_col), Some("Audi"));

        let row = stream.next_row().await.unwrap().unwrap();
        assert_eq!(row.get(name_col), Some("BMW"));

        assert!(stream.next_row().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_ragged_rows_yield_fewer_fields() {
        let (_dir, path) = fixture(b"id;brand;name\n1;10;Golf\n2;11\n3\n");
        let reader = CsvFileReader::new(&path, b';', "utf-8").unwrap();
        let mut stream = reader.open().await.unwrap();
        let name_col = stream.column("name").unwrap();

        let row = stream.next_row().await.unwrap().unwrap();
        assert_eq!(row.get(name_col), Some("Golf"));

        // Short rows still come through, just without the missing cells.
        let row = stream.next_row().await.unwrap().unwrap();
        assert_eq!(row.get(name_col), None);
        assert_eq!(row.len(), 2);

        let row = stream.next_row().await.unwrap().unwrap();
        assert_eq!(row.len(), 1);
    }

    #[tokio::test]
    async fn test_header_normalization() {
        let (_dir, path) = fixture(b" ID ;\"Name\"\n5;Lada\n");
        let reader = CsvFileReader::new(&path, b';', "utf-8").unwrap();
        let stream = reader.open().await.unwrap();
        assert!(stream.column("id").is_ok());
        assert!(stream.column("name").is_ok());
        assert!(stream.column("missing").is_err());
    }

    #[tokio::test]
    async fn test_windows_1251_decoding() {
        // "Лада" in windows-1251 bytes.
        let mut contents = b"id;name\n7;".to_vec();
        contents.extend_from_slice(&[0xCB, 0xE0, 0xE4, 0xE0]);
        contents.push(b'\n');
        let (_dir, path) = fixture(&contents);

        let reader = CsvFileReader::new(&path, b';', "windows-1251").unwrap();
        let mut stream = reader.open().await.unwrap();
        let name_col = stream.column("name").unwrap();
        let row = stream.next_row().await.unwrap().unwrap();
        assert_eq!(row.get(name_col), Some("Лада"));
    }

    #[tokio::test]
    async fn test_each_open_restarts_from_the_top() {
        let (_dir, path) = fixture(b"id;name\n1;Audi\n2;BMW\n");
        let reader = CsvFileReader::new(&path, b';', "utf-8").unwrap();

        for _ in 0..2 {
            let mut stream = reader.open().await.unwrap();
            let id_col = stream.column("id").unwrap();
            let row = stream.next_row().await.unwrap().unwrap();
            assert_eq!(row.get(id_col), Some("1"));
        }
    }

    #[tokio::test]
    async fn test_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let reader =
            CsvFileReader::new(dir.path().join("nope.csv"), b';', "utf-8").unwrap();
        let err = reader.open().await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ImportError>(),
            Some(ImportError::SourceMissing { .. })
        ));
    }

    #[test]
    fn test_unknown_encoding_label() {
        let err = CsvFileReader::new("x.csv", b';', "klingon-8").unwrap_err();
        assert!(matches!(err, ImportError::UnknownEncoding { .. }));
    }
}
