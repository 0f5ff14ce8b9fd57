pub mod config;
pub mod database;
pub mod errors;
pub mod importer;
pub mod models;

pub use config::Config;
pub use database::Database;
pub use importer::{ImportService, ImportStateManager};
