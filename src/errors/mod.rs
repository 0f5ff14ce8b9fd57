pub mod types;

pub use types::ImportError;
