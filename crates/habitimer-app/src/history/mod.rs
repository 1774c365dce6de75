pub mod manager;

pub use manager::{RecordManager, RecordManagerError, RecordStats};
