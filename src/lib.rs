pub mod config;
pub mod endpoint;
pub mod error;
pub mod protocol;
pub mod scanner;
pub mod server;
pub mod transport;
pub mod url;

pub use error::SnapSyncError;
pub type Result<T> = std::result::Result<T, SnapSyncError>;
