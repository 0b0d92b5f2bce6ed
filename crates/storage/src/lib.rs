pub mod backend;
pub mod error;
mod models;
mod path;
mod stream;

pub use crate::backend::{ByteStream, StorageBackend, UploadOptions};
pub use crate::models::FileInfo;
pub use crate::path::validate as validate_path;
pub use crate::stream::{concat, once};
use std::sync::Arc;

pub type BackendHandle = Arc<dyn StorageBackend + Send + Sync>;
