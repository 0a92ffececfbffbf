use crate::registry::ItemId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CompressionError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to read {0}: {1}")]
    Read(String, #[source] std::io::Error),

    #[error("Failed to decode {0}: {1}")]
    Decode(String, String),

    #[error("Invalid image dimensions: {0}x{1}. Maximum allowed: {2}x{2}")]
    InvalidDimensions(u32, u32, u32),

    #[error("Failed to encode {0}: {1}")]
    Encode(String, String),

    #[error("Item {0} is no longer in the batch")]
    NotFound(ItemId),

    #[error("Nothing to download: compress images before downloading")]
    EmptyInput,

    #[error("Compressed output is {actual} but the original is {expected}")]
    MimeMismatch { expected: String, actual: String },

    #[error("Invalid quality value: {0}. Must be between 1 and 100")]
    InvalidQuality(u8),

    #[error("File too large: {0} bytes. Maximum allowed: {1} bytes")]
    FileTooLarge(u64, u64),

    #[error("Batch file count limit exceeded: {0} files, maximum allowed {1}")]
    BatchFileLimitExceeded(usize, usize),

    #[error("Batch memory limit exceeded: estimated {0}MB, maximum allowed {1}MB")]
    BatchMemoryLimitExceeded(u64, u64),

    #[error(
        "Insufficient available memory: estimated batch requires {0}MB, but only {1}MB available"
    )]
    InsufficientMemory(u64, u64),

    #[error("No image files found in input path: {0}")]
    NoImageFilesFound(String),

    #[error("Walkdir error: {0}")]
    WalkdirError(#[from] walkdir::Error),

    #[error("Archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("Background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl CompressionError {
    /// Errors confined to a single item; siblings in the batch keep going.
    pub fn is_item_error(&self) -> bool {
        matches!(
            self,
            CompressionError::Read(..)
                | CompressionError::Decode(..)
                | CompressionError::InvalidDimensions(..)
                | CompressionError::Encode(..)
                | CompressionError::FileTooLarge(..)
        )
    }
}

pub type Result<T> = std::result::Result<T, CompressionError>;
