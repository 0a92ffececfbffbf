pub mod logger;

pub mod archive;
pub mod cli;
pub mod constants;
pub mod engine;
pub mod error;
pub mod formats;
pub mod limits;
pub mod registry;
pub mod session;
pub mod sources;
pub mod utils;

pub use archive::{build as build_archive, unique_entry_names, ArchiveEntry};
pub use constants::ARCHIVE_FILE_NAME;
pub use engine::{compress, compress_async, compress_bytes, CompressedImage, Quality};
pub use error::{CompressionError, Result};
pub use formats::ImageKind;
pub use registry::{BatchRegistry, Item, ItemId, ItemState, ItemSummary};
pub use session::{AddReport, BatchReport, Bundle, BundleSession, ItemFailure, SessionOptions};
pub use sources::{collect_image_files, is_image_file, LoadedFile, SourceFile, SourceOrigin};
