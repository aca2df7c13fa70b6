//! confluence2md engine: REST fetch, storage-format conversion and file output.
mod api;
mod client;
mod convert;
mod frontmatter;
mod persist;
mod retry;
mod types;

pub use client::{Auth, ClientSettings, ConfluenceClient, PageSource};
pub use convert::{convert, normalize_storage, ConvertOptions, Converter, StorageConverter};
pub use frontmatter::{build_note, NoteMetadata};
pub use persist::{ensure_output_dir, AtomicFileWriter, PersistError, StagedFile};
pub use retry::RetryPolicy;
pub use types::{Attachment, FailureKind, FetchError, PageData};
