//! panelfm - storage-agnostic file manager core
//!
//! Unifies heterogeneous storage backends (local disk, OneDrive via OAuth2
//! client credentials) into a single tabular directory-listing model, with a
//! per-user browsing session handling navigation, uploads, folder creation,
//! and deletes. Rendering is the host application's job; this crate exposes
//! the current path, listings, and mutation operations, and signals path
//! changes through a watch channel so the host knows when to re-render.
//!
//! ```no_run
//! use panelfm::{create_backend, DiskConfig, Session};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = DiskConfig::load("disk.json")?;
//! let session = Session::new(create_backend(&config)?);
//!
//! for entry in session.list().await? {
//!     println!("{}  {:?}  {:?}", entry.name, entry.kind, entry.size);
//! }
//! # Ok(())
//! # }
//! ```

pub mod backend;
pub mod config;
pub mod error;
pub mod listing;
pub mod session;

pub use backend::{create_backend, BackendEntry, BackendError, StorageBackend, Visibility};
pub use config::{DiskConfig, LocalDiskConfig, OneDriveDiskConfig};
pub use error::FileManagerError;
pub use listing::{list_directory, EntryKind, FileEntry, PARENT_ENTRY_NAME};
pub use session::{BulkDeleteReport, Session, UploadFile, UploadReport};
