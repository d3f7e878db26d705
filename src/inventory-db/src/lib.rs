//! Inventory Database Library
//!
//! A trait-based store for rooms, storages, categories, tags, images and
//! items, plus the engine that moves a whole inventory between stores as a
//! portable ZIP archive.
//!
//! # Features
//!
//! - `sqlite-sync` (default) - Synchronous SQLite store using rusqlite
//!
//! # Example
//!
//! ```no_run
//! use inventory_db::{export_archive, import_archive, ExportScope, ImportOptions, SqliteDb};
//!
//! let source = SqliteDb::open("home.db").unwrap();
//! source.init().unwrap();
//! let archive = export_archive(&source, &ExportScope::all()).unwrap();
//!
//! let target = SqliteDb::open("office.db").unwrap();
//! target.init().unwrap();
//! let result = import_archive(&target, &archive, &ImportOptions::default());
//! println!("{}", result);
//! ```

pub mod archive;
pub mod export;
pub mod import;
pub mod portable;
pub mod report;
pub mod repository;
pub mod shared;
pub mod types;

#[cfg(feature = "sqlite-sync")]
pub mod sqlite;

// Re-export types
pub use types::*;

// Re-export repository traits
pub use repository::{Entity, InventoryStore, LinkRepository, RepoError, RepoResult, Repository};

// Re-export the archive engine
pub use archive::{ArchiveContents, ArchiveError};
pub use export::{export_archive, export_snapshot, ExportBundle, ExportError, ExportScope};
pub use import::{import_archive, import_snapshot, ImportOptions};
pub use portable::{Snapshot, FORMAT_VERSION};
pub use report::{ImportResult, TypeCounts};

// Re-export implementations
#[cfg(feature = "sqlite-sync")]
pub use sqlite::{SqliteDb, DEFAULT_DB_PATH};
