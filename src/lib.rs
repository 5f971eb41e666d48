//! # Seed Maker - seed package exporter
//!
//! Exports selected application resources (users, projects, documents,
//! knowledge models, locales, document templates and their assets) into a
//! replayable seed package:
//! - one `add_<type>.sql` insert script per resource type
//! - a `recipe.json` manifest listing the scripts in apply order
//! - an `app/` mirror of the binary assets the resources reference
//!
//! The exporter is driven by a static [`Registry`] of resource descriptors.
//! The [`Resolver`] expands each requested root into its prerequisites, the
//! [`serializer`] turns rows into statements, the [`blob`] synchronizer
//! downloads assets and the [`PackageAssembler`] ties it together.

pub mod resource;
pub mod registry;
pub mod row;
pub mod serializer;
pub mod retry;
pub mod storage;
pub mod blob;
pub mod resolver;
pub mod package;
pub mod catalog;
pub mod config;
pub mod service;
pub mod server;
pub mod ui;

use std::path::PathBuf;

// Re-exports for convenient access
pub use resource::ResourceType;
pub use registry::{DependencyEdge, Registry, ResourceDescriptor};
pub use row::{Row, Value};
pub use resolver::{NodeKey, ResourceNode, Resolver};
pub use package::{ExportOptions, ExportReport, ExportRequest, PackageAssembler};
pub use catalog::{list_resources, Catalog};
pub use storage::{RowSource, SqliteStore};
pub use blob::{BlobStore, BlobSynchronizer, DirectoryBlobStore};

/// Result type alias for seed maker operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for seed maker operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Unknown resource type: {0}")]
    UnknownResourceType(String),

    #[error("{resource_type} '{identifier}' not found")]
    NodeNotFound {
        resource_type: ResourceType,
        identifier: String,
    },

    #[error("Transient storage error: {0}")]
    Transient(String),

    #[error("Cannot serialize {table}.{column}: {reason}")]
    Serialization {
        table: String,
        column: String,
        reason: String,
    },

    #[error("Failed to write manifest {}: {source}", path.display())]
    ManifestWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write {}: {source}", path.display())]
    Output {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid object key: {0}")]
    InvalidObjectKey(String),

    #[error("Blob {key} could not be synchronized: {reason}")]
    Blob { key: String, reason: String },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Whether retrying the same operation may succeed
    pub fn is_transient(&self) -> bool {
        match self {
            Error::Transient(_) => true,
            Error::Storage(rusqlite::Error::SqliteFailure(e, _)) => matches!(
                e.code,
                rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked
            ),
            Error::Io(e) => matches!(
                e.kind(),
                std::io::ErrorKind::Interrupted
                    | std::io::ErrorKind::TimedOut
                    | std::io::ErrorKind::WouldBlock
                    | std::io::ErrorKind::ConnectionReset
                    | std::io::ErrorKind::ConnectionAborted
            ),
            _ => false,
        }
    }

    /// Whether the whole export run must stop.
    ///
    /// Everything else is a per-node failure collected into the report.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::UnknownResourceType(_)
                | Error::Config(_)
                | Error::ManifestWrite { .. }
                | Error::Output { .. }
                | Error::InvalidInput(_)
        )
    }
}
