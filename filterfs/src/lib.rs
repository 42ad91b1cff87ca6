//! filterfs - Filter chains over a virtual file system
//!
//! A `FilterChain` wraps a source filesystem and runs every operation
//! through an ordered chain of filter filesystems first. Any filter may veto
//! the call by returning an error; only when all filters agree does the call
//! reach the source.
//!
//! The crate also provides the capability traits shared by sources and
//! filters (`FileSystem`, `File`) and two sources:
//! - `MemoryFileSystem`: in-memory tree, for tests and sandboxes
//! - `NativeFileSystem`: the host filesystem through `std::fs`
//!
//! # Usage
//! ```rust
//! use filterfs::{FileSystem, FilterChain, MemoryFileSystem};
//! use std::path::Path;
//!
//! let chain = FilterChain::new(MemoryFileSystem::new());
//! chain.create(Path::new("/hello.txt")).unwrap();
//! assert!(chain.stat(Path::new("/hello.txt")).unwrap().is_file());
//! ```

mod chain;
mod error;
pub mod logging;
mod memory;
mod metadata;
mod native;
mod r#trait;

pub use chain::FilterChain;
pub use error::{VfsError, VfsResult};
pub use memory::{MemoryFile, MemoryFileSystem};
pub use metadata::{FileMode, Metadata, OpenFlags};
pub use native::{NativeFile, NativeFileSystem};
pub use r#trait::{File, FileSystem};

pub use filterfs_config as config;

/// Create a new memory-based file system.
pub fn memory_fs() -> MemoryFileSystem {
    MemoryFileSystem::new()
}

/// Create a new native file system.
pub fn native_fs() -> NativeFileSystem {
    NativeFileSystem::new()
}
