//! FileSystem and File trait definitions

use crate::error::VfsResult;
use crate::metadata::{FileMode, Metadata, OpenFlags};
use std::fmt::Debug;
use std::io::{Read, Seek, Write};
use std::path::Path;
use std::time::SystemTime;

/// An open file handle.
///
/// Handles are closed when dropped. Reads, writes and seeks go through the
/// standard `io` traits.
pub trait File: Read + Write + Seek + Send + Debug {
    /// Name the handle was opened with
    fn name(&self) -> &str;

    /// Metadata of the underlying file
    fn stat(&self) -> VfsResult<Metadata>;

    /// Flush buffered data to the backing store
    fn sync(&mut self) -> VfsResult<()>;

    /// Resize the file to `size` bytes
    fn truncate(&mut self, size: u64) -> VfsResult<()>;

    /// List the entries of a directory handle, sorted by name
    fn read_dir(&mut self) -> VfsResult<Vec<Metadata>>;
}

/// Filesystem capability
///
/// Provides a unified interface for file operations, decoupling code from
/// specific file system implementations. The same trait is implemented by
/// sources, by filters and by `FilterChain` itself, so a chain can be used
/// anywhere a filesystem is expected.
///
/// # Implementations
/// - `MemoryFileSystem`: In-memory file system
/// - `NativeFileSystem`: Native OS file system
/// - `FilterChain`: filters in front of a source
pub trait FileSystem: Send + Sync {
    /// Create a file, truncating it if it exists.
    ///
    /// The handle is open for reading and writing.
    fn create(&self, path: &Path) -> VfsResult<Box<dyn File>>;

    /// Open a file for reading
    fn open(&self, path: &Path) -> VfsResult<Box<dyn File>>;

    /// Open a file with explicit flags.
    ///
    /// `mode` only applies when the file is created.
    fn open_with_flags(
        &self,
        path: &Path,
        flags: OpenFlags,
        mode: FileMode,
    ) -> VfsResult<Box<dyn File>>;

    /// Create a single directory; the parent must exist
    fn mkdir(&self, path: &Path, mode: FileMode) -> VfsResult<()>;

    /// Create a directory and any missing parents
    ///
    /// Succeeds without changes if the directory already exists.
    fn mkdir_all(&self, path: &Path, mode: FileMode) -> VfsResult<()>;

    /// Remove a file or an empty directory
    fn remove(&self, path: &Path) -> VfsResult<()>;

    /// Remove a path and everything below it
    ///
    /// Succeeds if the path does not exist.
    fn remove_all(&self, path: &Path) -> VfsResult<()>;

    /// Move `from` to `to`, replacing `to` if present
    fn rename(&self, from: &Path, to: &Path) -> VfsResult<()>;

    /// Retrieve metadata
    fn stat(&self, path: &Path) -> VfsResult<Metadata>;

    /// Identifies the filesystem implementation
    fn name(&self) -> &str;

    /// Change permission bits
    fn chmod(&self, path: &Path, mode: FileMode) -> VfsResult<()>;

    /// Change access and modification times
    fn chtimes(&self, path: &Path, accessed: SystemTime, modified: SystemTime) -> VfsResult<()>;
}
