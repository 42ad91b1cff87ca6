//! Native file system implementation

use crate::error::{VfsError, VfsResult};
use crate::metadata::{FileMode, Metadata, OpenFlags};
use crate::r#trait::{File, FileSystem};
use filterfs_config::{NativeConfig, TARGET_NATIVE};
use std::fs;
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Component, Path, PathBuf};
use std::time::SystemTime;
use tracing::trace;

fn to_metadata(path: &Path, meta: &fs::Metadata) -> Metadata {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.to_string_lossy().to_string());
    let perm = permission_bits(&meta.permissions());
    let mode = if meta.is_dir() {
        FileMode::dir(perm)
    } else {
        FileMode::file(perm)
    };
    Metadata {
        name,
        size: if meta.is_dir() { 0 } else { meta.len() },
        mode,
        modified: meta.modified().unwrap_or(SystemTime::UNIX_EPOCH),
        accessed: meta.accessed().unwrap_or(SystemTime::UNIX_EPOCH),
    }
}

#[cfg(unix)]
fn permission_bits(perm: &fs::Permissions) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    perm.mode() & FileMode::PERM_MASK
}

#[cfg(not(unix))]
fn permission_bits(perm: &fs::Permissions) -> u32 {
    if perm.readonly() {
        0o444
    } else {
        0o666
    }
}

#[cfg(unix)]
fn apply_mode(perm: &mut fs::Permissions, mode: FileMode) {
    use std::os::unix::fs::PermissionsExt;
    perm.set_mode(mode.permissions());
}

#[cfg(not(unix))]
fn apply_mode(perm: &mut fs::Permissions, mode: FileMode) {
    perm.set_readonly(mode.is_readonly());
}

/// A native OS file system implementation.
///
/// This wraps `std::fs` operations and provides the `FileSystem`
/// interface for local file access. With a base directory every path is
/// resolved below that directory and `..` components are rejected.
///
/// # Example
/// ```
/// use filterfs::{FileSystem, NativeFileSystem};
///
/// let fs = NativeFileSystem::with_base(std::env::temp_dir());
/// assert_eq!(fs.name(), "NativeFileSystem");
/// ```
#[derive(Debug, Clone, Default)]
pub struct NativeFileSystem {
    base: Option<PathBuf>,
}

impl NativeFileSystem {
    /// Create a new native file system addressing host paths directly.
    pub fn new() -> Self {
        Self { base: None }
    }

    /// Create a new native file system with a base directory.
    ///
    /// All paths will be relative to this base directory.
    ///
    /// # Arguments
    /// * `base` - The base directory for all file operations
    pub fn with_base(base: impl Into<PathBuf>) -> Self {
        Self {
            base: Some(base.into()),
        }
    }

    pub fn from_config(config: &NativeConfig) -> Self {
        Self {
            base: config.base.clone(),
        }
    }

    pub fn base(&self) -> Option<&Path> {
        self.base.as_deref()
    }

    /// Map a caller path onto the host filesystem.
    fn resolve(&self, path: &Path) -> VfsResult<PathBuf> {
        let Some(base) = &self.base else {
            return Ok(path.to_path_buf());
        };
        let mut resolved = base.clone();
        for component in path.components() {
            match component {
                Component::Normal(part) => resolved.push(part),
                Component::RootDir | Component::CurDir | Component::Prefix(_) => {}
                Component::ParentDir => {
                    return Err(VfsError::InvalidPath {
                        path: path.to_string_lossy().to_string(),
                        reason: String::from("parent components are not allowed below a base"),
                    })
                }
            }
        }
        Ok(resolved)
    }

    /// Open a host file.
    ///
    /// `std` refuses to create without write access and to combine append
    /// with truncate, so the descriptor may be opened wider than `flags`
    /// and truncation happens after the open. `NativeFile` enforces the
    /// access `flags` grant.
    fn open_native(&self, path: &Path, flags: OpenFlags, mode: FileMode) -> VfsResult<NativeFile> {
        let real = self.resolve(path)?;
        let append = flags.contains(OpenFlags::APPEND);
        let write = flags.contains(OpenFlags::WRITE) || (flags.contains(OpenFlags::CREATE) && !append);
        let mut options = fs::OpenOptions::new();
        options.read(flags.reads()).write(write).append(append);
        if flags.contains(OpenFlags::CREATE) {
            if flags.contains(OpenFlags::EXCLUSIVE) {
                options.create_new(true);
            } else {
                options.create(true);
            }
        }
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(mode.permissions());
        }
        #[cfg(not(unix))]
        let _ = mode;

        let file = options.open(&real).map_err(|e| VfsError::from_io(e, path))?;
        if flags.contains(OpenFlags::TRUNCATE) && flags.writes() {
            file.set_len(0).map_err(|e| VfsError::from_io(e, path))?;
        }
        Ok(NativeFile {
            name: path.to_string_lossy().to_string(),
            path: real,
            file,
            flags,
        })
    }
}

impl FileSystem for NativeFileSystem {
    fn create(&self, path: &Path) -> VfsResult<Box<dyn File>> {
        trace!(target: TARGET_NATIVE, path = %path.display(), "create");
        let file = self.open_native(path, OpenFlags::CREATE_TRUNCATE, FileMode::file(0o666))?;
        Ok(Box::new(file))
    }

    fn open(&self, path: &Path) -> VfsResult<Box<dyn File>> {
        trace!(target: TARGET_NATIVE, path = %path.display(), "open");
        Ok(Box::new(self.open_native(path, OpenFlags::READ, FileMode::file(0))?))
    }

    fn open_with_flags(
        &self,
        path: &Path,
        flags: OpenFlags,
        mode: FileMode,
    ) -> VfsResult<Box<dyn File>> {
        trace!(target: TARGET_NATIVE, path = %path.display(), ?flags, "open_with_flags");
        Ok(Box::new(self.open_native(path, flags, mode)?))
    }

    fn mkdir(&self, path: &Path, mode: FileMode) -> VfsResult<()> {
        trace!(target: TARGET_NATIVE, path = %path.display(), "mkdir");
        let real = self.resolve(path)?;
        let mut builder = fs::DirBuilder::new();
        #[cfg(unix)]
        {
            use std::os::unix::fs::DirBuilderExt;
            builder.mode(mode.permissions());
        }
        #[cfg(not(unix))]
        let _ = mode;
        builder.create(&real).map_err(|e| VfsError::from_io(e, path))
    }

    fn mkdir_all(&self, path: &Path, mode: FileMode) -> VfsResult<()> {
        trace!(target: TARGET_NATIVE, path = %path.display(), "mkdir_all");
        let real = self.resolve(path)?;
        let mut builder = fs::DirBuilder::new();
        builder.recursive(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::DirBuilderExt;
            builder.mode(mode.permissions());
        }
        #[cfg(not(unix))]
        let _ = mode;
        builder.create(&real).map_err(|e| VfsError::from_io(e, path))
    }

    fn remove(&self, path: &Path) -> VfsResult<()> {
        trace!(target: TARGET_NATIVE, path = %path.display(), "remove");
        let real = self.resolve(path)?;
        let meta = fs::symlink_metadata(&real).map_err(|e| VfsError::from_io(e, path))?;
        let result = if meta.is_dir() {
            fs::remove_dir(&real)
        } else {
            fs::remove_file(&real)
        };
        result.map_err(|e| VfsError::from_io(e, path))
    }

    fn remove_all(&self, path: &Path) -> VfsResult<()> {
        trace!(target: TARGET_NATIVE, path = %path.display(), "remove_all");
        let real = self.resolve(path)?;
        let meta = match fs::symlink_metadata(&real) {
            Ok(meta) => meta,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(VfsError::from_io(e, path)),
        };
        let result = if meta.is_dir() {
            fs::remove_dir_all(&real)
        } else {
            fs::remove_file(&real)
        };
        result.map_err(|e| VfsError::from_io(e, path))
    }

    fn rename(&self, from: &Path, to: &Path) -> VfsResult<()> {
        trace!(target: TARGET_NATIVE, from = %from.display(), to = %to.display(), "rename");
        let real_from = self.resolve(from)?;
        let real_to = self.resolve(to)?;
        fs::rename(&real_from, &real_to).map_err(|e| VfsError::from_io(e, from))
    }

    fn stat(&self, path: &Path) -> VfsResult<Metadata> {
        let real = self.resolve(path)?;
        let meta = fs::metadata(&real).map_err(|e| VfsError::from_io(e, path))?;
        Ok(to_metadata(&real, &meta))
    }

    fn name(&self) -> &str {
        "NativeFileSystem"
    }

    fn chmod(&self, path: &Path, mode: FileMode) -> VfsResult<()> {
        trace!(target: TARGET_NATIVE, path = %path.display(), mode = %mode, "chmod");
        let real = self.resolve(path)?;
        let mut perm = fs::metadata(&real)
            .map_err(|e| VfsError::from_io(e, path))?
            .permissions();
        apply_mode(&mut perm, mode);
        fs::set_permissions(&real, perm).map_err(|e| VfsError::from_io(e, path))
    }

    fn chtimes(&self, path: &Path, accessed: SystemTime, modified: SystemTime) -> VfsResult<()> {
        trace!(target: TARGET_NATIVE, path = %path.display(), "chtimes");
        let real = self.resolve(path)?;
        let file = fs::File::open(&real).map_err(|e| VfsError::from_io(e, path))?;
        let times = fs::FileTimes::new()
            .set_accessed(accessed)
            .set_modified(modified);
        file.set_times(times).map_err(|e| VfsError::from_io(e, path))
    }
}

/// Handle to a host file, limited to the access its open flags grant
#[derive(Debug)]
pub struct NativeFile {
    name: String,
    path: PathBuf,
    file: fs::File,
    flags: OpenFlags,
}

impl NativeFile {
    fn denied(&self) -> VfsError {
        VfsError::permission_denied(self.name.as_str())
    }
}

impl Read for NativeFile {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if !self.flags.reads() {
            return Err(self.denied().into());
        }
        self.file.read(buf)
    }
}

impl Write for NativeFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if !self.flags.writes() {
            return Err(self.denied().into());
        }
        self.file.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

impl Seek for NativeFile {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.file.seek(pos)
    }
}

impl File for NativeFile {
    fn name(&self) -> &str {
        &self.name
    }

    fn stat(&self) -> VfsResult<Metadata> {
        let meta = self
            .file
            .metadata()
            .map_err(|e| VfsError::from_io(e, &self.path))?;
        Ok(to_metadata(&self.path, &meta))
    }

    fn sync(&mut self) -> VfsResult<()> {
        self.file
            .sync_all()
            .map_err(|e| VfsError::from_io(e, &self.path))
    }

    fn truncate(&mut self, size: u64) -> VfsResult<()> {
        if !self.flags.writes() {
            return Err(self.denied());
        }
        self.file
            .set_len(size)
            .map_err(|e| VfsError::from_io(e, &self.path))
    }

    fn read_dir(&mut self) -> VfsResult<Vec<Metadata>> {
        let entries = fs::read_dir(&self.path).map_err(|e| VfsError::from_io(e, &self.path))?;
        let mut listing = Vec::new();
        for entry in entries {
            let entry = entry?;
            let meta = entry.metadata()?;
            listing.push(to_metadata(&entry.path(), &meta));
        }
        listing.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(listing)
    }
}
