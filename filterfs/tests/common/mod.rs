//! Test helpers
//!
//! Filters used by the integration tests: a read-only gate and a recorder
//! that never rejects.

#![allow(dead_code)]

use filterfs::{File, FileMode, FileSystem, Metadata, OpenFlags, VfsError, VfsResult};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::SystemTime;

/// Error returned by `ReadOnlyFilter` for every mutation
pub fn read_only_error() -> VfsError {
    VfsError::custom("read-only file system")
}

/// Handle returned by filters that let an open through.
///
/// Reads as empty and discards writes.
#[derive(Debug)]
pub struct NullFile {
    name: String,
}

impl NullFile {
    pub fn boxed(path: &Path) -> Box<dyn File> {
        Box::new(NullFile {
            name: path.to_string_lossy().to_string(),
        })
    }
}

impl Read for NullFile {
    fn read(&mut self, _: &mut [u8]) -> io::Result<usize> {
        Ok(0)
    }
}

impl Write for NullFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Seek for NullFile {
    fn seek(&mut self, _: SeekFrom) -> io::Result<u64> {
        Ok(0)
    }
}

impl File for NullFile {
    fn name(&self) -> &str {
        &self.name
    }

    fn stat(&self) -> VfsResult<Metadata> {
        Ok(placeholder_metadata(Path::new(&self.name)))
    }

    fn sync(&mut self) -> VfsResult<()> {
        Ok(())
    }

    fn truncate(&mut self, _: u64) -> VfsResult<()> {
        Ok(())
    }

    fn read_dir(&mut self) -> VfsResult<Vec<Metadata>> {
        Ok(Vec::new())
    }
}

/// Metadata a passing filter answers `stat` with
pub fn placeholder_metadata(path: &Path) -> Metadata {
    Metadata {
        name: path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default(),
        size: 0,
        mode: FileMode::file(0o444),
        modified: SystemTime::UNIX_EPOCH,
        accessed: SystemTime::UNIX_EPOCH,
    }
}

/// Shared, ordered log of calls seen by recorders
#[derive(Debug, Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<String>>>);

impl CallLog {
    pub fn push(&self, entry: String) {
        self.0.lock().unwrap().push(entry);
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    pub fn count(&self) -> usize {
        self.0.lock().unwrap().len()
    }

    pub fn count_for(&self, label: &str) -> usize {
        let prefix = format!("{} ", label);
        self.entries().iter().filter(|e| e.starts_with(&prefix)).count()
    }
}

/// Rejects every mutation, lets `open`, read-only `open_with_flags` and
/// `stat` through. Counts its own invocations.
#[derive(Debug, Default)]
pub struct ReadOnlyFilter {
    log: CallLog,
}

impl ReadOnlyFilter {
    pub fn new(log: &CallLog) -> Self {
        Self { log: log.clone() }
    }

    fn deny(&self, op: &str, path: &Path) -> VfsError {
        self.log.push(format!("read-only {} {}", op, path.display()));
        read_only_error()
    }

    fn allow(&self, op: &str, path: &Path) {
        self.log.push(format!("read-only {} {}", op, path.display()));
    }
}

impl FileSystem for ReadOnlyFilter {
    fn create(&self, path: &Path) -> VfsResult<Box<dyn File>> {
        Err(self.deny("create", path))
    }

    fn open(&self, path: &Path) -> VfsResult<Box<dyn File>> {
        self.allow("open", path);
        Ok(NullFile::boxed(path))
    }

    fn open_with_flags(&self, path: &Path, flags: OpenFlags, _: FileMode) -> VfsResult<Box<dyn File>> {
        if flags.writes() || flags.contains(OpenFlags::CREATE) {
            return Err(self.deny("open_with_flags", path));
        }
        self.allow("open_with_flags", path);
        Ok(NullFile::boxed(path))
    }

    fn mkdir(&self, path: &Path, _: FileMode) -> VfsResult<()> {
        Err(self.deny("mkdir", path))
    }

    fn mkdir_all(&self, path: &Path, _: FileMode) -> VfsResult<()> {
        Err(self.deny("mkdir_all", path))
    }

    fn remove(&self, path: &Path) -> VfsResult<()> {
        Err(self.deny("remove", path))
    }

    fn remove_all(&self, path: &Path) -> VfsResult<()> {
        Err(self.deny("remove_all", path))
    }

    fn rename(&self, from: &Path, _: &Path) -> VfsResult<()> {
        Err(self.deny("rename", from))
    }

    fn stat(&self, path: &Path) -> VfsResult<Metadata> {
        self.allow("stat", path);
        Ok(placeholder_metadata(path))
    }

    fn name(&self) -> &str {
        "ReadOnlyFilter"
    }

    fn chmod(&self, path: &Path, _: FileMode) -> VfsResult<()> {
        Err(self.deny("chmod", path))
    }

    fn chtimes(&self, path: &Path, _: SystemTime, _: SystemTime) -> VfsResult<()> {
        Err(self.deny("chtimes", path))
    }
}

/// Never rejects; records every call with its arguments.
#[derive(Debug)]
pub struct LoggingFilter {
    label: String,
    log: CallLog,
}

impl LoggingFilter {
    pub fn new(label: &str, log: &CallLog) -> Self {
        Self {
            label: label.to_string(),
            log: log.clone(),
        }
    }

    fn record(&self, call: String) {
        self.log.push(format!("{} {}", self.label, call));
    }
}

impl FileSystem for LoggingFilter {
    fn create(&self, path: &Path) -> VfsResult<Box<dyn File>> {
        self.record(format!("create {}", path.display()));
        Ok(NullFile::boxed(path))
    }

    fn open(&self, path: &Path) -> VfsResult<Box<dyn File>> {
        self.record(format!("open {}", path.display()));
        Ok(NullFile::boxed(path))
    }

    fn open_with_flags(&self, path: &Path, flags: OpenFlags, mode: FileMode) -> VfsResult<Box<dyn File>> {
        self.record(format!(
            "open_with_flags {} {:#x} {:o}",
            path.display(),
            flags.bits(),
            mode.permissions()
        ));
        Ok(NullFile::boxed(path))
    }

    fn mkdir(&self, path: &Path, mode: FileMode) -> VfsResult<()> {
        self.record(format!("mkdir {} {:o}", path.display(), mode.permissions()));
        Ok(())
    }

    fn mkdir_all(&self, path: &Path, mode: FileMode) -> VfsResult<()> {
        self.record(format!("mkdir_all {} {:o}", path.display(), mode.permissions()));
        Ok(())
    }

    fn remove(&self, path: &Path) -> VfsResult<()> {
        self.record(format!("remove {}", path.display()));
        Ok(())
    }

    fn remove_all(&self, path: &Path) -> VfsResult<()> {
        self.record(format!("remove_all {}", path.display()));
        Ok(())
    }

    fn rename(&self, from: &Path, to: &Path) -> VfsResult<()> {
        self.record(format!("rename {} {}", from.display(), to.display()));
        Ok(())
    }

    fn stat(&self, path: &Path) -> VfsResult<Metadata> {
        self.record(format!("stat {}", path.display()));
        Ok(placeholder_metadata(path))
    }

    fn name(&self) -> &str {
        &self.label
    }

    fn chmod(&self, path: &Path, mode: FileMode) -> VfsResult<()> {
        self.record(format!("chmod {} {:o}", path.display(), mode.permissions()));
        Ok(())
    }

    fn chtimes(&self, path: &Path, accessed: SystemTime, modified: SystemTime) -> VfsResult<()> {
        let secs = |t: SystemTime| {
            t.duration_since(SystemTime::UNIX_EPOCH)
                .map(|d| d.as_secs())
                .unwrap_or(0)
        };
        self.record(format!(
            "chtimes {} {} {}",
            path.display(),
            secs(accessed),
            secs(modified)
        ));
        Ok(())
    }
}

/// Read a whole file through any filesystem
pub fn read_to_string(fs: &dyn FileSystem, path: &str) -> String {
    let mut file = fs.open(Path::new(path)).unwrap();
    let mut content = String::new();
    file.read_to_string(&mut content).unwrap();
    content
}
