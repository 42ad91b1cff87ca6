//! File metadata, permission bits and open flags

use bitflags::bitflags;
use std::fmt;
use std::time::SystemTime;

/// Permission bits plus a directory marker.
///
/// Only the low nine bits (`0o777`) are kept as permissions; the directory
/// marker is tracked separately so `chmod` can never turn a file into a
/// directory or back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FileMode {
    bits: u32,
    dir: bool,
}

impl FileMode {
    pub const PERM_MASK: u32 = 0o777;

    /// Mode for a regular file
    pub const fn file(perm: u32) -> Self {
        Self {
            bits: perm & Self::PERM_MASK,
            dir: false,
        }
    }

    /// Mode for a directory
    pub const fn dir(perm: u32) -> Self {
        Self {
            bits: perm & Self::PERM_MASK,
            dir: true,
        }
    }

    pub fn permissions(&self) -> u32 {
        self.bits
    }

    pub fn is_dir(&self) -> bool {
        self.dir
    }

    /// True when no write bit is set
    pub fn is_readonly(&self) -> bool {
        self.bits & 0o222 == 0
    }

    /// Same kind, new permission bits
    pub fn with_permissions(&self, perm: u32) -> Self {
        Self {
            bits: perm & Self::PERM_MASK,
            dir: self.dir,
        }
    }
}

impl fmt::Display for FileMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const RWX: [char; 3] = ['r', 'w', 'x'];
        let mut out = String::with_capacity(10);
        out.push(if self.dir { 'd' } else { '-' });
        for i in (0..9).rev() {
            if self.bits & (1 << i) != 0 {
                out.push(RWX[2 - i % 3]);
            } else {
                out.push('-');
            }
        }
        f.write_str(&out)
    }
}

/// Metadata about a file or directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Metadata {
    /// Final path component ("/" for the root)
    pub name: String,
    /// Size in bytes (0 for directories)
    pub size: u64,
    pub mode: FileMode,
    /// Last modification time
    pub modified: SystemTime,
    /// Last access time
    pub accessed: SystemTime,
}

impl Metadata {
    pub fn is_dir(&self) -> bool {
        self.mode.is_dir()
    }

    pub fn is_file(&self) -> bool {
        !self.mode.is_dir()
    }
}

bitflags! {
    /// Flags controlling how `open_with_flags` opens a file.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct OpenFlags: u32 {
        /// Open for reading.
        const READ = 1;
        /// Open for writing.
        const WRITE = 1 << 1;
        /// Every write goes to the end of the file.
        const APPEND = 1 << 2;
        /// Create the file if it does not exist.
        const CREATE = 1 << 3;
        /// With CREATE, fail if the file already exists.
        const EXCLUSIVE = 1 << 4;
        /// Truncate to zero length on open.
        const TRUNCATE = 1 << 5;
    }
}

impl OpenFlags {
    /// Flags used by `create`
    pub const CREATE_TRUNCATE: OpenFlags = OpenFlags::READ
        .union(OpenFlags::WRITE)
        .union(OpenFlags::CREATE)
        .union(OpenFlags::TRUNCATE);

    /// Whether a handle opened with these flags may write
    pub fn writes(&self) -> bool {
        self.intersects(OpenFlags::WRITE | OpenFlags::APPEND)
    }

    /// Whether a handle opened with these flags may read.
    ///
    /// Flags without READ or a write bit open read-only.
    pub fn reads(&self) -> bool {
        self.contains(OpenFlags::READ) || !self.writes()
    }
}
