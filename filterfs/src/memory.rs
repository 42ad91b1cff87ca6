//! In-memory file system implementation

use crate::error::{VfsError, VfsResult};
use crate::metadata::{FileMode, Metadata, OpenFlags};
use crate::r#trait::{File, FileSystem};
use filterfs_config::{MemoryConfig, TARGET_MEMORY};
use std::collections::BTreeMap;
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::Path;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::SystemTime;
use tracing::{trace, warn};

/// A single file or directory
#[derive(Debug)]
struct Node {
    data: Vec<u8>,
    mode: FileMode,
    modified: SystemTime,
    accessed: SystemTime,
}

impl Node {
    fn new(mode: FileMode) -> Node {
        Self::with_data(mode, Vec::new())
    }

    fn with_data(mode: FileMode, data: Vec<u8>) -> Node {
        let now = SystemTime::now();
        Node {
            data,
            mode,
            modified: now,
            accessed: now,
        }
    }

    fn shared(self) -> NodeRef {
        Arc::new(RwLock::new(self))
    }

    fn metadata(&self, path: &str) -> Metadata {
        Metadata {
            name: base_name(path).to_string(),
            size: if self.mode.is_dir() {
                0
            } else {
                self.data.len() as u64
            },
            mode: self.mode,
            modified: self.modified,
            accessed: self.accessed,
        }
    }
}

type NodeRef = Arc<RwLock<Node>>;
type Tree = BTreeMap<String, NodeRef>;

fn poisoned() -> VfsError {
    VfsError::custom("Lock poisoned")
}

fn read_node(node: &NodeRef) -> VfsResult<RwLockReadGuard<'_, Node>> {
    node.read().map_err(|_| poisoned())
}

fn write_node(node: &NodeRef) -> VfsResult<RwLockWriteGuard<'_, Node>> {
    node.write().map_err(|_| poisoned())
}

fn out_of_range(message: &'static str) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidInput, message)
}

/// Resize file content to `len` bytes, zero-filling any growth.
///
/// Sizes the process cannot hold are reported as errors instead of aborting.
fn resize_data(data: &mut Vec<u8>, len: u64) -> io::Result<()> {
    let len = usize::try_from(len).map_err(|_| out_of_range("file size exceeds addressable memory"))?;
    if len > data.len() {
        data.try_reserve(len - data.len())
            .map_err(|e| io::Error::new(io::ErrorKind::OutOfMemory, e))?;
    }
    data.resize(len, 0);
    Ok(())
}

/// Normalize a path for internal storage.
///
/// Result is absolute and `/`-separated with `.` and `..` resolved, so
/// `a//b/../c/` and `/a/c` address the same node.
fn normalize_path(path: &Path) -> String {
    let raw = path.to_string_lossy().replace('\\', "/");
    let mut parts: Vec<&str> = Vec::new();
    for part in raw.split('/') {
        match part {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            other => parts.push(other),
        }
    }
    format!("/{}", parts.join("/"))
}

fn parent_of(path: &str) -> Option<&str> {
    if path == "/" {
        return None;
    }
    match path.rfind('/') {
        Some(0) => Some("/"),
        Some(idx) => Some(&path[..idx]),
        None => None,
    }
}

fn base_name(path: &str) -> &str {
    if path == "/" {
        return path;
    }
    path.rsplit('/').next().unwrap_or(path)
}

fn child_prefix(dir: &str) -> String {
    if dir == "/" {
        String::from("/")
    } else {
        format!("{}/", dir)
    }
}

/// Keys strictly below `dir`
fn descendants(tree: &Tree, dir: &str) -> Vec<String> {
    let prefix = child_prefix(dir);
    tree.range(prefix.clone()..)
        .take_while(|(key, _)| key.starts_with(&prefix))
        .filter(|(key, _)| key.as_str() != dir)
        .map(|(key, _)| key.clone())
        .collect()
}

fn has_children(tree: &Tree, dir: &str) -> bool {
    !descendants(tree, dir).is_empty()
}

/// First entry that stops `name` from being seeded as a file: `name` itself
/// when it is already a directory, or an ancestor that is a file.
fn seed_conflict(seeded: &BTreeMap<String, Node>, name: &str) -> Option<String> {
    if seeded.get(name).is_some_and(|node| node.mode.is_dir()) {
        return Some(name.to_string());
    }
    let mut dir = parent_of(name);
    while let Some(current) = dir {
        if seeded.get(current).is_some_and(|node| !node.mode.is_dir()) {
            return Some(current.to_string());
        }
        dir = parent_of(current);
    }
    None
}

fn check_parent(tree: &Tree, path: &str) -> VfsResult<()> {
    let Some(parent) = parent_of(path) else {
        return Ok(());
    };
    let node = tree.get(parent).ok_or_else(|| VfsError::not_found(parent))?;
    if read_node(node)?.mode.is_dir() {
        Ok(())
    } else {
        Err(VfsError::NotADirectory {
            path: parent.to_string(),
        })
    }
}

/// An in-memory file system implementation.
///
/// Files and directories live in a `BTreeMap` keyed by normalized path,
/// making it suitable for testing and scenarios where disk access is not
/// desired. Clones share the same tree.
///
/// # Example
/// ```
/// use filterfs::{FileSystem, MemoryFileSystem};
/// use std::io::Read;
/// use std::path::Path;
///
/// let fs = MemoryFileSystem::with_files([("/test.txt", b"hello".to_vec())]);
/// let mut content = String::new();
/// fs.open(Path::new("/test.txt")).unwrap().read_to_string(&mut content).unwrap();
/// assert_eq!(content, "hello");
/// ```
#[derive(Debug, Clone)]
pub struct MemoryFileSystem {
    nodes: Arc<RwLock<Tree>>,
    config: MemoryConfig,
}

impl MemoryFileSystem {
    /// Create a new file system containing only the root directory.
    pub fn new() -> Self {
        Self::from_config(&MemoryConfig::default())
    }

    pub fn from_config(config: &MemoryConfig) -> Self {
        let mut tree = Tree::new();
        tree.insert(String::from("/"), Node::new(FileMode::dir(0o755)).shared());
        Self {
            nodes: Arc::new(RwLock::new(tree)),
            config: config.clone(),
        }
    }

    /// Create a new memory file system pre-populated with files.
    ///
    /// Missing parent directories are created. An entry whose path is
    /// already a directory, or lies below a seeded file, is skipped with a
    /// warning; a later entry for the same file replaces the earlier one.
    ///
    /// # Arguments
    /// * `files` - Iterator of (path, content) tuples
    pub fn with_files<I, S>(files: I) -> Self
    where
        I: IntoIterator<Item = (S, Vec<u8>)>,
        S: AsRef<str>,
    {
        let config = MemoryConfig::default();
        let mut seeded = BTreeMap::new();
        seeded.insert(String::from("/"), Node::new(FileMode::dir(0o755)));
        for (path, content) in files {
            let name = normalize_path(Path::new(path.as_ref()));
            if let Some(conflict) = seed_conflict(&seeded, &name) {
                warn!(target: TARGET_MEMORY, path = %name, %conflict, "seeded file skipped");
                continue;
            }
            let mut dir = parent_of(&name);
            while let Some(current) = dir {
                seeded
                    .entry(current.to_string())
                    .or_insert_with(|| Node::new(FileMode::dir(config.dir_mode)));
                dir = parent_of(current);
            }
            seeded.insert(name, Node::with_data(FileMode::file(config.file_mode), content));
        }
        let tree: Tree = seeded
            .into_iter()
            .map(|(name, node)| (name, node.shared()))
            .collect();
        Self {
            nodes: Arc::new(RwLock::new(tree)),
            config,
        }
    }

    fn read_tree(&self) -> VfsResult<RwLockReadGuard<'_, Tree>> {
        self.nodes.read().map_err(|_| poisoned())
    }

    fn write_tree(&self) -> VfsResult<RwLockWriteGuard<'_, Tree>> {
        self.nodes.write().map_err(|_| poisoned())
    }

    fn lookup(&self, name: &str) -> VfsResult<NodeRef> {
        self.read_tree()?
            .get(name)
            .cloned()
            .ok_or_else(|| VfsError::not_found(name))
    }

    fn open_node(&self, path: &Path, flags: OpenFlags, mode: FileMode) -> VfsResult<MemoryFile> {
        let name = normalize_path(path);
        let mut tree = self.write_tree()?;
        let node = match tree.get(&name) {
            Some(existing) => {
                if flags.contains(OpenFlags::CREATE | OpenFlags::EXCLUSIVE) {
                    return Err(VfsError::AlreadyExists { path: name });
                }
                let node = Arc::clone(existing);
                {
                    let mut guard = write_node(&node)?;
                    if guard.mode.is_dir() && flags.writes() {
                        return Err(VfsError::IsADirectory { path: name });
                    }
                    if flags.contains(OpenFlags::TRUNCATE) && flags.writes() {
                        guard.data.clear();
                        guard.modified = SystemTime::now();
                    }
                }
                node
            }
            None => {
                if !flags.contains(OpenFlags::CREATE) {
                    return Err(VfsError::not_found(name));
                }
                check_parent(&tree, &name)?;
                let node = Node::new(FileMode::file(mode.permissions())).shared();
                tree.insert(name.clone(), Arc::clone(&node));
                node
            }
        };
        drop(tree);

        Ok(MemoryFile {
            name,
            node,
            nodes: Arc::clone(&self.nodes),
            position: 0,
            flags,
        })
    }
}

impl Default for MemoryFileSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl FileSystem for MemoryFileSystem {
    fn create(&self, path: &Path) -> VfsResult<Box<dyn File>> {
        trace!(target: TARGET_MEMORY, path = %path.display(), "create");
        let mode = FileMode::file(self.config.file_mode);
        Ok(Box::new(self.open_node(path, OpenFlags::CREATE_TRUNCATE, mode)?))
    }

    fn open(&self, path: &Path) -> VfsResult<Box<dyn File>> {
        trace!(target: TARGET_MEMORY, path = %path.display(), "open");
        Ok(Box::new(self.open_node(path, OpenFlags::READ, FileMode::file(0))?))
    }

    fn open_with_flags(
        &self,
        path: &Path,
        flags: OpenFlags,
        mode: FileMode,
    ) -> VfsResult<Box<dyn File>> {
        trace!(target: TARGET_MEMORY, path = %path.display(), ?flags, "open_with_flags");
        Ok(Box::new(self.open_node(path, flags, mode)?))
    }

    fn mkdir(&self, path: &Path, mode: FileMode) -> VfsResult<()> {
        let name = normalize_path(path);
        trace!(target: TARGET_MEMORY, path = %name, "mkdir");
        let mut tree = self.write_tree()?;
        if tree.contains_key(&name) {
            return Err(VfsError::AlreadyExists { path: name });
        }
        check_parent(&tree, &name)?;
        tree.insert(name, Node::new(FileMode::dir(mode.permissions())).shared());
        Ok(())
    }

    fn mkdir_all(&self, path: &Path, mode: FileMode) -> VfsResult<()> {
        let name = normalize_path(path);
        trace!(target: TARGET_MEMORY, path = %name, "mkdir_all");
        let mut tree = self.write_tree()?;
        let mut current = String::new();
        for part in name.split('/').filter(|p| !p.is_empty()) {
            current.push('/');
            current.push_str(part);
            match tree.get(&current) {
                Some(node) => {
                    if !read_node(node)?.mode.is_dir() {
                        return Err(VfsError::NotADirectory { path: current });
                    }
                }
                None => {
                    tree.insert(
                        current.clone(),
                        Node::new(FileMode::dir(mode.permissions())).shared(),
                    );
                }
            }
        }
        Ok(())
    }

    fn remove(&self, path: &Path) -> VfsResult<()> {
        let name = normalize_path(path);
        trace!(target: TARGET_MEMORY, path = %name, "remove");
        if name == "/" {
            return Err(VfsError::InvalidPath {
                path: name,
                reason: String::from("cannot remove the root directory"),
            });
        }
        let mut tree = self.write_tree()?;
        let is_dir = match tree.get(&name) {
            Some(node) => read_node(node)?.mode.is_dir(),
            None => return Err(VfsError::not_found(name)),
        };
        if is_dir && has_children(&tree, &name) {
            return Err(VfsError::DirectoryNotEmpty { path: name });
        }
        tree.remove(&name);
        Ok(())
    }

    fn remove_all(&self, path: &Path) -> VfsResult<()> {
        let name = normalize_path(path);
        trace!(target: TARGET_MEMORY, path = %name, "remove_all");
        let mut tree = self.write_tree()?;
        for key in descendants(&tree, &name) {
            tree.remove(&key);
        }
        // The root itself always stays.
        if name != "/" {
            tree.remove(&name);
        }
        Ok(())
    }

    fn rename(&self, from: &Path, to: &Path) -> VfsResult<()> {
        let from = normalize_path(from);
        let to = normalize_path(to);
        trace!(target: TARGET_MEMORY, from = %from, to = %to, "rename");
        if from == "/" || to == "/" {
            return Err(VfsError::InvalidPath {
                path: from,
                reason: String::from("cannot rename the root directory"),
            });
        }
        let mut tree = self.write_tree()?;
        let source_is_dir = match tree.get(&from) {
            Some(node) => read_node(node)?.mode.is_dir(),
            None => return Err(VfsError::not_found(from)),
        };
        if from == to {
            return Ok(());
        }
        if to.starts_with(&child_prefix(&from)) {
            return Err(VfsError::InvalidPath {
                path: to,
                reason: format!("cannot move '{}' inside itself", from),
            });
        }
        check_parent(&tree, &to)?;

        if let Some(target) = tree.get(&to) {
            let target_is_dir = read_node(target)?.mode.is_dir();
            match (source_is_dir, target_is_dir) {
                (_, true) if has_children(&tree, &to) => {
                    return Err(VfsError::DirectoryNotEmpty { path: to });
                }
                (false, true) => return Err(VfsError::IsADirectory { path: to }),
                (true, false) => return Err(VfsError::NotADirectory { path: to }),
                _ => {}
            }
            tree.remove(&to);
        }

        let mut moved = descendants(&tree, &from);
        moved.push(from.clone());
        for key in moved {
            if let Some(node) = tree.remove(&key) {
                let new_key = format!("{}{}", to, &key[from.len()..]);
                tree.insert(new_key, node);
            }
        }
        Ok(())
    }

    fn stat(&self, path: &Path) -> VfsResult<Metadata> {
        let name = normalize_path(path);
        let node = self.lookup(&name)?;
        let guard = read_node(&node)?;
        Ok(guard.metadata(&name))
    }

    fn name(&self) -> &str {
        "MemoryFileSystem"
    }

    fn chmod(&self, path: &Path, mode: FileMode) -> VfsResult<()> {
        let name = normalize_path(path);
        trace!(target: TARGET_MEMORY, path = %name, mode = %mode, "chmod");
        let node = self.lookup(&name)?;
        let mut guard = write_node(&node)?;
        guard.mode = guard.mode.with_permissions(mode.permissions());
        Ok(())
    }

    fn chtimes(&self, path: &Path, accessed: SystemTime, modified: SystemTime) -> VfsResult<()> {
        let name = normalize_path(path);
        trace!(target: TARGET_MEMORY, path = %name, "chtimes");
        let node = self.lookup(&name)?;
        let mut guard = write_node(&node)?;
        guard.accessed = accessed;
        guard.modified = modified;
        Ok(())
    }
}

/// Handle to a file or directory inside a `MemoryFileSystem`.
///
/// The content is shared with the filesystem: writes are visible to every
/// other handle and to `stat` immediately.
#[derive(Debug)]
pub struct MemoryFile {
    name: String,
    node: NodeRef,
    nodes: Arc<RwLock<Tree>>,
    position: u64,
    flags: OpenFlags,
}

impl MemoryFile {
    fn denied(&self) -> io::Error {
        VfsError::permission_denied(self.name.as_str()).into()
    }
}

impl Read for MemoryFile {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if !self.flags.reads() {
            return Err(self.denied());
        }
        let mut node = write_node(&self.node)?;
        if node.mode.is_dir() {
            return Err(VfsError::IsADirectory {
                path: self.name.clone(),
            }
            .into());
        }
        let len = node.data.len() as u64;
        if self.position >= len {
            return Ok(0);
        }
        let start = self.position as usize;
        let count = buf.len().min(node.data.len() - start);
        buf[..count].copy_from_slice(&node.data[start..start + count]);
        node.accessed = SystemTime::now();
        self.position += count as u64;
        Ok(count)
    }
}

impl Write for MemoryFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if !self.flags.writes() {
            return Err(self.denied());
        }
        let mut node = write_node(&self.node)?;
        if self.flags.contains(OpenFlags::APPEND) {
            self.position = node.data.len() as u64;
        }
        let end = self
            .position
            .checked_add(buf.len() as u64)
            .ok_or_else(|| out_of_range("write position overflows"))?;
        if (node.data.len() as u64) < end {
            resize_data(&mut node.data, end)?;
        }
        // Both bounds fit in usize once the content holds `end` bytes.
        let (start, stop) = (self.position as usize, end as usize);
        node.data[start..stop].copy_from_slice(buf);
        node.modified = SystemTime::now();
        self.position = end;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Seek for MemoryFile {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let len = read_node(&self.node)?.data.len() as i64;
        let target = match pos {
            SeekFrom::Start(offset) => i64::try_from(offset)
                .map_err(|_| out_of_range("seek offset is larger than i64::MAX"))?,
            SeekFrom::End(offset) => len
                .checked_add(offset)
                .ok_or_else(|| out_of_range("seek position overflows"))?,
            SeekFrom::Current(offset) => i64::try_from(self.position)
                .ok()
                .and_then(|position| position.checked_add(offset))
                .ok_or_else(|| out_of_range("seek position overflows"))?,
        };
        if target < 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "seek to a negative position",
            ));
        }
        self.position = target as u64;
        Ok(self.position)
    }
}

impl File for MemoryFile {
    fn name(&self) -> &str {
        &self.name
    }

    fn stat(&self) -> VfsResult<Metadata> {
        Ok(read_node(&self.node)?.metadata(&self.name))
    }

    fn sync(&mut self) -> VfsResult<()> {
        Ok(())
    }

    fn truncate(&mut self, size: u64) -> VfsResult<()> {
        if !self.flags.writes() {
            return Err(VfsError::permission_denied(self.name.as_str()));
        }
        let mut node = write_node(&self.node)?;
        if node.mode.is_dir() {
            return Err(VfsError::IsADirectory {
                path: self.name.clone(),
            });
        }
        resize_data(&mut node.data, size)?;
        node.modified = SystemTime::now();
        Ok(())
    }

    fn read_dir(&mut self) -> VfsResult<Vec<Metadata>> {
        if !read_node(&self.node)?.mode.is_dir() {
            return Err(VfsError::NotADirectory {
                path: self.name.clone(),
            });
        }
        let tree = self.nodes.read().map_err(|_| poisoned())?;
        // The directory may have been renamed since it was opened.
        let dir = tree
            .iter()
            .find(|(_, node)| Arc::ptr_eq(node, &self.node))
            .map(|(key, _)| key.clone())
            .ok_or_else(|| VfsError::not_found(self.name.as_str()))?;
        let mut entries = Vec::new();
        for key in descendants(&tree, &dir) {
            if parent_of(&key) != Some(dir.as_str()) {
                continue;
            }
            if let Some(node) = tree.get(&key) {
                entries.push(read_node(node)?.metadata(&key));
            }
        }
        Ok(entries)
    }
}
