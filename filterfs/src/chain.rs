//! Filter chain in front of a source filesystem

use crate::error::VfsResult;
use crate::metadata::{FileMode, Metadata, OpenFlags};
use crate::r#trait::{File, FileSystem};
use filterfs_config::TARGET_CHAIN;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::SystemTime;
use tracing::{debug, trace};

/// A filesystem that runs every call through a chain of filters before the
/// source.
///
/// Filters are ordinary `FileSystem` implementations. For each operation the
/// filters are called in order, most recently added first, with the same
/// arguments. The first filter that returns an error ends the call and that
/// error is handed back unchanged; neither the remaining filters nor the
/// source see the call. When every filter succeeds the source is called
/// exactly once and its result is returned as is.
///
/// `name()` is not filtered and always reports the source's name.
///
/// Handles returned by filters that let `create`/`open` through are dropped;
/// the caller only ever receives the source's handle.
///
/// The source is meant to be a plain filesystem rather than another
/// `FilterChain`. Nesting is not prevented and simply yields a deeper chain.
///
/// # Example
/// ```rust,ignore
/// use filterfs::{FilterChain, MemoryFileSystem};
///
/// let fs = FilterChain::new(MemoryFileSystem::new())
///     .with_filter(AuditFilter::new())
///     .with_filter(ReadOnlyFilter::new());
/// // ReadOnlyFilter runs first, then AuditFilter, then the memory source.
/// ```
pub struct FilterChain {
    source: Arc<dyn FileSystem>,
    /// In insertion order; evaluated back to front.
    filters: Vec<Arc<dyn FileSystem>>,
}

impl FilterChain {
    /// Create a chain with no filters around `source`
    pub fn new(source: impl FileSystem + 'static) -> Self {
        Self::from_shared(Arc::new(source))
    }

    /// Create a chain around a source that is shared with other owners
    pub fn from_shared(source: Arc<dyn FileSystem>) -> Self {
        Self {
            source,
            filters: Vec::new(),
        }
    }

    /// Prepend a filter: it runs before every filter added earlier.
    ///
    /// The same filter may be added more than once.
    pub fn add_filter(&mut self, filter: Arc<dyn FileSystem>) {
        trace!(
            target: TARGET_CHAIN,
            filter = filter.name(),
            depth = self.filters.len() + 1,
            "filter added"
        );
        self.filters.push(filter);
    }

    /// Builder form of `add_filter`
    pub fn with_filter(mut self, filter: impl FileSystem + 'static) -> Self {
        self.add_filter(Arc::new(filter));
        self
    }

    pub fn filter_count(&self) -> usize {
        self.filters.len()
    }

    /// True when calls go straight to the source
    pub fn is_pass_through(&self) -> bool {
        self.filters.is_empty()
    }

    pub fn source(&self) -> &Arc<dyn FileSystem> {
        &self.source
    }

    /// Filters in evaluation order
    pub fn filters(&self) -> impl Iterator<Item = &Arc<dyn FileSystem>> {
        self.filters.iter().rev()
    }

    /// Run `call` against each filter, then the source.
    fn gate<T>(
        &self,
        op: &'static str,
        path: &Path,
        call: impl Fn(&dyn FileSystem) -> VfsResult<T>,
    ) -> VfsResult<T> {
        for (position, filter) in self.filters().enumerate() {
            if let Err(err) = call(filter.as_ref()) {
                debug!(
                    target: TARGET_CHAIN,
                    op,
                    path = %path.display(),
                    filter = filter.name(),
                    position,
                    error = %err,
                    "rejected by filter"
                );
                return Err(err);
            }
        }
        trace!(
            target: TARGET_CHAIN,
            op,
            path = %path.display(),
            source = self.source.name(),
            "forwarding to source"
        );
        call(self.source.as_ref())
    }
}

impl fmt::Debug for FilterChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let filters: Vec<&str> = self.filters().map(|filter| filter.name()).collect();
        f.debug_struct("FilterChain")
            .field("source", &self.source.name())
            .field("filters", &filters)
            .finish()
    }
}

impl FileSystem for FilterChain {
    fn create(&self, path: &Path) -> VfsResult<Box<dyn File>> {
        self.gate("create", path, |fs| fs.create(path))
    }

    fn open(&self, path: &Path) -> VfsResult<Box<dyn File>> {
        self.gate("open", path, |fs| fs.open(path))
    }

    fn open_with_flags(
        &self,
        path: &Path,
        flags: OpenFlags,
        mode: FileMode,
    ) -> VfsResult<Box<dyn File>> {
        self.gate("open_with_flags", path, |fs| {
            fs.open_with_flags(path, flags, mode)
        })
    }

    fn mkdir(&self, path: &Path, mode: FileMode) -> VfsResult<()> {
        self.gate("mkdir", path, |fs| fs.mkdir(path, mode))
    }

    fn mkdir_all(&self, path: &Path, mode: FileMode) -> VfsResult<()> {
        self.gate("mkdir_all", path, |fs| fs.mkdir_all(path, mode))
    }

    fn remove(&self, path: &Path) -> VfsResult<()> {
        self.gate("remove", path, |fs| fs.remove(path))
    }

    fn remove_all(&self, path: &Path) -> VfsResult<()> {
        self.gate("remove_all", path, |fs| fs.remove_all(path))
    }

    fn rename(&self, from: &Path, to: &Path) -> VfsResult<()> {
        self.gate("rename", from, |fs| fs.rename(from, to))
    }

    fn stat(&self, path: &Path) -> VfsResult<Metadata> {
        self.gate("stat", path, |fs| fs.stat(path))
    }

    fn name(&self) -> &str {
        self.source.name()
    }

    fn chmod(&self, path: &Path, mode: FileMode) -> VfsResult<()> {
        self.gate("chmod", path, |fs| fs.chmod(path, mode))
    }

    fn chtimes(&self, path: &Path, accessed: SystemTime, modified: SystemTime) -> VfsResult<()> {
        self.gate("chtimes", path, |fs| fs.chtimes(path, accessed, modified))
    }
}
