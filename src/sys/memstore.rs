use std::{
    collections::HashMap,
    collections::HashSet,
    path::{Path, PathBuf},
    sync::{Arc, RwLock},
};

use tracing::debug;

use crate::{
    errors::{AclError, AmResult},
    sys::{access_list, AccessList, SecurityInfo, SecurityStore, Sid, MODE_DIR},
};

// Helper alias
pub(crate) type MemStoreNodes = HashMap<PathBuf, MemStoreNode>;

// A single path's security state. The committed access list is the source of truth; the
// permission mask reported by stat is always re-derived from it.
#[derive(Clone, Debug)]
pub(crate) struct MemStoreNode {
    pub(crate) dir: bool,
    pub(crate) owner: Sid,
    pub(crate) group: Sid,
    pub(crate) acl: AccessList,
}

#[derive(Debug)]
pub(crate) struct MemStoreInner {
    nodes: MemStoreNodes,
    fail_commits: HashSet<PathBuf>,
}

/// In-memory [`SecurityStore`] backend
///
/// Keeps a flat map of paths to committed access lists guarded by a reader writer lock, in the
/// same shape a memory backed filesystem keeps its entries. Cloning is cheap and clones share
/// the same underlying state. `stat` answers by evaluating the committed list back to a mask,
/// so every interaction exercises the full map and evaluate round trip.
///
/// Paths are used verbatim; no normalization or link resolution is performed.
///
/// ### Examples
/// ```
/// use aclmod::prelude::*;
///
/// let store = MemStore::new();
/// let file = store.add_file("/file", 0o644).unwrap();
/// assert_eq!(store.mode(&file).unwrap(), 0o644);
/// ```
#[derive(Clone, Debug)]
pub struct MemStore(Arc<RwLock<MemStoreInner>>);

impl MemStore {
    /// Create a new store containing only the root directory `/` with mode `0o755`
    pub fn new() -> Self {
        let store = MemStore(Arc::new(RwLock::new(MemStoreInner {
            nodes: HashMap::new(),
            fail_commits: HashSet::new(),
        })));
        // Seeding the root can only fail on allocation failure which panics anyway
        let _ = store.add_dir("/", 0o755);
        store
    }

    /// Default owning principal for new paths
    pub fn owner() -> Sid {
        Sid::new("S-1-5-21-500")
    }

    /// Default owning group principal for new paths
    pub fn group() -> Sid {
        Sid::new("S-1-5-21-513")
    }

    /// Add a directory with the given permission mask, creating missing parents with `0o755`
    ///
    /// ### Examples
    /// ```
    /// use aclmod::prelude::*;
    ///
    /// let store = MemStore::new();
    /// let dir = store.add_dir("/dir1/dir2", 0o750).unwrap();
    /// assert_eq!(store.mode(&dir).unwrap(), MODE_DIR | 0o750);
    /// assert_eq!(store.mode("/dir1").unwrap(), MODE_DIR | 0o755);
    /// ```
    pub fn add_dir<T: AsRef<Path>>(&self, path: T, mode: u32) -> AmResult<PathBuf> {
        self.add(path.as_ref(), true, mode)
    }

    /// Add a file with the given permission mask, creating missing parents with `0o755`
    ///
    /// ### Examples
    /// ```
    /// use aclmod::prelude::*;
    ///
    /// let store = MemStore::new();
    /// let file = store.add_file("/dir/file", 0o600).unwrap();
    /// assert_eq!(store.mode(&file).unwrap(), 0o600);
    /// ```
    pub fn add_file<T: AsRef<Path>>(&self, path: T, mode: u32) -> AmResult<PathBuf> {
        self.add(path.as_ref(), false, mode)
    }

    fn add(&self, path: &Path, dir: bool, mode: u32) -> AmResult<PathBuf> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !self.exists(parent) {
                self.add(parent, true, 0o755)?;
            }
        }
        let acl = access_list(mode & 0o777, &Self::owner(), &Self::group())?;
        let node = MemStoreNode { dir, owner: Self::owner(), group: Self::group(), acl };
        self.write_guard().nodes.insert(path.to_path_buf(), node);
        Ok(path.to_path_buf())
    }

    /// Returns true if the given path exists in the store
    pub fn exists<T: AsRef<Path>>(&self, path: T) -> bool {
        self.read_guard().nodes.contains_key(path.as_ref())
    }

    /// Returns the path's current permission mask, carrying [`MODE_DIR`] for directories
    ///
    /// ### Examples
    /// ```
    /// use aclmod::prelude::*;
    ///
    /// let store = MemStore::new();
    /// assert_eq!(store.mode("/").unwrap(), MODE_DIR | 0o755);
    /// ```
    pub fn mode<T: AsRef<Path>>(&self, path: T) -> AmResult<u32> {
        Ok(self.stat(path)?.mode)
    }

    /// Returns a copy of the path's committed access list
    pub fn acl<T: AsRef<Path>>(&self, path: T) -> AmResult<AccessList> {
        let path = path.as_ref();
        match self.read_guard().nodes.get(path) {
            Some(node) => Ok(node.acl.clone()),
            None => Err(AclError::LookupFailed(path.to_path_buf()).into()),
        }
    }

    /// Make every future commit against the given path fail
    ///
    /// Exercises the fail fast abort semantics of a recursive walk without a real filesystem
    /// to misbehave.
    pub fn fail_commits<T: AsRef<Path>>(&self, path: T) {
        self.write_guard().fail_commits.insert(path.as_ref().to_path_buf());
    }

    fn read_guard(&self) -> std::sync::RwLockReadGuard<'_, MemStoreInner> {
        self.0.read().unwrap_or_else(|err| err.into_inner())
    }

    fn write_guard(&self) -> std::sync::RwLockWriteGuard<'_, MemStoreInner> {
        self.0.write().unwrap_or_else(|err| err.into_inner())
    }
}

impl Default for MemStore {
    fn default() -> Self {
        MemStore::new()
    }
}

impl SecurityStore for MemStore {
    fn stat<T: AsRef<Path>>(&self, path: T) -> AmResult<SecurityInfo> {
        let path = path.as_ref();
        match self.read_guard().nodes.get(path) {
            Some(node) => Ok(SecurityInfo {
                mode: node.acl.to_mode(&node.owner, &node.group) | if node.dir { MODE_DIR } else { 0 },
                owner: node.owner.clone(),
                group: node.group.clone(),
            }),
            None => Err(AclError::LookupFailed(path.to_path_buf()).into()),
        }
    }

    fn entries<T: AsRef<Path>>(&self, path: T) -> AmResult<Vec<PathBuf>> {
        let path = path.as_ref();
        let guard = self.read_guard();
        match guard.nodes.get(path) {
            Some(node) if node.dir => Ok(guard
                .nodes
                .keys()
                .filter(|x| x.parent() == Some(path))
                .cloned()
                .collect()),
            _ => Err(AclError::EnumerationFailed(path.to_path_buf()).into()),
        }
    }

    fn commit<T: AsRef<Path>>(&self, path: T, acl: &AccessList) -> AmResult<()> {
        let path = path.as_ref();
        let mut guard = self.write_guard();
        if guard.fail_commits.contains(path) {
            return Err(AclError::CommitFailed(path.to_path_buf()).into());
        }
        match guard.nodes.get_mut(path) {
            Some(node) => {
                node.acl = acl.clone();
                debug!("committed access list for {}", path.display());
                Ok(())
            },
            None => Err(AclError::CommitFailed(path.to_path_buf()).into()),
        }
    }
}
