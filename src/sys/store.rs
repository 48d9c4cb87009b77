use std::{
    fmt::Debug,
    path::{Path, PathBuf},
};

use crate::{
    errors::AmResult,
    sys::{AccessList, Sid, MODE_DIR},
};

/// Current security state of a single path as reported by a [`SecurityStore`]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SecurityInfo {
    /// 9 bit permission mask, carrying [`MODE_DIR`] for directories
    pub mode: u32,

    /// Owning principal
    pub owner: Sid,

    /// Owning group principal
    pub group: Sid,
}

impl SecurityInfo {
    /// Returns true if the path is a directory
    pub fn is_dir(&self) -> bool {
        self.mode & MODE_DIR != 0
    }
}

/// Defines the security descriptor primitives the mode translation core is built over
///
/// Implementations own all side effects: reading a path's security state, enumerating a
/// directory and replacing a path's discretionary access list. The in-crate [`MemStore`]
/// provides an in-memory implementation for testing; a production backend wraps the real
/// security descriptor syscalls of the target platform.
///
/// [`MemStore`]: crate::sys::MemStore
pub trait SecurityStore: Debug + Send + Sync + 'static {
    /// Return the current permission mask, directory flag and owning identities for the path
    ///
    /// ### Errors
    /// * AclError::LookupFailed when the path does not exist or is inaccessible
    fn stat<T: AsRef<Path>>(&self, path: T) -> AmResult<SecurityInfo>;

    /// Return the immediate children of the given directory
    ///
    /// * Excludes the self and parent pseudo entries
    /// * Sibling order is implementation defined and must not be relied upon
    ///
    /// ### Errors
    /// * AclError::EnumerationFailed when the path is not an enumerable directory
    fn entries<T: AsRef<Path>>(&self, path: T) -> AmResult<Vec<PathBuf>>;

    /// Replace the path's discretionary access list with the given one
    ///
    /// * Must not disturb inherited permission relationships between the path and its
    ///   parent or children
    ///
    /// ### Errors
    /// * AclError::CommitFailed when the replacement could not be written
    fn commit<T: AsRef<Path>>(&self, path: T, acl: &AccessList) -> AmResult<()>;
}
