use std::{error::Error as StdError, fmt, path::PathBuf};

/// An error indicating that something went wrong while reading, building or committing an
/// access list
///
/// All variants are terminal for the operation they occur in; nothing is retried internally.
/// During a recursive walk the first failure aborts the remaining unvisited work but already
/// committed paths are left as is.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum AclError {
    /// An error indicating that building an access list exhausted available memory
    AllocationFailed,

    /// An error indicating that replacing a path's access list failed
    CommitFailed(PathBuf),

    /// An error indicating that listing a directory's children failed
    EnumerationFailed(PathBuf),

    /// An error indicating that a path's security information couldn't be read
    LookupFailed(PathBuf),
}

impl StdError for AclError {}

impl AsRef<dyn StdError> for AclError {
    fn as_ref(&self) -> &(dyn StdError + 'static) {
        self
    }
}

impl fmt::Display for AclError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            AclError::AllocationFailed => write!(f, "failed to allocate access list"),
            AclError::CommitFailed(ref path) => {
                write!(f, "failed to commit access list for: {}", path.display())
            },
            AclError::EnumerationFailed(ref path) => {
                write!(f, "failed to enumerate directory: {}", path.display())
            },
            AclError::LookupFailed(ref path) => {
                write!(f, "failed to look up security info for: {}", path.display())
            },
        }
    }
}
