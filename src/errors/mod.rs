//! Provides a common set of errors across the aclmod crate to reduce the verbosity of error
//! handling
//!
//! ### Using aclmod errors
//! ```
//! use aclmod::prelude::*;
//!
//! let mut err = AmError::from(std::io::Error::new(std::io::ErrorKind::Other, "foo"));
//! assert!(err.downcast_ref::<std::io::Error>().is_some());
//! assert!(err.downcast_mut::<std::io::Error>().is_some());
//! assert!(err.source().is_none());
//! ```
mod acl;
mod mode;

use std::{error::Error as StdError, fmt, io};

pub use acl::*;
pub use mode::*;

/// Provides a simplified result type with a common aclmod error type
pub type AmResult<T> = std::result::Result<T, AmError>;

/// An error that provides a common error for aclmod wrapping other internal errors
#[derive(Debug)]
pub enum AmError {
    /// Access list error
    Acl(AclError),

    /// An io error
    Io(io::Error),

    /// Mode expression error
    Mode(ModeError),
}

impl AmError {
    /// Implemented directly on the `Error` type to reduce casting required
    pub fn is<T: StdError + 'static>(&self) -> bool {
        self.as_ref().is::<T>()
    }

    /// Implemented directly on the `Error` type to reduce casting required
    pub fn downcast_ref<T: StdError + 'static>(&self) -> Option<&T> {
        self.as_ref().downcast_ref::<T>()
    }

    /// Implemented directly on the `Error` type to reduce casting required
    pub fn downcast_mut<T: StdError + 'static>(&mut self) -> Option<&mut T> {
        self.as_mut().downcast_mut::<T>()
    }

    /// Implemented directly on the `Error` type to reduce casting required
    /// which allows for using as_ref to get the correct pass through.
    pub fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.as_ref().source()
    }
}
impl StdError for AmError {}

impl fmt::Display for AmError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            AmError::Acl(ref err) => write!(f, "{}", err),
            AmError::Io(ref err) => write!(f, "{}", err),
            AmError::Mode(ref err) => write!(f, "{}", err),
        }
    }
}

impl AsRef<dyn StdError> for AmError {
    fn as_ref(&self) -> &(dyn StdError + 'static) {
        match *self {
            AmError::Acl(ref err) => err,
            AmError::Io(ref err) => err,
            AmError::Mode(ref err) => err,
        }
    }
}

impl AsMut<dyn StdError> for AmError {
    fn as_mut(&mut self) -> &mut (dyn StdError + 'static) {
        match *self {
            AmError::Acl(ref mut err) => err,
            AmError::Io(ref mut err) => err,
            AmError::Mode(ref mut err) => err,
        }
    }
}

impl From<AclError> for AmError {
    fn from(err: AclError) -> AmError {
        AmError::Acl(err)
    }
}

impl From<io::Error> for AmError {
    fn from(err: io::Error) -> AmError {
        AmError::Io(err)
    }
}

impl From<ModeError> for AmError {
    fn from(err: ModeError) -> AmError {
        AmError::Mode(err)
    }
}
