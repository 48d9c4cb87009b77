use std::{error::Error as StdError, fmt};

/// An error indicating that a mode expression is malformed
///
/// All variants are detected while parsing, before any security store access occurs, so a
/// malformed mode string never partially mutates a target.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum ModeError {
    /// An error indicating that the octal mode string is invalid
    InvalidOctal(String),

    /// An error indicating that a symbolic clause is missing or has a bad operator
    InvalidOp(String),

    /// An error indicating that a symbolic clause has trailing garbage or a misplaced operator
    InvalidMode(String),
}

impl StdError for ModeError {}

impl AsRef<dyn StdError> for ModeError {
    fn as_ref(&self) -> &(dyn StdError + 'static) {
        self
    }
}

impl fmt::Display for ModeError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            ModeError::InvalidOctal(ref mode) => write!(f, "invalid octal mode given: {}", mode),
            ModeError::InvalidOp(ref mode) => write!(f, "invalid mode operator given: {}", mode),
            ModeError::InvalidMode(ref mode) => write!(f, "invalid mode given: {}", mode),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::errors::*;

    fn mode_empty() -> AmResult<u32> {
        Err(ModeError::InvalidMode("".to_string()))?
    }

    #[test]
    fn test_downcast() {
        assert!(mode_empty().is_err());
        assert_eq!(
            mode_empty().unwrap_err().downcast_ref::<ModeError>(),
            Some(&ModeError::InvalidMode("".to_string()))
        );
    }

    #[test]
    fn test_mode_errors() {
        assert_eq!(ModeError::InvalidOctal("8".to_string()).to_string(), "invalid octal mode given: 8");
        assert_eq!(ModeError::InvalidOp("u~r".to_string()).to_string(), "invalid mode operator given: u~r");
        assert_eq!(ModeError::InvalidMode("u+r;".to_string()).to_string(), "invalid mode given: u+r;");
    }
}
