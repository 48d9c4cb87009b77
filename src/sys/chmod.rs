use std::path::{Path, PathBuf};

use tracing::debug;

use crate::{
    errors::{AmResult, ModeError},
    sys::{access_list, parse_octal, parse_symbolic, ModeExpression, SecurityInfo, SecurityStore},
};

/// Provides a builder pattern for translating a mode change into access lists and applying it
///
/// Create a new instance with [`Chmod::new`], set exactly one mode form with `mode`, `octal` or
/// `sym`, optionally enable recursion, then complete the operation by calling `exec`. Mode
/// strings are parsed when set, so a malformed expression surfaces before any store access and
/// never partially mutates a target.
///
/// An octal mode is a path independent literal. A symbolic expression is re-evaluated against
/// every visited path since each path folds the actions into its own current mask.
///
/// ### Examples
/// ```
/// use aclmod::prelude::*;
///
/// let store = MemStore::new();
/// let file = store.add_file("/file", 0o644).unwrap();
/// assert!(Chmod::new(&store, &file).mode("u+x").unwrap().exec().is_ok());
/// assert_eq!(store.mode(&file).unwrap(), 0o744);
/// ```
#[derive(Debug)]
pub struct Chmod<'a, S: SecurityStore> {
    store: &'a S,
    opts: ChmodOpts,
}

// Internal type used to encapsulate just the options. This separates the store being targeted
// from the options allowing the options to be shared across store implementations.
#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) struct ChmodOpts {
    pub(crate) path: PathBuf,            // path to apply the change to
    pub(crate) recursive: bool,          // apply the change across the subtree
    pub(crate) mask: Option<u32>,        // literal 9 bit mask
    pub(crate) expr: Option<ModeExpression>, // parsed symbolic expression
}

impl<'a, S: SecurityStore> Chmod<'a, S> {
    /// Create a new builder targeting the given path on the given store
    pub fn new<T: AsRef<Path>>(store: &'a S, path: T) -> Self {
        Self {
            store,
            opts: ChmodOpts {
                path: path.as_ref().to_path_buf(),
                recursive: false,
                mask: None,
                expr: None,
            },
        }
    }

    /// Set the mode from a string, trying the octal form first then the symbolic form
    ///
    /// ### Errors
    /// * ModeError when the string is neither a valid octal nor a valid symbolic mode
    ///
    /// ### Examples
    /// ```
    /// use aclmod::prelude::*;
    ///
    /// let store = MemStore::new();
    /// let file = store.add_file("/file", 0o644).unwrap();
    /// assert!(Chmod::new(&store, &file).mode("600").unwrap().exec().is_ok());
    /// assert_eq!(store.mode(&file).unwrap(), 0o600);
    /// ```
    pub fn mode(self, mode: &str) -> AmResult<Self> {
        match parse_octal(mode) {
            Ok(mask) => Ok(self.octal(mask)),
            Err(_) => self.sym(mode),
        }
    }

    /// Set a literal permission mask, replacing any previously set mode form
    ///
    /// ### Examples
    /// ```
    /// use aclmod::prelude::*;
    ///
    /// let store = MemStore::new();
    /// let file = store.add_file("/file", 0o644).unwrap();
    /// assert!(Chmod::new(&store, &file).octal(0o755).exec().is_ok());
    /// assert_eq!(store.mode(&file).unwrap(), 0o755);
    /// ```
    pub fn octal(mut self, mask: u32) -> Self {
        self.opts.mask = Some(mask & 0o777);
        self.opts.expr = None;
        self
    }

    /// Set a symbolic mode expression, replacing any previously set mode form
    ///
    /// ### Errors
    /// * ModeError when the expression is malformed
    ///
    /// ### Examples
    /// ```
    /// use aclmod::prelude::*;
    ///
    /// let store = MemStore::new();
    /// let file = store.add_file("/file", 0o644).unwrap();
    /// assert!(Chmod::new(&store, &file).sym("go-r").unwrap().exec().is_ok());
    /// assert_eq!(store.mode(&file).unwrap(), 0o600);
    /// ```
    pub fn sym(mut self, expr: &str) -> AmResult<Self> {
        self.opts.expr = Some(parse_symbolic(expr)?);
        self.opts.mask = None;
        Ok(self)
    }

    /// Apply the change to the whole subtree when the target is a directory
    ///
    /// * Default: false
    ///
    /// ### Examples
    /// ```
    /// use aclmod::prelude::*;
    ///
    /// let store = MemStore::new();
    /// let dir = store.add_dir("/dir", 0o755).unwrap();
    /// let file = store.add_file("/dir/file", 0o644).unwrap();
    /// assert!(Chmod::new(&store, &dir).sym("go-rx").unwrap().recurse().exec().is_ok());
    /// assert_eq!(store.mode(&dir).unwrap(), MODE_DIR | 0o700);
    /// assert_eq!(store.mode(&file).unwrap(), 0o600);
    /// ```
    pub fn recurse(mut self) -> Self {
        self.opts.recursive = true;
        self
    }

    /// Execute the configured change against the store
    ///
    /// For a recursive change the walk is depth first and post order: every child is fully
    /// processed before the directory itself so that revoking a directory's own traversal
    /// permissions can't cut the walk off from its children. The first failure aborts the
    /// remaining unvisited work; changes already committed are not rolled back.
    ///
    /// ### Errors
    /// * ModeError::InvalidMode when no mode form was set
    /// * AclError for lookup, enumeration or commit failures
    pub fn exec(&self) -> AmResult<()> {
        if self.opts.mask.is_none() && self.opts.expr.is_none() {
            return Err(ModeError::InvalidMode(String::new()).into());
        }
        let info = self.store.stat(&self.opts.path)?;
        if self.opts.recursive && info.is_dir() {
            self.apply_tree(&self.opts.path, &info)
        } else {
            self.apply_one(&self.opts.path, &info)
        }
    }

    // Children first so permissions revoked on a directory can't block its own traversal,
    // then the directory itself. Children are visited in name order for determinism.
    fn apply_tree(&self, path: &Path, info: &SecurityInfo) -> AmResult<()> {
        if info.is_dir() {
            let mut children = self.store.entries(path)?;
            children.sort();
            for child in children {
                let info = self.store.stat(&child)?;
                self.apply_tree(&child, &info)?;
            }
        }
        self.apply_one(path, info)
    }

    // Compute the final mask for this path, map it to an access list and commit it
    fn apply_one(&self, path: &Path, info: &SecurityInfo) -> AmResult<()> {
        let mask = match self.opts.mask {
            Some(mask) => mask,
            None => match &self.opts.expr {
                Some(expr) => expr.apply(info.mode),
                None => info.mode,
            },
        } & 0o777;

        debug!("applying mode {:03o} to {}", mask, path.display());
        let acl = access_list(mask, &info.owner, &info.group)?;
        self.store.commit(path, &acl)
    }
}

/// Apply a mode string to the given path, a convenience wrapper over the [`Chmod`] builder
///
/// ### Examples
/// ```
/// use aclmod::prelude::*;
///
/// let store = MemStore::new();
/// let file = store.add_file("/file", 0o644).unwrap();
/// assert!(sys::chmod(&store, &file, "u=rwx").is_ok());
/// assert_eq!(store.mode(&file).unwrap(), 0o700);
/// ```
pub fn chmod<S: SecurityStore, T: AsRef<Path>>(store: &S, path: T, mode: &str) -> AmResult<()> {
    Chmod::new(store, path).mode(mode)?.exec()
}
