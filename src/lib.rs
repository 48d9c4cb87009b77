//! Provides Unix mode expression parsing and translation into ordered allow/deny access control
//! lists, together with a pluggable security store for committing the results to a tree of paths.
//! The intent is to provide this while keeping dependencies to a minimum.
//!
//! ## Mode expressions
//!
//! Both octal literals e.g. `755` or `0644` and symbolic expressions e.g. `u+rwX,go-w` are
//! supported. Symbolic expressions are parsed into a sequence of actions that are folded over a
//! starting mode, so later clauses see the result of earlier ones just as the classic chmod
//! utility behaves.
//!
//! ## Access control translation
//!
//! A nine bit permission mask cannot be expressed directly by an ordered access control model
//! without deny entries. When the owner lacks a right that the group or everyone holds, or the
//! group lacks a right that everyone holds, an explicit deny entry is emitted ahead of the
//! corresponding allow entries so first match evaluation yields the Unix semantics.
//!
//! ```
//! use aclmod::prelude::*;
//!
//! let store = MemStore::new();
//! store.add_file("/file", 0o600).unwrap();
//! Chmod::new(&store, "/file").sym("u+x,go+r").unwrap().exec().unwrap();
//! assert_store_mode!(&store, "/file", 0o744);
//! ```
//!
//! ### Using Aclmod
//! ```
//! use aclmod::prelude::*;
//! ```
#[macro_use]
pub mod testing;

pub mod errors;
pub mod sys;

/// All essential symbols in a simple consumable way
///
/// ### Examples
/// ```
/// use aclmod::prelude::*;
/// ```
pub mod prelude
{
    // Re-exports
    pub use std::{
        path::{Path, PathBuf},
        sync::Arc,
    };

    // Export macros by name
    pub use crate::{
        assert_store_exists, assert_store_mode, assert_store_no_exists, panic_compare_msg, panic_msg,
    };
    // Export internal types
    pub use crate::{
        errors::*,
        sys::{
            self, AccessEntry, AccessList, AccessRights, Chmod, Effect, MemStore, ModeAction,
            ModeExpression, ModeOp, SecurityInfo, SecurityStore, Sid, EVERYONE, MODE_DIR, PERM_CX,
            PERM_R, PERM_W, PERM_X, WHO_ALL, WHO_GROUP, WHO_OTHER, WHO_USER,
        },
        testing,
    };
}
