//! Provides mode expression parsing and ordered access control translation
//!
//! ### How to use the Aclmod `sys` module
//! ```
//! use aclmod::prelude::*;
//! ```
mod acl;
mod chmod;
mod memstore;
mod mode;
mod store;

pub use acl::*;
pub use chmod::*;
pub use memstore::*;
pub use mode::*;
pub use store::*;
