//! Provides a set of testing functions and macros to reduce testing boiler plate
//!
//! ## For testing only
//! All code in this module should only ever be used in testing and not in production.
//!
//! ### How to use the Aclmod `testing` module
//! ```
//! use aclmod::prelude::*;
//! ```
#[macro_use]
mod assert;

pub use assert::*;
