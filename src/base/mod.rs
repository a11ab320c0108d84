//! Base types and error handling.
//!
//! - [`NetError`](neterror::NetError): the crate-wide error with a stable
//!   [`NetErrorKind`](neterror::NetErrorKind)
//! - [`IoResultExt`](context::IoResultExt): mapping IO errors at the boundary

pub mod context;
pub mod neterror;
