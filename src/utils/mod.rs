//! Various utility modules.

pub mod base16;
pub mod base32;
