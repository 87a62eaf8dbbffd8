//! Data models for the brigades service.
//!
//! Wire format is snake_case JSON; closed sets are enums serialized as lowercase strings.

mod assignment;
mod brigade;
mod member;

pub use assignment::*;
pub use brigade::*;
pub use member::*;
