//! Common types and utilities shared across the crate.

mod constants;
mod lock;
mod sort_order;
mod value;

pub use constants::*;
pub use lock::*;
pub use sort_order::*;
pub use value::*;
