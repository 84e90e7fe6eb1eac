//! # Domain Value Objects
//!
//! Immutable value types that represent domain concepts without identity.
//!
//! - **GroupName**: a broadcast group (`room:<id>`, `user:<id>`, `call:<id>`)

mod group_name;

pub use group_name::*;
