//! # Domain Services
//!
//! Business rules that span more than one entity.
//!
//! - **RoomPolicy**: who may delete, pin, edit or forward a message

mod room_policy;

pub use room_policy::*;
