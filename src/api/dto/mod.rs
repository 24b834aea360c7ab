//! Data Transfer Objects for REST request/response serialization.
//!
//! Field names follow what mobile clients already send and parse, so some
//! differ from the domain (`radius` rather than `radius_m`, `user` rather
//! than `user_id` inside a check-in record).

pub mod checkin_dto;
pub mod common_dto;
pub mod event_dto;
pub mod user_dto;

pub use checkin_dto::*;
pub use common_dto::*;
pub use event_dto::*;
pub use user_dto::*;
