//! Data models shared by the storage layer, the crew services and the HTTP API.

mod crew;
mod region;
mod user;

pub use crew::*;
pub use region::*;
pub use user::*;
