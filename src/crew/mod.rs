//! Crew domain: storage ports, membership rules, proximity search and the
//! lifecycle service tying them together.

mod membership;
mod nearby;
mod ports;
mod service;

pub use membership::MembershipState;
pub use nearby::find_nearby;
pub use ports::{CrewRepository, CrewStore, Directory, MembershipStore};
pub use service::CrewService;
