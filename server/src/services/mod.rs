pub mod audit;
pub mod checkin;
pub mod events;
pub mod issuance;
pub mod lookup;
pub mod role_gate;
pub mod scan;

pub use role_gate::{Action, RoleGate};
