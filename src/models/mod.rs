pub mod charge;
pub mod credential;
pub mod location;

pub use charge::{Charge, ChargeStatus, NewCharge};
pub use credential::Credential;
pub use location::{Location, LocationInventory, NewLocation};
