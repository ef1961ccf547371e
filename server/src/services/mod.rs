pub mod events;
pub mod inventory;
pub mod reports;
pub mod settlement;
