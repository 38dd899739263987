pub mod events;
pub mod ops;
pub mod reputation;
