//! Data models

pub mod asset;
pub mod inventory;

pub use asset::*;
pub use inventory::*;
