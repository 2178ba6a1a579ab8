//! Slot source implementations.
pub mod cowin;

pub use cowin::{CowinClient, CowinSource};
