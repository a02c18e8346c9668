//! Seat allocation entities: user assignments and group allocations.

pub mod holder;
pub mod model;

pub use holder::{AllocationHolder, HolderKind};
pub use model::{Allocation, AllocationRow};
