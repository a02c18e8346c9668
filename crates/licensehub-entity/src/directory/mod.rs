//! Users and groups as seen by the ledger.
//!
//! Identity lifecycle belongs to the directory; the ledger only needs to
//! know that a principal exists, what it is called, and whether it is active.

pub mod model;

pub use model::{DirectoryGroup, DirectoryUser};
