//! Append-only license history.

pub mod action;
pub mod model;

pub use action::ActionType;
pub use model::HistoryEntry;
