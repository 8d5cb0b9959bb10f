//! Transaction lifecycle tracking.
//!
//! Follows each submitted mutating call through
//! `Submitted -> Confirming -> Confirmed | Failed`, driven solely by the
//! ledger client's confirmation events.

mod events;
mod tracker;

pub use events::*;
pub use tracker::*;
