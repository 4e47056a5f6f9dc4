//! Daily series construction
//!
//! - **external**: partial authoritative history supplied by a remote source
//! - **reconcile**: merge of the observation log with that history

pub mod external;
pub mod reconcile;

pub use external::{DailySeries, ExternalDailySeries};
pub use reconcile::ReconciliationEngine;
