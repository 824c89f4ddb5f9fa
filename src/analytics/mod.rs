//! Session analytics
//!
//! Pull-based consumers of the ledger. Nothing here runs on the frame path.

mod aggregate;

pub use aggregate::{summarize, LabelCount, SessionStats, SessionSummary};
