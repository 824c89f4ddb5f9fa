//! Session State Module
//!
//! Per-session state shared between the frame path (writer) and
//! aggregation/export (readers): the observation ledger, the current label
//! register and the session context that owns both.

pub mod current;
pub mod ledger;
pub mod session;

pub use current::CurrentLabel;
pub use ledger::{LedgerSnapshot, Observation, SessionLedger};
pub use session::{Clock, Session, SessionInfo, SteppingClock, SystemClock};
