//! Server-side message synchronization core: who must observe an action
//! (fanout), how events reach them (publish), and read-receipt bookkeeping
//! (read_state).
//!
//! Everything here is best-effort relative to persistence: a committed
//! database write is ground truth, live delivery is an enhancement on top of
//! polling-based reconciliation.

pub mod fanout;
pub mod publish;
pub mod read_state;

mod error;

pub use error::SyncError;
pub use publish::{EventPublisher, EventSink, MemorySink};
