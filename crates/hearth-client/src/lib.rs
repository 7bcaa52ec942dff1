//! Client-side synchronization state for one connected chat surface.
//!
//! Three concurrent update sources — the optimistic copy a send returns,
//! pushed gateway events, and periodic authoritative reloads — converge here
//! into a single deduplicated view. The server-assigned message id is the only
//! identity key; everything else is insert-if-absent and monotonic merges.

pub mod roster;
pub mod sync;
pub mod timeline;
pub mod typing;

pub use roster::{ChannelEntry, ChannelRoster};
pub use sync::SyncState;
pub use timeline::Timeline;
pub use typing::{TypingSignal, TypingThrottle, TypingWatcher};
