//! Sync bookkeeping and timers
//!
//! - `state`: persisted sync state (last sync, connectivity, player id)
//! - `scheduler`: heartbeat, poll and startup triggers

mod scheduler;
mod state;

pub use scheduler::{Scheduler, SchedulerConfig, SyncTrigger};
pub use state::{SyncInProgress, SyncState, SyncStateError, SyncStateStore};
