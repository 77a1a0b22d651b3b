#![allow(clippy::result_large_err)]

mod data_differ;
mod pair_worker;
mod routine_syncer;
mod schema_differ;
mod supervisor;

pub use data_differ::run_data_tick;
pub use pair_worker::{PairWorker, WorkerState};
pub use routine_syncer::sync_all as sync_routines;
pub use schema_differ::run_schema_tick;
pub use supervisor::{DaemonStatus, DaemonSupervisor, PairStatus};

/// Outcome of one data, schema, or routine tick (§4.2, §7).
///
/// Table-level failures never abort a tick; they accumulate here and the
/// tick's `success()` reflects whether any occurred.
#[derive(Debug, Default, Clone)]
pub struct TickResult {
    pub errors: Vec<String>,
    /// Whether the tick performed at least one mutating statement. Drives
    /// the "record pair last synced at now()" reporting rule (§4.5).
    pub mutated: bool,
}

impl TickResult {
    pub fn success(&self) -> bool {
        self.errors.is_empty()
    }

    fn merge(&mut self, other: TickResult) {
        self.errors.extend(other.errors);
        self.mutated |= other.mutated;
    }
}
