// Refresh coordination: staleness, coalesced probe rounds, background warming

mod background;
mod coordinator;

pub use background::run_background_refresh;
pub use coordinator::{
    RefreshCoordinator, RefreshError, RoundEntry, RoundReport, PROBE_TASK_FAILED,
};
