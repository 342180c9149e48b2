// Per-server status records (current reading, all-time record, history)

mod record;
mod store;

pub use record::{HistoryPoint, StatusRecord, NOT_YET_PROBED};
pub use store::{StatusStore, StoreError, DEFAULT_HISTORY_LEN};
