// Tracked servers and their static metadata
pub mod registry;

// Prober capability and probe results
pub mod probe;

// Per-server status records
pub mod status;

// Refresh coordination and probe rounds
pub mod refresh;

// Read-only status snapshots
pub mod snapshot;

// HTTP API
pub mod api;

// Configuration loading
pub mod config;
