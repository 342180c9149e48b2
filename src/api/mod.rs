// HTTP API

pub mod servers;

pub use servers::{create_servers_router, ServersAppState};
