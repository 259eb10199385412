// Single-slot relay mailbox: HTTP server, client, and lifecycle supervisor

pub mod client;
pub mod server;
pub mod supervisor;

pub use client::{pull_message, push_message, RelayClientError};
pub use server::{routes, Mailbox};
pub use supervisor::{RelaySupervisor, SupervisorError};
