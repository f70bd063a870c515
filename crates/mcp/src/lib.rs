//! MCP JSON-RPC server, tool surface, and AI-assistant integration manager
//! (spec.md §4.6–§4.8): the bidirectional side of Portunix that lets AI
//! clients drive the dispatcher and container abstraction over stdio, tcp,
//! or a Unix domain socket.

pub mod dispatch;
pub mod integration;
pub mod protocol;
pub mod server;
pub mod state;
pub mod tools;
pub mod transport;

pub use server::McpServer;
pub use state::{ServerState, SharedState};
