//! Built-in command implementations. Each module owns one top-level
//! built-in the dispatcher (C5) never delegates to a helper: `container`
//! and `mcp`. `version`/`help` are small enough to live directly in
//! `cli.rs`.

pub mod container;
pub mod mcp;
