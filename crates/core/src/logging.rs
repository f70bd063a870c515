//! Tracing initialization.
//!
//! All normal CLI invocations log to stderr with an `EnvFilter` driven by
//! `PORTUNIX_LOG` (falling back to `RUST_LOG`, then `info`). MCP stdio mode
//! must never write anything but JSON-RPC frames to stdout, so logging is
//! stderr-only unconditionally — there is no "pretty to stdout" mode to
//! accidentally corrupt the wire.

use tracing_error::ErrorLayer;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub fn init() {
    init_with_default_level("info");
}

pub fn init_with_default_level(default_level: &str) {
    let filter = EnvFilter::try_from_env("PORTUNIX_LOG")
        .or_else(|_| EnvFilter::try_from_env("RUST_LOG"))
        .unwrap_or_else(|_| EnvFilter::new(default_level));

    let fmt_layer = fmt::layer().with_writer(std::io::stderr).with_target(false);

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .with(ErrorLayer::default())
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_does_not_panic_when_called_repeatedly() {
        init();
        init();
    }
}
