//! Shared helper-dispatch plumbing used by MCP tools that delegate to
//! sibling `ptx-*` helpers instead of embedding their own logic (spec.md
//! §4.7: "executes by calling the appropriate C3/C5 path").

use portunix_core::helpers::HelperRegistry;
use serde_json::{json, Value};
use tokio::process::Command;

/// Invoke the helper that owns `command` with `args`, capturing its
/// stdout/stderr. Returns a structured error payload (never panics) when no
/// helper claims `command` or the helper cannot be spawned, so callers can
/// surface it as a tool error without special-casing.
pub async fn call_helper(registry: &HelperRegistry, command: &str, args: &[String]) -> Result<Value, String> {
    let descriptor = registry
        .command(command)
        .ok_or_else(|| format!("no helper registered for '{command}'; the capability is not installed"))?;

    let mut full_args = vec![command.to_string()];
    full_args.extend(args.iter().cloned());

    let output = Command::new(&descriptor.path)
        .args(&full_args)
        .output()
        .await
        .map_err(|e| format!("failed to spawn helper '{}': {e}", descriptor.name))?;

    Ok(json!({
        "helper": descriptor.name,
        "exit_code": output.status.code().unwrap_or(-1),
        "stdout": String::from_utf8_lossy(&output.stdout),
        "stderr": String::from_utf8_lossy(&output.stderr),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_helper_is_reported_not_panicked() {
        let registry = HelperRegistry::default();
        let result = call_helper(&registry, "install", &[]).await;
        assert!(result.is_err());
    }
}
