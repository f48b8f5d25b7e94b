use anyhow::{Context, Result};
use std::io::Read;
use std::path::Path;

use ads_core::{AgentSnapshot, OutputFormat};
use ads_scheduler::select_layer;

/// Handle `ads select`. `-` reads the snapshot from stdin.
pub(crate) fn handle_select(path: &Path, format: OutputFormat) -> Result<()> {
    let raw = if path == Path::new("-") {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read snapshot from stdin")?;
        buf
    } else {
        std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read snapshot: {}", path.display()))?
    };
    let snapshot = parse_snapshot(&raw)?;
    let selection = select_layer(&snapshot)?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&selection)?),
        OutputFormat::Text => println!(
            "{}: {} (urgency {}) - {}",
            snapshot.agent_id, selection.layer, selection.urgency, selection.reason
        ),
    }
    Ok(())
}

fn parse_snapshot(raw: &str) -> Result<AgentSnapshot> {
    serde_json::from_str(raw).context("Invalid agent snapshot JSON")
}
