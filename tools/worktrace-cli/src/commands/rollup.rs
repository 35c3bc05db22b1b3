//! Reduce saved per-video metrics into a site rollup.

use std::path::PathBuf;

use worktrace_frame_model::frame::parse_jsonl;
use worktrace_frame_model::metrics::AnnotatedMetrics;
use worktrace_processing_core::SiteRollupBuilder;

pub fn run(path: PathBuf) -> anyhow::Result<()> {
    let content = std::fs::read_to_string(&path)
        .map_err(|_| anyhow::anyhow!("Metrics file not found: {}", path.display()))?;
    let rows: Vec<AnnotatedMetrics> = parse_jsonl(&content)
        .map_err(|e| anyhow::anyhow!("Failed to parse metrics: {e}"))?;

    let mut builder = SiteRollupBuilder::new();
    for row in rows {
        if let Some(previous) = builder.insert(row.metrics) {
            tracing::warn!(video_id = %previous.video_id, "Duplicate video; keeping the later row");
        }
    }
    tracing::info!(videos = builder.len(), "Building site rollup");

    println!("{}", serde_json::to_string_pretty(&builder.build())?);
    Ok(())
}
