//! Check detector output for malformed records.

use std::path::PathBuf;

use worktrace_common::{AnalysisConfig, MalformedFramePolicy};
use worktrace_processing_core::{PipelineCondition, PipelineRun};

use super::{load_detections, video_id_for};

pub fn run(path: PathBuf, config: &AnalysisConfig) -> anyhow::Result<()> {
    println!("Validating detections at: {}", path.display());

    let detections = load_detections(&path)?;
    let records = detections.len();

    // Collect every fault rather than stopping at the first.
    let config = AnalysisConfig {
        malformed_policy: MalformedFramePolicy::DropFrame,
        ..config.clone()
    };
    let mut run = PipelineRun::new(video_id_for(&path), &config)?;
    run.ingest_all(detections)?;

    println!("  Records: {records}");
    println!("  Accepted: {}", run.len());

    let faults: Vec<_> = run
        .conditions()
        .iter()
        .filter_map(|c| match c {
            PipelineCondition::MalformedDetection { frame_index, fault } => {
                Some((frame_index, fault))
            }
            _ => None,
        })
        .collect();

    if faults.is_empty() {
        println!("\nDetections are valid.");
    } else {
        println!("\nMalformed records:");
        for (frame_index, fault) in &faults {
            println!("  - frame {frame_index}: {fault}");
        }
        println!("\n{} record(s) would be dropped.", faults.len());
    }

    Ok(())
}
