//! Progress reporting for long extraction runs.

use std::time::Duration;

use async_trait::async_trait;

/// Milestones of a structured extraction run.
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    Init,
    StructureStart,
    StructureComplete,
    Progress { current: usize, total: usize },
    Complete { elapsed: Duration, total_deals: usize },
    Error { message: String },
}

const BAR_LENGTH: usize = 20;

impl ProgressEvent {
    /// Human-readable status line, with a bar for per-deal progress.
    pub fn render(&self) -> String {
        match self {
            Self::Init => "🔄 Starting deal analysis...".to_string(),
            Self::StructureStart => "📊 Analyzing deal structure...".to_string(),
            Self::StructureComplete => "✅ Structure analysis complete".to_string(),
            Self::Progress { current, total } => {
                let filled = if *total == 0 {
                    0
                } else {
                    (BAR_LENGTH * current / total).min(BAR_LENGTH)
                };
                format!(
                    "🔄 Processing deal {current} of {total}\n\n[{}{}] {current}/{total}",
                    "█".repeat(filled),
                    "░".repeat(BAR_LENGTH - filled)
                )
            }
            Self::Complete {
                elapsed,
                total_deals,
            } => format!(
                "✨ Processing complete: {total_deals} deals in {:.2}s",
                elapsed.as_secs_f64()
            ),
            Self::Error { message } => format!("❌ Error: {message}"),
        }
    }
}

/// Receiver of progress events. Failures to report are the sink's problem.
#[async_trait]
pub trait ProgressSink: Send + Sync {
    async fn report(&self, event: ProgressEvent);
}
