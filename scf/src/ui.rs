// scf/src/ui.rs
//! Terminal rendering of pipeline events.

use colored::Colorize;
use scf_common::pipeline::PipelineEvent;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::warn;

pub const EVENT_CHANNEL_SIZE: usize = 64;

/// `==> message` in the usual heading style.
pub fn heading(message: &str) -> String {
    format!("{}{}", "==> ".bold().blue(), message.bold())
}

/// Renders one event, or `None` for events that are only logged.
pub fn format_event(event: &PipelineEvent) -> Option<String> {
    match event {
        PipelineEvent::Located { name, version, url } => {
            Some(heading(&format!("Installing {name} {version} from {url}")))
        }
        PipelineEvent::DownloadStarted { url } => Some(format!("Downloading {url}")),
        PipelineEvent::DownloadFinished { path, size_bytes } => Some(format!(
            "Downloaded {size_bytes} bytes to {}",
            path.display()
        )),
        PipelineEvent::ChecksumVerified { sha256 } => {
            Some(format!("{} sha256 {sha256}", "Verified".green()))
        }
        PipelineEvent::BuildStarted { toolchain, args } => Some(heading(&format!(
            "{} {}",
            toolchain.display(),
            args.join(" ")
        ))),
        PipelineEvent::BuildFinished { keg_path } => {
            Some(format!("{} {}", "Built".green(), keg_path.display()))
        }
        PipelineEvent::Linked { links } => Some(
            links
                .iter()
                .map(|l| format!("Linked {}", l.display()))
                .collect::<Vec<_>>()
                .join("\n"),
        ),
        PipelineEvent::Caveats { text } => Some(format!(
            "{}\n{}",
            heading("Caveats"),
            text.trim_end()
        )),
        PipelineEvent::TestPassed { output } => Some(format!(
            "{} {}",
            "Test passed:".green(),
            output.trim()
        )),
        PipelineEvent::Failed { state, error } => {
            Some(format!("{} {state}: {error}", "✖".red().bold()))
        }
        PipelineEvent::StateChanged { .. } => None,
    }
}

/// Prints events until every sender is gone.
pub async fn print_events(mut rx: broadcast::Receiver<PipelineEvent>) {
    loop {
        match rx.recv().await {
            Ok(event) => {
                if let PipelineEvent::StateChanged { from, to } = &event {
                    tracing::debug!("Pipeline state {} -> {}", from, to);
                }
                if let Some(line) = format_event(&event) {
                    println!("{line}");
                }
            }
            Err(RecvError::Lagged(missed)) => {
                warn!("Output fell behind; {} pipeline events skipped", missed);
            }
            Err(RecvError::Closed) => break,
        }
    }
}
