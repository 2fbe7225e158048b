use hlsgrab_engine::DownloadEvent;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

fn segment_style() -> ProgressStyle {
    ProgressStyle::default_bar()
        .template("{spinner:.green} {msg}\n[{elapsed_precise}] [{bar:40.green/white}] {pos}/{len} segments")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("=> ")
}

/// Renders download events as a single segment progress bar.
#[derive(Clone)]
pub struct ProgressManager {
    bar: Option<ProgressBar>,
}

impl ProgressManager {
    pub fn new() -> Self {
        let bar = ProgressBar::new(0);
        bar.set_style(segment_style());
        bar.set_message("Resolving playlist");
        bar.enable_steady_tick(Duration::from_millis(500));
        Self { bar: Some(bar) }
    }

    pub fn new_disabled() -> Self {
        Self { bar: None }
    }

    pub fn handle_event(&self, event: &DownloadEvent) {
        let Some(bar) = &self.bar else {
            return;
        };

        match event {
            DownloadEvent::PlaylistResolved {
                selected_segments,
                has_init_segment,
                ..
            } => {
                bar.set_length((*selected_segments + usize::from(*has_init_segment)) as u64);
                bar.set_message("Downloading segments");
            }
            DownloadEvent::SegmentCompleted {
                completed, total, ..
            } => {
                bar.set_length(*total as u64);
                bar.set_position(*completed as u64);
            }
            DownloadEvent::Assembling { output, .. } => {
                bar.set_message(format!("Assembling {}", output.display()));
            }
            DownloadEvent::Completed { path, .. } => {
                bar.finish_with_message(format!("Finished {}", path.display()));
            }
        }
    }

    /// Stop the bar in place, e.g. after a failure.
    pub fn abandon(&self) {
        if let Some(bar) = &self.bar {
            bar.abandon();
        }
    }
}
