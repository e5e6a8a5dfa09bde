//! Progress bar display for transfers and job stages

use indicatif::{ProgressBar, ProgressStyle};

fn bar(len: u64, visible: bool) -> ProgressBar {
    if visible {
        ProgressBar::new(len)
    } else {
        ProgressBar::hidden()
    }
}

/// Byte-level progress of a bundle transfer
pub struct TransferProgress {
    bytes_pb: ProgressBar,
}

impl TransferProgress {
    /// Create a transfer display for `total_bytes`
    pub fn new(total_bytes: u64, visible: bool) -> Self {
        let bytes_pb = bar(total_bytes, visible);
        if let Ok(style) = ProgressStyle::default_bar()
            .template("[{bar:40.cyan/blue}] {bytes}/{total_bytes} {msg}")
        {
            bytes_pb.set_style(style.progress_chars("#>-"));
        }
        Self { bytes_pb }
    }

    /// Show the file currently being moved
    pub fn start_file(&self, name: &str) {
        let display_name = if name.len() > 50 {
            format!("...{}", &name[name.len() - 47..])
        } else {
            name.to_string()
        };
        self.bytes_pb.set_message(display_name);
    }

    /// Account for a finished (or skipped) file
    pub fn finish_file(&self, size: u64) {
        self.bytes_pb.inc(size);
    }

    pub fn finish(&self) {
        self.bytes_pb.finish_with_message("done");
    }

    /// Abandon on error
    pub fn abandon(&self) {
        self.bytes_pb.abandon();
    }
}

/// Weighted progress over the fixed stages of a job run
pub struct StageProgress {
    stage_pb: ProgressBar,
}

impl StageProgress {
    /// Create a stage display whose stage weights add up to `total_weight`
    pub fn new(title: &str, total_weight: u64, visible: bool) -> Self {
        let stage_pb = bar(total_weight, visible);
        if let Ok(style) =
            ProgressStyle::default_bar().template("{prefix} [{bar:40.green/yellow}] {percent}% {msg}")
        {
            stage_pb.set_style(style.progress_chars("█▉▊▋▌▍▎▏  "));
        }
        stage_pb.set_prefix(title.to_string());
        Self { stage_pb }
    }

    pub fn begin(&self, stage: &str) {
        self.stage_pb.set_message(stage.to_string());
    }

    pub fn complete(&self, weight: u64) {
        self.stage_pb.inc(weight);
    }

    pub fn finish(&self) {
        self.stage_pb.finish_with_message("finished");
    }

    pub fn abandon(&self) {
        self.stage_pb.abandon();
    }
}
