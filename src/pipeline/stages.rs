use std::fmt;
use std::path::PathBuf;
use uuid::Uuid;

/// Pipeline stages in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    ImagePrep,
    VideoAssembly,
    Upload,
    CaptionPoll,
    Download,
    Regenerate,
    ReUpload,
}

impl Stage {
    pub const ALL: [Stage; 7] = [
        Stage::ImagePrep,
        Stage::VideoAssembly,
        Stage::Upload,
        Stage::CaptionPoll,
        Stage::Download,
        Stage::Regenerate,
        Stage::ReUpload,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Stage::ImagePrep => "image-prep",
            Stage::VideoAssembly => "video-assembly",
            Stage::Upload => "upload",
            Stage::CaptionPoll => "caption-poll",
            Stage::Download => "download",
            Stage::Regenerate => "regenerate",
            Stage::ReUpload => "re-upload",
        }
    }

    /// Stages after this one
    pub fn following(self) -> impl Iterator<Item = Stage> {
        Stage::ALL.into_iter().skip_while(move |s| *s != self).skip(1)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// What happened to one stage
#[derive(Debug, Clone, PartialEq)]
pub enum StageOutcome {
    Succeeded(String),
    Skipped(String),
    Failed(String),
}

impl StageOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, StageOutcome::Failed(_))
    }

    pub fn detail(&self) -> &str {
        match self {
            StageOutcome::Succeeded(d) | StageOutcome::Skipped(d) | StageOutcome::Failed(d) => d,
        }
    }
}

impl fmt::Display for StageOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StageOutcome::Succeeded(d) => write!(f, "ok: {}", d),
            StageOutcome::Skipped(d) => write!(f, "skipped: {}", d),
            StageOutcome::Failed(d) => write!(f, "FAILED: {}", d),
        }
    }
}

/// Outcome of a whole run
#[derive(Debug, Clone)]
pub struct PipelineReport {
    pub run_id: Uuid,
    pub stages: Vec<(Stage, StageOutcome)>,
    pub video_id: Option<String>,
    pub auto_captions_path: Option<PathBuf>,
    pub final_captions_path: Option<PathBuf>,
    pub uploaded_track_id: Option<String>,
}

impl Default for PipelineReport {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineReport {
    pub fn new() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            stages: Vec::new(),
            video_id: None,
            auto_captions_path: None,
            final_captions_path: None,
            uploaded_track_id: None,
        }
    }

    pub fn record(&mut self, stage: Stage, outcome: StageOutcome) {
        self.stages.push((stage, outcome));
    }

    /// Mark every stage after `failed` as skipped
    pub fn skip_after(&mut self, failed: Stage) {
        for stage in failed.following() {
            self.stages.push((stage, StageOutcome::Skipped(format!("{} failed", failed))));
        }
    }

    pub fn outcome(&self, stage: Stage) -> Option<&StageOutcome> {
        self.stages.iter().find(|(s, _)| *s == stage).map(|(_, o)| o)
    }

    pub fn first_failure(&self) -> Option<(Stage, &StageOutcome)> {
        self.stages.iter().find(|(_, o)| o.is_failure()).map(|(s, o)| (*s, o))
    }

    pub fn is_success(&self) -> bool {
        self.first_failure().is_none()
    }
}

impl fmt::Display for PipelineReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Run {}", self.run_id)?;
        for (stage, outcome) in &self.stages {
            writeln!(f, "  {:<15} {}", stage.name(), outcome)?;
        }
        Ok(())
    }
}
