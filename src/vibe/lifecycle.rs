use crate::models::AnalysisResult;

/// Captions shown under the progress bar, indexed by step
pub const ANALYSIS_STEPS: [&str; 4] = [
    "Fetching playlist data",
    "Analyzing audio features",
    "Generating AI insights",
    "Finalizing your vibe report",
];

pub const MAX_PROGRESS: u8 = 100;

/// Where a single analysis stands
#[derive(Debug, Clone, PartialEq)]
pub enum LifecycleState {
    Idle,
    Requesting {
        playlist_id: String,
        progress: u8,
        step: usize,
    },
    Succeeded {
        result: AnalysisResult,
    },
    Failed {
        message: String,
    },
}

impl LifecycleState {
    pub fn requesting(playlist_id: &str) -> Self {
        LifecycleState::Requesting {
            playlist_id: playlist_id.to_string(),
            progress: 0,
            step: 0,
        }
    }

    pub fn is_requesting(&self) -> bool {
        matches!(self, LifecycleState::Requesting { .. })
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            LifecycleState::Succeeded { .. } | LifecycleState::Failed { .. }
        )
    }

    pub fn step_caption(&self) -> Option<&'static str> {
        match self {
            LifecycleState::Requesting { step, .. } => ANALYSIS_STEPS.get(*step).copied(),
            _ => None,
        }
    }
}

/// Next value of the cosmetic progress bar, clamped to 100
pub fn advance_progress(progress: u8, step: u8) -> u8 {
    progress.saturating_add(step).min(MAX_PROGRESS)
}

/// Which caption goes with a given progress value
pub fn step_for_progress(progress: u8) -> usize {
    match progress {
        0..=24 => 0,
        25..=49 => 1,
        50..=74 => 2,
        _ => 3,
    }
}
