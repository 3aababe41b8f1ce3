use std::fmt;

use thiserror::Error;

/// Lifecycle of one URL within a run.
///
/// `Pending -> Fetching -> Assembling -> Rendering -> Written`, with `Skipped`
/// reachable only from `Pending` and `Failed` from any working stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UrlState {
    Pending,
    Fetching,
    Assembling,
    Rendering,
    Written,
    Skipped,
    Failed,
}

impl UrlState {
    pub fn is_terminal(self) -> bool {
        matches!(self, UrlState::Written | UrlState::Skipped | UrlState::Failed)
    }

    pub fn can_transition_to(self, next: UrlState) -> bool {
        use UrlState::*;
        matches!(
            (self, next),
            (Pending, Fetching)
                | (Pending, Skipped)
                | (Fetching, Assembling)
                | (Fetching, Failed)
                | (Assembling, Rendering)
                | (Assembling, Failed)
                | (Rendering, Written)
                | (Rendering, Failed)
        )
    }
}

impl fmt::Display for UrlState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            UrlState::Pending => "pending",
            UrlState::Fetching => "fetching",
            UrlState::Assembling => "assembling",
            UrlState::Rendering => "rendering",
            UrlState::Written => "written",
            UrlState::Skipped => "skipped",
            UrlState::Failed => "failed",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid transition for {url}: {from} -> {to}")]
pub struct TransitionError {
    pub url: String,
    pub from: UrlState,
    pub to: UrlState,
}

/// One URL moving through the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlJob {
    url: String,
    state: UrlState,
    failed_at: Option<UrlState>,
    detail: Option<String>,
}

impl UrlJob {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            state: UrlState::Pending,
            failed_at: None,
            detail: None,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn state(&self) -> UrlState {
        self.state
    }

    pub fn advance(&mut self, next: UrlState) -> Result<(), TransitionError> {
        if !self.state.can_transition_to(next) {
            return Err(TransitionError {
                url: self.url.clone(),
                from: self.state,
                to: next,
            });
        }
        self.state = next;
        Ok(())
    }

    /// Mark the job written, remembering where the output went.
    pub fn complete(&mut self, output: impl Into<String>) -> Result<(), TransitionError> {
        self.advance(UrlState::Written)?;
        self.detail = Some(output.into());
        Ok(())
    }

    /// Move to `Failed`, recording the stage that failed and why.
    pub fn fail(&mut self, reason: impl Into<String>) -> Result<(), TransitionError> {
        let stage = self.state;
        self.advance(UrlState::Failed)?;
        self.failed_at = Some(stage);
        self.detail = Some(reason.into());
        Ok(())
    }

    pub fn into_outcome(self) -> crate::UrlOutcome {
        crate::UrlOutcome {
            url: self.url,
            state: self.state,
            failed_at: self.failed_at,
            detail: self.detail,
        }
    }
}
