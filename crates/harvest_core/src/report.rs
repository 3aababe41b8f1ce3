use crate::UrlState;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlOutcome {
    pub url: String,
    pub state: UrlState,
    /// Stage the job was in when it failed.
    pub failed_at: Option<UrlState>,
    /// Output path for written pages, failure reason for failed ones.
    pub detail: Option<String>,
}

/// Per-URL outcomes of one run, in processing order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RunReport {
    outcomes: Vec<UrlOutcome>,
}

impl RunReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, outcome: UrlOutcome) {
        debug_assert!(outcome.state.is_terminal(), "outcome recorded before completion");
        self.outcomes.push(outcome);
    }

    pub fn outcomes(&self) -> &[UrlOutcome] {
        &self.outcomes
    }

    pub fn count(&self, state: UrlState) -> usize {
        self.outcomes.iter().filter(|o| o.state == state).count()
    }

    pub fn written(&self) -> usize {
        self.count(UrlState::Written)
    }

    pub fn skipped(&self) -> usize {
        self.count(UrlState::Skipped)
    }

    pub fn failed(&self) -> usize {
        self.count(UrlState::Failed)
    }

    pub fn outcome_for(&self, url: &str) -> Option<&UrlOutcome> {
        self.outcomes.iter().find(|o| o.url == url)
    }
}
