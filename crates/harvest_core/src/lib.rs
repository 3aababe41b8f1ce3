//! Harvest core: pure per-URL state machine and run bookkeeping.
mod report;
mod state;
mod urls;

pub use report::{RunReport, UrlOutcome};
pub use state::{TransitionError, UrlJob, UrlState};
pub use urls::parse_url_list;
