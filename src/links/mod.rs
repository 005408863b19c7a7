//! Link management and backlink discovery on top of encrypted storage

mod backlinks;
mod error;
mod liveness;
mod manager;
mod panel;

#[cfg(test)]
mod test_support;

pub use backlinks::{Backlink, BacklinkConfig, BacklinkReport, BacklinkResolver};
pub use error::{LinkError, LinkResult};
pub use liveness::LivenessToken;
pub use manager::{EntryScope, LinkManager, LinkUpdate};
pub use panel::{BacklinkState, GraphState, LinkPanel, LinkView, Outcome};
