//! Identifier generation for nodes, edges and payloads

use chrono::Utc;
use rand::distributions::Alphanumeric;
use rand::Rng;

const SUFFIX_LEN: usize = 9;

/// A fresh identifier: `{prefix}-{unix millis}-{random suffix}`.
///
/// The timestamp keeps ids roughly ordered by creation; the suffix keeps
/// ids created within the same millisecond distinct.
pub(crate) fn fresh_id(prefix: &str) -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(SUFFIX_LEN)
        .map(|b| char::from(b).to_ascii_lowercase())
        .collect();
    format!("{}-{}-{}", prefix, Utc::now().timestamp_millis(), suffix)
}
