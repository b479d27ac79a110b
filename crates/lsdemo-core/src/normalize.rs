//! Request normalization: assign every request its stable key.
//!
//! Named requests keep their script-supplied name. Text requests have no
//! identity of their own and get `textual-output-<n>`, where `n` counts text
//! requests only and restarts at 0 for every frame.

use crate::request::ControlRequest;

/// Prefix for synthetic text-request keys.
pub const TEXT_KEY_PREFIX: &str = "textual-output-";

/// A request paired with its reconciliation key.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedRequest {
    pub key: String,
    pub request: ControlRequest,
}

/// Pair each request with its key, preserving source order.
///
/// Duplicate names are passed through untouched; the reconciler applies them
/// in order so the later one wins.
#[must_use]
pub fn normalize(requests: &[ControlRequest]) -> Vec<NormalizedRequest> {
    let mut text_ordinal = 0usize;
    requests
        .iter()
        .map(|request| {
            let key = match request.name() {
                Some(name) => name.to_string(),
                None => {
                    let key = format!("{TEXT_KEY_PREFIX}{text_ordinal}");
                    text_ordinal += 1;
                    key
                }
            };
            NormalizedRequest {
                key,
                request: request.clone(),
            }
        })
        .collect()
}
