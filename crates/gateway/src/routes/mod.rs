//! Route handlers, grouped per payment pattern.

use serde::Deserialize;

pub mod grants;
pub mod health;
pub mod operations;
pub mod payments;
pub mod recurring;
pub mod splits;

/// Body of every authorization callback: the interaction reference from the
/// finish redirect, plus the hash to verify it against the stored nonce.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallbackBody {
    pub interact_ref: String,
    #[serde(default)]
    pub hash: Option<String>,
}
