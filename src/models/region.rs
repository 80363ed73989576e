//! Region model.

use serde::{Deserialize, Serialize};

/// Administrative area a crew meets in. Seeded once, never edited.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Region {
    pub id: String,
    pub city: String,
    pub district: String,
}
