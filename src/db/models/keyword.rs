use serde::{Deserialize, Serialize};

/// A keyword under active rank tracking. Original casing is preserved for
/// display; comparisons against the performance log are case-insensitive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackedKeyword {
    pub id: i64,
    pub keyword: String,
    pub collection: String,
    pub is_active: bool,
}
