use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::models::report::MatchReport;

/// A persisted match run as returned by `history/get_all`.
/// Owned by the backend; the client only reads, sorts and deletes entries.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct HistoryEntry {
    #[serde(rename = "_id", alias = "id", deserialize_with = "deserialize_history_id")]
    pub id: String,
    /// Raw timestamp in whichever encoding the backend used; see `history::timestamp`.
    #[serde(default)]
    pub timestamp: Value,
    #[serde(default)]
    pub resume_text: String,
    #[serde(default)]
    pub resume_json: Value,
    #[serde(default)]
    pub jd_text: String,
    #[serde(default)]
    pub jd_json: Value,
    #[serde(default)]
    pub match_report: Value,
}

impl HistoryEntry {
    /// The stored report, if it still has the expected shape.
    pub fn report(&self) -> Option<MatchReport> {
        serde_json::from_value(self.match_report.clone()).ok()
    }
}

/// Body of `history/add`: one completed run, stored verbatim.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewHistoryEntry {
    pub resume_text: String,
    pub resume_json: Value,
    pub jd_text: String,
    pub jd_json: Value,
    pub match_report: MatchReport,
}

/// `_id` arrives either as a plain string or as extended JSON `{"$oid": "..."}`.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawHistoryId {
    Plain(String),
    ObjectId {
        #[serde(rename = "$oid")]
        oid: String,
    },
}

fn deserialize_history_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match RawHistoryId::deserialize(deserializer)? {
        RawHistoryId::Plain(id) => id,
        RawHistoryId::ObjectId { oid } => oid,
    })
}
