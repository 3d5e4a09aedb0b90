//! Wire shapes on both sides of the proxy and the mapping between them.
//!
//! The conversion service speaks snake_case (`csv_content`); the browser
//! client expects camelCase (`csvContent`). Nothing else changes: stats and
//! CSV text pass through byte for byte.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Free-form statistics record reported by the conversion service.
pub type Stats = serde_json::Map<String, serde_json::Value>;

/// Generated CSV artifacts keyed by category (`trades`, `transactions`, …).
pub type Artifacts = BTreeMap<String, String>;

/// Reply body of the conversion service's `POST /process-pdf`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpstreamReply {
    pub success: bool,
    pub message: String,
    pub stats: Stats,
    pub csv_content: Artifacts,
}

/// Successful response body of `POST /api/process-pdf`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionResult {
    pub success: bool,
    pub message: String,
    pub stats: Stats,
    pub csv_content: Artifacts,
}

impl From<UpstreamReply> for ConversionResult {
    fn from(reply: UpstreamReply) -> Self {
        Self {
            success: reply.success,
            message: reply.message,
            stats: reply.stats,
            csv_content: reply.csv_content,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn renames_only_the_artifact_field() {
        let reply: UpstreamReply = serde_json::from_value(json!({
            "success": true,
            "message": "ok",
            "stats": {"trades": 3, "transactions": 5},
            "csv_content": {"trades": "a,b\n1,2", "transactions": "x,y\n3,4"}
        }))
        .unwrap();

        let mapped = serde_json::to_value(ConversionResult::from(reply)).unwrap();
        assert_eq!(
            mapped,
            json!({
                "success": true,
                "message": "ok",
                "stats": {"trades": 3, "transactions": 5},
                "csvContent": {"trades": "a,b\n1,2", "transactions": "x,y\n3,4"}
            })
        );
    }

    #[test]
    fn failure_flag_passes_through() {
        let reply = UpstreamReply {
            success: false,
            message: "no trades found".into(),
            stats: Stats::new(),
            csv_content: Artifacts::new(),
        };
        let mapped = ConversionResult::from(reply);
        assert!(!mapped.success);
        assert_eq!(mapped.message, "no trades found");
        assert!(mapped.csv_content.is_empty());
    }

    #[test]
    fn nested_stats_are_untouched() {
        let reply: UpstreamReply = serde_json::from_value(json!({
            "success": true,
            "message": "PDF processed successfully",
            "stats": {"transactions_count": 12, "range": {"from": "2024-01-01", "to": null}},
            "csv_content": {}
        }))
        .unwrap();
        let mapped = ConversionResult::from(reply.clone());
        assert_eq!(mapped.stats, reply.stats);
    }
}
