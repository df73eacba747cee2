//! `TacticalReport` and `ReportSection`.
//!
//! Grounded on `original_source/.../entities/tactical_report.py` and
//! `value_objects/report_section.py`. Per the explicit-serialization
//! redesign note, `to_json` is a method on the entity rather than
//! something derived via reflection over arbitrary attributes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentType {
    Text,
    Chart,
    Table,
    Metrics,
    AiAnalysis,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportSection {
    pub title: String,
    pub content_type: ContentType,
    pub content: serde_json::Value,
    pub order: i32,
    pub description: Option<String>,
}

impl ReportSection {
    pub fn new(title: impl Into<String>, content_type: ContentType, content: serde_json::Value, order: i32) -> Self {
        Self {
            title: title.into(),
            content_type,
            content,
            order,
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TacticalReport {
    pub report_id: String,
    pub match_id: String,
    pub team_id: String,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub sections: Vec<ReportSection>,
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

const SCHEMA_VERSION: &str = "1.0";

impl TacticalReport {
    pub fn new(
        report_id: impl Into<String>,
        match_id: impl Into<String>,
        team_id: impl Into<String>,
        title: impl Into<String>,
    ) -> Self {
        Self {
            report_id: report_id.into(),
            match_id: match_id.into(),
            team_id: team_id.into(),
            title: title.into(),
            created_at: Utc::now(),
            sections: Vec::new(),
            metadata: serde_json::Map::new(),
        }
    }

    /// Appends a section, re-sorting by `order` to keep the invariant
    /// that section order is total after every mutation.
    pub fn add_section(&mut self, section: ReportSection) {
        self.sections.push(section);
        self.sections.sort_by_key(|s| s.order);
    }

    pub fn sections_by_type(&self, content_type: ContentType) -> Vec<&ReportSection> {
        self.sections.iter().filter(|s| s.content_type == content_type).collect()
    }

    pub fn ai_analysis(&self) -> Option<&ReportSection> {
        self.sections_by_type(ContentType::AiAnalysis).into_iter().next()
    }

    pub fn section_count(&self) -> usize {
        self.sections.len()
    }

    /// JSON export with chart payloads replaced by `"[CHART_DATA]"` and
    /// an ISO-8601 `Z`-suffixed timestamp, per the report-composer spec.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "schema_version": SCHEMA_VERSION,
            "report_id": self.report_id,
            "match_id": self.match_id,
            "team_id": self.team_id,
            "title": self.title,
            "created_at": self.created_at.to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
            "metadata": self.metadata,
            "sections": self.sections.iter().map(|s| serde_json::json!({
                "title": s.title,
                "content_type": s.content_type,
                "order": s.order,
                "description": s.description,
                "content": if matches!(s.content_type, ContentType::Chart) {
                    serde_json::Value::String("[CHART_DATA]".to_string())
                } else {
                    s.content.clone()
                },
            })).collect::<Vec<_>>(),
        })
    }
}

impl PartialEq for ReportSection {
    fn eq(&self, other: &Self) -> bool {
        self.order == other.order && self.title == other.title
    }
}

impl Eq for ReportSection {}

impl PartialOrd for ReportSection {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ReportSection {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.order.cmp(&other.order)
    }
}
