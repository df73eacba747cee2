//! Report composition: assembles a `TacticalReport` from pre-seeded
//! text, a metrics store view, chart adapter output and an AI
//! analysis adapter call, in a fixed section order: executive summary,
//! key metrics, charts, then AI analysis last.
//!
//! Grounded on `original_source/.../tactical_report.py`'s section
//! assembly order and `json_exporter.py`'s export surface (the latter
//! already lives on `TacticalReport::to_json`, see
//! `src/domain/report.rs`). `ChartRenderer`/`LlmAnalysisAdapter` are
//! the contract-only ports from `src/adapters/ports.rs` — this module
//! calls through them and never implements either.

use serde::{Deserialize, Serialize};

use crate::adapters::ports::{ChartRenderer, LlmAnalysisAdapter};
use crate::domain::report::{ContentType, ReportSection, TacticalReport};
use crate::error::Result;

const ORDER_EXECUTIVE_SUMMARY: i32 = 0;
const ORDER_KEY_METRICS: i32 = 1;
const ORDER_CHARTS_START: i32 = 2;
/// Always last regardless of how many chart sections precede it.
const ORDER_AI_ANALYSIS: i32 = 1000;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChartSpec {
    pub title: String,
    pub spec: serde_json::Value,
}

/// Everything the composer needs to build one report. Mirrors the
/// `report` job's payload shape.
#[derive(Debug, Clone)]
pub struct ComposeRequest {
    pub report_id: String,
    pub match_id: String,
    pub team_id: String,
    pub title: String,
    pub summary_text: String,
    pub key_metrics: Option<serde_json::Value>,
    pub charts: Vec<ChartSpec>,
    pub include_ai_analysis: bool,
    pub ai_query: String,
}

impl ComposeRequest {
    pub fn new(report_id: impl Into<String>, match_id: impl Into<String>, team_id: impl Into<String>, title: impl Into<String>) -> Self {
        let match_id = match_id.into();
        Self {
            report_id: report_id.into(),
            team_id: team_id.into(),
            title: title.into(),
            summary_text: format!("Tactical analysis for match {match_id}."),
            match_id,
            key_metrics: None,
            charts: Vec::new(),
            include_ai_analysis: false,
            ai_query: "Summarize the tactical patterns and key moments of this match.".to_string(),
        }
    }
}

/// Builds a `TacticalReport` per the fixed section order: Executive
/// Summary, optional Key Metrics, chart sections (one per
/// `request.charts` entry, only when `chart_renderer` is supplied),
/// then AI Tactical Analysis (only when `include_ai_analysis` is set
/// and an adapter is supplied).
pub fn compose(
    request: ComposeRequest,
    chart_renderer: Option<&dyn ChartRenderer>,
    analysis_adapter: Option<&dyn LlmAnalysisAdapter>,
) -> Result<TacticalReport> {
    let mut report = TacticalReport::new(
        request.report_id.clone(),
        request.match_id.clone(),
        request.team_id.clone(),
        request.title.clone(),
    );

    report.add_section(ReportSection::new(
        "Executive Summary",
        ContentType::Text,
        serde_json::Value::String(request.summary_text.clone()),
        ORDER_EXECUTIVE_SUMMARY,
    ));

    if let Some(metrics) = request.key_metrics.clone() {
        report.add_section(ReportSection::new("Key Metrics", ContentType::Metrics, metrics, ORDER_KEY_METRICS));
    }

    if let Some(renderer) = chart_renderer {
        for (i, chart) in request.charts.iter().enumerate() {
            let rendered = renderer.render(&chart.spec)?;
            let content = serde_json::json!({
                "spec": chart.spec,
                "rendered_bytes": rendered.len(),
            });
            let order = ORDER_CHARTS_START + i as i32;
            report.add_section(
                ReportSection::new(chart.title.clone(), ContentType::Chart, content, order)
                    .with_description(format!("rendered chart ({} bytes)", rendered.len())),
            );
        }
    }

    if request.include_ai_analysis {
        if let Some(adapter) = analysis_adapter {
            let result = adapter.analyze(&request.match_id, &request.ai_query)?;
            let content = serde_json::json!({
                "content": result.content,
                "tokens_used": result.tokens_used,
                "duration_seconds": result.duration_seconds,
            });
            report.add_section(ReportSection::new(
                "AI Tactical Analysis",
                ContentType::AiAnalysis,
                content,
                ORDER_AI_ANALYSIS,
            ));
        }
    }

    Ok(report)
}
