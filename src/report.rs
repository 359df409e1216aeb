use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;

/// Fixed note included in every summary about how answers were routed.
const ROUTING_INSIGHTS: &str = "Model selection is delegated to the routing service; \
the model_used field on each result records which model ultimately answered.";

#[derive(Debug, Clone, Serialize)]
pub struct ResultEntry {
    pub id: u64,
    pub difficulty: String,
    pub question: String,
    pub model_used: String,
    pub answer: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub timestamp: DateTime<Utc>,
    pub total_questions: usize,
    pub models_configured_for_routing: Vec<String>,
    /// BTreeMap keeps the serialized key order stable
    pub model_usage: BTreeMap<String, u64>,
    pub failed_questions: Vec<u64>,
    pub routing_insights: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct BenchmarkReport {
    pub results: Vec<ResultEntry>,
    pub summary: RunSummary,
}

impl BenchmarkReport {
    /// Serializes the report with human-readable indentation.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }
}

/// Accumulates per-question outcomes and assembles the final report.
pub struct ReportBuilder {
    timestamp: DateTime<Utc>,
    total_questions: usize,
    models: Vec<String>,
    results: Vec<ResultEntry>,
    model_usage: BTreeMap<String, u64>,
    failed_questions: Vec<u64>,
}

impl ReportBuilder {
    pub fn new(models: Vec<String>, total_questions: usize) -> Self {
        Self {
            timestamp: Utc::now(),
            total_questions,
            models,
            results: Vec::new(),
            model_usage: BTreeMap::new(),
            failed_questions: Vec::new(),
        }
    }

    /// Records an answered question and counts the model that answered it.
    pub fn record_success(&mut self, entry: ResultEntry) {
        *self.model_usage.entry(entry.model_used.clone()).or_insert(0) += 1;
        self.results.push(entry);
    }

    pub fn record_failure(&mut self, id: u64) {
        self.failed_questions.push(id);
    }

    /// Whether `id` has been recorded, as either a result or a failure.
    pub fn contains(&self, id: u64) -> bool {
        self.results.iter().any(|entry| entry.id == id) || self.failed_questions.contains(&id)
    }

    /// Sorts results and failed ids ascending and assembles the report.
    pub fn build(mut self) -> BenchmarkReport {
        self.results.sort_by_key(|entry| entry.id);
        self.failed_questions.sort_unstable();

        BenchmarkReport {
            results: self.results,
            summary: RunSummary {
                timestamp: self.timestamp,
                total_questions: self.total_questions,
                models_configured_for_routing: self.models,
                model_usage: self.model_usage,
                failed_questions: self.failed_questions,
                routing_insights: ROUTING_INSIGHTS,
            },
        }
    }
}
