use crate::utils::error::RenderError;
use serde::Serialize;
use std::collections::BTreeMap;

/// 一位收件人的參數，已對應到模板的 schema
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BoundRecord {
    /// 1-based data row index, stable across skipped rows.
    pub id: usize,
    pub display_name: String,
    pub parameters: BTreeMap<String, String>,
    /// Advisory validation notes; never cause rejection.
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum RenderResult {
    Success {
        id: usize,
        display_name: String,
        #[serde(skip)]
        image: Vec<u8>,
    },
    Failure {
        id: usize,
        display_name: String,
        reason: RenderError,
    },
}

impl RenderResult {
    pub fn id(&self) -> usize {
        match self {
            RenderResult::Success { id, .. } | RenderResult::Failure { id, .. } => *id,
        }
    }

    pub fn display_name(&self) -> &str {
        match self {
            RenderResult::Success { display_name, .. }
            | RenderResult::Failure { display_name, .. } => display_name,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, RenderResult::Success { .. })
    }
}

/// 批次結果彙總，順序與輸入記錄一致
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub template_id: String,
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
    pub cancelled: bool,
    pub results: Vec<RenderResult>,
}

impl BatchReport {
    pub fn new(template_id: &str, total: usize, results: Vec<RenderResult>, cancelled: bool) -> Self {
        let succeeded = results.iter().filter(|r| r.is_success()).count();
        let failed = results.len() - succeeded;
        Self {
            template_id: template_id.to_string(),
            total,
            succeeded,
            failed,
            skipped: total.saturating_sub(results.len()),
            cancelled,
            results,
        }
    }

    pub fn has_successes(&self) -> bool {
        self.succeeded > 0
    }

    pub fn successes(&self) -> impl Iterator<Item = &RenderResult> {
        self.results.iter().filter(|r| r.is_success())
    }

    pub fn failures(&self) -> impl Iterator<Item = &RenderResult> {
        self.results.iter().filter(|r| !r.is_success())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Progress {
    pub completed: usize,
    pub total: usize,
    pub current_display_name: String,
}

/// A finalized, in-memory ZIP archive.
#[derive(Debug, Clone)]
pub struct Archive {
    pub file_name: String,
    pub bytes: Vec<u8>,
    pub entries: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct BatchOutcome {
    pub report: BatchReport,
    /// Where the archive was written; `None` when nothing succeeded.
    pub archive_path: Option<String>,
}
