use std::collections::BTreeMap;

use serde::Serialize;
use thiserror::Error;

/// The workflow advances one stage at a time on success. The three in-flight
/// stages exist only while a remote call is outstanding; each has exactly one
/// successor and one fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Input,
    Planning,
    PlanReview,
    Researching,
    FindingsReview,
    Summarizing,
    Report,
}

impl Stage {
    pub fn is_in_flight(self) -> bool {
        matches!(
            self,
            Stage::Planning | Stage::Researching | Stage::Summarizing
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("research topic is empty")]
    EmptyTopic,
    #[error("the plan has no sub-topics")]
    EmptyPlan,
    #[error("there is no report to export")]
    EmptyReport,
    #[error("operation not allowed in the current stage")]
    WrongStage,
    #[error("no sub-topic at index {0}")]
    BadIndex(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Pdf,
    Docx,
}

impl ExportFormat {
    pub fn endpoint_path(self) -> &'static str {
        match self {
            ExportFormat::Pdf => "/api/export/pdf",
            ExportFormat::Docx => "/api/export/docx",
        }
    }

    pub fn file_name(self) -> &'static str {
        match self {
            ExportFormat::Pdf => "report.pdf",
            ExportFormat::Docx => "report.docx",
        }
    }
}

/// One plan row: the sub-topic text plus its optional per-item instruction.
/// Pairing them in one record keeps instructions attached to their row when
/// rows are inserted or removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubTopic {
    pub title: String,
    pub instructions: Option<String>,
}

impl SubTopic {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            instructions: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Finding {
    pub topic: String,
    pub text: String,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct PlanRequest {
    pub topic: String,
    pub custom_prompt: String,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ResearchItem {
    pub topic: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ResearchPhaseRequest {
    pub sub_topics: Vec<ResearchItem>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SummarizeRequest {
    pub topic: String,
    pub research_findings: BTreeMap<String, String>,
    pub sources: Vec<String>,
    pub custom_prompt: String,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ExportRequest {
    pub content: String,
    #[serde(skip)]
    pub format: ExportFormat,
}

/// Mutable state of one open research workflow. Created on open, discarded on
/// close or reset. Mutated only by the transition methods below and by the
/// stage-gated edit methods; the view reads, never writes.
#[derive(Debug)]
pub struct WorkflowSession {
    stage: Stage,
    topic: String,
    custom_instructions: String,
    sub_topics: Vec<SubTopic>,
    findings: Vec<Finding>,
    sources: Vec<String>,
    report: String,
    error: Option<String>,
}

impl Default for WorkflowSession {
    fn default() -> Self {
        Self {
            stage: Stage::Input,
            topic: String::new(),
            custom_instructions: String::new(),
            sub_topics: Vec::new(),
            findings: Vec::new(),
            sources: Vec::new(),
            report: String::new(),
            error: None,
        }
    }
}

impl WorkflowSession {
    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn custom_instructions(&self) -> &str {
        &self.custom_instructions
    }

    pub fn sub_topics(&self) -> &[SubTopic] {
        &self.sub_topics
    }

    pub fn findings(&self) -> &[Finding] {
        &self.findings
    }

    pub fn sources(&self) -> &[String] {
        &self.sources
    }

    pub fn report(&self) -> &str {
        &self.report
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn clear_error(&mut self) {
        self.error = None;
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    // --- Input stage edits ---

    pub fn set_topic(&mut self, topic: impl Into<String>) -> Result<(), ValidationError> {
        if self.stage != Stage::Input {
            return Err(ValidationError::WrongStage);
        }
        self.topic = topic.into();
        Ok(())
    }

    pub fn set_custom_instructions(
        &mut self,
        text: impl Into<String>,
    ) -> Result<(), ValidationError> {
        if self.stage != Stage::Input {
            return Err(ValidationError::WrongStage);
        }
        self.custom_instructions = text.into();
        Ok(())
    }

    // --- Plan review edits ---

    pub fn add_sub_topic(&mut self, title: impl Into<String>) -> Result<(), ValidationError> {
        if self.stage != Stage::PlanReview {
            return Err(ValidationError::WrongStage);
        }
        self.sub_topics.push(SubTopic::new(title));
        Ok(())
    }

    pub fn remove_sub_topic(&mut self, index: usize) -> Result<(), ValidationError> {
        if self.stage != Stage::PlanReview {
            return Err(ValidationError::WrongStage);
        }
        if index >= self.sub_topics.len() {
            return Err(ValidationError::BadIndex(index));
        }
        self.sub_topics.remove(index);
        Ok(())
    }

    pub fn set_sub_topic_title(
        &mut self,
        index: usize,
        title: impl Into<String>,
    ) -> Result<(), ValidationError> {
        if self.stage != Stage::PlanReview {
            return Err(ValidationError::WrongStage);
        }
        let item = self
            .sub_topics
            .get_mut(index)
            .ok_or(ValidationError::BadIndex(index))?;
        item.title = title.into();
        Ok(())
    }

    pub fn set_sub_topic_instructions(
        &mut self,
        index: usize,
        instructions: impl Into<String>,
    ) -> Result<(), ValidationError> {
        if self.stage != Stage::PlanReview {
            return Err(ValidationError::WrongStage);
        }
        let item = self
            .sub_topics
            .get_mut(index)
            .ok_or(ValidationError::BadIndex(index))?;
        let text = instructions.into();
        item.instructions = if text.is_empty() { None } else { Some(text) };
        Ok(())
    }

    // --- Findings review edits ---

    pub fn set_finding_text(
        &mut self,
        index: usize,
        text: impl Into<String>,
    ) -> Result<(), ValidationError> {
        if self.stage != Stage::FindingsReview {
            return Err(ValidationError::WrongStage);
        }
        let finding = self
            .findings
            .get_mut(index)
            .ok_or(ValidationError::BadIndex(index))?;
        finding.text = text.into();
        Ok(())
    }

    // --- Transitions ---

    /// Input → Planning. Refuses a blank topic without issuing a request.
    pub fn start_planning(&mut self) -> Result<PlanRequest, ValidationError> {
        if self.stage != Stage::Input {
            return Err(ValidationError::WrongStage);
        }
        if self.topic.trim().is_empty() {
            return Err(ValidationError::EmptyTopic);
        }
        self.error = None;
        self.stage = Stage::Planning;
        Ok(PlanRequest {
            topic: self.topic.clone(),
            custom_prompt: self.custom_instructions.clone(),
        })
    }

    pub fn apply_plan_success(&mut self, sub_topics: Vec<String>) {
        debug_assert_eq!(self.stage, Stage::Planning);
        self.sub_topics = sub_topics
            .into_iter()
            .filter(|title| !title.trim().is_empty())
            .map(SubTopic::new)
            .collect();
        self.stage = Stage::PlanReview;
    }

    /// The only failure that falls back to Input: nothing has been planned
    /// yet, so the user returns to the topic form.
    pub fn apply_plan_failure(&mut self, message: impl Into<String>) {
        debug_assert_eq!(self.stage, Stage::Planning);
        self.error = Some(message.into());
        self.stage = Stage::Input;
    }

    /// PlanReview → Researching. Blank rows are pruned from the session so
    /// the submitted plan and the visible plan stay identical.
    pub fn start_research(&mut self) -> Result<ResearchPhaseRequest, ValidationError> {
        if self.stage != Stage::PlanReview {
            return Err(ValidationError::WrongStage);
        }
        self.sub_topics.retain(|item| !item.title.trim().is_empty());
        if self.sub_topics.is_empty() {
            return Err(ValidationError::EmptyPlan);
        }
        for item in &mut self.sub_topics {
            item.title = item.title.trim().to_string();
            if item
                .instructions
                .as_deref()
                .is_some_and(|text| text.trim().is_empty())
            {
                item.instructions = None;
            }
        }
        self.error = None;
        self.stage = Stage::Researching;
        Ok(ResearchPhaseRequest {
            sub_topics: self
                .sub_topics
                .iter()
                .map(|item| ResearchItem {
                    topic: item.title.clone(),
                    instructions: item.instructions.clone(),
                })
                .collect(),
        })
    }

    /// Findings arrive as one atomic map. Entries are ordered by the
    /// submitted sub-topic order; keys the plan does not cover (the contract
    /// says there are none, but the payload is server-controlled) are
    /// appended afterwards.
    pub fn apply_research_success(
        &mut self,
        mut findings: BTreeMap<String, String>,
        sources: Vec<String>,
    ) {
        debug_assert_eq!(self.stage, Stage::Researching);
        let mut ordered = Vec::with_capacity(findings.len());
        for item in &self.sub_topics {
            if let Some(text) = findings.remove(&item.title) {
                ordered.push(Finding {
                    topic: item.title.clone(),
                    text,
                });
            }
        }
        for (topic, text) in findings {
            ordered.push(Finding { topic, text });
        }
        self.findings = ordered;
        self.sources = sources;
        self.stage = Stage::FindingsReview;
    }

    pub fn apply_research_failure(&mut self, message: impl Into<String>) {
        debug_assert_eq!(self.stage, Stage::Researching);
        self.error = Some(message.into());
        self.stage = Stage::PlanReview;
    }

    /// FindingsReview → Summarizing. No local precondition beyond the stage.
    pub fn start_summary(&mut self) -> Result<SummarizeRequest, ValidationError> {
        if self.stage != Stage::FindingsReview {
            return Err(ValidationError::WrongStage);
        }
        self.error = None;
        self.stage = Stage::Summarizing;
        Ok(SummarizeRequest {
            topic: self.topic.clone(),
            research_findings: self
                .findings
                .iter()
                .map(|finding| (finding.topic.clone(), finding.text.clone()))
                .collect(),
            sources: self.sources.clone(),
            custom_prompt: self.custom_instructions.clone(),
        })
    }

    pub fn apply_summary_success(&mut self, report: impl Into<String>) {
        debug_assert_eq!(self.stage, Stage::Summarizing);
        self.report = report.into();
        self.stage = Stage::Report;
    }

    pub fn apply_summary_failure(&mut self, message: impl Into<String>) {
        debug_assert_eq!(self.stage, Stage::Summarizing);
        self.error = Some(message.into());
        self.stage = Stage::FindingsReview;
    }

    /// Export never changes the stage, in either direction.
    pub fn start_export(&mut self, format: ExportFormat) -> Result<ExportRequest, ValidationError> {
        if self.stage != Stage::Report {
            return Err(ValidationError::WrongStage);
        }
        if self.report.trim().is_empty() {
            return Err(ValidationError::EmptyReport);
        }
        self.error = None;
        Ok(ExportRequest {
            content: self.report.clone(),
            format,
        })
    }

    pub fn apply_export_failure(&mut self, message: impl Into<String>) {
        self.error = Some(message.into());
    }
}

#[cfg(test)]
#[path = "../tests/unit/workflow_tests.rs"]
mod tests;
