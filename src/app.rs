use crate::events::AppEvent;
use crate::gateway::{ExportArtifact, GatewayEvent, GatewayPayload};
use crate::workflow::{
    ExportFormat, ExportRequest, PlanRequest, ResearchPhaseRequest, Stage, SummarizeRequest,
    WorkflowSession,
};

/// Ticks before a planning-failure banner clears and the input form is usable
/// again. The event loop polls every 16ms, so this is roughly five seconds.
const ERROR_AUTO_DISMISS_TICKS: u64 = 300;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputField {
    Topic,
    CustomInstructions,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanField {
    Title,
    Instructions,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CallKind {
    Plan,
    Research,
    Summary,
    Export,
}

#[derive(Debug, Clone, Copy)]
struct PendingCall {
    seq: u64,
    kind: CallKind,
}

/// A remote call the event handler decided to issue. The caller owns the
/// gateway and dispatches it; the app itself never touches the network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundCall {
    Plan(u64, PlanRequest),
    Research(u64, ResearchPhaseRequest),
    Summary(u64, SummarizeRequest),
    Export(u64, ExportRequest),
}

#[derive(Debug)]
pub struct App {
    pub running: bool,
    ticks: u64,
    session: WorkflowSession,
    input_focus: InputField,
    plan_selected: usize,
    plan_focus: PlanField,
    findings_selected: usize,
    report_scroll: u16,
    pending: Option<PendingCall>,
    next_seq: u64,
    error_dismiss_ticks: Option<u64>,
    notice: Option<String>,
}

impl Default for App {
    fn default() -> Self {
        Self {
            running: true,
            ticks: 0,
            session: WorkflowSession::default(),
            input_focus: InputField::Topic,
            plan_selected: 0,
            plan_focus: PlanField::Title,
            findings_selected: 0,
            report_scroll: 0,
            pending: None,
            next_seq: 1,
            error_dismiss_ticks: None,
            notice: None,
        }
    }
}

impl App {
    pub fn session(&self) -> &WorkflowSession {
        &self.session
    }

    pub fn input_focus(&self) -> InputField {
        self.input_focus
    }

    pub fn plan_selected(&self) -> usize {
        self.plan_selected
    }

    pub fn plan_focus(&self) -> PlanField {
        self.plan_focus
    }

    pub fn findings_selected(&self) -> usize {
        self.findings_selected
    }

    pub fn report_scroll(&self) -> u16 {
        self.report_scroll
    }

    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    pub fn set_notice(&mut self, text: impl Into<String>) {
        self.notice = Some(text.into());
    }

    pub fn call_in_flight(&self) -> bool {
        self.pending.is_some()
    }

    /// Export has no in-flight stage of its own; the view shows a hint from
    /// the pending slot instead.
    pub fn exporting(&self) -> bool {
        self.pending
            .is_some_and(|call| call.kind == CallKind::Export)
    }

    pub fn quit(&mut self) {
        self.running = false;
    }

    /// Seed the topic before the workflow opens, for a topic passed on the
    /// command line.
    pub fn prefill_topic(&mut self, topic: &str) {
        let _ = self.session.set_topic(topic);
    }

    pub fn on_tick(&mut self) {
        self.ticks = self.ticks.saturating_add(1);
        if let Some(remaining) = self.error_dismiss_ticks {
            if remaining <= 1 {
                self.error_dismiss_ticks = None;
                if self.session.stage() == Stage::Input {
                    self.session.clear_error();
                }
            } else {
                self.error_dismiss_ticks = Some(remaining - 1);
            }
        }
    }

    /// Translate one input event into session mutations, and possibly into a
    /// remote call for the caller to dispatch.
    pub fn handle_event(&mut self, event: AppEvent) -> Option<OutboundCall> {
        match event {
            AppEvent::Tick => {
                self.on_tick();
                None
            }
            AppEvent::Quit => {
                self.quit();
                None
            }
            AppEvent::Reset => {
                self.close_workflow();
                None
            }
            AppEvent::NextField => {
                self.cycle_field();
                None
            }
            AppEvent::MoveUp => {
                self.move_selection(-1);
                None
            }
            AppEvent::MoveDown => {
                self.move_selection(1);
                None
            }
            AppEvent::ScrollUp => {
                self.report_scroll = self.report_scroll.saturating_sub(1);
                None
            }
            AppEvent::ScrollDown => {
                self.report_scroll = self.report_scroll.saturating_add(1);
                None
            }
            AppEvent::AddItem => {
                if self.session.add_sub_topic("New Sub-topic").is_ok() {
                    self.plan_selected = self.session.sub_topics().len() - 1;
                    self.plan_focus = PlanField::Title;
                }
                None
            }
            AppEvent::RemoveItem => {
                if self.session.remove_sub_topic(self.plan_selected).is_ok() {
                    self.clamp_plan_selection();
                }
                None
            }
            AppEvent::InputChar(c) => self.handle_char(c),
            AppEvent::Backspace => {
                self.handle_backspace();
                None
            }
            AppEvent::Submit => self.handle_submit(),
        }
    }

    /// Apply one gateway completion. Events whose sequence number does not
    /// match the pending call are stale (the workflow was closed or reset
    /// while the call was outstanding) and are dropped. A successful export
    /// is handed back to the caller, which owns the save location.
    pub fn on_gateway_event(&mut self, event: GatewayEvent) -> Option<ExportArtifact> {
        let Some(pending) = self.pending else {
            return None;
        };
        if pending.seq != event.seq {
            return None;
        }
        self.pending = None;
        match event.payload {
            GatewayPayload::Plan(Ok(sub_topics)) => {
                self.session.apply_plan_success(sub_topics);
                self.plan_selected = 0;
                self.plan_focus = PlanField::Title;
                None
            }
            GatewayPayload::Plan(Err(err)) => {
                self.session.apply_plan_failure(err.to_string());
                self.error_dismiss_ticks = Some(ERROR_AUTO_DISMISS_TICKS);
                None
            }
            GatewayPayload::Research(Ok(outcome)) => {
                self.session
                    .apply_research_success(outcome.findings, outcome.sources);
                self.findings_selected = 0;
                None
            }
            GatewayPayload::Research(Err(err)) => {
                self.session.apply_research_failure(err.to_string());
                None
            }
            GatewayPayload::Summary(Ok(report)) => {
                self.session.apply_summary_success(report);
                self.report_scroll = 0;
                None
            }
            GatewayPayload::Summary(Err(err)) => {
                self.session.apply_summary_failure(err.to_string());
                None
            }
            GatewayPayload::Export(Ok(artifact)) => Some(artifact),
            GatewayPayload::Export(Err(err)) => {
                self.session.apply_export_failure(err.to_string());
                None
            }
        }
    }

    /// The download succeeded but the local save did not; same user-visible
    /// contract as a failed export call.
    pub fn on_export_save_failed(&mut self, message: impl Into<String>) {
        self.session.apply_export_failure(message);
    }

    fn close_workflow(&mut self) {
        self.session.reset();
        self.input_focus = InputField::Topic;
        self.plan_selected = 0;
        self.plan_focus = PlanField::Title;
        self.findings_selected = 0;
        self.report_scroll = 0;
        self.pending = None;
        self.error_dismiss_ticks = None;
        self.notice = None;
    }

    fn cycle_field(&mut self) {
        match self.session.stage() {
            Stage::Input => {
                self.input_focus = match self.input_focus {
                    InputField::Topic => InputField::CustomInstructions,
                    InputField::CustomInstructions => InputField::Topic,
                };
            }
            Stage::PlanReview => {
                self.plan_focus = match self.plan_focus {
                    PlanField::Title => PlanField::Instructions,
                    PlanField::Instructions => PlanField::Title,
                };
            }
            _ => {}
        }
    }

    fn move_selection(&mut self, delta: i64) {
        match self.session.stage() {
            Stage::PlanReview => {
                let len = self.session.sub_topics().len();
                self.plan_selected = step_index(self.plan_selected, delta, len);
            }
            Stage::FindingsReview => {
                let len = self.session.findings().len();
                self.findings_selected = step_index(self.findings_selected, delta, len);
            }
            Stage::Report => {
                if delta < 0 {
                    self.report_scroll = self.report_scroll.saturating_sub(1);
                } else {
                    self.report_scroll = self.report_scroll.saturating_add(1);
                }
            }
            _ => {}
        }
    }

    fn clamp_plan_selection(&mut self) {
        let len = self.session.sub_topics().len();
        if len == 0 {
            self.plan_selected = 0;
        } else if self.plan_selected >= len {
            self.plan_selected = len - 1;
        }
    }

    fn handle_char(&mut self, c: char) -> Option<OutboundCall> {
        match self.session.stage() {
            Stage::Input => {
                let _ = match self.input_focus {
                    InputField::Topic => {
                        let mut text = self.session.topic().to_string();
                        text.push(c);
                        self.session.set_topic(text)
                    }
                    InputField::CustomInstructions => {
                        let mut text = self.session.custom_instructions().to_string();
                        text.push(c);
                        self.session.set_custom_instructions(text)
                    }
                };
                None
            }
            Stage::PlanReview => {
                let index = self.plan_selected;
                let Some(item) = self.session.sub_topics().get(index) else {
                    return None;
                };
                let _ = match self.plan_focus {
                    PlanField::Title => {
                        let mut text = item.title.clone();
                        text.push(c);
                        self.session.set_sub_topic_title(index, text)
                    }
                    PlanField::Instructions => {
                        let mut text = item.instructions.clone().unwrap_or_default();
                        text.push(c);
                        self.session.set_sub_topic_instructions(index, text)
                    }
                };
                None
            }
            Stage::FindingsReview => {
                let index = self.findings_selected;
                let Some(finding) = self.session.findings().get(index) else {
                    return None;
                };
                let mut text = finding.text.clone();
                text.push(c);
                let _ = self.session.set_finding_text(index, text);
                None
            }
            Stage::Report => match c {
                'p' => self.submit_export(ExportFormat::Pdf),
                'd' => self.submit_export(ExportFormat::Docx),
                _ => None,
            },
            _ => None,
        }
    }

    fn handle_backspace(&mut self) {
        match self.session.stage() {
            Stage::Input => {
                let _ = match self.input_focus {
                    InputField::Topic => {
                        let mut text = self.session.topic().to_string();
                        text.pop();
                        self.session.set_topic(text)
                    }
                    InputField::CustomInstructions => {
                        let mut text = self.session.custom_instructions().to_string();
                        text.pop();
                        self.session.set_custom_instructions(text)
                    }
                };
            }
            Stage::PlanReview => {
                let index = self.plan_selected;
                let Some(item) = self.session.sub_topics().get(index) else {
                    return;
                };
                let _ = match self.plan_focus {
                    PlanField::Title => {
                        let mut text = item.title.clone();
                        text.pop();
                        self.session.set_sub_topic_title(index, text)
                    }
                    PlanField::Instructions => {
                        let mut text = item.instructions.clone().unwrap_or_default();
                        text.pop();
                        self.session.set_sub_topic_instructions(index, text)
                    }
                };
            }
            Stage::FindingsReview => {
                let index = self.findings_selected;
                let Some(finding) = self.session.findings().get(index) else {
                    return;
                };
                let mut text = finding.text.clone();
                text.pop();
                let _ = self.session.set_finding_text(index, text);
            }
            _ => {}
        }
    }

    fn handle_submit(&mut self) -> Option<OutboundCall> {
        if self.pending.is_some() {
            return None;
        }
        match self.session.stage() {
            Stage::Input => {
                let request = self.session.start_planning().ok()?;
                let seq = self.claim_seq(CallKind::Plan);
                Some(OutboundCall::Plan(seq, request))
            }
            Stage::PlanReview => {
                let request = self.session.start_research().ok()?;
                self.clamp_plan_selection();
                let seq = self.claim_seq(CallKind::Research);
                Some(OutboundCall::Research(seq, request))
            }
            Stage::FindingsReview => {
                let request = self.session.start_summary().ok()?;
                let seq = self.claim_seq(CallKind::Summary);
                Some(OutboundCall::Summary(seq, request))
            }
            _ => None,
        }
    }

    fn submit_export(&mut self, format: ExportFormat) -> Option<OutboundCall> {
        if self.pending.is_some() {
            return None;
        }
        let request = self.session.start_export(format).ok()?;
        self.notice = None;
        let seq = self.claim_seq(CallKind::Export);
        Some(OutboundCall::Export(seq, request))
    }

    fn claim_seq(&mut self, kind: CallKind) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.pending = Some(PendingCall { seq, kind });
        seq
    }
}

fn step_index(current: usize, delta: i64, len: usize) -> usize {
    if len == 0 {
        return 0;
    }
    let max = len - 1;
    if delta < 0 {
        current.saturating_sub(delta.unsigned_abs() as usize)
    } else {
        (current + delta as usize).min(max)
    }
}

#[cfg(test)]
#[path = "../tests/unit/app_tests.rs"]
mod tests;
