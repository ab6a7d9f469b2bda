use std::collections::BTreeMap;
use std::io::Read;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::workflow::{
    ExportFormat, ExportRequest, PlanRequest, ResearchPhaseRequest, SummarizeRequest,
};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    #[error("{0}")]
    Request(String),
    #[error("export failed: {0}")]
    Export(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResearchOutcome {
    pub findings: BTreeMap<String, String>,
    pub sources: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportArtifact {
    pub format: ExportFormat,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayPayload {
    Plan(Result<Vec<String>, GatewayError>),
    Research(Result<ResearchOutcome, GatewayError>),
    Summary(Result<String, GatewayError>),
    Export(Result<ExportArtifact, GatewayError>),
}

/// One completion event per issued call, tagged with the request sequence
/// number so late arrivals for a closed session can be dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayEvent {
    pub seq: u64,
    pub payload: GatewayPayload,
}

#[derive(Debug, Deserialize)]
struct PlanResponse {
    #[serde(default)]
    sub_topics: Vec<String>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResearchPhaseResponse {
    #[serde(default)]
    findings: BTreeMap<String, String>,
    #[serde(default)]
    sources: Vec<String>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SummarizeResponse {
    #[serde(default)]
    report: String,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Serialize)]
struct ExportBody<'a> {
    content: &'a str,
}

/// Client for the research backend. Every operation is a single-shot POST
/// performed on its own thread; the outcome arrives as exactly one
/// `GatewayEvent` on the channel drained by the main loop.
pub struct ApiGateway {
    base_url: String,
    event_tx: Sender<GatewayEvent>,
    event_rx: Receiver<GatewayEvent>,
}

impl ApiGateway {
    pub fn new(base_url: impl Into<String>) -> Self {
        let (event_tx, event_rx) = mpsc::channel();
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            event_tx,
            event_rx,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn plan_research(&self, seq: u64, request: PlanRequest) {
        let url = format!("{}/api/plan", self.base_url);
        let tx = self.event_tx.clone();
        thread::spawn(move || {
            let result = post_json::<_, PlanResponse>(&url, &request).and_then(|response| {
                match envelope_error(response.error) {
                    Some(message) => Err(GatewayError::Request(message)),
                    None => Ok(response.sub_topics),
                }
            });
            let _ = tx.send(GatewayEvent {
                seq,
                payload: GatewayPayload::Plan(result),
            });
        });
    }

    pub fn execute_research(&self, seq: u64, request: ResearchPhaseRequest) {
        let url = format!("{}/api/research_phase", self.base_url);
        let tx = self.event_tx.clone();
        thread::spawn(move || {
            let result =
                post_json::<_, ResearchPhaseResponse>(&url, &request).and_then(|response| {
                    match envelope_error(response.error) {
                        Some(message) => Err(GatewayError::Request(message)),
                        None => Ok(ResearchOutcome {
                            findings: response.findings,
                            sources: response.sources,
                        }),
                    }
                });
            let _ = tx.send(GatewayEvent {
                seq,
                payload: GatewayPayload::Research(result),
            });
        });
    }

    pub fn generate_summary(&self, seq: u64, request: SummarizeRequest) {
        let url = format!("{}/api/summarize", self.base_url);
        let tx = self.event_tx.clone();
        thread::spawn(move || {
            let result = post_json::<_, SummarizeResponse>(&url, &request).and_then(|response| {
                match envelope_error(response.error) {
                    Some(message) => Err(GatewayError::Request(message)),
                    None => Ok(response.report),
                }
            });
            let _ = tx.send(GatewayEvent {
                seq,
                payload: GatewayPayload::Summary(result),
            });
        });
    }

    pub fn export_report(&self, seq: u64, request: ExportRequest) {
        let url = format!("{}{}", self.base_url, request.format.endpoint_path());
        let tx = self.event_tx.clone();
        thread::spawn(move || {
            let result = fetch_export_artifact(&url, &request);
            let _ = tx.send(GatewayEvent {
                seq,
                payload: GatewayPayload::Export(result),
            });
        });
    }

    pub fn drain_events_limited(&self, max_events: usize) -> Vec<GatewayEvent> {
        let mut events = Vec::new();
        while events.len() < max_events {
            let Ok(event) = self.event_rx.try_recv() else {
                break;
            };
            events.push(event);
        }
        events
    }
}

fn post_json<B: Serialize, T: for<'de> Deserialize<'de>>(
    url: &str,
    body: &B,
) -> Result<T, GatewayError> {
    let value = serde_json::to_value(body).map_err(|err| GatewayError::Request(err.to_string()))?;
    let response = ureq::post(url)
        .send_json(value)
        .map_err(|err| GatewayError::Request(err.to_string()))?;
    response
        .into_json::<T>()
        .map_err(|err| GatewayError::Request(err.to_string()))
}

/// The export endpoints reply with the artifact bytes on success but with a
/// JSON `{error}` body on failure, both under HTTP 200, so the content type
/// decides which one arrived.
fn fetch_export_artifact(url: &str, request: &ExportRequest) -> Result<ExportArtifact, GatewayError> {
    let body = ExportBody {
        content: &request.content,
    };
    let value = serde_json::to_value(&body).map_err(|err| GatewayError::Export(err.to_string()))?;
    let response = ureq::post(url)
        .send_json(value)
        .map_err(|err| GatewayError::Export(err.to_string()))?;
    let is_json = response
        .header("Content-Type")
        .is_some_and(|value| value.contains("application/json"));
    let mut bytes = Vec::new();
    response
        .into_reader()
        .read_to_end(&mut bytes)
        .map_err(|err| GatewayError::Export(err.to_string()))?;
    if is_json {
        let envelope: ErrorEnvelope = serde_json::from_slice(&bytes)
            .map_err(|err| GatewayError::Export(err.to_string()))?;
        return Err(GatewayError::Export(
            envelope_error(envelope.error).unwrap_or_else(|| "export returned no data".to_string()),
        ));
    }
    Ok(ExportArtifact {
        format: request.format,
        bytes,
    })
}

fn envelope_error(error: Option<String>) -> Option<String> {
    error.filter(|message| !message.trim().is_empty())
}

#[cfg(test)]
#[path = "../tests/unit/gateway_tests.rs"]
mod tests;
