use super::*;
use crate::workflow::ResearchItem;
use std::io::{BufRead, BufReader, Write};
use std::net::{TcpListener, TcpStream};
use std::time::Duration;

/// Serves exactly one canned HTTP response on a loopback port and returns the
/// request (head + body) the client sent.
fn spawn_one_shot_server(
    content_type: &str,
    body: Vec<u8>,
) -> (String, thread::JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind loopback");
    let addr = listener.local_addr().expect("local addr");
    let content_type = content_type.to_string();
    let handle = thread::spawn(move || {
        let (mut stream, _) = listener.accept().expect("accept");
        let request = read_http_request(&stream);
        let head = format!(
            "HTTP/1.1 200 OK\r\nContent-Type: {content_type}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
            body.len()
        );
        stream.write_all(head.as_bytes()).expect("write head");
        stream.write_all(&body).expect("write body");
        stream.flush().expect("flush");
        request
    });
    (format!("http://{addr}"), handle)
}

fn read_http_request(stream: &TcpStream) -> String {
    let mut reader = BufReader::new(stream);
    let mut head = String::new();
    let mut content_length = 0usize;
    loop {
        let mut line = String::new();
        reader.read_line(&mut line).expect("read header line");
        if line == "\r\n" || line.is_empty() {
            break;
        }
        if let Some(rest) = line.to_ascii_lowercase().strip_prefix("content-length:") {
            content_length = rest.trim().parse().unwrap_or(0);
        }
        head.push_str(&line);
    }
    let mut body = vec![0u8; content_length];
    std::io::Read::read_exact(&mut reader, &mut body).expect("read body");
    format!("{head}\r\n{}", String::from_utf8_lossy(&body))
}

fn wait_for_event(gateway: &ApiGateway) -> GatewayEvent {
    for _ in 0..500 {
        if let Some(event) = gateway.drain_events_limited(8).into_iter().next() {
            return event;
        }
        thread::sleep(Duration::from_millis(10));
    }
    panic!("no gateway event arrived");
}

#[test]
fn plan_call_posts_request_and_parses_sub_topics() {
    let (base_url, server) = spawn_one_shot_server(
        "application/json",
        br#"{"sub_topics": ["History", "Applications"]}"#.to_vec(),
    );
    let gateway = ApiGateway::new(base_url);
    gateway.plan_research(
        7,
        PlanRequest {
            topic: "Quantum Computing".to_string(),
            custom_prompt: "focus on industry".to_string(),
        },
    );

    let event = wait_for_event(&gateway);
    assert_eq!(event.seq, 7);
    assert_eq!(
        event.payload,
        GatewayPayload::Plan(Ok(vec![
            "History".to_string(),
            "Applications".to_string()
        ]))
    );

    let request = server.join().expect("server thread");
    assert!(request.starts_with("POST /api/plan"));
    assert!(request.contains(r#""topic":"Quantum Computing""#));
    assert!(request.contains(r#""custom_prompt":"focus on industry""#));
}

#[test]
fn error_envelope_on_http_200_is_a_failure() {
    let (base_url, server) = spawn_one_shot_server(
        "application/json",
        br#"{"error": "GOOGLE_API_KEY not found."}"#.to_vec(),
    );
    let gateway = ApiGateway::new(base_url);
    gateway.plan_research(
        1,
        PlanRequest {
            topic: "Topic".to_string(),
            custom_prompt: String::new(),
        },
    );

    let event = wait_for_event(&gateway);
    assert_eq!(
        event.payload,
        GatewayPayload::Plan(Err(GatewayError::Request(
            "GOOGLE_API_KEY not found.".to_string()
        )))
    );
    server.join().expect("server thread");
}

#[test]
fn research_call_parses_findings_and_sources() {
    let (base_url, server) = spawn_one_shot_server(
        "application/json",
        br#"{"findings": {"History": "old things"}, "sources": ["https://example.com"]}"#.to_vec(),
    );
    let gateway = ApiGateway::new(base_url);
    gateway.execute_research(
        2,
        ResearchPhaseRequest {
            sub_topics: vec![
                ResearchItem {
                    topic: "History".to_string(),
                    instructions: None,
                },
                ResearchItem {
                    topic: "Applications".to_string(),
                    instructions: Some("focus on 2024".to_string()),
                },
            ],
        },
    );

    let event = wait_for_event(&gateway);
    let GatewayPayload::Research(Ok(outcome)) = event.payload else {
        panic!("expected research success, got {:?}", event.payload);
    };
    assert_eq!(
        outcome.findings.get("History").map(String::as_str),
        Some("old things")
    );
    assert_eq!(outcome.sources, ["https://example.com".to_string()]);

    let request = server.join().expect("server thread");
    assert!(request.starts_with("POST /api/research_phase"));
    // Absent instructions stay off the wire entirely.
    assert!(request.contains(r#"{"topic":"History"}"#));
    assert!(request.contains(r#""instructions":"focus on 2024""#));
}

#[test]
fn summarize_call_parses_report() {
    let (base_url, server) =
        spawn_one_shot_server("application/json", br##"{"report": "# Report"}"##.to_vec());
    let gateway = ApiGateway::new(base_url);
    gateway.generate_summary(
        3,
        SummarizeRequest {
            topic: "Topic".to_string(),
            research_findings: BTreeMap::from([(
                "History".to_string(),
                "old things".to_string(),
            )]),
            sources: vec!["https://example.com".to_string()],
            custom_prompt: String::new(),
        },
    );

    let event = wait_for_event(&gateway);
    assert_eq!(
        event.payload,
        GatewayPayload::Summary(Ok("# Report".to_string()))
    );
    let request = server.join().expect("server thread");
    assert!(request.starts_with("POST /api/summarize"));
    assert!(request.contains(r#""research_findings":{"History":"old things"}"#));
}

#[test]
fn export_returns_artifact_bytes() {
    let (base_url, server) =
        spawn_one_shot_server("application/pdf", b"%PDF-1.4 fake".to_vec());
    let gateway = ApiGateway::new(base_url);
    gateway.export_report(
        4,
        ExportRequest {
            content: "# Report".to_string(),
            format: ExportFormat::Pdf,
        },
    );

    let event = wait_for_event(&gateway);
    let GatewayPayload::Export(Ok(artifact)) = event.payload else {
        panic!("expected export success, got {:?}", event.payload);
    };
    assert_eq!(artifact.format, ExportFormat::Pdf);
    assert_eq!(artifact.bytes, b"%PDF-1.4 fake");

    let request = server.join().expect("server thread");
    assert!(request.starts_with("POST /api/export/pdf"));
    assert!(request.contains(r##""content":"# Report""##));
}

#[test]
fn export_error_envelope_is_an_export_failure() {
    let (base_url, server) = spawn_one_shot_server(
        "application/json",
        br#"{"error": "pdf renderer unavailable"}"#.to_vec(),
    );
    let gateway = ApiGateway::new(base_url);
    gateway.export_report(
        5,
        ExportRequest {
            content: "# Report".to_string(),
            format: ExportFormat::Docx,
        },
    );

    let event = wait_for_event(&gateway);
    assert_eq!(
        event.payload,
        GatewayPayload::Export(Err(GatewayError::Export(
            "pdf renderer unavailable".to_string()
        )))
    );
    server.join().expect("server thread");
}

#[test]
fn unreachable_server_reports_a_request_failure() {
    // Bind then drop to get a port nothing is listening on.
    let port = {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind loopback");
        listener.local_addr().expect("local addr").port()
    };
    let gateway = ApiGateway::new(format!("http://127.0.0.1:{port}"));
    gateway.plan_research(
        6,
        PlanRequest {
            topic: "Topic".to_string(),
            custom_prompt: String::new(),
        },
    );

    let event = wait_for_event(&gateway);
    assert_eq!(event.seq, 6);
    match event.payload {
        GatewayPayload::Plan(Err(GatewayError::Request(message))) => {
            assert!(!message.is_empty());
        }
        other => panic!("expected a request failure, got {other:?}"),
    }
}

#[test]
fn base_url_trailing_slash_is_normalized() {
    let gateway = ApiGateway::new("http://127.0.0.1:8000/");
    assert_eq!(gateway.base_url(), "http://127.0.0.1:8000");
}

#[test]
fn blank_error_fields_are_not_failures() {
    assert_eq!(envelope_error(None), None);
    assert_eq!(envelope_error(Some(String::new())), None);
    assert_eq!(envelope_error(Some("   ".to_string())), None);
    assert_eq!(
        envelope_error(Some("boom".to_string())),
        Some("boom".to_string())
    );
}
