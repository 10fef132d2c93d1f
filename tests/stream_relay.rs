// tests/stream_relay.rs

mod test_helpers;

use axum::body::Body;
use axum::http::Request;
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

use test_helpers::{Scripted, ScriptedAdapter, empty_app, post_json, scripted_app};
use weaver_gateway::registry::Engine;

/// Parsed transcript of one relay response.
#[derive(Debug, Default)]
struct Transcript {
    deltas: Vec<String>,
    end: Option<Value>,
    error: Option<Value>,
    terminals: usize,
}

/// Parse SSE framing the way the studio client does: split on blank lines,
/// read `event:` and `data:` fields, treat everything else as noise.
fn parse_relay(body: &str) -> Transcript {
    let mut transcript = Transcript::default();
    for block in body.split("\n\n").filter(|b| !b.trim().is_empty()) {
        let mut event_name = None;
        let mut data = None;
        for line in block.lines() {
            if let Some(rest) = line.strip_prefix("event:") {
                event_name = Some(rest.trim().to_string());
            } else if let Some(rest) = line.strip_prefix("data:") {
                data = Some(rest.trim_start().to_string());
            }
        }
        let Some(data) = data else { continue };
        let payload: Value = serde_json::from_str(&data).expect("event payload is JSON");
        match event_name.as_deref() {
            Some("end") => {
                transcript.terminals += 1;
                transcript.end = Some(payload);
            }
            Some("error") => {
                transcript.terminals += 1;
                transcript.error = Some(payload);
            }
            _ => transcript
                .deltas
                .push(payload["delta"].as_str().expect("delta is a string").to_string()),
        }
    }
    transcript
}

async fn collect_body(response: axum::response::Response) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

fn stream_request(text: &str) -> Value {
    json!({ "messages": [{ "role": "user", "content": text }] })
}

#[tokio::test]
async fn demo_stream_echoes_the_last_user_message() {
    let (app, _trace) = empty_app();

    let response = app
        .oneshot(post_json("/v1/chat/stream", stream_request("Hello there")))
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let transcript = parse_relay(&collect_body(response).await);
    assert!(!transcript.deltas.is_empty());
    assert!(transcript.deltas.iter().all(|d| d.chars().count() <= 24));

    let full: String = transcript.deltas.concat();
    assert_eq!(
        full,
        "DEMO STREAM: no provider credentials configured. Echo: \"Hello there\". \
         Set OPENAI_API_KEY or GEMINI_API_KEY to reach a live engine."
    );

    assert_eq!(transcript.terminals, 1);
    let end = transcript.end.expect("demo stream ends with an end event");
    assert_eq!(end["modelUsed"], "demo");
    assert_eq!(end["engine"], "demo");
    assert!(transcript.error.is_none());
}

#[tokio::test]
async fn live_stream_relays_content_in_order() {
    let adapter = ScriptedAdapter::new(vec![Scripted::Reply(
        "The quick brown fox jumps over the lazy dog.",
    )]);
    let (app, _trace) = scripted_app(Engine::OpenAi, adapter);

    let response = app
        .oneshot(post_json("/v1/chat/stream", stream_request("tell me about the fox")))
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let content_type = response.headers()["content-type"].to_str().unwrap().to_string();
    assert!(content_type.starts_with("text/event-stream"));
    assert_eq!(response.headers()["cache-control"], "no-cache");
    assert_eq!(response.headers()["x-accel-buffering"], "no");

    let transcript = parse_relay(&collect_body(response).await);
    assert!(transcript.deltas.len() <= 5);
    assert!(transcript.deltas.len() > 1);
    assert_eq!(transcript.deltas.concat(), "The quick brown fox jumps over the lazy dog.");

    assert_eq!(transcript.terminals, 1);
    let end = transcript.end.expect("live stream ends with an end event");
    assert_eq!(end["modelUsed"], "gpt-4o-mini");
    assert_eq!(end["engine"], "openai");
}

#[tokio::test]
async fn live_stream_failure_is_a_single_error_event() {
    let adapter = ScriptedAdapter::new(vec![
        Scripted::Fail(503, "model overloaded"),
        Scripted::Fail(503, "model overloaded"),
    ]);
    let (app, _trace) = scripted_app(Engine::OpenAi, adapter);

    let response = app
        .oneshot(post_json("/v1/chat/stream", stream_request("hi")))
        .await
        .unwrap();
    // transport succeeds; failure arrives as the terminal event
    assert_eq!(response.status(), 200);

    let transcript = parse_relay(&collect_body(response).await);
    assert!(transcript.deltas.is_empty());
    assert_eq!(transcript.terminals, 1);
    assert!(transcript.end.is_none());

    let error = transcript.error.expect("failed stream ends with an error event");
    assert_eq!(error["error"], "model overloaded");
    assert_eq!(error["status"], 503);
}

#[tokio::test]
async fn stream_rejects_malformed_json() {
    let (app, trace) = empty_app();

    let request = Request::builder()
        .method("POST")
        .uri("/v1/chat/stream")
        .header("content-type", "application/json")
        .body(Body::from("delta"))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert!(response.status().is_client_error());

    let events: Vec<String> = trace.query(50).into_iter().map(|e| e.event).collect();
    assert!(events.contains(&"route_error".to_string()));
}

#[tokio::test]
async fn demo_stream_traces_start_and_end() {
    let (app, trace) = empty_app();

    let response = app
        .oneshot(post_json("/v1/chat/stream", stream_request("trace me")))
        .await
        .unwrap();
    let transcript = parse_relay(&collect_body(response).await);

    let events = trace.query(50);
    let start = events
        .iter()
        .find(|e| e.event == "stream_start")
        .expect("stream_start recorded");
    assert_eq!(start.svc, "relay");
    assert_eq!(start.fields["mode"], "demo");

    let end = events
        .iter()
        .find(|e| e.event == "stream_end")
        .expect("stream_end recorded");
    assert_eq!(end.fields["chunks"], json!(transcript.deltas.len()));
}

#[tokio::test]
async fn live_stream_passes_trace_id_through() {
    let adapter = ScriptedAdapter::new(vec![Scripted::Reply("short reply")]);
    let (app, trace) = scripted_app(Engine::OpenAi, adapter);

    let mut request = stream_request("hi");
    request["traceId"] = json!("stream-trace-9");
    let response = app.oneshot(post_json("/v1/chat/stream", request)).await.unwrap();
    collect_body(response).await;

    let events = trace.query(50);
    let start = events.iter().find(|e| e.event == "stream_start").unwrap();
    assert_eq!(start.fields["traceId"], "stream-trace-9");
    assert_eq!(start.fields["mode"], "live");

    let orchestrated = events.iter().find(|e| e.event == "request").unwrap();
    assert_eq!(orchestrated.fields["traceId"], "stream-trace-9");
}
