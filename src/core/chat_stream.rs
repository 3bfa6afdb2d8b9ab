use std::time::Duration;

use futures_util::StreamExt;
use memchr::memchr;
use tokio::sync::mpsc;

use crate::api::{ChatEvent, ChatRequest, ChatResponse};
use crate::utils::url::construct_api_url;

/// One transport-level event, tagged with the stream id it belongs to so the
/// session can discard events from superseded streams.
#[derive(Clone, Debug)]
pub enum StreamEvent {
    /// Handshake succeeded; the connection is open and awaiting fragments.
    Open,
    /// One incremental text fragment.
    Fragment(String),
    /// Whole reply at once, from the legacy non-streaming endpoint.
    Complete(String),
    Error(String),
    End,
}

/// How long a silent connection is tolerated before it is treated as dead.
pub const STREAM_IDLE_TIMEOUT: Duration = Duration::from_secs(90);

fn extract_data_payload(line: &str) -> Option<&str> {
    line.strip_prefix("data:").map(str::trim_start)
}

fn handle_data_payload(
    payload: &str,
    tx: &mpsc::UnboundedSender<(StreamEvent, u64)>,
    stream_id: u64,
) -> bool {
    match serde_json::from_str::<ChatEvent>(payload) {
        Ok(event) => {
            if !event.data.is_empty() {
                let _ = tx.send((StreamEvent::Fragment(event.data), stream_id));
            }
            if event.is_final {
                let _ = tx.send((StreamEvent::End, stream_id));
                return true;
            }
            false
        }
        Err(err) => {
            if payload.trim().is_empty() {
                return false;
            }
            // One bad envelope does not abort the stream; skip it and keep
            // consuming subsequent events.
            tracing::warn!(%err, payload, "skipping malformed stream event");
            false
        }
    }
}

fn process_sse_line(
    line: &str,
    tx: &mpsc::UnboundedSender<(StreamEvent, u64)>,
    stream_id: u64,
) -> bool {
    extract_data_payload(line)
        .map(|payload| handle_data_payload(payload, tx, stream_id))
        .unwrap_or(false)
}

fn extract_error_summary(value: &serde_json::Value) -> Option<String> {
    value
        .pointer("/detail")
        .and_then(|v| v.as_str())
        .or_else(|| value.pointer("/error/message").and_then(|v| v.as_str()))
        .or_else(|| value.get("message").and_then(|v| v.as_str()))
        .map(|text| text.split_whitespace().collect::<Vec<_>>().join(" "))
}

fn format_api_error(error_text: &str) -> String {
    let trimmed = error_text.trim();
    if trimmed.is_empty() {
        return "API error: <empty body>".to_string();
    }
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(trimmed) {
        if let Some(summary) = extract_error_summary(&value) {
            if !summary.is_empty() {
                return format!("API error: {summary}");
            }
        }
    }
    format!("API error: {trimmed}")
}

pub struct StreamParams {
    pub client: reqwest::Client,
    pub base_url: String,
    pub auth_token: Option<String>,
    pub request: ChatRequest,
    pub cancel_token: tokio_util::sync::CancellationToken,
    pub stream_id: u64,
}

#[derive(Clone)]
pub struct ChatStreamService {
    tx: mpsc::UnboundedSender<(StreamEvent, u64)>,
}

impl ChatStreamService {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<(StreamEvent, u64)>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Drive one streaming request to completion on a background task,
    /// feeding events back through the service channel.
    pub fn spawn_stream(&self, params: StreamParams) {
        let tx_clone = self.tx.clone();
        tokio::spawn(async move {
            let StreamParams {
                client,
                base_url,
                auth_token,
                request,
                cancel_token,
                stream_id,
            } = params;

            tokio::select! {
                _ = async {
                    let stream_url = construct_api_url(&base_url, "chat_event_streaming");
                    let mut http_request = client
                        .post(stream_url)
                        .header("Content-Type", "application/json")
                        .header("Accept", "text/event-stream");
                    if let Some(token) = &auth_token {
                        http_request = http_request.bearer_auth(token);
                    }

                    match http_request.json(&request).send().await {
                        Ok(response) => {
                            if !response.status().is_success() {
                                let error_text = response
                                    .text()
                                    .await
                                    .unwrap_or_else(|_| "<no body>".to_string());
                                let _ = tx_clone
                                    .send((StreamEvent::Error(format_api_error(&error_text)), stream_id));
                                let _ = tx_clone.send((StreamEvent::End, stream_id));
                                return;
                            }

                            let _ = tx_clone.send((StreamEvent::Open, stream_id));

                            let mut stream = response.bytes_stream();
                            let mut buffer: Vec<u8> = Vec::new();

                            loop {
                                let chunk = match tokio::time::timeout(
                                    STREAM_IDLE_TIMEOUT,
                                    stream.next(),
                                )
                                .await
                                {
                                    Ok(Some(chunk)) => chunk,
                                    // Server closed the connection cleanly.
                                    Ok(None) => break,
                                    Err(_) => {
                                        let _ = tx_clone.send((
                                            StreamEvent::Error(format!(
                                                "stream went silent for {}s; giving up",
                                                STREAM_IDLE_TIMEOUT.as_secs()
                                            )),
                                            stream_id,
                                        ));
                                        let _ = tx_clone.send((StreamEvent::End, stream_id));
                                        return;
                                    }
                                };

                                if cancel_token.is_cancelled() {
                                    return;
                                }

                                let chunk_bytes = match chunk {
                                    Ok(bytes) => bytes,
                                    Err(e) => {
                                        let _ = tx_clone.send((
                                            StreamEvent::Error(format_api_error(&e.to_string())),
                                            stream_id,
                                        ));
                                        let _ = tx_clone.send((StreamEvent::End, stream_id));
                                        return;
                                    }
                                };

                                buffer.extend_from_slice(&chunk_bytes);

                                while let Some(newline_pos) = memchr(b'\n', &buffer) {
                                    let line_str = match std::str::from_utf8(&buffer[..newline_pos]) {
                                        Ok(s) => s.trim(),
                                        Err(e) => {
                                            tracing::warn!(%e, "invalid UTF-8 in stream");
                                            buffer.drain(..=newline_pos);
                                            continue;
                                        }
                                    };

                                    let should_end =
                                        process_sse_line(line_str, &tx_clone, stream_id);
                                    buffer.drain(..=newline_pos);
                                    if should_end {
                                        return;
                                    }
                                }
                            }

                            let _ = tx_clone.send((StreamEvent::End, stream_id));
                        }
                        Err(e) => {
                            let _ = tx_clone
                                .send((StreamEvent::Error(format_api_error(&e.to_string())), stream_id));
                            let _ = tx_clone.send((StreamEvent::End, stream_id));
                        }
                    }
                } => {}
                _ = cancel_token.cancelled() => {}
            }
        });
    }

    /// Legacy mode: one request, one whole reply, delivered on the same
    /// channel so the session applies it through the same path.
    pub fn spawn_fallback(&self, params: StreamParams) {
        let tx_clone = self.tx.clone();
        tokio::spawn(async move {
            let StreamParams {
                client,
                base_url,
                auth_token,
                request,
                cancel_token,
                stream_id,
            } = params;

            tokio::select! {
                _ = async {
                    let chat_url = construct_api_url(&base_url, "chat");
                    let mut http_request = client
                        .post(chat_url)
                        .header("Content-Type", "application/json");
                    if let Some(token) = &auth_token {
                        http_request = http_request.bearer_auth(token);
                    }

                    match http_request.json(&request).send().await {
                        Ok(response) => {
                            if !response.status().is_success() {
                                let error_text = response
                                    .text()
                                    .await
                                    .unwrap_or_else(|_| "<no body>".to_string());
                                let _ = tx_clone
                                    .send((StreamEvent::Error(format_api_error(&error_text)), stream_id));
                                let _ = tx_clone.send((StreamEvent::End, stream_id));
                                return;
                            }
                            match response.json::<ChatResponse>().await {
                                Ok(body) => {
                                    let _ = tx_clone
                                        .send((StreamEvent::Complete(body.response), stream_id));
                                    let _ = tx_clone.send((StreamEvent::End, stream_id));
                                }
                                Err(e) => {
                                    let _ = tx_clone.send((
                                        StreamEvent::Error(format_api_error(&e.to_string())),
                                        stream_id,
                                    ));
                                    let _ = tx_clone.send((StreamEvent::End, stream_id));
                                }
                            }
                        }
                        Err(e) => {
                            let _ = tx_clone
                                .send((StreamEvent::Error(format_api_error(&e.to_string())), stream_id));
                            let _ = tx_clone.send((StreamEvent::End, stream_id));
                        }
                    }
                } => {}
                _ = cancel_token.cancelled() => {}
            }
        });
    }

    #[cfg(test)]
    pub fn send_for_test(&self, event: StreamEvent, stream_id: u64) {
        let _ = self.tx.send((event, stream_id));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn process_sse_line_handles_spacing_variants() {
        let (service, mut rx) = ChatStreamService::new();
        let variants = [
            (
                r#"data: {"event":"stream","data":"Hello","is_final":false}"#,
                "Hello",
            ),
            (
                r#"data:{"event":"stream","data":"World","is_final":false}"#,
                "World",
            ),
        ];

        for (index, (line, expected)) in variants.iter().enumerate() {
            let stream_id = (index + 1) as u64;
            assert!(!process_sse_line(line, &service.tx, stream_id));

            let (event, received_id) = rx.try_recv().expect("expected fragment");
            assert_eq!(received_id, stream_id);
            match event {
                StreamEvent::Fragment(text) => assert_eq!(text, *expected),
                other => panic!("expected fragment, got {:?}", other),
            }
        }

        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn final_envelope_ends_the_stream() {
        let (service, mut rx) = ChatStreamService::new();
        let line = r#"data: {"event":"stream","data":"","is_final":true,"chat_id":"abc123"}"#;

        assert!(process_sse_line(line, &service.tx, 7));

        let (event, received_id) = rx.try_recv().expect("expected end");
        assert_eq!(received_id, 7);
        assert!(matches!(event, StreamEvent::End));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn final_envelope_with_trailing_fragment_sends_both() {
        let (service, mut rx) = ChatStreamService::new();
        let line = r#"data: {"event":"stream","data":"!","is_final":true}"#;

        assert!(process_sse_line(line, &service.tx, 3));

        let (event, _) = rx.try_recv().expect("expected fragment");
        assert!(matches!(event, StreamEvent::Fragment(ref s) if s == "!"));
        let (event, _) = rx.try_recv().expect("expected end");
        assert!(matches!(event, StreamEvent::End));
    }

    #[test]
    fn malformed_envelope_is_skipped_without_ending_the_stream() {
        let (service, mut rx) = ChatStreamService::new();

        assert!(!process_sse_line("data: {not json", &service.tx, 5));
        assert!(rx.try_recv().is_err());

        // A well-formed envelope afterwards still flows through.
        let line = r#"data: {"event":"stream","data":"ok","is_final":false}"#;
        assert!(!process_sse_line(line, &service.tx, 5));
        let (event, _) = rx.try_recv().expect("expected fragment");
        assert!(matches!(event, StreamEvent::Fragment(ref s) if s == "ok"));
    }

    #[test]
    fn non_data_lines_are_ignored() {
        let (service, mut rx) = ChatStreamService::new();
        assert!(!process_sse_line("", &service.tx, 1));
        assert!(!process_sse_line("event: stream", &service.tx, 1));
        assert!(!process_sse_line(": keep-alive", &service.tx, 1));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn format_api_error_extracts_fastapi_detail() {
        let raw = r#"{"detail":"Generations limit exceeded"}"#;
        assert_eq!(format_api_error(raw), "API error: Generations limit exceeded");
    }

    #[test]
    fn format_api_error_extracts_nested_message() {
        let raw = r#"{"error":{"message":"model   overloaded"}}"#;
        assert_eq!(format_api_error(raw), "API error: model overloaded");
    }

    #[test]
    fn format_api_error_falls_back_to_raw_text() {
        assert_eq!(format_api_error("  connection refused "), "API error: connection refused");
        assert_eq!(format_api_error(""), "API error: <empty body>");
    }
}
