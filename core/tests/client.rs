#![allow(clippy::unwrap_used, clippy::expect_used)]

use futures::StreamExt;
use pretty_assertions::assert_eq;
use quill_core::Message;
use quill_core::ModelClient;
use quill_core::Prompt;
use quill_core::QuillErr;
use quill_core::ResponseEvent;
use quill_core::Role;
use quill_core::config::Settings;
use tokio_util::sync::CancellationToken;
use wiremock::Mock;
use wiremock::MockServer;
use wiremock::ResponseTemplate;
use wiremock::matchers::bearer_token;
use wiremock::matchers::method;
use wiremock::matchers::path;

const COMPLETIONS_PATH: &str = "/v1/chat/completions";

fn settings_for(server: &MockServer) -> Settings {
    Settings {
        base_url: format!("{}{COMPLETIONS_PATH}", server.uri()),
        api_key: "sk-test".to_string(),
        model: "gpt-test".to_string(),
    }
}

fn prompt(text: &str) -> Prompt {
    Prompt::new(vec![Message::user(text)])
}

/// Build a streaming body in the chat-completions SSE framing: one
/// `data:`-prefixed JSON line per delta, terminated by the `[DONE]` sentinel.
fn sse_body(deltas: &[&str]) -> String {
    let mut body = String::new();
    for delta in deltas {
        let chunk = serde_json::json!({
            "choices": [{"delta": {"content": delta}}]
        });
        body.push_str(&format!("data: {chunk}\n\n"));
    }
    body.push_str("data: [DONE]\n\n");
    body
}

fn sse_response(body: String) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .insert_header("content-type", "text/event-stream")
        .set_body_raw(body, "text/event-stream")
}

async fn collect(
    mut stream: quill_core::ResponseStream,
) -> (Vec<String>, Option<String>, Vec<QuillErr>) {
    let mut deltas = Vec::new();
    let mut completed = None;
    let mut errors = Vec::new();
    while let Some(event) = stream.next().await {
        match event {
            Ok(ResponseEvent::OutputTextDelta(delta)) => deltas.push(delta),
            Ok(ResponseEvent::Completed { content }) => completed = Some(content),
            Err(e) => errors.push(e),
        }
    }
    (deltas, completed, errors)
}

#[tokio::test]
async fn streamed_deltas_concatenate_to_the_final_content() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(COMPLETIONS_PATH))
        .and(bearer_token("sk-test"))
        .respond_with(sse_response(sse_body(&["The answer", " is", " 4."])))
        .expect(1)
        .mount(&server)
        .await;

    let client = ModelClient::new(settings_for(&server));
    let stream = client
        .stream(&prompt("2+2?"), CancellationToken::new())
        .await
        .unwrap();
    let (deltas, completed, errors) = collect(stream).await;

    assert!(errors.is_empty());
    assert_eq!(deltas, vec!["The answer", " is", " 4."]);
    assert_eq!(completed.as_deref(), Some("The answer is 4."));
    assert_eq!(deltas.concat(), completed.unwrap());
}

#[tokio::test]
async fn single_delta_then_sentinel_yields_exactly_that_content() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(COMPLETIONS_PATH))
        .respond_with(sse_response(sse_body(&["4"])))
        .mount(&server)
        .await;

    let client = ModelClient::new(settings_for(&server));
    let stream = client
        .stream(&prompt("2+2?"), CancellationToken::new())
        .await
        .unwrap();
    let (deltas, completed, _) = collect(stream).await;

    assert_eq!(deltas, vec!["4"]);
    assert_eq!(completed.as_deref(), Some("4"));
}

#[tokio::test]
async fn malformed_event_lines_are_skipped_without_aborting_the_stream() {
    let server = MockServer::start().await;
    let mut body = String::new();
    body.push_str("data: {\"choices\":[{\"delta\":{\"content\":\"first\"}}]}\n\n");
    body.push_str("data: {not valid json\n\n");
    // Role-only and empty-content chunks are tolerated too.
    body.push_str("data: {\"choices\":[{\"delta\":{\"role\":\"assistant\"}}]}\n\n");
    body.push_str("data: {\"choices\":[{\"delta\":{\"content\":\" second\"}}]}\n\n");
    body.push_str("data: [DONE]\n\n");

    Mock::given(method("POST"))
        .and(path(COMPLETIONS_PATH))
        .respond_with(sse_response(body))
        .mount(&server)
        .await;

    let client = ModelClient::new(settings_for(&server));
    let stream = client
        .stream(&prompt("hi"), CancellationToken::new())
        .await
        .unwrap();
    let (deltas, completed, errors) = collect(stream).await;

    assert!(errors.is_empty());
    assert_eq!(deltas, vec!["first", " second"]);
    assert_eq!(completed.as_deref(), Some("first second"));
}

#[tokio::test]
async fn non_2xx_with_structured_body_surfaces_the_parsed_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(COMPLETIONS_PATH))
        .respond_with(
            ResponseTemplate::new(401)
                .set_body_json(serde_json::json!({"error": {"message": "invalid key"}})),
        )
        .mount(&server)
        .await;

    let client = ModelClient::new(settings_for(&server));
    let err = client
        .stream(&prompt("hi"), CancellationToken::new())
        .await
        .unwrap_err();

    match err {
        QuillErr::UnexpectedStatus { status, message } => {
            assert_eq!(status.as_u16(), 401);
            assert_eq!(message, "invalid key");
        }
        other => panic!("expected UnexpectedStatus, got {other:?}"),
    }
}

#[tokio::test]
async fn non_2xx_without_structured_body_gets_a_status_coded_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(COMPLETIONS_PATH))
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream exploded"))
        .mount(&server)
        .await;

    let client = ModelClient::new(settings_for(&server));
    let err = client
        .stream(&prompt("hi"), CancellationToken::new())
        .await
        .unwrap_err();

    match err {
        QuillErr::UnexpectedStatus { status, message } => {
            assert_eq!(status.as_u16(), 500);
            assert!(message.contains("500"), "unexpected message: {message}");
        }
        other => panic!("expected UnexpectedStatus, got {other:?}"),
    }
}

#[tokio::test]
async fn missing_credential_never_issues_a_network_call() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(sse_response(sse_body(&["never seen"])))
        .mount(&server)
        .await;

    let mut settings = settings_for(&server);
    settings.api_key = String::new();
    let client = ModelClient::new(settings);

    let err = client
        .stream(&prompt("hi"), CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, QuillErr::MissingConfiguration("API key")));

    let received = server.received_requests().await.unwrap();
    assert!(received.is_empty());
}

#[tokio::test]
async fn cancellation_before_the_response_surfaces_as_interrupted() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(COMPLETIONS_PATH))
        .respond_with(
            sse_response(sse_body(&["too late"]))
                .set_delay(std::time::Duration::from_secs(30)),
        )
        .mount(&server)
        .await;

    let client = ModelClient::new(settings_for(&server));
    let cancel = CancellationToken::new();
    let handle = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(50)).await;
            cancel.cancel();
        })
    };

    let err = client.stream(&prompt("hi"), cancel).await.unwrap_err();
    assert!(err.is_interrupt(), "expected Interrupted, got {err:?}");
    handle.await.unwrap();
}

#[tokio::test]
async fn cancellation_mid_stream_stops_delta_delivery() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(COMPLETIONS_PATH))
        .respond_with(sse_response(sse_body(&["a", "b", "c"])))
        .mount(&server)
        .await;

    let client = ModelClient::new(settings_for(&server));
    let cancel = CancellationToken::new();
    let stream = client.stream(&prompt("hi"), cancel.clone()).await.unwrap();

    // Fire the token before draining: the decode loop checks it ahead of
    // every read, so the first event observed must be the interrupt.
    cancel.cancel();
    let (deltas, completed, errors) = collect(stream).await;

    assert!(deltas.is_empty());
    assert!(completed.is_none());
    assert_eq!(errors.len(), 1);
    assert!(errors[0].is_interrupt());
}

#[tokio::test]
async fn non_streaming_mode_returns_the_message_content_directly() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(COMPLETIONS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "choices": [{"message": {"role": "assistant", "content": "4"}}]
        })))
        .mount(&server)
        .await;

    let client = ModelClient::new(settings_for(&server));
    let content = client.complete(&prompt("2+2?")).await.unwrap();
    assert_eq!(content, "4");
}

#[tokio::test]
async fn streaming_and_non_streaming_agree_on_the_same_prompt() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(COMPLETIONS_PATH))
        .respond_with(sse_response(sse_body(&["4"])))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(COMPLETIONS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "choices": [{"message": {"role": "assistant", "content": "4"}}]
        })))
        .mount(&server)
        .await;

    let client = ModelClient::new(settings_for(&server));
    let stream = client
        .stream(&prompt("2+2?"), CancellationToken::new())
        .await
        .unwrap();
    let (_, streamed, _) = collect(stream).await;
    let direct = client.complete(&prompt("2+2?")).await.unwrap();

    assert_eq!(streamed.as_deref(), Some(direct.as_str()));
}

#[tokio::test]
async fn request_body_carries_roles_and_contents_but_no_timestamps() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(COMPLETIONS_PATH))
        .respond_with(sse_response(sse_body(&["ok"])))
        .mount(&server)
        .await;

    let client = ModelClient::new(settings_for(&server));
    let messages = vec![
        Message::new(Role::System, "be terse"),
        Message::user("2+2?"),
    ];
    let stream = client
        .stream(&Prompt::new(messages), CancellationToken::new())
        .await
        .unwrap();
    let _ = collect(stream).await;

    let received = server.received_requests().await.unwrap();
    assert_eq!(received.len(), 1);
    let body: serde_json::Value = received[0].body_json().unwrap();
    assert_eq!(body["model"], "gpt-test");
    assert_eq!(body["stream"], true);
    assert_eq!(
        body["messages"],
        serde_json::json!([
            {"role": "system", "content": "be terse"},
            {"role": "user", "content": "2+2?"},
        ])
    );
}
