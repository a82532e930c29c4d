use bytes::Bytes;
use eventsource_stream::Eventsource;
use futures::Stream;
use futures::StreamExt;
use futures::TryStreamExt;
use serde::Deserialize;
use serde_json::json;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing::trace;
use tracing::warn;

use crate::client_common::Prompt;
use crate::client_common::ResponseEvent;
use crate::client_common::ResponseStream;
use crate::config::Settings;
use crate::error::QuillErr;
use crate::error::Result;
use crate::flags::QUILL_STREAM_IDLE_TIMEOUT_MS;
use crate::message::WireMessage;

/// Structured error body returned by OpenAI-compatible endpoints:
/// `{"error":{"message":"..."}}`.
#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

/// Client for an OpenAI-style chat-completions endpoint. Holds no mutable
/// state; one instance is shared across turns.
#[derive(Debug, Clone)]
pub struct ModelClient {
    http: reqwest::Client,
    settings: Settings,
}

impl ModelClient {
    pub fn new(settings: Settings) -> Self {
        Self {
            http: reqwest::Client::new(),
            settings,
        }
    }

    /// Issue a streaming completion request. Fails with
    /// [`QuillErr::MissingConfiguration`] before any network call when the
    /// settings are incomplete. The returned stream yields one
    /// [`ResponseEvent::OutputTextDelta`] per received fragment followed by a
    /// single [`ResponseEvent::Completed`].
    ///
    /// No retries: retry policy belongs to the caller.
    pub async fn stream(
        &self,
        prompt: &Prompt,
        cancel: CancellationToken,
    ) -> Result<ResponseStream> {
        let resp = self.post_completions(prompt, true, &cancel).await?;

        let (tx_event, rx_event) = mpsc::channel::<Result<ResponseEvent>>(16);
        let byte_stream = resp.bytes_stream().map_err(QuillErr::Reqwest);
        tokio::spawn(process_sse(byte_stream, tx_event, cancel));
        Ok(ResponseStream { rx_event })
    }

    /// Non-streaming mode: a single JSON response whose message content is
    /// returned directly.
    pub async fn complete(&self, prompt: &Prompt) -> Result<String> {
        let cancel = CancellationToken::new();
        let resp = self.post_completions(prompt, false, &cancel).await?;

        let body: serde_json::Value = resp.json().await?;
        body.get("choices")
            .and_then(|c| c.get(0))
            .and_then(|c| c.get("message"))
            .and_then(|m| m.get("content"))
            .and_then(|c| c.as_str())
            .map(str::to_owned)
            .ok_or(QuillErr::EmptyResponse)
    }

    async fn post_completions(
        &self,
        prompt: &Prompt,
        stream: bool,
        cancel: &CancellationToken,
    ) -> Result<reqwest::Response> {
        self.settings.validate()?;

        let messages: Vec<WireMessage> = prompt.messages.iter().map(WireMessage::from).collect();
        let payload = json!({
            "model": self.settings.model,
            "messages": messages,
            "stream": stream,
        });

        debug!(url = %self.settings.base_url, stream, "POST (chat)");
        trace!("request payload: {payload}");

        let req = self
            .http
            .post(&self.settings.base_url)
            .bearer_auth(&self.settings.api_key)
            .header(reqwest::header::ACCEPT, "text/event-stream")
            .json(&payload);

        let res = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(QuillErr::Interrupted),
            res = req.send() => res?,
        };

        let status = res.status();
        if status.is_success() {
            return Ok(res);
        }

        let body = res.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorResponse>(&body)
            .ok()
            .and_then(|e| e.error.message)
            .unwrap_or_else(|| format!("API request failed with status {status}"));
        Err(QuillErr::UnexpectedStatus { status, message })
    }
}

/// Decode the line-oriented SSE framing into [`ResponseEvent`]s. Each event
/// is a `data:`-prefixed JSON fragment carrying an incremental content delta;
/// the literal `[DONE]` sentinel terminates the stream. A malformed payload
/// on one line is logged and skipped, never aborting the stream.
///
/// The cancellation token is checked at every read iteration; on cancel the
/// body is dropped promptly, releasing the underlying connection.
async fn process_sse<S>(
    stream: S,
    tx_event: mpsc::Sender<Result<ResponseEvent>>,
    cancel: CancellationToken,
) where
    S: Stream<Item = Result<Bytes>> + Unpin,
{
    let mut stream = stream.eventsource();
    let idle_timeout = *QUILL_STREAM_IDLE_TIMEOUT_MS;
    let mut content = String::new();

    loop {
        let next = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                let _ = tx_event.send(Err(QuillErr::Interrupted)).await;
                return;
            }
            next = timeout(idle_timeout, stream.next()) => next,
        };

        let sse = match next {
            Ok(Some(Ok(ev))) => ev,
            Ok(Some(Err(e))) => {
                let _ = tx_event.send(Err(QuillErr::Stream(e.to_string()))).await;
                return;
            }
            Ok(None) => {
                // Stream closed without the sentinel; treat what arrived as
                // the full response rather than dropping it.
                let _ = tx_event.send(Ok(ResponseEvent::Completed { content })).await;
                return;
            }
            Err(_) => {
                let _ = tx_event
                    .send(Err(QuillErr::Stream("idle timeout waiting for SSE".into())))
                    .await;
                return;
            }
        };

        if sse.data.trim() == "[DONE]" {
            let _ = tx_event.send(Ok(ResponseEvent::Completed { content })).await;
            return;
        }

        let chunk: serde_json::Value = match serde_json::from_str(&sse.data) {
            Ok(v) => v,
            Err(e) => {
                warn!("skipping malformed SSE line: {e}");
                continue;
            }
        };

        let delta = chunk
            .get("choices")
            .and_then(|c| c.get(0))
            .and_then(|c| c.get("delta"))
            .and_then(|d| d.get("content"))
            .and_then(|c| c.as_str());

        // Absent or empty fragments (role-only chunks, finish markers) are
        // tolerated without emitting an event.
        if let Some(delta) = delta
            && !delta.is_empty()
        {
            content.push_str(delta);
            let _ = tx_event
                .send(Ok(ResponseEvent::OutputTextDelta(delta.to_string())))
                .await;
        }
    }
}
