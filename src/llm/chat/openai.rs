use async_trait::async_trait;
use eventsource_stream::Eventsource;
use futures::{ future, StreamExt };
use log::{ debug, warn };
use reqwest::{ Client as HttpClient, header::{ HeaderMap, HeaderValue, CONTENT_TYPE, AUTHORIZATION } };
use serde::{ Deserialize, Serialize };
use serde_json::Value;

use super::{ ChatClient, DeltaStream };
use crate::error::RelayError;
use crate::llm::LlmConfig;

const DONE_MARKER: &str = "[DONE]";

pub struct OpenAIChatClient {
    http: HttpClient,
    base_url: String,
}

#[derive(Serialize)]
struct OpenAIChatRequest<'a> {
    messages: &'a [Value],
    model: &'a str,
    stream: bool,
}

#[derive(Deserialize, Debug, Default)]
pub struct ChatCompletionChunk {
    #[serde(default)]
    pub choices: Vec<ChunkChoice>,
    #[serde(default)]
    pub error: Option<Value>,
}

#[derive(Deserialize, Debug, Default)]
pub struct ChunkChoice {
    #[serde(default)]
    pub delta: Option<ChunkDelta>,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Deserialize, Debug, Default)]
pub struct ChunkDelta {
    #[serde(default)]
    pub content: Option<String>,
}

/// Text carried by the first choice's delta. Role-only and terminal units
/// have none.
pub fn extract_delta(chunk: &ChatCompletionChunk) -> Option<&str> {
    chunk.choices
        .first()?
        .delta.as_ref()?
        .content.as_deref()
        .filter(|c| !c.is_empty())
}

/// Interprets one SSE `data:` payload. `Ok(None)` means nothing to emit;
/// a payload that is not a JSON chunk ends the stream.
fn decode_event_data(data: &str) -> Result<Option<String>, RelayError> {
    match serde_json::from_str::<ChatCompletionChunk>(data) {
        Ok(chunk) => {
            if let Some(err) = chunk.error {
                return Err(RelayError::UpstreamStream(err.to_string()));
            }
            if let Some(reason) = chunk.choices.first().and_then(|c| c.finish_reason.as_deref()) {
                debug!("Upstream finish_reason: {}", reason);
            }
            Ok(extract_delta(&chunk).map(str::to_owned))
        }
        Err(e) => {
            warn!("JSON parse error: {} for data: {}", e, data);
            Err(RelayError::UpstreamStream(format!("malformed chunk: {}", e)))
        }
    }
}

impl OpenAIChatClient {
    pub fn new(api_key: &str, base_url: &str) -> Result<Self, RelayError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", api_key)).map_err(|e|
                RelayError::Config(format!("Invalid API key format: {}", e))
            )?
        );

        let http = HttpClient::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| RelayError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(config: &LlmConfig) -> Result<Self, RelayError> {
        Self::new(&config.api_key, &config.base_url)
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }
}

#[async_trait]
impl ChatClient for OpenAIChatClient {
    async fn open_stream(
        &self,
        model: &str,
        messages: Vec<Value>
    ) -> Result<DeltaStream, RelayError> {
        let req = OpenAIChatRequest {
            messages: &messages,
            model,
            stream: true,
        };

        let resp = self.http
            .post(self.completions_url())
            .json(&req)
            .send().await
            .map_err(RelayError::UpstreamRequest)?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(RelayError::UpstreamStatus { status, body });
        }

        let deltas = resp
            .bytes_stream()
            .eventsource()
            .take_while(|event| {
                future::ready(!matches!(event, Ok(ev) if ev.data.trim() == DONE_MARKER))
            })
            .filter_map(|event| async move {
                match event {
                    Ok(ev) => decode_event_data(&ev.data).transpose(),
                    Err(e) => Some(Err(RelayError::UpstreamStream(e.to_string()))),
                }
            })
            // First error is terminal.
            .scan(false, |failed, item| {
                if *failed {
                    return future::ready(None);
                }
                *failed = item.is_err();
                future::ready(Some(item))
            });

        Ok(Box::pin(deltas))
    }
}
