//! Completion relay: prepends the system prompt to the caller's conversation,
//! opens one streaming completion and hands back the deltas as a byte stream.

use axum::body::{ Body, Bytes };
use axum::http::header::CONTENT_TYPE;
use axum::response::{ IntoResponse, Response };
use log::{ error, info };
use std::sync::Arc;
use tokio_stream::wrappers::ReceiverStream;

use crate::config::prompt::SystemPrompt;
use crate::error::RelayError;
use crate::llm::chat::{ pump_deltas, ChatClient };
use crate::models::chat::Conversation;

#[derive(Clone)]
pub struct Relay {
    client: Arc<dyn ChatClient>,
    system_prompt: Arc<SystemPrompt>,
    model: String,
}

impl Relay {
    pub fn new(
        client: Arc<dyn ChatClient>,
        system_prompt: Arc<SystemPrompt>,
        model: impl Into<String>
    ) -> Self {
        Self { client, system_prompt, model: model.into() }
    }

    /// Parses the body and opens the upstream stream. Everything that can go
    /// wrong before the first body byte surfaces here.
    pub async fn open(
        &self,
        body: &[u8]
    ) -> Result<ReceiverStream<Result<Bytes, RelayError>>, RelayError> {
        let conversation = Conversation::from_slice(body)?;
        info!("Received data: {}", serde_json::to_string(&conversation)?);

        let messages = conversation.with_system(&self.system_prompt.message())?;
        let upstream = self.client.open_stream(&self.model, messages).await?;
        info!("OpenAI completion stream obtained for model {}", self.model);

        Ok(pump_deltas(upstream))
    }

    /// Full request handling: a streamed 200 on success, the generic 500 JSON
    /// body when the relay could not get as far as streaming.
    pub async fn respond(&self, body: &[u8]) -> Response {
        match self.open(body).await {
            Ok(stream) => {
                Response::builder()
                    .header(CONTENT_TYPE, "text/plain; charset=utf-8")
                    .body(Body::from_stream(stream))
                    .unwrap_or_else(|e| {
                        let err = RelayError::ResponseBuild(e);
                        error!("Error handling POST request: {}", err);
                        err.into_response()
                    })
            }
            Err(e) => {
                error!("Error handling POST request: {}", e);
                e.into_response()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::chat::stub::{ StubChatClient, StubDelta };
    use crate::models::chat::{ ChatMessage, Role };
    use axum::http::StatusCode;
    use futures::StreamExt;
    use serde_json::json;

    fn relay_with(stub: Arc<StubChatClient>) -> Relay {
        Relay::new(stub, Arc::new(SystemPrompt::new("be nice")), "gpt-4")
    }

    async fn body_string(resp: Response) -> String {
        let mut stream = resp.into_body().into_data_stream();
        let mut out = Vec::new();
        while let Some(chunk) = stream.next().await {
            out.extend_from_slice(&chunk.unwrap());
        }
        String::from_utf8(out).unwrap()
    }

    #[tokio::test]
    async fn sends_system_message_then_conversation() {
        let stub = Arc::new(StubChatClient::new(vec![]));
        let relay = relay_with(stub.clone());
        let convo = json!([
            {"role": "user", "content": "hi"},
            {"role": "assistant", "content": "hello"},
            {"role": "user", "content": "bye", "extra": [1, 2]}
        ]);

        let _ = relay.open(convo.to_string().as_bytes()).await.unwrap();

        let seen = stub.seen();
        assert_eq!(seen.len(), 1);
        let (model, messages) = &seen[0];
        assert_eq!(model, "gpt-4");
        assert_eq!(messages[0], serde_json::to_value(ChatMessage::new(Role::System, "be nice")).unwrap());
        assert_eq!(&messages[1..], convo.as_array().unwrap().as_slice());
    }

    #[tokio::test]
    async fn concatenates_deltas_into_body() {
        let stub = Arc::new(
            StubChatClient::new(vec![StubDelta::Text("Hel"), StubDelta::Text("lo"), StubDelta::Text("")])
        );
        let resp = relay_with(stub).respond(br#"[{"role":"user","content":"hi"}]"#).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_string(resp).await, "Hello");
    }

    #[tokio::test]
    async fn unparseable_body_is_500_without_upstream_call() {
        let stub = Arc::new(StubChatClient::new(vec![StubDelta::Text("x")]));
        let resp = relay_with(stub.clone()).respond(b"{oops").await;
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_string(resp).await, r#"{"message":"Internal Server Error"}"#);
        assert_eq!(stub.calls(), 0);
    }

    #[tokio::test]
    async fn non_array_body_is_500() {
        let stub = Arc::new(StubChatClient::new(vec![]));
        let resp = relay_with(stub.clone()).respond(br#"{"role":"user","content":"hi"}"#).await;
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(stub.calls(), 0);
    }

    #[tokio::test]
    async fn upstream_open_failure_is_500_and_not_retried() {
        let stub = Arc::new(StubChatClient::failing_open());
        let resp = relay_with(stub.clone()).respond(b"[]").await;
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_string(resp).await, r#"{"message":"Internal Server Error"}"#);
        assert_eq!(stub.calls(), 1);
    }

    #[tokio::test]
    async fn mid_stream_failure_truncates_body() {
        let stub = Arc::new(
            StubChatClient::new(vec![StubDelta::Text("partial"), StubDelta::Fail("reset"), StubDelta::Text("lost")])
        );
        let resp = relay_with(stub.clone()).respond(b"[]").await;
        assert_eq!(resp.status(), StatusCode::OK);

        let chunks: Vec<_> = resp.into_body().into_data_stream().collect().await;
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].as_ref().unwrap(), &Bytes::from("partial"));
        assert!(chunks[1].is_err());
        assert_eq!(stub.calls(), 1);
    }

    #[tokio::test]
    async fn empty_upstream_closes_empty_body() {
        let stub = Arc::new(StubChatClient::new(vec![]));
        let resp = relay_with(stub).respond(b"[]").await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_string(resp).await, "");
    }
}
