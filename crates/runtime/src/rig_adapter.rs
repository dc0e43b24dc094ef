use futures::StreamExt;
use rig::completion::{CompletionModel, Message as RigMessage};
use rig::prelude::CompletionClient;
use rig::providers::openai;
use rig::streaming::StreamedAssistantContent;
use snafu::{ResultExt, ensure};
use tokio::sync::{mpsc, oneshot};

use crate::provider::{
    CompletionsFailedSnafu, EmptyMessageSetSnafu, HttpClientSnafu, LlmProvider,
    MissingApiKeySnafu, ProviderMessage, Role, RuntimeConfig, RuntimeError, RuntimeResult,
    SessionId, StreamEvent, StreamHandle, StreamPayload, StreamRequest, StreamWorker,
    make_event_stream,
};

pub const OPENAI_PROVIDER_ID: &str = "openai";
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";

type RigStreamingResponse = rig::streaming::StreamingCompletionResponse<
    rig::providers::openai::responses_api::streaming::StreamingCompletionResponse,
>;

/// OpenAI-compatible provider backed by rig.
pub struct OpenAiProvider {
    config: RuntimeConfig,
}

impl OpenAiProvider {
    pub fn new(config: RuntimeConfig) -> RuntimeResult<Self> {
        ensure!(
            !config.api_key.is_empty(),
            MissingApiKeySnafu {
                stage: "openai-provider-new",
                provider_id: config.provider_id.clone(),
            }
        );

        Ok(Self { config })
    }

    fn build_client(config: &RuntimeConfig) -> RuntimeResult<openai::Client> {
        let mut builder = openai::Client::builder().api_key(config.api_key.as_str());
        if !config.base_url.is_empty() {
            builder = builder.base_url(config.base_url.as_str());
        }
        builder.build().context(HttpClientSnafu {
            stage: "build-client",
        })
    }

    fn to_rig_message(message: &ProviderMessage) -> RigMessage {
        match message.role {
            Role::User => RigMessage::user(message.content.clone()),
            Role::Assistant => RigMessage::assistant(message.content.clone()),
        }
    }

    async fn open_stream(
        config: &RuntimeConfig,
        request: &StreamRequest,
    ) -> RuntimeResult<RigStreamingResponse> {
        let client = Self::build_client(config)?;
        let model = client.completion_model(request.model_id.clone());

        let mut history = request
            .messages
            .iter()
            .map(Self::to_rig_message)
            .collect::<Vec<_>>();

        let Some(prompt) = history.pop() else {
            tracing::warn!(
                session = ?request.session,
                model_id = %request.model_id,
                message_count = request.messages.len(),
                "no turns left to prompt with"
            );
            return EmptyMessageSetSnafu {
                stage: "open-stream-pop-prompt",
                session: request.session,
            }
            .fail();
        };

        model
            .completion_request(prompt)
            .messages(history)
            .stream()
            .await
            .context(CompletionsFailedSnafu {
                stage: "open-stream",
            })
    }

    fn map_stream_item<R>(
        session: SessionId,
        item: StreamedAssistantContent<R>,
    ) -> Option<StreamEvent>
    where
        R: Clone + Unpin,
    {
        match item {
            StreamedAssistantContent::Text(text) if !text.text.is_empty() => Some(StreamEvent {
                session,
                payload: StreamPayload::Delta(text.text),
            }),
            _ => None,
        }
    }

    async fn run_stream_worker(
        config: RuntimeConfig,
        request: StreamRequest,
        event_tx: mpsc::UnboundedSender<StreamEvent>,
        mut cancel_rx: oneshot::Receiver<()>,
    ) {
        let session = request.session;
        let send_error = |error: RuntimeError| {
            let _ = event_tx.send(StreamEvent {
                session,
                payload: StreamPayload::Error(error.to_string()),
            });
        };

        let mut stream = match Self::open_stream(&config, &request).await {
            Ok(stream) => stream,
            Err(error) => {
                tracing::error!(
                    session = ?session,
                    model_id = %request.model_id,
                    stage = error.stage(),
                    error = %error,
                    "failed to open provider stream"
                );
                send_error(error);
                return;
            }
        };

        loop {
            tokio::select! {
                _ = &mut cancel_rx => {
                    tracing::debug!(session = ?session, "provider stream cancelled");
                    stream.cancel();
                    return;
                }
                next_item = stream.next() => match next_item {
                    Some(Ok(item)) => {
                        if let Some(event) = Self::map_stream_item(session, item)
                            && event_tx.send(event).is_err()
                        {
                            return;
                        }
                    }
                    Some(Err(source)) => {
                        tracing::warn!(
                            session = ?session,
                            error = %source,
                            "provider stream failed mid-reply"
                        );
                        send_error(RuntimeError::CompletionsFailed {
                            stage: "stream-chunk",
                            source,
                        });
                        return;
                    }
                    None => break,
                },
            }
        }

        let _ = event_tx.send(StreamEvent {
            session,
            payload: StreamPayload::Done,
        });
    }
}

impl LlmProvider for OpenAiProvider {
    fn id(&self) -> &str {
        &self.config.provider_id
    }

    fn name(&self) -> &str {
        "OpenAI"
    }

    fn default_model(&self) -> &str {
        self.config.model.as_deref().unwrap_or(DEFAULT_OPENAI_MODEL)
    }

    fn stream_chat(&self, request: StreamRequest) -> RuntimeResult<StreamHandle> {
        ensure!(
            !request.messages.is_empty(),
            EmptyMessageSetSnafu {
                stage: "stream-chat",
                session: request.session,
            }
        );

        let (event_tx, stream, cancel_rx) = make_event_stream(request.session);
        let worker: StreamWorker = Box::pin(Self::run_stream_worker(
            self.config.clone(),
            request,
            event_tx,
            cancel_rx,
        ));

        Ok(StreamHandle { stream, worker })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(api_key: &str) -> RuntimeConfig {
        RuntimeConfig::new(OPENAI_PROVIDER_ID, api_key, "", None)
    }

    #[test]
    fn rejects_blank_api_key() {
        let error = OpenAiProvider::new(config("   "))
            .err()
            .expect("blank key must fail");
        assert!(matches!(error, RuntimeError::MissingApiKey { .. }));
        assert_eq!(error.stage(), "openai-provider-new");
    }

    #[test]
    fn default_model_falls_back_when_unset() {
        let provider = OpenAiProvider::new(config("sk-test")).expect("valid config");
        assert_eq!(provider.default_model(), DEFAULT_OPENAI_MODEL);

        let configured = OpenAiProvider::new(RuntimeConfig::new(
            OPENAI_PROVIDER_ID,
            "sk-test",
            "",
            Some("gpt-4.1".into()),
        ))
        .expect("valid config");
        assert_eq!(configured.default_model(), "gpt-4.1");
    }

    #[test]
    fn history_maps_each_role_to_its_rig_turn() {
        let user = OpenAiProvider::to_rig_message(&ProviderMessage::new(Role::User, "hi"));
        let assistant =
            OpenAiProvider::to_rig_message(&ProviderMessage::new(Role::Assistant, "hello"));

        assert_eq!(user, RigMessage::user("hi"));
        assert_eq!(assistant, RigMessage::assistant("hello"));
    }

    #[test]
    fn empty_requests_are_rejected_before_spawning_a_worker() {
        let provider = OpenAiProvider::new(config("sk-test")).expect("valid config");
        let result = provider.stream_chat(StreamRequest::new(
            SessionId::new(4),
            DEFAULT_OPENAI_MODEL,
            Vec::new(),
        ));

        assert!(matches!(
            result,
            Err(RuntimeError::EmptyMessageSet { session, .. }) if session == SessionId::new(4)
        ));
    }
}
