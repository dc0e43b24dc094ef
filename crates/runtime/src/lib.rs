#![deny(unsafe_code)]

//! Chat runtime handle for the assistant shell.
//!
//! The shell never talks to a provider directly. It receives a [`ChatRuntime`] from
//! [`create_runtime`] and passes it down to the thread view, which opens one stream per
//! reply.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

mod provider;
mod rig_adapter;

pub use provider::{
    EventStream, LlmProvider, ProviderMessage, Role, RuntimeConfig, RuntimeError,
    RuntimeResult, SessionId, StreamEvent, StreamHandle, StreamPayload, StreamRequest,
    StreamWorker, make_event_stream,
};
pub use rig_adapter::{DEFAULT_OPENAI_MODEL, OPENAI_PROVIDER_ID, OpenAiProvider};

static NEXT_RUNTIME_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of one runtime handle. Two clones of a handle share an id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RuntimeId(u64);

impl RuntimeId {
    fn next() -> Self {
        Self(NEXT_RUNTIME_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// Opaque, cloneable assistant capability.
#[derive(Clone)]
pub struct ChatRuntime {
    id: RuntimeId,
    provider: Arc<dyn LlmProvider>,
    model_id: String,
}

impl ChatRuntime {
    pub fn new(provider: Arc<dyn LlmProvider>) -> Self {
        let model_id = provider.default_model().to_string();
        Self {
            id: RuntimeId::next(),
            provider,
            model_id,
        }
    }

    pub fn id(&self) -> RuntimeId {
        self.id
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    pub fn model_id(&self) -> &str {
        &self.model_id
    }

    /// Opens a streamed reply for `messages` under `session`.
    pub fn stream(
        &self,
        session: SessionId,
        messages: Vec<ProviderMessage>,
    ) -> RuntimeResult<StreamHandle> {
        tracing::debug!(
            runtime = ?self.id,
            provider_id = %self.provider.id(),
            model_id = %self.model_id,
            session = ?session,
            message_count = messages.len(),
            "opening reply stream"
        );
        self.provider
            .stream_chat(StreamRequest::new(session, self.model_id.clone(), messages))
    }
}

impl fmt::Debug for ChatRuntime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChatRuntime")
            .field("id", &self.id)
            .field("provider", &self.provider.id())
            .field("model_id", &self.model_id)
            .finish()
    }
}

/// Builds a runtime handle for the configured provider.
pub fn create_runtime(mut config: RuntimeConfig) -> RuntimeResult<ChatRuntime> {
    if config.provider_id.is_empty() {
        config.provider_id = OPENAI_PROVIDER_ID.to_string();
    }

    match config.provider_id.as_str() {
        "openai" | "rig-openai" => {
            config.provider_id = OPENAI_PROVIDER_ID.to_string();
            let provider = OpenAiProvider::new(config)?;
            Ok(ChatRuntime::new(Arc::new(provider)))
        }
        _ => Err(RuntimeError::UnsupportedProvider {
            stage: "create-runtime",
            provider_id: config.provider_id,
        }),
    }
}
