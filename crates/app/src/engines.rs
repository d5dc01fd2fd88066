//! Contracts for the services a turn depends on but this crate does not
//! implement: token counting, the conversational model, speech recognition
//! and speech synthesis. Calls are blocking and are never retried here.

use std::sync::Arc;

use quota_core::ContextTurn;
use thiserror::Error;

#[derive(Debug, Error)]
#[error("{service} failed: {message}")]
pub struct ExternalError {
    pub service: &'static str,
    pub message: String,
}

impl ExternalError {
    pub fn new(service: &'static str, message: impl Into<String>) -> Self {
        Self {
            service,
            message: message.into(),
        }
    }
}

pub type ExternalResult<T> = std::result::Result<T, ExternalError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineReply {
    pub text: String,
    /// Tokens billed for the completion.
    pub tokens: u64,
}

pub trait TokenCounter: Send + Sync {
    fn count(&self, turns: &[ContextTurn]) -> ExternalResult<u64>;
}

pub trait ConversationEngine: Send + Sync {
    fn reply(&self, turns: &[ContextTurn]) -> ExternalResult<EngineReply>;
}

pub trait SpeechToText: Send + Sync {
    fn transcribe(&self, audio: &[u8]) -> ExternalResult<String>;
}

pub trait TextToSpeech: Send + Sync {
    fn synthesize(&self, text: &str) -> ExternalResult<Vec<u8>>;
}

#[derive(Clone)]
pub struct Engines {
    pub tokens: Arc<dyn TokenCounter>,
    pub conversation: Arc<dyn ConversationEngine>,
    pub speech_to_text: Arc<dyn SpeechToText>,
    pub text_to_speech: Arc<dyn TextToSpeech>,
}
