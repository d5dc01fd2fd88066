#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

use quota_app::engines::ExternalResult;
use quota_app::{
    AppState, ConversationEngine, EngineReply, Engines, ExternalError, SpeechToText,
    TextToSpeech, TokenCounter, TurnService,
};
use quota_core::{ContextTurn, NewUsageRecord, QuotaLimits};
use tempfile::TempDir;

pub struct TestApp {
    pub _dir: TempDir,
    pub state: AppState,
}

pub fn setup_app(limits: QuotaLimits) -> TestApp {
    let dir = tempfile::tempdir().expect("temp dir");
    let db_path = dir.path().join("quota.sqlite");
    let state = AppState::new(db_path, limits);
    state.initialize().expect("initialize");
    TestApp { _dir: dir, state }
}

pub fn seed(app: &TestApp, records: Vec<NewUsageRecord>) {
    let mut db = app.state.open_db().expect("open db");
    db.append_records(&records).expect("seed records");
}

/// One token per whitespace-separated word across all turns.
pub struct WordCounter;

impl TokenCounter for WordCounter {
    fn count(&self, turns: &[ContextTurn]) -> ExternalResult<u64> {
        Ok(turns
            .iter()
            .map(|turn| turn.content.split_whitespace().count() as u64)
            .sum())
    }
}

/// Replies with a fixed answer and records the prompts it saw.
pub struct ScriptedEngine {
    pub answer: String,
    pub tokens: u64,
    pub calls: AtomicUsize,
    pub prompts: std::sync::Mutex<Vec<Vec<ContextTurn>>>,
}

impl ScriptedEngine {
    pub fn new(answer: &str, tokens: u64) -> Self {
        Self {
            answer: answer.to_string(),
            tokens,
            calls: AtomicUsize::new(0),
            prompts: std::sync::Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_prompt(&self) -> Vec<ContextTurn> {
        self.prompts
            .lock()
            .expect("prompts")
            .last()
            .cloned()
            .unwrap_or_default()
    }
}

impl ConversationEngine for ScriptedEngine {
    fn reply(&self, turns: &[ContextTurn]) -> ExternalResult<EngineReply> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().expect("prompts").push(turns.to_vec());
        Ok(EngineReply {
            text: self.answer.clone(),
            tokens: self.tokens,
        })
    }
}

pub struct FailingEngine;

impl ConversationEngine for FailingEngine {
    fn reply(&self, _turns: &[ContextTurn]) -> ExternalResult<EngineReply> {
        Err(ExternalError::new("conversation", "upstream timeout"))
    }
}

pub struct FakeStt {
    pub transcript: String,
    pub calls: AtomicUsize,
}

impl FakeStt {
    pub fn new(transcript: &str) -> Self {
        Self {
            transcript: transcript.to_string(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl SpeechToText for FakeStt {
    fn transcribe(&self, _audio: &[u8]) -> ExternalResult<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.transcript.clone())
    }
}

/// Returns the text bytes as "audio" after an optional delay.
pub struct FakeTts {
    pub fail: bool,
    pub delay: Duration,
    pub calls: AtomicUsize,
}

impl FakeTts {
    pub fn new() -> Self {
        Self {
            fail: false,
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new()
        }
    }

    pub fn slow(delay: Duration) -> Self {
        Self {
            delay,
            ..Self::new()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl TextToSpeech for FakeTts {
    fn synthesize(&self, text: &str) -> ExternalResult<Vec<u8>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            thread::sleep(self.delay);
        }
        if self.fail {
            return Err(ExternalError::new("text-to-speech", "voice unavailable"));
        }
        Ok(text.as_bytes().to_vec())
    }
}

pub struct Fakes {
    pub engine: Arc<ScriptedEngine>,
    pub stt: Arc<FakeStt>,
    pub tts: Arc<FakeTts>,
}

pub fn fakes(answer: &str, tokens: u64) -> Fakes {
    Fakes {
        engine: Arc::new(ScriptedEngine::new(answer, tokens)),
        stt: Arc::new(FakeStt::new("what is the weather")),
        tts: Arc::new(FakeTts::new()),
    }
}

pub fn turn_service(app: &TestApp, fakes: &Fakes) -> TurnService {
    app.state.turns(Engines {
        tokens: Arc::new(WordCounter),
        conversation: fakes.engine.clone(),
        speech_to_text: fakes.stt.clone(),
        text_to_speech: fakes.tts.clone(),
    })
}

pub fn records(app: &TestApp, user_id: i64) -> Vec<quota_core::UsageRecord> {
    let db = app.state.open_db().expect("open db");
    db.list_records(user_id).expect("list records")
}

pub fn engines_with(conversation: Arc<dyn ConversationEngine>, tts: Arc<FakeTts>) -> Engines {
    Engines {
        tokens: Arc::new(WordCounter),
        conversation,
        speech_to_text: Arc::new(FakeStt::new("what is the weather")),
        text_to_speech: tts,
    }
}
