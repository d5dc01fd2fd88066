use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "user" => Ok(Role::User),
            "assistant" => Ok(Role::Assistant),
            other => Err(format!("unknown role {other}")),
        }
    }
}

/// Metered external resource. Each maps to one ledger column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Transcription,
    Synthesis,
    ConversationTokens,
}

impl ResourceKind {
    pub fn label(&self) -> &'static str {
        match self {
            ResourceKind::Transcription => "speech-to-text blocks",
            ResourceKind::Synthesis => "text-to-speech characters",
            ResourceKind::ConversationTokens => "conversation tokens",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A persisted ledger row. Never updated after insert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageRecord {
    pub id: i64,
    pub user_id: i64,
    pub content: String,
    pub role: Role,
    pub cumulative_tokens: u64,
    pub synthesis_chars: u64,
    pub transcription_blocks: u64,
}

/// A ledger row waiting for the store to assign its id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewUsageRecord {
    pub user_id: i64,
    pub content: String,
    pub role: Role,
    pub cumulative_tokens: u64,
    pub synthesis_chars: u64,
    pub transcription_blocks: u64,
}

impl NewUsageRecord {
    pub fn new(user_id: i64, content: impl Into<String>, role: Role, cumulative_tokens: u64) -> Self {
        Self {
            user_id,
            content: content.into(),
            role,
            cumulative_tokens,
            synthesis_chars: 0,
            transcription_blocks: 0,
        }
    }

    pub fn user(user_id: i64, content: impl Into<String>, cumulative_tokens: u64) -> Self {
        Self::new(user_id, content, Role::User, cumulative_tokens)
    }

    pub fn assistant(user_id: i64, content: impl Into<String>, cumulative_tokens: u64) -> Self {
        Self::new(user_id, content, Role::Assistant, cumulative_tokens)
    }

    pub fn with_synthesis_chars(mut self, chars: u64) -> Self {
        self.synthesis_chars = chars;
        self
    }

    pub fn with_transcription_blocks(mut self, blocks: u64) -> Self {
        self.transcription_blocks = blocks;
        self
    }
}

/// One row of a last-N ledger read, oldest first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerTurn {
    pub content: String,
    pub role: Role,
    pub cumulative_tokens: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextTurn {
    pub content: String,
    pub role: Role,
}

impl ContextTurn {
    pub fn new(content: impl Into<String>, role: Role) -> Self {
        Self {
            content: content.into(),
            role,
        }
    }
}

/// Prompt history for one request plus the user's token high-water mark.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextWindow {
    pub turns: Vec<ContextTurn>,
    pub running_token_total: u64,
}

impl ContextWindow {
    pub fn from_ledger(rows: Vec<LedgerTurn>) -> Self {
        let running_token_total = rows
            .iter()
            .map(|row| row.cumulative_tokens)
            .max()
            .unwrap_or(0);
        let turns = rows
            .into_iter()
            .map(|row| ContextTurn {
                content: row.content,
                role: row.role,
            })
            .collect();
        Self {
            turns,
            running_token_total,
        }
    }

    /// Appends a turn that is not persisted yet, dropping the oldest turns so
    /// that at most `limit` remain.
    pub fn push_pending(&mut self, turn: ContextTurn, limit: usize) {
        self.turns.push(turn);
        if limit > 0 && self.turns.len() > limit {
            let excess = self.turns.len() - limit;
            self.turns.drain(..excess);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuotaLimits {
    pub max_users: u64,
    pub max_user_stt_blocks: u64,
    pub max_user_tts_symbols: u64,
    pub max_tts_symbols: u64,
    pub max_user_gpt_tokens: u64,
    pub context_turns: usize,
    pub max_audio_seconds: u32,
    pub block_seconds: u32,
}

impl Default for QuotaLimits {
    fn default() -> Self {
        Self {
            max_users: 3,
            max_user_stt_blocks: 10,
            max_user_tts_symbols: 5_000,
            max_tts_symbols: 200,
            max_user_gpt_tokens: 2_000,
            context_turns: 4,
            max_audio_seconds: 30,
            block_seconds: 15,
        }
    }
}

/// Whole blocks charged for `duration_seconds` of audio, rounded up.
pub fn transcription_blocks(duration_seconds: u32, block_seconds: u32) -> u64 {
    u64::from(duration_seconds.div_ceil(block_seconds.max(1)))
}

/// Characters charged for synthesizing `text`. Counts Unicode scalar values,
/// not bytes.
pub fn synthesis_chars(text: &str) -> u64 {
    text.chars().count() as u64
}

/// Provisional charge handed out by a limiter check. It becomes real only
/// when written to the ledger together with the resulting content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reservation {
    pub user_id: i64,
    pub resource: ResourceKind,
    pub quantity: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Denial {
    QuotaExceeded {
        resource: ResourceKind,
        remaining: u64,
        message: String,
    },
    AdmissionDenied {
        message: String,
    },
}

impl Denial {
    pub fn message(&self) -> &str {
        match self {
            Denial::QuotaExceeded { message, .. } | Denial::AdmissionDenied { message } => message,
        }
    }
}

impl fmt::Display for Denial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// Outcome of an admission or limiter check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "value", rename_all = "snake_case")]
pub enum Decision<T> {
    Allowed(T),
    Denied(Denial),
}

impl<T> Decision<T> {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allowed(_))
    }

    pub fn denial(&self) -> Option<&Denial> {
        match self {
            Decision::Allowed(_) => None,
            Decision::Denied(denial) => Some(denial),
        }
    }

    pub fn into_result(self) -> Result<T, Denial> {
        match self {
            Decision::Allowed(value) => Ok(value),
            Decision::Denied(denial) => Err(denial),
        }
    }
}

/// Lifetime consumption of one user, as read from the ledger.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserUsage {
    pub transcription_blocks: u64,
    pub synthesis_chars: u64,
    pub cumulative_tokens: u64,
}
