use quota_core::{ContextTurn, NewUsageRecord, Role};
use tracing::{error, info, warn};

use crate::engines::Engines;
use crate::error::{AppError, Result};
use crate::services::ledger::LedgerService;
use crate::services::session::{SessionService, UserSession};

const VOICE_UNAVAILABLE: &str = "Voice reply is unavailable right now, here is the text";

/// What the shell sends back for one incoming message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnReply {
    /// `notice` explains why a voice request got a text reply.
    Text {
        text: String,
        notice: Option<String>,
    },
    Voice {
        audio: Vec<u8>,
        text: String,
    },
    /// Refused by a quota, the admission cap or input validation.
    Denied(String),
    /// Failed for an internal reason; carries only the generic apology.
    Failed(String),
}

struct Exchange {
    prior_total: u64,
    total: u64,
    answer: String,
}

enum Speech {
    Audio { audio: Vec<u8>, chars: u64 },
    Skipped(String),
}

/// The per-message pipelines: admission, limiter checks, external calls and
/// a single atomic commit, all under the requesting user's lock. Nothing is
/// written when a check denies or an external call fails.
#[derive(Clone)]
pub struct TurnService {
    sessions: SessionService,
    ledger: LedgerService,
    engines: Engines,
}

impl TurnService {
    pub(super) fn new(sessions: SessionService, ledger: LedgerService, engines: Engines) -> Self {
        Self {
            sessions,
            ledger,
            engines,
        }
    }

    pub fn text_turn(&self, user_id: i64, text: &str) -> Result<TurnReply> {
        require_text(text, "Send a text or voice message")?;
        let reply = self.sessions.run(user_id, |session| {
            session.check_admission()?.into_result()?;
            let exchange = self.converse(session, text)?;
            session.commit(&[
                NewUsageRecord::user(user_id, text, exchange.prior_total),
                NewUsageRecord::assistant(user_id, &exchange.answer, exchange.total),
            ])?;
            Ok(TurnReply::Text {
                text: exchange.answer,
                notice: None,
            })
        })?;
        self.log_usage(user_id, "text");
        Ok(reply)
    }

    pub fn voice_turn(&self, user_id: i64, duration_seconds: u32, audio: &[u8]) -> Result<TurnReply> {
        let reply = self.sessions.run(user_id, |session| {
            session.check_admission()?.into_result()?;
            let blocks = session
                .check_transcription(duration_seconds)?
                .into_result()?;
            let transcript = self.engines.speech_to_text.transcribe(audio)?;
            // The audio has been transcribed: its blocks are owed even if the
            // conversation step refuses or fails.
            if let Err(err) = require_text(&transcript, "No speech was recognized in the message") {
                charge_transcript(session, &transcript, blocks.quantity);
                return Err(err);
            }
            let exchange = match self.converse(session, &transcript) {
                Ok(exchange) => exchange,
                Err(err) => {
                    charge_transcript(session, &transcript, blocks.quantity);
                    return Err(err);
                }
            };
            let speech = self.speak(session, &exchange.answer)?;
            let synthesized = match &speech {
                Speech::Audio { chars, .. } => *chars,
                Speech::Skipped(_) => 0,
            };
            session.commit(&[
                NewUsageRecord::user(user_id, transcript.as_str(), exchange.prior_total)
                    .with_transcription_blocks(blocks.quantity),
                NewUsageRecord::assistant(user_id, &exchange.answer, exchange.total)
                    .with_synthesis_chars(synthesized),
            ])?;
            Ok(match speech {
                Speech::Audio { audio, .. } => TurnReply::Voice {
                    audio,
                    text: exchange.answer,
                },
                Speech::Skipped(notice) => TurnReply::Text {
                    text: exchange.answer,
                    notice: Some(notice),
                },
            })
        })?;
        self.log_usage(user_id, "voice");
        Ok(reply)
    }

    /// Speaks `text` back without involving the conversational model.
    pub fn synthesize(&self, user_id: i64, text: &str) -> Result<TurnReply> {
        require_text(text, "Send the text you want to hear")?;
        let reply = self.sessions.run(user_id, |session| {
            session.check_admission()?.into_result()?;
            let reservation = session.check_synthesis(text)?.into_result()?;
            let audio = self.engines.text_to_speech.synthesize(text)?;
            let carried = session.high_water_mark()?;
            session.commit(&[NewUsageRecord::user(user_id, text, carried)
                .with_synthesis_chars(reservation.quantity)])?;
            Ok(TurnReply::Voice {
                audio,
                text: text.to_string(),
            })
        })?;
        self.log_usage(user_id, "synthesis");
        Ok(reply)
    }

    /// Returns the transcript of a voice message without involving the
    /// conversational model.
    pub fn transcribe(&self, user_id: i64, duration_seconds: u32, audio: &[u8]) -> Result<TurnReply> {
        let reply = self.sessions.run(user_id, |session| {
            session.check_admission()?.into_result()?;
            let blocks = session
                .check_transcription(duration_seconds)?
                .into_result()?;
            let transcript = self.engines.speech_to_text.transcribe(audio)?;
            if let Err(err) = require_text(&transcript, "No speech was recognized in the message") {
                charge_transcript(session, &transcript, blocks.quantity);
                return Err(err);
            }
            let carried = session.high_water_mark()?;
            session.commit(&[NewUsageRecord::user(user_id, transcript.as_str(), carried)
                .with_transcription_blocks(blocks.quantity)])?;
            Ok(TurnReply::Text {
                text: transcript,
                notice: None,
            })
        })?;
        self.log_usage(user_id, "transcription");
        Ok(reply)
    }

    pub fn handle_text(&self, user_id: i64, text: &str) -> TurnReply {
        self.text_turn(user_id, text)
            .unwrap_or_else(|err| failure_reply(user_id, err))
    }

    pub fn handle_voice(&self, user_id: i64, duration_seconds: u32, audio: &[u8]) -> TurnReply {
        self.voice_turn(user_id, duration_seconds, audio)
            .unwrap_or_else(|err| failure_reply(user_id, err))
    }

    pub fn handle_synthesis(&self, user_id: i64, text: &str) -> TurnReply {
        self.synthesize(user_id, text)
            .unwrap_or_else(|err| failure_reply(user_id, err))
    }

    pub fn handle_transcription(
        &self,
        user_id: i64,
        duration_seconds: u32,
        audio: &[u8],
    ) -> TurnReply {
        self.transcribe(user_id, duration_seconds, audio)
            .unwrap_or_else(|err| failure_reply(user_id, err))
    }

    fn converse(&self, session: &UserSession, prompt: &str) -> Result<Exchange> {
        let mut window = session.context_window()?;
        let prior_total = window.running_token_total;
        window.push_pending(
            ContextTurn::new(prompt, Role::User),
            session.limits().context_turns,
        );
        let proposed = self.engines.tokens.count(&window.turns)?;
        let approved = session.check_tokens(&window, proposed).into_result()?;
        let reply = self.engines.conversation.reply(&window.turns)?;
        Ok(Exchange {
            prior_total,
            total: approved.saturating_add(reply.tokens),
            answer: reply.text,
        })
    }

    fn speak(&self, session: &UserSession, text: &str) -> Result<Speech> {
        let reservation = match session.check_synthesis(text)?.into_result() {
            Ok(reservation) => reservation,
            Err(denial) => return Ok(Speech::Skipped(denial.message().to_string())),
        };
        match self.engines.text_to_speech.synthesize(text) {
            Ok(audio) => Ok(Speech::Audio {
                audio,
                chars: reservation.quantity,
            }),
            Err(err) => {
                warn!(user_id = session.user_id(), error = %err, "speech synthesis failed");
                Ok(Speech::Skipped(VOICE_UNAVAILABLE.to_string()))
            }
        }
    }

    fn log_usage(&self, user_id: i64, kind: &str) {
        let usage = self.ledger.usage_or_default(user_id);
        info!(
            user_id,
            kind,
            transcription_blocks = usage.transcription_blocks,
            synthesis_chars = usage.synthesis_chars,
            cumulative_tokens = usage.cumulative_tokens,
            "turn completed"
        );
    }
}

fn require_text(text: &str, hint: &str) -> Result<()> {
    if text.trim().is_empty() {
        return Err(AppError::InvalidInput(hint.to_string()));
    }
    Ok(())
}

/// Commits the user turn of a voice message whose reply was never produced.
fn charge_transcript(session: &mut UserSession, transcript: &str, blocks: u64) {
    let user_id = session.user_id();
    let committed = session.high_water_mark().and_then(|carried| {
        session.commit(&[
            NewUsageRecord::user(user_id, transcript, carried).with_transcription_blocks(blocks)
        ])
    });
    if let Err(err) = committed {
        error!(user_id, blocks, error = %err, "failed to charge transcription");
    }
}

fn failure_reply(user_id: i64, err: AppError) -> TurnReply {
    if err.is_denial() {
        return TurnReply::Denied(err.user_message());
    }
    error!(user_id, error = %err, "turn failed");
    TurnReply::Failed(err.user_message())
}
