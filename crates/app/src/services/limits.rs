use quota_core::{
    ContextWindow, Decision, Denial, QuotaLimits, Reservation, ResourceKind, synthesis_chars,
    transcription_blocks,
};
use quota_db::Db;
use tracing::{debug, warn};

use crate::error::Result;
use crate::services::{SharedConfig, open_db};

/// The three resource limiters. Checks never write; the returned
/// reservation is persisted only with the record it pays for.
#[derive(Clone)]
pub struct LimitsService {
    config: SharedConfig,
}

impl LimitsService {
    pub(super) fn new(config: SharedConfig) -> Self {
        Self { config }
    }

    fn db(&self) -> Result<Db> {
        open_db(&self.config)
    }

    pub fn check_transcription(
        &self,
        user_id: i64,
        duration_seconds: u32,
    ) -> Result<Decision<Reservation>> {
        let db = self.db()?;
        check_transcription(&db, &self.config.limits, user_id, duration_seconds)
    }

    pub fn check_synthesis(&self, user_id: i64, text: &str) -> Result<Decision<Reservation>> {
        let db = self.db()?;
        check_synthesis(&db, &self.config.limits, user_id, text)
    }

    /// Returns the total the user will have spent if `proposed_tokens` are
    /// charged on top of the window's running total.
    pub fn check_tokens(&self, window: &ContextWindow, proposed_tokens: u64) -> Decision<u64> {
        check_tokens(&self.config.limits, window, proposed_tokens)
    }
}

pub(crate) fn check_transcription(
    db: &Db,
    limits: &QuotaLimits,
    user_id: i64,
    duration_seconds: u32,
) -> Result<Decision<Reservation>> {
    let resource = ResourceKind::Transcription;
    let used = db.sum_resource(user_id, resource)?;
    let remaining = limits.max_user_stt_blocks.saturating_sub(used);
    if duration_seconds >= limits.max_audio_seconds {
        return Ok(deny(
            user_id,
            resource,
            remaining,
            format!(
                "Speech recognition only accepts voice messages shorter than {} seconds",
                limits.max_audio_seconds
            ),
        ));
    }
    let blocks = transcription_blocks(duration_seconds, limits.block_seconds);
    if used.saturating_add(blocks) >= limits.max_user_stt_blocks {
        return Ok(deny(
            user_id,
            resource,
            remaining,
            format!(
                "Speech-to-text limit of {} blocks reached: used {}, this message needs {}",
                limits.max_user_stt_blocks, used, blocks
            ),
        ));
    }
    Ok(allow(user_id, resource, blocks))
}

pub(crate) fn check_synthesis(
    db: &Db,
    limits: &QuotaLimits,
    user_id: i64,
    text: &str,
) -> Result<Decision<Reservation>> {
    let resource = ResourceKind::Synthesis;
    let chars = synthesis_chars(text);
    let used = db.sum_resource(user_id, resource)?;
    let remaining = limits.max_user_tts_symbols.saturating_sub(used);
    if chars >= limits.max_tts_symbols {
        return Ok(deny(
            user_id,
            resource,
            remaining,
            format!(
                "Text-to-speech accepts fewer than {} characters per message, this one has {}",
                limits.max_tts_symbols, chars
            ),
        ));
    }
    if used.saturating_add(chars) >= limits.max_user_tts_symbols {
        return Ok(deny(
            user_id,
            resource,
            remaining,
            format!(
                "Text-to-speech limit of {} characters reached: used {}, this message needs {}",
                limits.max_user_tts_symbols, used, chars
            ),
        ));
    }
    Ok(allow(user_id, resource, chars))
}

pub(crate) fn check_tokens(
    limits: &QuotaLimits,
    window: &ContextWindow,
    proposed_tokens: u64,
) -> Decision<u64> {
    let total = window.running_token_total.saturating_add(proposed_tokens);
    if total > limits.max_user_gpt_tokens {
        let remaining = limits
            .max_user_gpt_tokens
            .saturating_sub(window.running_token_total);
        warn!(
            resource = %ResourceKind::ConversationTokens,
            total,
            remaining,
            "quota check denied"
        );
        return Decision::Denied(Denial::QuotaExceeded {
            resource: ResourceKind::ConversationTokens,
            remaining,
            message: format!(
                "Conversation token limit of {} reached",
                limits.max_user_gpt_tokens
            ),
        });
    }
    debug!(total, proposed_tokens, "token check passed");
    Decision::Allowed(total)
}

fn allow(user_id: i64, resource: ResourceKind, quantity: u64) -> Decision<Reservation> {
    debug!(user_id, resource = %resource, quantity, "quota check passed");
    Decision::Allowed(Reservation {
        user_id,
        resource,
        quantity,
    })
}

fn deny(
    user_id: i64,
    resource: ResourceKind,
    remaining: u64,
    message: String,
) -> Decision<Reservation> {
    warn!(user_id, resource = %resource, remaining, "quota check denied");
    Decision::Denied(Denial::QuotaExceeded {
        resource,
        remaining,
        message,
    })
}
