use quota_core::QuotaLimits;

use crate::error::{AppError, Result};

/// Rejects limit sets the limiters cannot enforce meaningfully.
pub fn validate_limits(limits: &QuotaLimits) -> Result<()> {
    if limits.block_seconds == 0 {
        return Err(AppError::InvalidInput(
            "block_seconds must be greater than zero".to_string(),
        ));
    }
    if limits.max_audio_seconds == 0 {
        return Err(AppError::InvalidInput(
            "max_audio_seconds must be greater than zero".to_string(),
        ));
    }
    // The running token total is read from the window; an empty window
    // would always report zero spend.
    if limits.context_turns == 0 {
        return Err(AppError::InvalidInput(
            "context_turns must be at least 1".to_string(),
        ));
    }
    Ok(())
}
