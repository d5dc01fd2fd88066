pub mod app;
pub mod config;
pub mod engines;
pub mod error;
pub mod services;
pub mod startup;
pub mod util;

pub use app::{AppConfig, AppState};
pub use config::validate_limits;
pub use engines::{
    ConversationEngine, EngineReply, Engines, ExternalError, SpeechToText, TextToSpeech,
    TokenCounter,
};
pub use error::{APOLOGY, AppError, Result};
pub use services::{AppServices, TurnReply, TurnService, UserSession};
pub use startup::{AppPaths, ensure_app_data_dir};
pub use util::locks::UserLocks;
