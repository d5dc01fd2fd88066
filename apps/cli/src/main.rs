mod args;
mod config;
mod dirs;

use std::fs::OpenOptions;
use std::io;
use std::path::Path;
use std::sync::Mutex;

use quota_app::{AppPaths, AppState, ensure_app_data_dir};
use tracing::info;
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = args::parse_args().map_err(|err| {
        eprintln!("{err}");
        args::print_help();
        io::Error::new(io::ErrorKind::InvalidInput, "invalid arguments")
    })?;

    let config = config::load_or_create(args.config.as_deref()).map_err(io::Error::other)?;
    init_logging(config.config.log_file.as_deref())?;
    if config.created {
        info!(file = %config.file.display(), "created default config");
    }

    let data_dir = match args.data_dir.or(config.config.data_dir) {
        Some(dir) => dir,
        None => dirs::default_data_dir().map_err(io::Error::other)?,
    };
    let paths = AppPaths::new(data_dir);
    ensure_app_data_dir(&paths).map_err(|err| io::Error::other(err.to_string()))?;

    let limits = config.config.limits;
    let app_state = AppState::new(paths.db_path.clone(), limits);
    let is_fresh_db = app_state.is_fresh_db();
    app_state
        .initialize()
        .map_err(|err| io::Error::other(format!("failed to initialize ledger: {}", err)))?;

    info!(
        db = %paths.db_path.display(),
        fresh = is_fresh_db,
        "usage ledger ready"
    );
    info!(
        max_users = limits.max_users,
        max_user_stt_blocks = limits.max_user_stt_blocks,
        max_user_tts_symbols = limits.max_user_tts_symbols,
        max_tts_symbols = limits.max_tts_symbols,
        max_user_gpt_tokens = limits.max_user_gpt_tokens,
        context_turns = limits.context_turns,
        max_audio_seconds = limits.max_audio_seconds,
        block_seconds = limits.block_seconds,
        "effective limits"
    );
    Ok(())
}

fn init_logging(log_file: Option<&Path>) -> io::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match log_file {
        Some(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            builder
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .init();
        }
        None => builder.with_writer(io::stderr).init(),
    }
    Ok(())
}
