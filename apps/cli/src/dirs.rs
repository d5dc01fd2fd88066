use std::env;
use std::path::PathBuf;

const APP_DIR_NAME: &str = "voice-quota";

pub fn config_dir() -> Result<PathBuf, String> {
    base_dir("XDG_CONFIG_HOME", &[".config"])
}

pub fn default_data_dir() -> Result<PathBuf, String> {
    base_dir("XDG_DATA_HOME", &[".local", "share"])
}

fn base_dir(xdg_var: &str, home_fallback: &[&str]) -> Result<PathBuf, String> {
    if let Some(dir) = env::var_os(xdg_var).filter(|value| !value.is_empty()) {
        return Ok(PathBuf::from(dir).join(APP_DIR_NAME));
    }
    let home = env::var("HOME").map_err(|err| format!("resolve HOME: {}", err))?;
    let mut dir = PathBuf::from(home);
    dir.extend(home_fallback);
    Ok(dir.join(APP_DIR_NAME))
}
