use grove_core::paths;
use log::LevelFilter;
use std::path::PathBuf;

const LOG_FILE_NAME: &str = "grove.log";

pub const LOG_LEVEL_ENV: &str = "GROVE_LOG";
pub const DEFAULT_LOG_LEVEL: LevelFilter = LevelFilter::Warn;

pub fn default_log_file() -> anyhow::Result<PathBuf> {
    Ok(paths::cache_dir()?.join(LOG_FILE_NAME))
}

/// Level named by `GROVE_LOG`, or the default when unset or unrecognised.
pub fn level_from_env() -> LevelFilter {
    parse_level(std::env::var(LOG_LEVEL_ENV).ok().as_deref())
}

fn parse_level(value: Option<&str>) -> LevelFilter {
    value
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(DEFAULT_LOG_LEVEL)
}

pub fn setup_logging(level: LevelFilter) -> anyhow::Result<()> {
    let log_file = default_log_file()?;
    if let Some(parent) = log_file.parent() {
        std::fs::create_dir_all(parent)?;
    }
    simple_log::file(log_file.to_string_lossy().into_owned(), level, 10, 10)
        .map_err(|e| anyhow::anyhow!(e))?;
    log::info!("grove logging initialised (level={level})");
    Ok(())
}
