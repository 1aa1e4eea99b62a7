use std::time::SystemTime;

use colored::Colorize;
use log::{Level, LevelFilter};

const LOG_LEVEL_ENV: &str = "LOG_LEVEL";

fn colored_level(level: Level) -> String {
    match level {
        Level::Error => level.to_string().red().to_string(),
        Level::Warn => level.to_string().yellow().to_string(),
        Level::Info => level.to_string().green().to_string(),
        Level::Debug => level.to_string().blue().to_string(),
        Level::Trace => level.to_string().dimmed().to_string(),
    }
}

/*
   LOG_LEVEL wins over the CLI default so a run can be debugged without
   touching its arguments
*/
pub fn setup_logger(default_level: LevelFilter) -> Result<(), fern::InitError> {
    let level = std::env::var(LOG_LEVEL_ENV)
        .ok()
        .and_then(|raw| raw.parse::<LevelFilter>().ok())
        .unwrap_or(default_level);

    fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "[{} {} {}] {}",
                humantime::format_rfc3339_seconds(SystemTime::now()),
                colored_level(record.level()),
                record.target(),
                message
            ))
        })
        .level(level)
        .level_for("chromiumoxide", LevelFilter::Warn)
        .level_for("tungstenite", LevelFilter::Warn)
        .level_for("html5ever", LevelFilter::Warn)
        .level_for("selectors", LevelFilter::Warn)
        .chain(std::io::stderr())
        .apply()?;

    Ok(())
}
