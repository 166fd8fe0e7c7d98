use colored::{Color, Colorize};
use once_cell::sync::Lazy;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogLevel {
    Step,
    Info,
    Success,
    Warning,
    Error,
}

static LOG_LEVEL_CONFIG: Lazy<HashMap<LogLevel, (&'static str, Color)>> = Lazy::new(|| {
    HashMap::from([
        (LogLevel::Step, ("STEP", Color::Magenta)),
        (LogLevel::Info, ("INFO", Color::Cyan)),
        (LogLevel::Success, ("SUCCESS", Color::Green)),
        (LogLevel::Warning, ("WARNING", Color::Yellow)),
        (LogLevel::Error, ("ERROR", Color::Red)),
    ])
});

static PREFIX_WIDTH: Lazy<usize> = Lazy::new(|| {
    LOG_LEVEL_CONFIG
        .values()
        .map(|(s, _)| s.len() + 4)
        .max()
        .unwrap_or(11)
        + 1
});

static LOG_PREFIXES: Lazy<HashMap<LogLevel, String>> = Lazy::new(|| {
    colored::control::set_override(true);

    LOG_LEVEL_CONFIG
        .iter()
        .map(|(level, (level_str, color))| {
            let padding = PREFIX_WIDTH.saturating_sub(level_str.len() + 4);
            let inner = format!(" {} ", level_str).color(*color).bold();
            (*level, format!("[{}]{}", inner, " ".repeat(padding)))
        })
        .collect()
});

/// Installs the stdout subscriber. `RUST_LOG` defaults to `info`.
pub fn setup_logging() {
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info");
    }

    let format = tracing_subscriber::fmt::format()
        .without_time()
        .with_level(false)
        .with_target(false)
        .compact();

    tracing_subscriber::fmt()
        .event_format(format)
        .with_ansi(true)
        .with_writer(std::io::stdout)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();
}

pub fn log(level: LogLevel, message: &str) {
    let prefix = LOG_PREFIXES
        .get(&level)
        .cloned()
        .unwrap_or_else(|| format!("[{:<7}] ", format!("{:?}", level)));

    match level {
        LogLevel::Step => tracing::info!(target: "step", "{}{}", prefix, message),
        LogLevel::Info | LogLevel::Success => tracing::info!("{}{}", prefix, message),
        LogLevel::Warning => tracing::warn!("{}{}", prefix, message),
        LogLevel::Error => tracing::error!("{}{}", prefix, message),
    }
}
