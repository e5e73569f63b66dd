use chrono::Local;
use eyre::Result;
use fern::Dispatch;
use log::LevelFilter;

/// Sets up the application logger with console output.
///
/// # Returns
/// * `Result<()>` - Success or failure of logger setup
///
/// # Errors
/// * If a logger was already installed
pub fn setup_logger() -> Result<()> {
    Dispatch::new()
        // Set logging level from RUST_LOG env var or default to Info
        .level(level_from_env(std::env::var("RUST_LOG").ok().as_deref()))
        // HTTP internals are only interesting when something is wrong
        .level_for("reqwest", LevelFilter::Warn)
        .level_for("hyper", LevelFilter::Warn)
        // Configure logging to console
        .chain(std::io::stdout())
        // Format log messages with time, log level and target
        .format(|out, message, record| {
            out.finish(format_args!(
                "{} [{}] {}: {}",
                Local::now().format("%Y-%m-%d %H:%M:%S"),
                record.level(),
                record.target(),
                message
            ));
        })
        .apply()?;
    Ok(())
}

/// Level named by `RUST_LOG`, `Info` when unset or unparsable
fn level_from_env(value: Option<&str>) -> LevelFilter {
    value
        .and_then(|level| level.trim().parse().ok())
        .unwrap_or(LevelFilter::Info)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_from_env() {
        assert_eq!(level_from_env(None), LevelFilter::Info);
        assert_eq!(level_from_env(Some("debug")), LevelFilter::Debug);
        assert_eq!(level_from_env(Some(" WARN ")), LevelFilter::Warn);
        assert_eq!(level_from_env(Some("chatty")), LevelFilter::Info);
    }
}
