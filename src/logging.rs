use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;
use crate::error::Error;
use crate::types::Result;

const LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Install the global tracing subscriber. Output goes to stderr so reports
/// printed on stdout stay machine-readable. `RUST_LOG` takes precedence.
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    let level = config.level.to_lowercase();
    if !LEVELS.contains(&level.as_str()) {
        return Err(Error::InvalidInput(format!(
            "Invalid log level '{}'; expected one of {}",
            config.level,
            LEVELS.join(", ")
        )));
    }

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("clinic_lake={}", level)));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    let result = if config.json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };

    result.map_err(|e| Error::InvalidInput(format!("Logging already initialized: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_unknown_level() {
        let config = LoggingConfig {
            level: "loud".to_string(),
            json: false,
        };
        assert!(init_logging(&config).is_err());
    }
}
