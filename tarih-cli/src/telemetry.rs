//! Tracing subscriber installation.

use tracing_subscriber::EnvFilter;

use crate::cli::LogFormat;

const DEFAULT_FILTER: &str = "tarih_rag=info,tarih_cli=info";

/// Install the global subscriber. `RUST_LOG` takes precedence over the
/// default filter. Logs go to stderr so answers on stdout stay clean.
///
/// Returns `false` when a global subscriber was already installed; the
/// existing one is kept.
pub fn init(format: LogFormat) -> bool {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    let installed = match format {
        LogFormat::Text => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    if let Err(e) = installed {
        eprintln!("tracing subscriber not installed: {e}");
        return false;
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_init_keeps_the_first_subscriber() {
        init(LogFormat::Text);
        assert!(!init(LogFormat::Json));
    }
}
