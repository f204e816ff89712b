pub mod formats;

use tracing_subscriber::EnvFilter;

use crate::Error;

/// Install the stderr subscriber. `RUST_LOG` overrides the default `info`.
pub fn init() -> Result<(), Error> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .event_format(formats::CliFormat)
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| Error::Logging(e.to_string()))
}
