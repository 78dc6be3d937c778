use std::io;
use std::path::PathBuf;

use thiserror::Error;
use url::Url;

/// Failures while wiring the client to files, the network stack or telemetry.
#[derive(Debug, Error)]
pub enum InfraError {
    #[error("failed to read `{}`", path.display())]
    ReadFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to build http client")]
    ClientBuild(#[source] reqwest::Error),
    #[error("`{base}` cannot be used as a base URL")]
    BaseUrl { base: Url },
    #[error("failed to install tracing subscriber: {0}")]
    Telemetry(String),
}

impl InfraError {
    pub fn read_file(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::ReadFile {
            path: path.into(),
            source,
        }
    }
}
