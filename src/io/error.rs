use super::Format;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("I/O operation failed: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    #[error("failed to parse {format} data: {details} (at line ~{line})")]
    Parse {
        format: Format,
        line: usize,
        details: String,
    },

    #[error("failed to parse topology file: {0}")]
    TopologyParse(#[from] toml::de::Error),

    #[error("failed to serialize topology file: {0}")]
    TopologySerialize(#[from] toml::ser::Error),

    #[error("topology file does not match the structure: {0}")]
    TopologyMismatch(String),

    #[error("the '{0}' format is not supported for this operation")]
    UnsupportedFormat(Format),
}

impl Error {
    pub(crate) fn parse(format: Format, line: usize, details: impl Into<String>) -> Self {
        Self::Parse {
            format,
            line,
            details: details.into(),
        }
    }
}
