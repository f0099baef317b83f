use thiserror::Error;

/// Errors specific to chunk operations
#[derive(Error, Debug)]
pub enum ChunkError {
    /// The source ended before its declared length
    #[error("source ended early at offset {offset}: declared length {declared}")]
    SourceRead { offset: u64, declared: u64 },

    /// Reading from the source failed
    #[error("source read failed at offset {offset}: {source}")]
    Io {
        offset: u64,
        #[source]
        source: std::io::Error,
    },

    /// The size policy is unusable
    #[error("invalid chunk policy: {0}")]
    InvalidPolicy(String),
}

impl ChunkError {
    pub const fn source_read(offset: u64, declared: u64) -> Self {
        Self::SourceRead { offset, declared }
    }

    pub fn invalid_policy<S: Into<String>>(msg: S) -> Self {
        Self::InvalidPolicy(msg.into())
    }

    pub(crate) fn from_io(offset: u64, declared: u64, source: std::io::Error) -> Self {
        if source.kind() == std::io::ErrorKind::UnexpectedEof {
            Self::source_read(offset, declared)
        } else {
            Self::Io { offset, source }
        }
    }
}
