use thiserror::Error;

/// Failures that end the program with a user-facing message
#[derive(Error, Debug)]
pub enum DcrpsError {
    /// Missing or unrecognized command/argument. The help text follows the message.
    #[error("{0}")]
    Usage(String),

    #[error("Couldn't resolve addr or pid {target} to TCPAddress: {source}")]
    Resolution {
        target: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("{0:#}")]
    Dispatch(#[source] anyhow::Error),
}

impl DcrpsError {
    pub fn usage(message: impl Into<String>) -> Self {
        DcrpsError::Usage(message.into())
    }

    pub fn exit_code(&self) -> i32 {
        1
    }
}
