use thiserror::Error;

/// Errors raised by the serial link, the background monitor and settings storage.
///
/// Unparseable lines are not errors: decoders report them as `None`.
#[derive(Error, Debug)]
pub enum Error {
    /// Opening the serial port failed
    #[error("failed to open {port}: {source}")]
    Open {
        port: String,
        #[source]
        source: serialport::Error,
    },

    /// Serial driver error while the link is up
    #[error("serial error: {0}")]
    Serial(#[from] serialport::Error),

    /// I/O failure while reading from the link or touching the settings file
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Settings file could not be encoded or decoded
    #[error("settings error: {0}")]
    Settings(#[from] serde_json::Error),

    /// `Monitor::start` called while the reader is still running
    #[error("monitor is already running")]
    AlreadyRunning,

    /// The reader thread panicked before it could be joined
    #[error("reader thread panicked")]
    ReaderPanicked,
}

/// Result type alias for telemetry operations
pub type Result<T> = std::result::Result<T, Error>;
