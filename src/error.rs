//! Custom errors.

/// Errors thrown by the range encoder / decoder.
///
/// All variants are contract violations. A stream that returned one of them
/// must not be used any further.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CoderError {
    /// Bad arguments.
    BadArguments(&'static str),
    /// An encoding operation was called on a decoder or vice versa.
    WrongMode,
    /// The stream was already finished.
    Finished,
    /// The bit queue has no room left. The caller didn't drain the encoder
    /// or fed the decoder faster than it consumed its input.
    QueueOverflow,
    /// The decoded interval doesn't match the coder state.
    InvalidStream,
    /// An internal error.
    InternalError(&'static str),
}

impl std::fmt::Display for CoderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CoderError::BadArguments(message) => {
                write!(f, "{}", message)
            }
            CoderError::InternalError(message) => {
                write!(f, "{}", message)
            }
            CoderError::WrongMode => {
                write!(f, "operation is not supported by the coder's mode")
            }
            CoderError::Finished => {
                write!(f, "the stream is already finished")
            }
            CoderError::QueueOverflow => {
                write!(f, "bit queue overflow")
            }
            CoderError::InvalidStream => {
                write!(f, "the interval doesn't fit the decoder state")
            }
        }
    }
}

impl std::error::Error for CoderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        None
    }
}
