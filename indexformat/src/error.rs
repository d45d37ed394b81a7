use crate::types::DataKind;
use std::fmt;
use std::io;

/// The result type for everything in the indexformat crate.
pub type Result<T> = std::result::Result<T, Error>;

/// The error type for everything in the indexformat crate.
#[derive(Debug)]
pub enum Error {
    /// A type name that is not one of the registered kinds.
    UnknownType(String),

    /// A value whose kind does not match the column (or index) it is used with.
    TypeMismatch { expected: DataKind, actual: DataKind },

    /// A string longer than its column's declared maximum length.
    LengthExceeded { len: usize, max: usize },

    /// Bytes that cannot be turned back into a value of the requested kind,
    /// e.g. a short fixed-width buffer or a string that isn't UTF-8.
    DecodeError(String),

    /// Two values of different kinds were compared.
    InvalidComparison { left: DataKind, right: DataKind },

    /// A zero-length buffer was handed to a deserializer. Whether this means
    /// "no index yet" or "lost index" is up to the caller.
    EmptyStream,

    /// A length prefix claims more bytes than the buffer has left.
    TruncatedStream { needed: usize, remaining: usize },

    /// The stream does not follow the record format.
    CorruptStream(String),

    /// Writing a stream to its sink failed.
    IoError(io::Error),

    UuidError(uuid::Error),
}

impl Error {
    /// Only an empty stream can be recovered from by starting over with an
    /// empty structure.
    pub fn is_recoverable(&self) -> bool {
        match self {
            Error::EmptyStream => true,
            _ => false,
        }
    }
}

impl From<io::Error> for Error {
    fn from(error: io::Error) -> Self {
        Error::IoError(error)
    }
}

impl From<uuid::Error> for Error {
    fn from(error: uuid::Error) -> Self {
        Error::UuidError(error)
    }
}

impl From<std::string::FromUtf8Error> for Error {
    fn from(error: std::string::FromUtf8Error) -> Self {
        Error::DecodeError(format!("invalid utf-8: {}", error))
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::UnknownType(name) => write!(f, "unknown data type: {}", name),
            Error::TypeMismatch { expected, actual } => {
                write!(f, "type mismatch: expected {}, got {}", expected, actual)
            }
            Error::LengthExceeded { len, max } => {
                write!(f, "value length {} exceeds column length {}", len, max)
            }
            Error::DecodeError(msg) => write!(f, "decode error: {}", msg),
            Error::InvalidComparison { left, right } => {
                write!(f, "cannot compare {} with {}", left, right)
            }
            Error::EmptyStream => write!(f, "empty stream"),
            Error::TruncatedStream { needed, remaining } => write!(
                f,
                "truncated stream: record needs {} bytes, {} remaining",
                needed, remaining
            ),
            Error::CorruptStream(msg) => write!(f, "corrupt stream: {}", msg),
            Error::IoError(err) => fmt::Display::fmt(err, f),
            Error::UuidError(err) => fmt::Display::fmt(err, f),
        }
    }
}

impl std::error::Error for Error {}
