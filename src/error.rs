use std::fmt;
use std::io;

/// Return type for index operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug)]
pub enum Error {
    /// Codec, ordering and stream errors from the binary layer.
    Format(indexformat::Error),
    UnknownTable(String),
    UnknownIndex(String),
    UnknownColumn { table: String, column: String },
    /// A row change reached some indexes but not others. Nothing is rolled
    /// back: `applied` names the structures that were changed.
    FanOut {
        applied: Vec<String>,
        failures: Vec<(String, Error)>,
    },
    Message(String),
    IoError(io::Error),
    SledError(sled::Error),
    BincodeError(bincode::Error),
    ConfigError(ron::de::Error),
}

impl Error {
    /// The binary-layer error behind this one, if any.
    pub fn format_error(&self) -> Option<&indexformat::Error> {
        match self {
            Error::Format(err) => Some(err),
            _ => None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Format(err) => fmt::Display::fmt(err, f),
            Error::UnknownTable(id) => write!(f, "Table not found: {}", id),
            Error::UnknownIndex(id) => write!(f, "Index not found: {}", id),
            Error::UnknownColumn { table, column } => {
                write!(f, "Column {} not found in table {}", column, table)
            }
            Error::FanOut { applied, failures } => {
                write!(
                    f,
                    "{} of {} index updates failed:",
                    failures.len(),
                    failures.len() + applied.len()
                )?;
                for (id, err) in failures {
                    write!(f, " [{}: {}]", id, err)?;
                }
                Ok(())
            }
            Error::Message(msg) => write!(f, "{}", msg),
            Error::IoError(err) => fmt::Display::fmt(err, f),
            Error::SledError(err) => fmt::Display::fmt(err, f),
            Error::BincodeError(err) => fmt::Display::fmt(err, f),
            Error::ConfigError(err) => fmt::Display::fmt(err, f),
        }
    }
}

impl std::error::Error for Error {}

impl From<indexformat::Error> for Error {
    fn from(error: indexformat::Error) -> Self {
        Error::Format(error)
    }
}

impl From<io::Error> for Error {
    fn from(error: io::Error) -> Self {
        Error::IoError(error)
    }
}

impl From<sled::Error> for Error {
    fn from(error: sled::Error) -> Self {
        Error::SledError(error)
    }
}

impl From<bincode::Error> for Error {
    fn from(error: bincode::Error) -> Self {
        Error::BincodeError(error)
    }
}

impl From<ron::de::Error> for Error {
    fn from(error: ron::de::Error) -> Self {
        Error::ConfigError(error)
    }
}
