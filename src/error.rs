use std::borrow::Cow;
use std::error;
use std::fmt;
use std::io;
use std::num;
use std::string;

/// Server-side errors
#[derive(Debug, PartialEq)]
pub enum ServerError {
    /// The server replied to a command with an error line.
    Error(String),
    /// The client did not expect this reply from the server. When the frame
    /// itself was malformed the stream may be out of sync, and the pool
    /// discards the connection.
    BadResponse(Cow<'static, str>),
}

impl fmt::Display for ServerError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ServerError::Error(ref s) => write!(f, "server error: {}", s),
            ServerError::BadResponse(ref s) => write!(f, "unexpected reply from the server: {}", s),
        }
    }
}

impl error::Error for ServerError {}

impl From<ServerError> for RedmapError {
    fn from(err: ServerError) -> Self {
        RedmapError::Server(err)
    }
}

/// Command specific errors.
#[derive(Debug, PartialEq)]
pub enum CommandError {
    /// The record, or the field within the record, does not exist in the server.
    KeyNotFound,
    /// Invalid arguments were passed to the command.
    InvalidArguments,
}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            CommandError::KeyNotFound => write!(f, "key not found in the server"),
            CommandError::InvalidArguments => write!(f, "invalid arguments provided"),
        }
    }
}

impl error::Error for CommandError {}

impl From<CommandError> for RedmapError {
    fn from(err: CommandError) -> Self {
        RedmapError::Command(err)
    }
}

/// Field decoding errors.
#[derive(Debug, PartialEq)]
pub enum DecodeError {
    /// The raw field value is not valid UTF-8.
    String(string::FromUtf8Error),
    /// The raw field value does not parse as an integer.
    Int(num::ParseIntError),
    /// The raw field value does not parse as a float.
    Float(num::ParseFloatError),
    /// The raw field value is not a recognized boolean form.
    Bool(String),
    /// The record exists but is missing a field the mapping declares.
    MissingField(String),
    /// The raw field value is not the JSON document the caller asked for.
    #[cfg(feature = "json")]
    Json(String),
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            DecodeError::String(ref err) => err.fmt(f),
            DecodeError::Int(ref err) => err.fmt(f),
            DecodeError::Float(ref err) => err.fmt(f),
            DecodeError::Bool(ref s) => write!(f, "invalid boolean value: {:?}", s),
            DecodeError::MissingField(ref name) => write!(f, "record is missing the field {:?}", name),
            #[cfg(feature = "json")]
            DecodeError::Json(ref s) => write!(f, "invalid json value: {}", s),
        }
    }
}

impl error::Error for DecodeError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            DecodeError::String(ref err) => Some(err),
            DecodeError::Int(ref err) => Some(err),
            DecodeError::Float(ref err) => Some(err),
            _ => None,
        }
    }
}

impl From<DecodeError> for RedmapError {
    fn from(err: DecodeError) -> Self {
        RedmapError::Decode(err)
    }
}

/// Errors in the construction of a record mapping.
#[derive(Debug, PartialEq)]
pub enum MappingError {
    /// Two mapping entries declared the same wire field name.
    DuplicateField(String),
    /// The mapping declares no fields at all.
    EmptyMapping,
}

impl fmt::Display for MappingError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            MappingError::DuplicateField(ref name) => {
                write!(f, "mapping declares the field {:?} more than once", name)
            }
            MappingError::EmptyMapping => write!(f, "mapping declares no fields"),
        }
    }
}

impl error::Error for MappingError {}

impl From<MappingError> for RedmapError {
    fn from(err: MappingError) -> Self {
        RedmapError::Mapping(err)
    }
}

/// An enum of all error kinds.
#[derive(Debug)]
pub enum RedmapError {
    /// The URL given to the client could not be parsed, or carried options
    /// the client does not support.
    BadUrl(String),
    /// A new connection to the server could not be established.
    Dial(io::Error),
    /// `std::io` related errors on an established connection.
    Io(io::Error),
    /// Server-side errors
    Server(ServerError),
    /// Command specific errors
    Command(CommandError),
    /// Field decoding errors
    Decode(DecodeError),
    /// Record mapping configuration errors
    Mapping(MappingError),
    /// Every pooled connection was busy and none freed up within the
    /// acquire timeout.
    PoolExhausted(r2d2::Error),
}

impl fmt::Display for RedmapError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            RedmapError::BadUrl(ref s) => s.fmt(f),
            RedmapError::Dial(ref err) => write!(f, "failed to connect to the server: {}", err),
            RedmapError::Io(ref err) => err.fmt(f),
            RedmapError::Server(ref err) => err.fmt(f),
            RedmapError::Command(ref err) => err.fmt(f),
            RedmapError::Decode(ref err) => err.fmt(f),
            RedmapError::Mapping(ref err) => err.fmt(f),
            RedmapError::PoolExhausted(ref err) => err.fmt(f),
        }
    }
}

impl error::Error for RedmapError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            RedmapError::BadUrl(_) => None,
            RedmapError::Dial(ref err) => Some(err),
            RedmapError::Io(ref err) => Some(err),
            RedmapError::Server(ref err) => Some(err),
            RedmapError::Command(ref err) => Some(err),
            RedmapError::Decode(ref err) => Some(err),
            RedmapError::Mapping(ref err) => Some(err),
            RedmapError::PoolExhausted(ref err) => Some(err),
        }
    }
}

impl From<io::Error> for RedmapError {
    fn from(err: io::Error) -> RedmapError {
        RedmapError::Io(err)
    }
}

impl From<url::ParseError> for RedmapError {
    fn from(err: url::ParseError) -> RedmapError {
        RedmapError::BadUrl(err.to_string())
    }
}

impl From<string::FromUtf8Error> for RedmapError {
    fn from(err: string::FromUtf8Error) -> RedmapError {
        DecodeError::String(err).into()
    }
}

impl From<num::ParseIntError> for RedmapError {
    fn from(err: num::ParseIntError) -> RedmapError {
        DecodeError::Int(err).into()
    }
}

impl From<num::ParseFloatError> for RedmapError {
    fn from(err: num::ParseFloatError) -> RedmapError {
        DecodeError::Float(err).into()
    }
}

#[cfg(feature = "json")]
impl From<serde_json::Error> for RedmapError {
    fn from(err: serde_json::Error) -> RedmapError {
        DecodeError::Json(err.to_string()).into()
    }
}

impl RedmapError {
    /// True for errors that leave the connection in an unknown state: raw
    /// I/O failures and replies the frame reader could not make sense of.
    pub(crate) fn is_transport(&self) -> bool {
        matches!(
            self,
            RedmapError::Io(_) | RedmapError::Server(ServerError::BadResponse(_))
        )
    }

    /// Best-effort copy handed to r2d2 when the original error is kept for
    /// the caller. The pool drops it unseen, so only the message survives.
    pub(crate) fn mirror(&self) -> RedmapError {
        match self {
            RedmapError::Dial(ref err) => RedmapError::Dial(io::Error::new(err.kind(), err.to_string())),
            other => RedmapError::Dial(io::Error::new(io::ErrorKind::Other, other.to_string())),
        }
    }
}
