use failure::{Backtrace, Context, Fail};
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::result;

pub type Result<T> = result::Result<T, Error>;

/// The error type used throughout the crate.
#[derive(Debug)]
pub struct Error {
    ctx: Context<ErrorKind>,
}

impl Error {
    /// Return the kind of this error.
    pub fn kind(&self) -> &ErrorKind {
        self.ctx.get_context()
    }

    pub fn bug<T: AsRef<str>>(msg: T) -> Error {
        Error::from(ErrorKind::Bug(msg.as_ref().to_string()))
    }

    pub fn config<T: AsRef<str>>(msg: T) -> Error {
        Error::from(ErrorKind::Config(msg.as_ref().to_string()))
    }

    pub fn decode<T: AsRef<str>>(msg: T) -> Error {
        Error::from(ErrorKind::Decode(msg.as_ref().to_string()))
    }

    pub fn encode<T: AsRef<str>>(msg: T) -> Error {
        Error::from(ErrorKind::Encode(msg.as_ref().to_string()))
    }

    pub fn unknown_code<T: AsRef<str>>(msg: T) -> Error {
        Error::from(ErrorKind::UnknownCode(msg.as_ref().to_string()))
    }

    pub fn unknown_blend_mode<T: AsRef<str>>(name: T) -> Error {
        Error::from(ErrorKind::UnknownBlendMode(name.as_ref().to_string()))
    }

    pub fn schema<T: AsRef<str>>(msg: T) -> Error {
        Error::from(ErrorKind::Schema(msg.as_ref().to_string()))
    }
}

impl Fail for Error {
    fn cause(&self) -> Option<&dyn Fail> {
        self.ctx.cause()
    }

    fn backtrace(&self) -> Option<&Backtrace> {
        self.ctx.backtrace()
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        self.ctx.fmt(f)
    }
}

/// The specific kind of error that can occur.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ErrorKind {
    /// An unexpected internal state.
    Bug(String),
    /// Invalid user supplied options.
    Config(String),
    /// A binary record was truncated or malformed.
    Decode(String),
    /// A value does not fit the width of its binary length prefix.
    Encode(String),
    /// A code, bit or name outside one of the closed enumerations.
    UnknownCode(String),
    /// A descriptor named a blend mode that does not exist.
    UnknownBlendMode(String),
    /// A descriptor value has the wrong type.
    Schema(String),
    /// An error tied to a specific file path.
    Path(PathBuf),
    /// A generic I/O error.
    Io,
    /// A JSON (de)serialization error.
    Json,
}

impl ErrorKind {
    pub fn path<P: AsRef<Path>>(path: P) -> ErrorKind {
        ErrorKind::Path(path.as_ref().to_path_buf())
    }
}

impl Fail for ErrorKind {}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            ErrorKind::Bug(ref msg) => write!(
                f,
                "BUG: {}, please report this issue with the offending pass record",
                msg
            ),
            ErrorKind::Config(ref msg) => write!(f, "config error: {}", msg),
            ErrorKind::Decode(ref msg) => write!(f, "decode error: {}", msg),
            ErrorKind::Encode(ref msg) => write!(f, "encode error: {}", msg),
            ErrorKind::UnknownCode(ref msg) => write!(f, "unknown code: {}", msg),
            ErrorKind::UnknownBlendMode(ref name) => {
                write!(f, "unknown blend mode name: {:?}", name)
            }
            ErrorKind::Schema(ref msg) => write!(f, "descriptor error: {}", msg),
            ErrorKind::Path(ref path) => write!(f, "{}", path.display()),
            ErrorKind::Io => write!(f, "I/O error"),
            ErrorKind::Json => write!(f, "JSON error"),
        }
    }
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Error {
        Error::from(Context::new(kind))
    }
}

impl From<Context<ErrorKind>> for Error {
    fn from(ctx: Context<ErrorKind>) -> Error {
        Error { ctx }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Error {
        Error::from(err.context(ErrorKind::Io))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Error {
        Error::from(err.context(ErrorKind::Json))
    }
}

/// Render an error and its chain of causes, one per line.
pub fn pretty_error(err: &failure::Error) -> String {
    let mut pretty = err.to_string();
    let mut prev = err.as_fail();
    while let Some(next) = prev.cause() {
        pretty.push_str(": ");
        pretty.push_str(&next.to_string());
        prev = next;
    }
    pretty
}
