use std::error;
use std::fmt;
use std::io;




#[derive(Debug)]

/**
 * Error to represent a failure anywhere in the visualization loop: a
 * subscriber failing during a cascade, a binding fed data it cannot draw, a
 * frame index out of range, or an I/O failure while loading snapshots or
 * capturing frames.
 */
pub enum Error {
    Subscription(Vec<Error>),
    ShapeMismatch {
        binding: String,
        cell: String,
        expected: (usize, usize),
        found: (usize, usize),
    },
    IndexOutOfRange {
        index: usize,
        count: usize,
    },
    Capture {
        index: usize,
        reason: String,
    },
    Recompute {
        cell: String,
        reason: String,
    },
    Frame {
        index: usize,
        source: Box<Error>,
    },
    Cancelled {
        index: usize,
    },
    InvalidState(&'static str),
    UnknownHandle(usize),
    EmptySeries,
    Io(io::Error),
    Decode(String),
    Encode(String),
}

pub type Result<T> = std::result::Result<T, Error>;




// ============================================================================
impl Error {

    /**
     * Whether the error leaves the cell graph usable. Recoverable errors are
     * reported for the frame on which they occurred and the animation keeps
     * going; anything else ends the current run.
     */
    pub fn is_recoverable(&self) -> bool {
        use Error::*;

        match self {
            ShapeMismatch { .. } | IndexOutOfRange { .. } => true,
            Subscription(errors) => errors.iter().all(Error::is_recoverable),
            _ => false,
        }
    }

    /**
     * Join the failures of a cascade. An empty list means the cascade
     * succeeded, and a single failure is returned as-is rather than wrapped.
     */
    pub fn join(mut errors: Vec<Error>) -> Result<()> {
        match errors.len() {
            0 => Ok(()),
            1 => Err(errors.remove(0)),
            _ => Err(Error::Subscription(errors)),
        }
    }

    /**
     * Return the leaf errors, flattening nested subscription failures.
     */
    pub fn leaves(&self) -> Vec<&Error> {
        match self {
            Error::Subscription(errors) => errors.iter().flat_map(Error::leaves).collect(),
            Error::Frame { source, .. } => source.leaves(),
            other => vec![other],
        }
    }
}




// ============================================================================
impl fmt::Display for Error {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        use Error::*;

        match self {
            Subscription(errors) => {
                write!(fmt, "{} subscriber(s) failed:", errors.len())?;
                for e in errors {
                    write!(fmt, " [{}]", e)?;
                }
                Ok(())
            }
            ShapeMismatch { binding, cell, expected, found } => write!(
                fmt,
                "binding '{}' cannot draw cell '{}': expected shape {:?}, found {:?}",
                binding, cell, expected, found
            ),
            IndexOutOfRange { index, count } => {
                write!(fmt, "frame index {} out of range 1..={}", index, count)
            }
            Capture { index, reason } => write!(fmt, "capture of frame {} failed: {}", index, reason),
            Recompute { cell, reason } => write!(fmt, "recompute of cell '{}' failed: {}", cell, reason),
            Frame { index, source } => write!(fmt, "animation aborted at frame {}: {}", index, source),
            Cancelled { index } => write!(fmt, "animation cancelled after frame {}", index),
            InvalidState(what) => write!(fmt, "invalid state: {}", what),
            UnknownHandle(h) => write!(fmt, "no primitive with handle {}", h),
            EmptySeries => write!(fmt, "time series has no samples"),
            Io(e) => write!(fmt, "i/o error: {}", e),
            Decode(e) => write!(fmt, "decode error: {}", e),
            Encode(e) => write!(fmt, "encode error: {}", e),
        }
    }
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            Error::Frame { source, .. } => Some(source.as_ref()),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Error::Io(e)
    }
}
