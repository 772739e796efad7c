//! Types for errors that can occur while decoding, synchronizing, and
//! re-encoding market data files.

use std::path::PathBuf;

/// An error that can occur with this crate.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// An I/O error while reading or writing a file.
    #[error("I/O error: '{source}' while {context}")]
    Io {
        /// The original error.
        #[source]
        source: std::io::Error,
        /// The context in which the error occurred.
        context: String,
    },
    /// A depth header whose leading word is not the `SCDD` magic number.
    #[error("invalid depth header magic number {found:#010x}")]
    BadMagic {
        /// The word found where the magic number belongs.
        found: u32,
    },
    /// A depth header advertising a header size other than 64 bytes.
    #[error("invalid depth header size {found}, expected {}", crate::DEPTH_HEADER_LEN)]
    BadHeaderSize {
        /// The header size the file claims.
        found: u32,
    },
    /// A depth header advertising a record size other than 24 bytes.
    #[error("invalid depth record size {found}, expected {}", crate::DEPTH_RECORD_LEN)]
    BadRecordSize {
        /// The record size the file claims.
        found: u32,
    },
    /// An input that ended partway through a record or batch.
    #[error(
        "truncated stream: {trailing} trailing bytes after {complete} complete records while {context}"
    )]
    TruncatedStream {
        /// Records fully decoded before the truncation point.
        complete: u64,
        /// Bytes of the partial record at the end of the input.
        trailing: u64,
        /// The operation that hit the truncation.
        context: String,
    },
    /// A depth batch violating the batch structure rules.
    #[error("malformed depth batch at {sc_us}: {desc}")]
    MalformedBatch {
        /// The platform-microsecond timestamp of the offending batch.
        sc_us: u64,
        /// What rule the batch broke.
        desc: String,
    },
    /// A depth record timestamped outside the session day being synchronized.
    #[error("depth record at {sc_us} falls outside the session day {day}")]
    OutsideSession {
        /// The platform-microsecond timestamp of the offending record.
        sc_us: u64,
        /// The UTC session day of the run.
        day: time::Date,
    },
    /// An error while decoding.
    #[error("decode error: {0}")]
    Decode(String),
    /// An error while encoding.
    #[error("encode error: {0}")]
    Encode(String),
    /// An invalid argument was passed to a function.
    #[error("bad argument `{param_name}`: {desc}")]
    BadArgument {
        /// The name of the parameter.
        param_name: String,
        /// The reason it's invalid.
        desc: String,
    },
    /// A completed output that could not be moved to its final name.
    #[error("failed to rename output '{}' to '{}': {source}", .src.display(), .dst.display())]
    OutputRename {
        /// The temporary path the output was written under.
        src: PathBuf,
        /// The final path the output was meant to take.
        dst: PathBuf,
        /// The original error.
        #[source]
        source: std::io::Error,
    },
}

/// An alias for a `Result` with the error type [`enum@Error`].
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Creates a new I/O [`enum@Error`] with the given `context`.
    pub fn io(source: std::io::Error, context: impl ToString) -> Self {
        Self::Io {
            source,
            context: context.to_string(),
        }
    }

    /// Creates a new decode [`enum@Error`].
    pub fn decode(msg: impl ToString) -> Self {
        Self::Decode(msg.to_string())
    }

    /// Creates a new encode [`enum@Error`].
    pub fn encode(msg: impl ToString) -> Self {
        Self::Encode(msg.to_string())
    }

    /// Creates a new bad-argument [`enum@Error`].
    pub fn bad_argument(param_name: impl ToString, desc: impl ToString) -> Self {
        Self::BadArgument {
            param_name: param_name.to_string(),
            desc: desc.to_string(),
        }
    }

    /// Returns `true` for the truncation variant, which downgrades a run to
    /// [`PartiallyComplete`](crate::run::RunStatus::PartiallyComplete) instead
    /// of failing it outright.
    pub fn is_truncation(&self) -> bool {
        matches!(self, Self::TruncatedStream { .. })
    }
}
