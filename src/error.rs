use std::fmt::Display;

/// Error type for `qs_value`.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Custom string-based error
    #[error("{0}")]
    Custom(String),

    /// The configured parameter limit is zero
    #[error("Parameter limit must be a positive integer.")]
    InvalidParameterLimit,

    /// More pairs than `parameter_limit` allows, with
    /// `raise_on_limit_exceeded` set
    #[error("Parameter limit exceeded: Only {0} parameter{suffix} allowed.", suffix = plural(.0))]
    ParameterLimitExceeded(usize),

    /// A list grew past `list_limit`, with `raise_on_limit_exceeded` set
    #[error("List limit exceeded: Only {0} element{suffix} allowed in a list.", suffix = plural(.0))]
    ListLimitExceeded(isize),

    /// Well-formed bracket groups past `depth`, with `strict_depth` set
    #[error("Input depth exceeded depth option of {0} and strict_depth is true")]
    DepthExceeded(usize),

    /// `decode_dot_in_keys` without `allow_dots`
    #[error("decode_dot_in_keys requires allow_dots")]
    DecodeDotWithoutAllowDots,

    /// `encode_dot_in_keys` without `allow_dots`
    #[error("encode_dot_in_keys requires allow_dots")]
    EncodeDotWithoutAllowDots,

    /// The encoder re-entered a container it is already serializing
    #[error("Circular reference detected")]
    CircularReference,
}

impl Error {
    /// Generate a custom error message.
    pub fn custom<T>(msg: T) -> Self
    where
        T: Display,
    {
        Error::Custom(msg.to_string())
    }
}

fn plural<T>(count: &T) -> &'static str
where
    T: Copy + TryInto<i64>,
{
    let count: Result<i64, _> = (*count).try_into();
    match count {
        Ok(1) => "",
        _ => "s",
    }
}

pub type Result<T, E = Error> = core::result::Result<T, E>;
