//! Token parser for host command lines
//!
//! A line is a keyword followed by space-separated decimal integers. Tokens
//! are split on single spaces, so an empty token (double space, trailing
//! space) is malformed rather than skipped.

use core::fmt;

/// Top-level command keywords
pub mod keyword {
    /// Start the send dialog
    pub const SEND: &str = "SEND";
    /// Report the staged inbound message
    pub const RECEIVE: &str = "RECEIVE";
    /// Report bridge configuration
    pub const CONFIGURATION: &str = "CONFIGURATION";
    /// Restart the device
    pub const RESET: &str = "RESET";
    /// Address line (send dialog input, receive dialog output)
    pub const ADDRESS: &str = "ADDRESS";
    /// Data line (send dialog input, receive dialog output)
    pub const DATA: &str = "DATA";
}

/// Token separator
pub const SEPARATOR: u8 = b' ';

/// Why a line was rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseError {
    /// First token is not the expected keyword
    KeywordMismatch,
    /// Token is not a decimal integer (or overflows `i64`)
    InvalidNumber,
    /// Integer outside 0..=255
    OutOfRange(i64),
    /// More tokens than the field can hold
    TooManyTokens {
        /// Maximum number of tokens allowed
        limit: usize,
    },
    /// Address token count differs from the transport address width
    WrongTokenCount {
        /// Required number of tokens
        expected: usize,
        /// Number of tokens on the line
        found: usize,
    },
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::KeywordMismatch => write!(f, "unexpected keyword"),
            Self::InvalidNumber => write!(f, "invalid number"),
            Self::OutOfRange(n) => write!(f, "value {} out of range 0..=255", n),
            Self::TooManyTokens { limit } => write!(f, "more than {} values", limit),
            Self::WrongTokenCount { expected, found } => {
                write!(f, "expected {} values, found {}", expected, found)
            }
        }
    }
}

/// Split a line into tokens
pub fn tokens(line: &[u8]) -> impl Iterator<Item = &[u8]> {
    line.split(|&b| b == SEPARATOR)
}

/// Check that the first token is exactly `keyword` (case-sensitive)
pub fn has_keyword(line: &[u8], keyword: &str) -> bool {
    tokens(line).next() == Some(keyword.as_bytes())
}

/// Check the keyword and return an iterator over the remaining tokens
pub fn arguments<'a>(
    line: &'a [u8],
    keyword: &str,
) -> Result<impl Iterator<Item = &'a [u8]>, ParseError> {
    let mut iter = tokens(line);
    if iter.next() != Some(keyword.as_bytes()) {
        return Err(ParseError::KeywordMismatch);
    }
    Ok(iter)
}

/// Parse a signed decimal integer consuming the whole token
///
/// An optional leading sign is accepted. Anything else left over, an empty
/// token, or a value that does not fit an `i64` is rejected.
pub fn parse_integer(token: &[u8]) -> Result<i64, ParseError> {
    let text = core::str::from_utf8(token).map_err(|_| ParseError::InvalidNumber)?;
    text.parse::<i64>().map_err(|_| ParseError::InvalidNumber)
}

/// Parse an integer token and check it is in 0..=255
pub fn parse_byte(token: &[u8]) -> Result<u8, ParseError> {
    let value = parse_integer(token)?;
    u8::try_from(value).map_err(|_| ParseError::OutOfRange(value))
}
