//! Address and data codec
//!
//! Converts `ADDRESS`/`DATA` lines into binary values and formats binary
//! values back into decimal report lines such as `OWN_ADDRESS 10 0 0 7`.

use core::fmt::{self, Write};

use heapless::String;

use crate::message::{Address, Payload, MAX_ADDRESS_LEN, PAYLOAD_CAPACITY};
use crate::parser::{self, keyword, ParseError};

/// Capacity of a formatted output line (the longest is a full `DATA` report)
pub const OUTPUT_LINE_CAPACITY: usize = 320;

/// Formatted output line
pub type OutputLine = String<OUTPUT_LINE_CAPACITY>;

/// Marker printed in place of an address the transport cannot provide
pub const UNAVAILABLE: &str = "N/A";

/// Parse `ADDRESS b0 … b(width-1)`
///
/// The token count must equal `width` exactly.
pub fn parse_address(line: &[u8], width: usize) -> Result<Address, ParseError> {
    let width = width.min(MAX_ADDRESS_LEN);
    let mut bytes = [0u8; MAX_ADDRESS_LEN];
    let mut found = 0;

    for token in parser::arguments(line, keyword::ADDRESS)? {
        let value = parser::parse_byte(token)?;
        if found == width {
            return Err(ParseError::WrongTokenCount {
                expected: width,
                found: found + 1,
            });
        }
        bytes[found] = value;
        found += 1;
    }

    if found != width {
        return Err(ParseError::WrongTokenCount {
            expected: width,
            found,
        });
    }
    Ok(Address::from_slice(&bytes[..width]).unwrap_or_else(|| Address::zeroed(width)))
}

/// Parse `DATA b0 … bk` with at most `limit` values
///
/// `limit` is clamped to [`PAYLOAD_CAPACITY`]. A bare `DATA` line yields an
/// empty payload.
pub fn parse_data(line: &[u8], limit: usize) -> Result<Payload, ParseError> {
    let limit = limit.min(PAYLOAD_CAPACITY);
    let mut payload = Payload::new();

    for token in parser::arguments(line, keyword::DATA)? {
        let value = parser::parse_byte(token)?;
        if payload.len() == limit {
            return Err(ParseError::TooManyTokens { limit });
        }
        payload
            .push(value)
            .map_err(|_| ParseError::TooManyTokens { limit })?;
    }
    Ok(payload)
}

/// Write `header` followed by each byte in decimal, space-separated
pub fn write_bytes<W: Write>(out: &mut W, header: &str, bytes: &[u8]) -> fmt::Result {
    out.write_str(header)?;
    for byte in bytes {
        write!(out, " {}", byte)?;
    }
    Ok(())
}

/// Write an address report, or `header N/A` when there is none
pub fn write_address<W: Write>(
    out: &mut W,
    header: &str,
    address: Option<&Address>,
) -> fmt::Result {
    match address {
        Some(address) => write_bytes(out, header, address.as_bytes()),
        None => write!(out, "{} {}", header, UNAVAILABLE),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_address_roundtrip() {
        let addr = parse_address(b"ADDRESS 1 2 3 4", 4).unwrap();
        assert_eq!(addr.as_bytes(), &[1, 2, 3, 4]);

        let mut line = OutputLine::new();
        write_bytes(&mut line, keyword::ADDRESS, addr.as_bytes()).unwrap();
        assert_eq!(line.as_str(), "ADDRESS 1 2 3 4");
        assert_eq!(parse_address(line.as_bytes(), 4).unwrap(), addr);
    }

    #[test]
    fn test_parse_address_wrong_count() {
        assert_eq!(
            parse_address(b"ADDRESS 1 2 3", 4),
            Err(ParseError::WrongTokenCount {
                expected: 4,
                found: 3
            })
        );
        assert_eq!(
            parse_address(b"ADDRESS 1 2 3 4 5", 4),
            Err(ParseError::WrongTokenCount {
                expected: 4,
                found: 5
            })
        );
        assert_eq!(
            parse_address(b"ADDRESS", 4),
            Err(ParseError::WrongTokenCount {
                expected: 4,
                found: 0
            })
        );
    }

    #[test]
    fn test_parse_address_rejects_bad_tokens() {
        assert_eq!(
            parse_address(b"ADDRESS 1 2 300 4", 4),
            Err(ParseError::OutOfRange(300))
        );
        assert_eq!(
            parse_address(b"ADDRESS 1 x 3 4", 4),
            Err(ParseError::InvalidNumber)
        );
        assert_eq!(
            parse_address(b"DATA 1 2 3 4", 4),
            Err(ParseError::KeywordMismatch)
        );
    }

    #[test]
    fn test_parse_data_limits() {
        assert!(parse_data(b"DATA", 64).unwrap().is_empty());
        assert_eq!(parse_data(b"DATA 10 20", 64).unwrap().as_slice(), &[10, 20]);

        let mut line: String<400> = String::new();
        line.push_str("DATA").unwrap();
        for _ in 0..PAYLOAD_CAPACITY {
            line.push_str(" 9").unwrap();
        }
        assert_eq!(
            parse_data(line.as_bytes(), PAYLOAD_CAPACITY).unwrap().len(),
            PAYLOAD_CAPACITY
        );

        line.push_str(" 9").unwrap();
        assert_eq!(
            parse_data(line.as_bytes(), PAYLOAD_CAPACITY),
            Err(ParseError::TooManyTokens {
                limit: PAYLOAD_CAPACITY
            })
        );
    }

    #[test]
    fn test_parse_data_respects_transport_limit() {
        assert!(parse_data(b"DATA 1 2 3", 3).is_ok());
        assert_eq!(
            parse_data(b"DATA 1 2 3 4", 3),
            Err(ParseError::TooManyTokens { limit: 3 })
        );
    }

    #[test]
    fn test_write_address_unavailable() {
        let mut line = OutputLine::new();
        write_address(&mut line, "OWN_ADDRESS", None).unwrap();
        assert_eq!(line.as_str(), "OWN_ADDRESS N/A");

        let mut line = OutputLine::new();
        let addr = Address::from_slice(&[255, 0]).unwrap();
        write_address(&mut line, "BROADCAST_ADDRESS", Some(&addr)).unwrap();
        assert_eq!(line.as_str(), "BROADCAST_ADDRESS 255 0");
    }
}
