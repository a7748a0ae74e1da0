//! Access-log line parser
//!
//! Parses one fixed log grammar: a bracketed local timestamp, a status
//! separator, the 3-digit status code, an HTTP method, scheme, host and
//! request target, and a trailing `[Client <address>]` marker. Anything
//! else is rejected; log noise is expected and not an error.

use chrono::{DateTime, Utc};
use regex::Regex;
use sald_common::SaldError;
use tracing::warn;

/// Timestamp format used inside the leading bracket, e.g.
/// `10/Oct/2023:13:55:36 +0000`.
const TIMESTAMP_FORMAT: &str = "%d/%b/%Y:%H:%M:%S %z";

/// One normalized access-log record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedLogRecord {
    /// Client address extracted from the `[Client ...]` marker
    pub remote_ip: String,
    /// Request instant, normalized to UTC
    pub timestamp: DateTime<Utc>,
    /// HTTP status code
    pub status_code: Option<i32>,
    /// Virtual host the request was served for
    pub domain: String,
    /// Request target with surrounding quotes stripped
    pub request_path: String,
    /// The original line, unchanged; part of the dedup key
    pub raw_line: String,
}

impl ParsedLogRecord {
    /// The `(timestamp, ip, raw line)` triple used for at-most-once storage
    pub fn dedup_key(&self) -> (DateTime<Utc>, String, String) {
        (
            self.timestamp,
            self.remote_ip.clone(),
            self.raw_line.clone(),
        )
    }
}

/// Result of parsing a single line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseOutcome {
    /// The line matched the grammar and produced a complete record
    Accepted(ParsedLogRecord),
    /// The line did not match the grammar, or a matched field was garbled
    RejectedMalformed,
    /// The grammar matched but a required field was empty after extraction
    RejectedIncomplete,
}

impl ParseOutcome {
    /// The record, if the line was accepted
    pub fn into_record(self) -> Option<ParsedLogRecord> {
        match self {
            ParseOutcome::Accepted(record) => Some(record),
            _ => None,
        }
    }
}

/// Parser for the fixed access-log grammar
pub struct LineParser {
    pattern: Regex,
}

impl LineParser {
    /// Compile the line grammar
    pub fn new() -> Result<Self, SaldError> {
        let pattern = Regex::new(
            r#"(?x)
            ^\[(?P<time_local>\d{2}/\w{3}/\d{4}:\d{2}:\d{2}:\d{2}\s[+-]\d{4})\]\s+
            -\s+
            (?:-\s+)?
            (?P<status>\d{3})
            .*?\s+
            (?P<method>GET|POST|PUT|DELETE|HEAD|OPTIONS|PATCH)\s+
            (?P<scheme>https?)\s+
            (?P<host>\S+)\s+
            (?P<request_uri>"[^"]*"|[^"\s]+)\s+
            .*?
            \[Client\s(?P<remote_addr>[^\]]+)\]
            .*$
            "#,
        )
        .map_err(|e| SaldError::Parse(format!("invalid line grammar: {}", e)))?;

        Ok(Self { pattern })
    }

    /// Parse one raw line into a normalized record
    ///
    /// Pure function of its input; never fails the caller.
    pub fn parse(&self, line: &str) -> ParseOutcome {
        let Some(captures) = self.pattern.captures(line) else {
            return ParseOutcome::RejectedMalformed;
        };

        let time_local = match captures.name("time_local") {
            Some(m) => m.as_str(),
            None => return ParseOutcome::RejectedMalformed,
        };

        let timestamp = match DateTime::parse_from_str(time_local, TIMESTAMP_FORMAT) {
            Ok(ts) => ts.with_timezone(&Utc),
            Err(e) => {
                warn!(timestamp = %time_local, error = %e, "Rejecting line with malformed timestamp");
                return ParseOutcome::RejectedMalformed;
            },
        };

        let status_code = captures
            .name("status")
            .and_then(|m| m.as_str().parse::<i32>().ok());

        let remote_ip = captures
            .name("remote_addr")
            .map(|m| m.as_str().trim().to_string())
            .unwrap_or_default();
        let domain = captures
            .name("host")
            .map(|m| m.as_str().to_string())
            .unwrap_or_default();
        let request_path = captures
            .name("request_uri")
            .map(|m| m.as_str().trim_matches('"').to_string())
            .unwrap_or_default();

        if remote_ip.is_empty() || domain.is_empty() || request_path.is_empty() {
            return ParseOutcome::RejectedIncomplete;
        }

        ParseOutcome::Accepted(ParsedLogRecord {
            remote_ip,
            timestamp,
            status_code,
            domain,
            request_path,
            raw_line: line.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn parser() -> LineParser {
        LineParser::new().unwrap()
    }

    const SAMPLE: &str = r#"[10/Oct/2023:13:55:36 +0000] - 200 "-" GET https example.com "/index.html" extra fields [Client 203.0.113.5] more"#;

    #[test]
    fn test_parses_well_formed_line() {
        let outcome = parser().parse(SAMPLE);
        let record = outcome.into_record().expect("line should be accepted");

        assert_eq!(record.remote_ip, "203.0.113.5");
        assert_eq!(record.domain, "example.com");
        assert_eq!(record.request_path, "/index.html");
        assert_eq!(record.status_code, Some(200));
        assert_eq!(
            record.timestamp,
            Utc.with_ymd_and_hms(2023, 10, 10, 13, 55, 36).unwrap()
        );
        assert_eq!(record.raw_line, SAMPLE);
    }

    #[test]
    fn test_normalizes_timezone_offset_to_utc() {
        let line = r#"[10/Oct/2023:15:55:36 +0200] - 200 "-" GET https example.com "/index.html" x [Client 203.0.113.5]"#;
        let record = parser().parse(line).into_record().unwrap();
        assert_eq!(
            record.timestamp,
            Utc.with_ymd_and_hms(2023, 10, 10, 13, 55, 36).unwrap()
        );
    }

    #[test]
    fn test_strips_quotes_from_request_target() {
        let line = r#"[10/Oct/2023:13:55:36 +0000] - 301 "-" POST http shop.example.org "/cart?add=1" x [Client 198.51.100.7]"#;
        let record = parser().parse(line).into_record().unwrap();
        assert_eq!(record.request_path, "/cart?add=1");
    }

    #[test]
    fn test_accepts_unquoted_request_target() {
        let line = r#"[10/Oct/2023:13:55:36 +0000] - 404 "-" GET https example.com /favicon.ico x [Client 198.51.100.7]"#;
        let record = parser().parse(line).into_record().unwrap();
        assert_eq!(record.request_path, "/favicon.ico");
    }

    #[test]
    fn test_rejects_line_without_client_marker() {
        let line = r#"[10/Oct/2023:13:55:36 +0000] - 200 "-" GET https example.com "/index.html""#;
        assert_eq!(parser().parse(line), ParseOutcome::RejectedMalformed);
    }

    #[test]
    fn test_rejects_arbitrary_noise() {
        assert_eq!(
            parser().parse("some random log noise"),
            ParseOutcome::RejectedMalformed
        );
        assert_eq!(parser().parse(""), ParseOutcome::RejectedMalformed);
    }

    #[test]
    fn test_rejects_impossible_calendar_date() {
        // Grammar-valid shape, but no such date exists.
        let line = r#"[31/Feb/2023:13:55:36 +0000] - 200 "-" GET https example.com "/i.html" x [Client 203.0.113.5]"#;
        assert_eq!(parser().parse(line), ParseOutcome::RejectedMalformed);
    }

    #[test]
    fn test_rejects_empty_quoted_request_target() {
        let line = r#"[10/Oct/2023:13:55:36 +0000] - 200 "-" GET https example.com "" x [Client 203.0.113.5]"#;
        assert_eq!(parser().parse(line), ParseOutcome::RejectedIncomplete);
    }

    #[test]
    fn test_accepts_line_without_second_dash() {
        let line = r#"[10/Oct/2023:13:55:36 +0000] - 502 x GET https example.com "/api" x [Client 2001:db8::1]"#;
        let record = parser().parse(line).into_record().unwrap();
        assert_eq!(record.status_code, Some(502));
        assert_eq!(record.remote_ip, "2001:db8::1");
    }
}
