//! Request parser: the pure, line-at-a-time logic driving the
//! connection's `REQUEST_LINE → MIME_HEADER → DATA` state machine. The state
//! machine itself lives in [`crate::connection`]; this module holds the two
//! decisions that machine makes about each line it reads.

/// Characters that terminate the URL token on a request line: whitespace,
/// CR, LF, tab, or the start of a query string.
const URL_TERMINATORS: [char; 5] = [' ', '\r', '\n', '\t', '?'];

/// If `line` is a GET request line, returns the extracted path (query string
/// stripped). Any other method, or a line with no `GET ` prefix, fails —
/// that failure is the trigger for a 500 response.
pub fn parse_request_line(line: &str) -> Option<String> {
    let rest = line.strip_prefix("GET ")?;
    let end = rest.find(URL_TERMINATORS).unwrap_or(rest.len());
    Some(rest[..end].to_string())
}

/// True iff `line` is the blank separator ending the MIME-header phase:
/// empty, or containing only whitespace/CR/LF. Header *values* are never
/// inspected — the parser exists solely to find this line.
pub fn is_blank_header_line(line: &str) -> bool {
    line.chars().all(|c| c == ' ' || c == '\r' || c == '\n')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_path_up_to_query_string() {
        assert_eq!(parse_request_line("GET /listen?foo=bar HTTP/1.0"), Some("/listen".to_string()));
    }

    #[test]
    fn extracts_path_up_to_whitespace() {
        assert_eq!(parse_request_line("GET / HTTP/1.0"), Some("/".to_string()));
    }

    #[test]
    fn rejects_non_get_methods() {
        assert_eq!(parse_request_line("POST / HTTP/1.0"), None);
        assert_eq!(parse_request_line(""), None);
    }

    #[test]
    fn blank_header_line_accepts_empty_and_whitespace_only() {
        assert!(is_blank_header_line(""));
        assert!(is_blank_header_line("   "));
        assert!(!is_blank_header_line("Host: example.com"));
    }
}
