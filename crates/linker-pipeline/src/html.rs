use linker_core::traits::TextExtractor;

/// Elements whose content is never page text.
const SKIPPED_ELEMENTS: [&str; 4] = ["script", "style", "link", "noscript"];

/// Elements that end a line of text when they open or close.
const BLOCK_ELEMENTS: [&str; 16] =
    ["p", "div", "br", "li", "ul", "ol", "tr", "td", "th", "h1", "h2", "h3", "h4", "h5", "h6", "title"];

/// Plain text of the HTML payload of a WARC response record.
///
/// The WARC and HTTP header blocks are dropped, markup is stripped, the
/// common entities are decoded and whitespace is collapsed into one chunk of
/// text per line.
#[derive(Debug, Default, Clone, Copy)]
pub struct HtmlTextExtractor;

impl TextExtractor for HtmlTextExtractor {
    fn extract(&self, raw: &str) -> String {
        normalize_whitespace(&decode_entities(&strip_markup(payload(raw))))
    }
}

/// Body after the WARC header block and, for HTTP responses, the HTTP header
/// block.
fn payload(raw: &str) -> &str {
    let body = after_blank_line(raw).unwrap_or("");
    if body.trim_start().starts_with("HTTP/") {
        after_blank_line(body).unwrap_or("")
    } else {
        body
    }
}

fn after_blank_line(s: &str) -> Option<&str> {
    let crlf = s.find("\r\n\r\n").map(|i| i + 4);
    let lf = s.find("\n\n").map(|i| i + 2);
    let end = match (crlf, lf) {
        (Some(a), Some(b)) => a.min(b),
        (a, b) => a.or(b)?,
    };
    Some(&s[end..])
}

fn strip_markup(html: &str) -> String {
    let lower = html.to_ascii_lowercase();
    let mut out = String::with_capacity(html.len() / 2);
    let mut i = 0;
    while let Some(offset) = html[i..].find('<') {
        let start = i + offset;
        out.push_str(&html[i..start]);
        if !opens_markup(&html[start + 1..]) {
            out.push('<');
            i = start + 1;
            continue;
        }
        if lower[start..].starts_with("<!--") {
            i = lower[start..].find("-->").map_or(html.len(), |e| start + e + 3);
            continue;
        }
        let Some(close) = html[start..].find('>').map(|e| start + e) else {
            i = html.len();
            break;
        };
        let tag = &lower[start + 1..close];
        let closing = tag.starts_with('/');
        let name: String = tag.trim_start_matches('/').chars().take_while(|c| c.is_ascii_alphanumeric()).collect();
        i = close + 1;
        if !closing && !tag.ends_with('/') && SKIPPED_ELEMENTS.contains(&name.as_str()) {
            let end_tag = format!("</{name}");
            i = match lower[i..].find(&end_tag) {
                Some(e) => lower[i + e..].find('>').map_or(html.len(), |g| i + e + g + 1),
                None => html.len(),
            };
            continue;
        }
        if BLOCK_ELEMENTS.contains(&name.as_str()) {
            out.push('\n');
        }
    }
    if i < html.len() {
        out.push_str(&html[i..]);
    }
    out
}

// A `<` starts markup only when a tag name, end tag, comment, doctype or
// processing instruction follows; otherwise it is text such as `3 < 5`.
fn opens_markup(rest: &str) -> bool {
    rest.chars().next().is_some_and(|c| c.is_ascii_alphabetic() || matches!(c, '/' | '!' | '?'))
}

fn decode_entities(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];
        let decoded =
            rest.find(';').filter(|semi| *semi <= 10).and_then(|semi| decode_entity(&rest[1..semi]).map(|c| (c, semi)));
        match decoded {
            Some((c, semi)) => {
                out.push(c);
                rest = &rest[semi + 1..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn decode_entity(name: &str) -> Option<char> {
    match name {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "nbsp" => Some(' '),
        _ => {
            let num = name.strip_prefix('#')?;
            let code = match num.strip_prefix(['x', 'X']) {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => num.parse().ok()?,
            };
            char::from_u32(code)
        }
    }
}

/// Trim lines, split them on double spaces and keep the non-empty chunks,
/// one per line.
fn normalize_whitespace(text: &str) -> String {
    text.lines()
        .flat_map(|line| line.trim().split("  "))
        .map(str::trim)
        .filter(|chunk| !chunk.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    const RECORD: &str = "WARC-Type: response\r\nWARC-TREC-ID: rec-001\r\n\r\n\
HTTP/1.1 200 OK\r\nContent-Type: text/html\r\n\r\n\
<html><head><title>Paris &amp; France</title><style>body { color: red; }</style>\
<script type=\"text/javascript\">var x = \"<p>not text</p>\";</script></head>\
<body><!-- nav --><p>Paris is the capital of   France.</p><NOSCRIPT>enable js</NOSCRIPT>\
<div>Population&nbsp;2&#44;1 million &#x263A;</div></body></html>";

    #[test]
    fn strips_headers_markup_and_hidden_elements() {
        let text = HtmlTextExtractor.extract(RECORD);
        assert_eq!(text, "Paris & France\nParis is the capital of\nFrance.\nPopulation 2,1 million \u{263A}");
    }

    #[test]
    fn bare_less_than_is_text() {
        let record = "WARC-TREC-ID: x\n\n<p>prices 3 < 5 today. Paris is the capital of France.</p><p>a <3 b</p>";
        let text = HtmlTextExtractor.extract(record);
        assert_eq!(text, "prices 3 < 5 today. Paris is the capital of France.\na <3 b");
        assert_eq!(HtmlTextExtractor.extract("WARC-TREC-ID: x\n\nx <= y <!doctype html>z"), "x <= y z");
    }

    #[test]
    fn malformed_input_yields_empty_or_partial_text() {
        assert_eq!(HtmlTextExtractor.extract(""), "");
        assert_eq!(HtmlTextExtractor.extract("WARC-TREC-ID: x"), "");
        assert_eq!(HtmlTextExtractor.extract("WARC-TREC-ID: x\n\n<p>unterminated <b"), "unterminated");
        assert_eq!(decode_entities("AT&T &bogus; &#9999999999;"), "AT&T &bogus; &#9999999999;");
    }
}
