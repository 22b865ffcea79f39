//! Light markup for assistant replies.
//!
//! Provider output is untrusted. It is parsed into [`Span`]s (`**bold**`,
//! `*italic*`, `` `code` ``, line breaks) and every piece of text is
//! HTML-escaped on output, so a reply can never inject markup of its own.
//! Markers never span lines and do not nest.

/// A styled fragment of one reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Span<'a> {
    Text(&'a str),
    Strong(&'a str),
    Emphasis(&'a str),
    Code(&'a str),
    LineBreak,
}

/// CSS classes for inline code, matching the web front end.
pub const CODE_CLASS: &str = "bg-muted px-1 py-0.5 rounded text-sm";

pub fn parse(text: &str) -> Vec<Span<'_>> {
    let mut spans = Vec::new();
    for (i, line) in text.split('\n').enumerate() {
        if i > 0 {
            spans.push(Span::LineBreak);
        }
        parse_line(line, &mut spans);
    }
    spans
}

fn parse_line<'a>(line: &'a str, spans: &mut Vec<Span<'a>>) {
    let bytes = line.as_bytes();
    let mut text_start = 0;
    let mut i = 0;

    while i < bytes.len() {
        // Only ASCII delimiters are matched, so `i` is a char boundary
        // whenever a slice is taken at it.
        let matched = match bytes[i] {
            b'*' => delimited(line, i, "**")
                .map(|(inner, end)| (Span::Strong(inner), end))
                .or_else(|| delimited(line, i, "*").map(|(inner, end)| (Span::Emphasis(inner), end))),
            b'`' => delimited(line, i, "`").map(|(inner, end)| (Span::Code(inner), end)),
            _ => None,
        };

        match matched {
            Some((span, end)) => {
                if text_start < i {
                    spans.push(Span::Text(&line[text_start..i]));
                }
                spans.push(span);
                i = end;
                text_start = end;
            }
            None => i += 1,
        }
    }

    if text_start < line.len() {
        spans.push(Span::Text(&line[text_start..]));
    }
}

/// `line[start..]` opens with `delim`; returns the inner text and the index
/// just past the closing delimiter.
fn delimited<'a>(line: &'a str, start: usize, delim: &str) -> Option<(&'a str, usize)> {
    if !line[start..].starts_with(delim) {
        return None;
    }
    let open_end = start + delim.len();
    let close = line[open_end..].find(delim)? + open_end;
    Some((&line[open_end..close], close + delim.len()))
}

/// Render `text` to escaped HTML.
pub fn to_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + text.len() / 4);
    for span in parse(text) {
        match span {
            Span::Text(t) => escape_html(t, &mut out),
            Span::Strong(t) => wrap(&mut out, "<strong>", t, "</strong>"),
            Span::Emphasis(t) => wrap(&mut out, "<em>", t, "</em>"),
            Span::Code(t) => {
                out.push_str("<code class=\"");
                out.push_str(CODE_CLASS);
                out.push_str("\">");
                escape_html(t, &mut out);
                out.push_str("</code>");
            }
            Span::LineBreak => out.push_str("<br>"),
        }
    }
    out
}

fn wrap(out: &mut String, open: &str, inner: &str, close: &str) {
    out.push_str(open);
    escape_html(inner, out);
    out.push_str(close);
}

pub fn escape_html(text: &str, out: &mut String) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
}
