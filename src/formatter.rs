//! Message formatter: raw chat text to a safe HTML fragment
//!
//! Supports a small handwritten markdown subset, applied in a fixed order:
//!
//! 1. `<` and `>` are escaped (the only escaping performed)
//! 2. fenced code blocks become `<pre><code>` with the trimmed inner text
//! 3. inline backtick spans become `<code>`
//! 4. `**bold**` spans become `<strong>`
//! 5. numbered and bulleted lines become `<li>` items
//! 6. each run of adjacent items is wrapped in `<ol>` or `<ul>`, chosen by
//!    the kind of the first item in the run
//! 7. the result is wrapped in a role-tagged message container
//!
//! Code produced by steps 2 and 3 is parked behind placeholder tokens until
//! the end, so list and bold processing never touch code contents.
//!
//! # Examples
//!
//! ```
//! use parlor::formatter::format;
//!
//! let html = format("1. first\n2. second", true);
//! assert!(html.contains("<ol><li>first</li><li>second</li></ol>"));
//! assert!(html.contains(r#"data-role="assistant""#));
//! ```

use regex::{Captures, Regex};
use std::sync::OnceLock;

/// Marks the start and end of a parked code fragment
const PLACEHOLDER: char = '\u{E000}';

fn code_block_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)```(.*?)```").expect("Invalid regex pattern"))
}

fn inline_code_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"`([^`]+)`").expect("Invalid regex pattern"))
}

fn bold_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\*\*(.*?)\*\*").expect("Invalid regex pattern"))
}

fn ordered_item_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\d+\.\s(.*)$").expect("Invalid regex pattern"))
}

fn unordered_item_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[-*]\s(.*)$").expect("Invalid regex pattern"))
}

fn placeholder_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new("\u{E000}(\\d+)\u{E000}").expect("Invalid regex pattern"))
}

/// Kind of list a line was recognised as
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ListKind {
    Ordered,
    Unordered,
}

/// One line after step 5
#[derive(Debug)]
enum Line {
    Item(ListKind, String),
    Text(String),
}

/// Code fragments parked during formatting
#[derive(Debug, Default)]
struct Parked {
    fragments: Vec<String>,
}

impl Parked {
    fn park(&mut self, html: String) -> String {
        let index = self.fragments.len();
        self.fragments.push(html);
        format!("{PLACEHOLDER}{index}{PLACEHOLDER}")
    }

    /// Replace every placeholder in `text` with its parked fragment
    fn restore(&self, text: &str) -> String {
        placeholder_re()
            .replace_all(text, |caps: &Captures<'_>| {
                caps[1]
                    .parse::<usize>()
                    .ok()
                    .and_then(|i| self.fragments.get(i))
                    .cloned()
                    .unwrap_or_default()
            })
            .into_owned()
    }
}

/// Format raw message content as an HTML fragment
///
/// `is_assistant` selects the container role (`assistant` / `AI` versus
/// `user` / `You`). Never fails: unmatched markers are left as literal text.
///
/// # Examples
///
/// ```
/// use parlor::formatter::format;
///
/// let html = format("use `<b>` for **bold**", false);
/// assert!(html.contains("<code>&lt;b&gt;</code>"));
/// assert!(html.contains("<strong>bold</strong>"));
/// assert!(html.contains(r#"<span class="role-label">You</span>"#));
/// ```
pub fn format(content: &str, is_assistant: bool) -> String {
    let body = format_body(content);
    let (role, label) = if is_assistant {
        ("assistant", "AI")
    } else {
        ("user", "You")
    };

    format!(
        "<div class=\"message {role}\" data-role=\"{role}\">\n\
         <div class=\"message-header\"><span class=\"role-label\">{label}</span></div>\n\
         <div class=\"message-content markdown\">\n{body}\n</div>\n\
         </div>\n"
    )
}

/// Steps 1 through 6, without the role container
pub fn format_body(content: &str) -> String {
    let mut parked = Parked::default();

    let escaped = escape_angle_brackets(content);

    let text = code_block_re()
        .replace_all(&escaped, |caps: &Captures<'_>| {
            parked.park(format!("<pre><code>{}</code></pre>", caps[1].trim()))
        })
        .into_owned();

    // Inline spans may enclose an already parked block; expand it into the
    // span so a single restore pass at the end is enough.
    let text = inline_code_re()
        .replace_all(&text, |caps: &Captures<'_>| {
            let inner = parked.restore(&caps[1]);
            parked.park(format!("<code>{inner}</code>"))
        })
        .into_owned();

    let text = bold_re()
        .replace_all(&text, "<strong>$1</strong>")
        .into_owned();

    let lines: Vec<Line> = text.split('\n').map(classify_line).collect();
    let wrapped = wrap_list_runs(lines);

    parked.restore(&wrapped)
}

/// Escape `<` and `>`; placeholder characters are dropped from the input
fn escape_angle_brackets(content: &str) -> String {
    let mut out = String::with_capacity(content.len());
    for c in content.chars() {
        match c {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            PLACEHOLDER => {}
            other => out.push(other),
        }
    }
    out
}

fn classify_line(line: &str) -> Line {
    if let Some(caps) = ordered_item_re().captures(line) {
        return Line::Item(ListKind::Ordered, caps[1].to_string());
    }
    if let Some(caps) = unordered_item_re().captures(line) {
        return Line::Item(ListKind::Unordered, caps[1].to_string());
    }
    Line::Text(line.to_string())
}

/// Collapse runs of adjacent items into a single `<ol>`/`<ul>` line
fn wrap_list_runs(lines: Vec<Line>) -> String {
    let mut out: Vec<String> = Vec::with_capacity(lines.len());
    let mut run: Option<(ListKind, String)> = None;

    for line in lines {
        match line {
            Line::Item(kind, item) => {
                let entry = run.get_or_insert_with(|| (kind, String::new()));
                entry.1.push_str("<li>");
                entry.1.push_str(&item);
                entry.1.push_str("</li>");
            }
            Line::Text(text) => {
                if let Some((kind, items)) = run.take() {
                    out.push(close_run(kind, &items));
                }
                out.push(text);
            }
        }
    }
    if let Some((kind, items)) = run.take() {
        out.push(close_run(kind, &items));
    }

    out.join("\n")
}

fn close_run(kind: ListKind, items: &str) -> String {
    match kind {
        ListKind::Ordered => format!("<ol>{items}</ol>"),
        ListKind::Unordered => format!("<ul>{items}</ul>"),
    }
}
