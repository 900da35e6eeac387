//! Markdown-subset renderer for assistant replies.
//!
//! Supports fenced code blocks, inline code, `**bold**` and line breaks.
//! Everything else is literal text. Markup-significant characters are escaped
//! before any scanning and stay escaped in every emitted payload.

use lazy_static::lazy_static;
use regex::{ Captures, Regex };
use crate::models::content::ContentBlock;

pub const DEFAULT_CODE_LANGUAGE: &str = "sql";

lazy_static! {
    static ref FENCED_BLOCK: Regex = Regex::new(r"```((?-u:\w)+)?
((?s:.*?))```").unwrap();
    static ref INLINE_CODE: Regex = Regex::new(r"`([^`]+)`").unwrap();
    static ref BOLD: Regex = Regex::new(r"\*\*([^*]+)\*\*").unwrap();
}

pub fn render(text: &str) -> Vec<ContentBlock> {
    let escaped = escape_markup(text);
    let mut blocks = Vec::new();

    scan(
        &FENCED_BLOCK,
        &escaped,
        &mut blocks,
        |caps, out| {
            let language = caps
                .get(1)
                .map_or(DEFAULT_CODE_LANGUAGE, |m| m.as_str());
            out.push(ContentBlock::code_block(language, caps[2].trim()));
        },
        render_inline
    );

    blocks
}

fn render_inline(text: &str, out: &mut Vec<ContentBlock>) {
    scan(
        &INLINE_CODE,
        text,
        out,
        |caps, out| out.push(ContentBlock::inline_code(&caps[1])),
        render_emphasis
    );
}

fn render_emphasis(text: &str, out: &mut Vec<ContentBlock>) {
    scan(
        &BOLD,
        text,
        out,
        |caps, out| out.push(ContentBlock::emphasis(&caps[1])),
        push_lines
    );
}

fn push_lines(text: &str, out: &mut Vec<ContentBlock>) {
    for (i, line) in text.split('\n').enumerate() {
        if i > 0 {
            out.push(ContentBlock::LineBreak);
        }
        if !line.is_empty() {
            out.push(ContentBlock::text(line));
        }
    }
}

/// Feeds each match of `re` to `on_match` and every unmatched gap to `on_rest`,
/// in source order.
fn scan<M, R>(re: &Regex, text: &str, out: &mut Vec<ContentBlock>, mut on_match: M, mut on_rest: R)
    where M: FnMut(&Captures<'_>, &mut Vec<ContentBlock>), R: FnMut(&str, &mut Vec<ContentBlock>)
{
    let mut last = 0;
    for caps in re.captures_iter(text) {
        let Some(whole) = caps.get(0) else {
            continue;
        };
        if whole.start() > last {
            on_rest(&text[last..whole.start()], out);
        }
        on_match(&caps, out);
        last = whole.end();
    }
    if last < text.len() {
        on_rest(&text[last..], out);
    }
}

pub fn escape_markup(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Flattens rendered blocks back into copyable text. Payloads stay escaped.
pub fn plain_text(blocks: &[ContentBlock]) -> String {
    let mut text = String::new();
    for block in blocks {
        match block {
            | ContentBlock::TextRun { text: t }
            | ContentBlock::Emphasis { text: t }
            | ContentBlock::InlineCode { text: t } => text.push_str(t),
            ContentBlock::CodeBlock { code, .. } => text.push_str(code),
            ContentBlock::LineBreak => text.push('\n'),
        }
    }
    text
}
