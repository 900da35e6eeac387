use serde::Serialize;

/// A typed unit of rendered reply content. Text payloads are already
/// neutralized against markup injection and are safe to display verbatim.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    TextRun {
        text: String,
    },
    Emphasis {
        text: String,
    },
    InlineCode {
        text: String,
    },
    CodeBlock {
        language: String,
        code: String,
    },
    LineBreak,
}

impl ContentBlock {
    pub fn text(text: impl Into<String>) -> Self {
        ContentBlock::TextRun { text: text.into() }
    }

    pub fn emphasis(text: impl Into<String>) -> Self {
        ContentBlock::Emphasis { text: text.into() }
    }

    pub fn inline_code(text: impl Into<String>) -> Self {
        ContentBlock::InlineCode { text: text.into() }
    }

    pub fn code_block(language: impl Into<String>, code: impl Into<String>) -> Self {
        ContentBlock::CodeBlock {
            language: language.into(),
            code: code.into(),
        }
    }
}
