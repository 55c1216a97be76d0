use regex::Regex;
use std::sync::LazyLock;

/// Separator placed between paragraphs packed into the same chunk.
pub const PARAGRAPH_SEPARATOR: &str = "\n\n";

// Two or more line breaks, allowing whitespace-only lines in between.
static PARAGRAPH_BREAK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\r?\n(?:[ \t]*\r?\n)+").expect("valid paragraph break pattern")
});

/// Splits text into paragraph-aligned chunks of bounded size.
///
/// Sizes are measured in characters. Paragraphs are never cut: a paragraph
/// longer than `max_size` becomes a chunk of its own.
#[derive(Debug, Clone)]
pub struct ParagraphChunker {
    max_size: usize,
}

impl ParagraphChunker {
    pub fn new(max_size: usize) -> Self {
        Self {
            max_size: max_size.max(1),
        }
    }

    /// Split text into chunks, packing consecutive paragraphs greedily
    pub fn split_text(&self, text: &str) -> Vec<String> {
        let separator_len = PARAGRAPH_SEPARATOR.chars().count();
        let mut chunks = Vec::new();
        let mut current = String::new();
        let mut current_len = 0;

        for paragraph in paragraphs(text) {
            let paragraph_len = paragraph.chars().count();

            if current.is_empty() {
                current.push_str(paragraph);
                current_len = paragraph_len;
                continue;
            }

            if current_len + separator_len + paragraph_len <= self.max_size {
                current.push_str(PARAGRAPH_SEPARATOR);
                current.push_str(paragraph);
                current_len += separator_len + paragraph_len;
            } else {
                chunks.push(std::mem::take(&mut current));
                current.push_str(paragraph);
                current_len = paragraph_len;
            }
        }

        if !current.is_empty() {
            chunks.push(current);
        }

        chunks
    }
}

/// Returns the trimmed, non-empty paragraphs of `text` in source order.
pub fn paragraphs(text: &str) -> impl Iterator<Item = &str> {
    PARAGRAPH_BREAK
        .split(text)
        .map(str::trim)
        .filter(|paragraph| !paragraph.is_empty())
}

/// Convenience wrapper around [`ParagraphChunker::split_text`].
pub fn chunk(text: &str, max_size: usize) -> Vec<String> {
    ParagraphChunker::new(max_size).split_text(text)
}
