// Sentence segmentation with byte spans into the source text

/// A sentence borrowed from the document, with its byte span
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sentence<'a> {
    pub text: &'a str,
    pub start: usize,
    pub end: usize,
}

/// Splits on `.`, `!` or `?` followed by whitespace or end of text.
/// Terminators stay attached to their sentence; empty pieces are dropped.
pub fn split_sentences(text: &str) -> Vec<Sentence<'_>> {
    let mut sentences = Vec::new();
    let mut start = 0;
    let mut chars = text.char_indices().peekable();

    while let Some((idx, c)) = chars.next() {
        if !matches!(c, '.' | '!' | '?') {
            continue;
        }
        let boundary = match chars.peek() {
            Some((_, next)) => next.is_whitespace(),
            None => true,
        };
        if boundary {
            push_trimmed(text, start, idx + c.len_utf8(), &mut sentences);
            start = idx + c.len_utf8();
        }
    }
    push_trimmed(text, start, text.len(), &mut sentences);

    sentences
}

/// Index of the sentence containing byte `offset`
pub fn sentence_index_at(sentences: &[Sentence<'_>], offset: usize) -> Option<usize> {
    sentences
        .iter()
        .position(|s| offset >= s.start && offset < s.end)
        .or_else(|| sentences.iter().position(|s| s.start >= offset))
}

fn push_trimmed<'a>(text: &'a str, start: usize, end: usize, out: &mut Vec<Sentence<'a>>) {
    let raw = &text[start..end];
    let leading = raw.len() - raw.trim_start().len();
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return;
    }
    let s = start + leading;
    out.push(Sentence {
        text: trimmed,
        start: s,
        end: s + trimmed.len(),
    });
}
