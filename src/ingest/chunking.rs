//! Sentence-aware text chunking
//!
//! Token counts use the character heuristic `⌈chars / 4⌉`, which is close
//! enough for English prose and needs no tokenizer download.

/// Estimated token count of `text`
pub fn estimate_tokens(text: &str) -> usize {
    (text.chars().count() + 3) / 4
}

/// Splits text into chunks of whole sentences.
///
/// Each chunk stays within `chunk_size` estimated tokens, except a single
/// sentence that is larger on its own. Up to `overlap` tokens of trailing
/// sentences are repeated at the start of the next chunk.
#[derive(Debug, Clone, Copy)]
pub struct SentenceChunker {
    chunk_size: usize,
    overlap: usize,
}

impl SentenceChunker {
    pub fn new(chunk_size: usize, overlap: usize) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
            overlap: overlap.min(chunk_size.saturating_sub(1)),
        }
    }

    pub fn split(&self, text: &str) -> Vec<String> {
        let mut chunks = Vec::new();
        let mut current: Vec<&str> = Vec::new();
        let mut current_tokens = 0;

        for sentence in split_sentences(text) {
            let tokens = estimate_tokens(sentence);

            if !current.is_empty() && current_tokens + tokens > self.chunk_size {
                chunks.push(current.join(" "));
                current = self.carry_over(&current);
                current_tokens = current.iter().map(|s| estimate_tokens(s)).sum();

                if current_tokens + tokens > self.chunk_size {
                    current.clear();
                    current_tokens = 0;
                }
            }

            current.push(sentence);
            current_tokens += tokens;
        }

        if !current.is_empty() {
            chunks.push(current.join(" "));
        }
        chunks
    }

    /// Longest suffix of `sentences` within the overlap budget
    fn carry_over<'a>(&self, sentences: &[&'a str]) -> Vec<&'a str> {
        let mut carried = Vec::new();
        let mut tokens = 0;
        for sentence in sentences.iter().rev() {
            let t = estimate_tokens(sentence);
            if tokens + t > self.overlap {
                break;
            }
            tokens += t;
            carried.push(*sentence);
        }
        carried.reverse();
        carried
    }
}

/// Sentences end at `.`, `!` or `?` followed by whitespace, or at a blank
/// line. Surrounding whitespace is trimmed and empty pieces dropped.
fn split_sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0;
    let mut chars = text.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        let boundary = match chars.peek() {
            Some(&(_, next)) => {
                (matches!(c, '.' | '!' | '?') && next.is_whitespace()) || (c == '\n' && next == '\n')
            }
            None => false,
        };
        if boundary {
            let end = i + c.len_utf8();
            sentences.push(text[start..end].trim());
            start = end;
        }
    }
    sentences.push(text[start..].trim());

    sentences.retain(|s| !s.is_empty());
    sentences
}

#[cfg(test)]
mod tests {
    use super::*;
    use quickcheck_macros::quickcheck;

    #[test]
    fn test_estimate_tokens() {
        assert_eq!(estimate_tokens(""), 0);
        assert_eq!(estimate_tokens("abcd"), 1);
        assert_eq!(estimate_tokens("abcde"), 2);
        assert_eq!(estimate_tokens(&"a".repeat(100)), 25);
    }

    #[test]
    fn test_split_sentences() {
        let s = split_sentences("First one. Second one! Third?  Fourth\n\nFifth");
        assert_eq!(s, vec!["First one.", "Second one!", "Third?", "Fourth", "Fifth"]);
    }

    #[test]
    fn test_decimal_points_do_not_split() {
        let s = split_sentences("Emissions fell 2.5 percent. Done.");
        assert_eq!(s, vec!["Emissions fell 2.5 percent.", "Done."]);
    }

    #[test]
    fn test_short_text_single_chunk() {
        let chunker = SentenceChunker::new(512, 50);
        let chunks = chunker.split("One. Two. Three.");
        assert_eq!(chunks, vec!["One. Two. Three."]);
    }

    #[test]
    fn test_chunks_respect_size_and_overlap() {
        // each sentence is 12 chars = 3 tokens
        let text = "Sentence aa. Sentence bb. Sentence cc. Sentence dd.";
        let chunker = SentenceChunker::new(6, 3);
        let chunks = chunker.split(text);

        assert_eq!(
            chunks,
            vec![
                "Sentence aa. Sentence bb.",
                "Sentence bb. Sentence cc.",
                "Sentence cc. Sentence dd.",
            ]
        );
    }

    #[test]
    fn test_oversized_sentence_is_own_chunk() {
        let long = format!("{}.", "x".repeat(100));
        let text = format!("Short. {} Tail.", long);
        let chunks = SentenceChunker::new(5, 0).split(&text);

        assert_eq!(chunks, vec!["Short.".to_string(), long, "Tail.".to_string()]);
    }

    #[test]
    fn test_empty_text() {
        assert!(SentenceChunker::new(10, 2).split("   ").is_empty());
    }

    #[quickcheck]
    fn prop_chunks_within_budget_unless_single_sentence(words: Vec<u8>, size: u8) -> bool {
        let size = (size as usize % 40) + 1;
        let text: String = words
            .iter()
            .map(|w| format!("{}.", "w".repeat((*w as usize % 30) + 1)))
            .collect::<Vec<_>>()
            .join(" ");
        SentenceChunker::new(size, 0)
            .split(&text)
            .iter()
            .all(|chunk| {
                let sentences = split_sentences(chunk);
                let tokens: usize = sentences.iter().map(|s| estimate_tokens(s)).sum();
                tokens <= size || sentences.len() == 1
            })
    }
}
