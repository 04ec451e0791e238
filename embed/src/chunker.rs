/// Which splitter Stage E applies to an abstract before embedding (spec
/// §4.6). Selected per run via CLI flag, not mixed within one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkStrategy {
    /// Token-aware splitter sized to the embedding model's max input, with
    /// windowing so long abstracts still get full coverage.
    Complete,
    /// Split on sentence boundaries; each sentence becomes its own chunk.
    Sentence,
}

/// Max whitespace-delimited tokens per window for the `complete` strategy.
/// The embedding model used downstream truncates well beyond this, so the
/// value trades completeness against an oversized single chunk.
const MAX_TOKENS: usize = 256;

/// Overlap between consecutive windows, so a sentence split across a window
/// boundary is still fully present in at least one chunk.
const WINDOW_OVERLAP: usize = 32;

/// Token-aware windowed split (spec §4.6 "complete"). A "token" here is a
/// whitespace-delimited word; the real embedding model's tokenizer runs a
/// subword scheme, but word count is a close enough proxy for windowing
/// since this stage only needs the *count* of a fixed step size, not the
/// model's own token ids.
pub fn chunk_complete(text: &str) -> Vec<String> {
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.is_empty() {
        return Vec::new();
    }
    if words.len() <= MAX_TOKENS {
        return vec![words.join(" ")];
    }

    let step = MAX_TOKENS - WINDOW_OVERLAP;
    let mut chunks = Vec::new();
    let mut start = 0;
    while start < words.len() {
        let end = (start + MAX_TOKENS).min(words.len());
        chunks.push(words[start..end].join(" "));
        if end == words.len() {
            break;
        }
        start += step;
    }
    chunks
}

/// Splits on sentence boundaries (spec §4.6 "sentence"). This is a
/// heuristic stand-in for a biomedical sentence segmenter: a sentence ends
/// at `.`/`!`/`?` followed by whitespace and then a capital letter or an
/// opening paren, which avoids breaking on common abbreviation patterns
/// like "e.g." or "Fig. 2" followed by a lowercase continuation.
pub fn chunk_sentence(text: &str) -> Vec<String> {
    let chars: Vec<char> = text.trim().chars().collect();
    let mut sentences = Vec::new();
    let mut start = 0;
    let mut i = 0;

    while i < chars.len() {
        let is_terminator = matches!(chars[i], '.' | '!' | '?');
        if is_terminator {
            let mut j = i + 1;
            while j < chars.len() && chars[j].is_whitespace() {
                j += 1;
            }
            let boundary = j > i + 1 && chars.get(j).is_some_and(|c| c.is_uppercase() || *c == '(');
            if boundary {
                let sentence: String = chars[start..=i].iter().collect();
                let sentence = sentence.trim();
                if !sentence.is_empty() {
                    sentences.push(sentence.to_string());
                }
                start = j;
                i = j;
                continue;
            }
        }
        i += 1;
    }

    let tail: String = chars[start..].iter().collect();
    let tail = tail.trim();
    if !tail.is_empty() {
        sentences.push(tail.to_string());
    }
    sentences
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_text_is_a_single_chunk() {
        let chunks = chunk_complete("a short abstract with few words");
        assert_eq!(chunks.len(), 1);
    }

    #[test]
    fn long_text_windows_with_overlap() {
        let text = (0..600).map(|n| n.to_string()).collect::<Vec<_>>().join(" ");
        let chunks = chunk_complete(&text);
        assert!(chunks.len() > 1);

        let first_words: Vec<&str> = chunks[0].split_whitespace().collect();
        let second_words: Vec<&str> = chunks[1].split_whitespace().collect();
        assert_eq!(first_words.len(), MAX_TOKENS);
        // the tail of the first window reappears at the head of the second
        assert_eq!(first_words[first_words.len() - WINDOW_OVERLAP..], second_words[..WINDOW_OVERLAP]);
    }

    #[test]
    fn empty_text_has_no_chunks() {
        assert!(chunk_complete("").is_empty());
        assert!(chunk_sentence("   ").is_empty());
    }

    #[test]
    fn sentence_split_respects_boundaries() {
        let chunks = chunk_sentence("Background is clear. Methods followed the protocol. Results were mixed.");
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0], "Background is clear.");
    }

    #[test]
    fn sentence_split_tolerates_common_abbreviations() {
        let chunks = chunk_sentence("See Fig. 2 for details. It shows a clear trend.");
        assert_eq!(chunks.len(), 2);
    }
}
