use super::*;

/// Walk the chunks in order and verify together they cover the whole input.
/// Each chunk must occur in the text starting at or before the byte frontier
/// already covered; repetitive text is handled by taking the latest match.
fn assert_full_coverage(text: &str, chunks: &[String]) {
    assert!(!chunks.is_empty(), "non-empty input must produce chunks");

    let mut covered_to = 0;
    for chunk in chunks {
        let max_start = covered_to.min(text.len() - chunk.len());
        let start = (0..=max_start)
            .rev()
            .find(|&s| text.is_char_boundary(s) && text[s..].starts_with(chunk.as_str()))
            .expect("chunk must start at or before the covered frontier");
        covered_to = covered_to.max(start + chunk.len());
    }
    assert_eq!(covered_to, text.len(), "input tail was dropped");
}

#[test]
fn empty_input_produces_no_chunks() {
    assert!(split_text("", 100, 10).is_empty());
}

#[test]
fn short_input_is_a_single_chunk() {
    let chunks = split_text("hello world", 100, 10);
    assert_eq!(chunks, vec!["hello world".to_string()]);
}

#[test]
fn chunks_respect_the_size_bound() {
    let text = "word ".repeat(500);
    let chunks = split_text(&text, 100, 10);

    for chunk in &chunks {
        assert!(chunk.chars().count() <= 100);
    }
    assert_full_coverage(&text, &chunks);
}

#[test]
fn unbroken_text_is_hard_cut() {
    let text = "a".repeat(250);
    let chunks = split_text(&text, 100, 10);

    assert!(chunks.len() > 2);
    for chunk in &chunks {
        assert!(chunk.chars().count() <= 100);
    }
    assert_full_coverage(&text, &chunks);
}

#[test]
fn consecutive_chunks_overlap() {
    let text: String = ('a'..='z').cycle().take(300).collect();
    let chunks = split_text(&text, 100, 20);

    for pair in chunks.windows(2) {
        let prev_tail: String = pair[0].chars().rev().take(20).collect();
        let tail: String = prev_tail.chars().rev().collect();
        assert!(
            pair[1].starts_with(&tail),
            "next chunk should repeat the previous chunk's tail"
        );
    }
}

#[test]
fn prefers_whitespace_break_points() {
    let text = format!("{} {}", "a".repeat(80), "b".repeat(80));
    let chunks = split_text(&text, 100, 0);

    assert_eq!(chunks[0], format!("{} ", "a".repeat(80)));
    assert_full_coverage(&text, &chunks);
}

#[test]
fn deterministic_for_identical_input() {
    let text = "The quick brown fox jumps over the lazy dog. ".repeat(50);
    assert_eq!(split_text(&text, 120, 30), split_text(&text, 120, 30));
}

#[test]
fn handles_multibyte_characters() {
    let text = "héllo wörld 🦀 ".repeat(40);
    let chunks = split_text(&text, 50, 10);

    for chunk in &chunks {
        assert!(chunk.chars().count() <= 50);
    }
    assert_full_coverage(&text, &chunks);
}

#[test]
fn config_defaults_match_ingestion_policy() {
    let config = ChunkingConfig::default();
    assert_eq!(config.chunk_size, 1000);
    assert_eq!(config.chunk_overlap, 100);
}
