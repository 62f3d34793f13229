//! Line handling for generated batches: numbering removal and whole-word
//! token matching.

/// Split generated text into candidate lines.
///
/// Leading list numbering (`1.`, `2)`, `3-`) is stripped and blank lines are
/// dropped. At most `limit` lines are returned.
pub fn split_candidates(text: &str, limit: usize) -> Vec<String> {
    text.lines()
        .map(strip_numbering)
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .take(limit)
        .map(str::to_string)
        .collect()
}

fn strip_numbering(line: &str) -> &str {
    let trimmed = line.trim_start();
    let digits = trimmed.bytes().take_while(u8::is_ascii_digit).count();
    if digits == 0 {
        return trimmed;
    }
    match trimmed[digits..].chars().next() {
        Some('.' | ')' | '-') => trimmed[digits + 1..].trim_start(),
        _ => trimmed,
    }
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Case-insensitive whole-word match: `token` must not be flanked by word
/// characters on either side. Every start position is tried, so overlapping
/// occurrences are not skipped.
pub fn contains_whole_word(line: &str, token: &str) -> bool {
    if token.is_empty() {
        return false;
    }
    let haystack = line.to_lowercase();
    let needle = token.to_lowercase();

    haystack.char_indices().any(|(start, _)| {
        if !haystack[start..].starts_with(&needle) {
            return false;
        }
        let before = haystack[..start].chars().next_back();
        let after = haystack[start + needle.len()..].chars().next();
        !before.is_some_and(is_word_char) && !after.is_some_and(is_word_char)
    })
}
