/// Trigger vocabulary scanned in inbound messages.
pub const DEFAULT_TRIGGER_WORDS: &[&str] = &[
    "camera",
    "mic",
    "stream",
    "fear",
    "hallucination",
    "watching",
    "see",
    "hear",
    "know",
    "record",
    "live",
    "broadcast",
    "eyes",
    "screen",
    "monitor",
    "alone",
    "dark",
    "shadow",
    "follow",
];

/// Case-insensitive substring scan over a fixed vocabulary.
///
/// Matches are reported in vocabulary order, each at most once.
#[derive(Debug, Clone)]
pub struct KeywordDetector {
    vocabulary: Vec<String>,
}

impl KeywordDetector {
    pub fn new<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut vocabulary: Vec<String> = Vec::new();
        for word in words {
            let word = word.as_ref().trim().to_lowercase();
            if !word.is_empty() && !vocabulary.contains(&word) {
                vocabulary.push(word);
            }
        }
        Self { vocabulary }
    }

    pub fn detect(&self, text: &str) -> Vec<&str> {
        let lowered = text.to_lowercase();
        self.vocabulary
            .iter()
            .filter(|word| lowered.contains(word.as_str()))
            .map(String::as_str)
            .collect()
    }
}

impl Default for KeywordDetector {
    fn default() -> Self {
        Self::new(DEFAULT_TRIGGER_WORDS)
    }
}
