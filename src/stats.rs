//! Character and word statistics for an article body.

use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextStats {
    /// Unicode scalar values.
    pub characters: usize,
    /// Whitespace-separated runs.
    pub words: usize,
    /// Occurrences of each character.
    pub frequencies: BTreeMap<char, usize>,
}

impl TextStats {
    pub fn of(text: &str) -> Self {
        let mut frequencies = BTreeMap::new();
        let mut characters = 0;
        for ch in text.chars() {
            characters += 1;
            *frequencies.entry(ch).or_insert(0) += 1;
        }
        Self {
            characters,
            words: text.split_whitespace().count(),
            frequencies,
        }
    }

    /// The `n` most frequent non-whitespace characters, most frequent first.
    pub fn most_common(&self, n: usize) -> Vec<(char, usize)> {
        let mut common: Vec<(char, usize)> = self
            .frequencies
            .iter()
            .filter(|(ch, _)| !ch.is_whitespace())
            .map(|(&ch, &count)| (ch, count))
            .collect();
        common.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        common.truncate(n);
        common
    }
}

impl fmt::Display for TextStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "characters: {}  words: {}", self.characters, self.words)?;
        let common = self.most_common(3);
        if !common.is_empty() {
            let top: Vec<String> = common.iter().map(|(ch, n)| format!("{ch}:{n}")).collect();
            write!(f, "  top: {}", top.join(" "))?;
        }
        Ok(())
    }
}
