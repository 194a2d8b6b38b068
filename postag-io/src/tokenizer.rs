//! Splitting raw text into embedding-table tokens.

use serde::{Deserialize, Serialize};

/// Options for [`Tokenizer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenizerConfig {
    /// Lower-case every token.
    pub lowercase: bool,
    /// Split punctuation away from words. When false, only whitespace splits.
    pub split_punctuation: bool,
}

impl Default for TokenizerConfig {
    fn default() -> Self {
        Self {
            lowercase: false,
            split_punctuation: true,
        }
    }
}

/// Word tokenizer in the style of GloVe vocabularies.
///
/// Within a whitespace-delimited word, runs of alphanumerics form tokens and
/// every other character stands alone, except that:
/// - digits joined by `.` or `,` stay together (`3.14`, `1,000`)
/// - an apostrophe followed by letters starts a new token (`don't` → `don`, `'t`)
#[derive(Debug, Clone, Default)]
pub struct Tokenizer {
    config: TokenizerConfig,
}

impl Tokenizer {
    pub fn new(config: TokenizerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TokenizerConfig {
        &self.config
    }

    /// Split `text` into tokens.
    pub fn tokenize(&self, text: &str) -> Vec<String> {
        let mut tokens = Vec::new();
        for word in text.split_whitespace() {
            if self.config.split_punctuation {
                split_word(word, &mut tokens);
            } else {
                tokens.push(word.to_string());
            }
        }
        if self.config.lowercase {
            for t in &mut tokens {
                *t = t.to_lowercase();
            }
        }
        tokens
    }
}

fn split_word(word: &str, out: &mut Vec<String>) {
    let chars: Vec<char> = word.chars().collect();
    let mut current = String::new();

    for (i, &c) in chars.iter().enumerate() {
        let next = chars.get(i + 1).copied();
        if c.is_alphanumeric() {
            current.push(c);
            continue;
        }

        let after_digit = current.chars().last().is_some_and(|p| p.is_ascii_digit());
        if (c == '.' || c == ',') && after_digit && next.is_some_and(|n| n.is_ascii_digit()) {
            current.push(c);
            continue;
        }

        if c == '\'' && !current.is_empty() && next.is_some_and(char::is_alphanumeric) {
            out.push(std::mem::take(&mut current));
            current.push(c);
            continue;
        }

        if !current.is_empty() {
            out.push(std::mem::take(&mut current));
        }
        out.push(c.to_string());
    }

    if !current.is_empty() {
        out.push(current);
    }
}
