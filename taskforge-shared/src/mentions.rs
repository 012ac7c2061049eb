/// Mention extraction
///
/// A mention is written `@[identifier]`, where the identifier is 1–64 ASCII
/// alphanumerics, `_`, `.` or `-`. The `@` must not directly follow a letter
/// or digit, so `name@[host]` inside an address is not a mention. Anything
/// that doesn't match exactly (bare `@word`, `@[]`, an unterminated bracket,
/// an over-long or illegal identifier) yields no token and scanning resumes
/// after the `@`.
///
/// # Example
///
/// ```
/// use taskforge_shared::mentions::{extract_mentions, MentionTokens};
///
/// let tokens: Vec<&str> = MentionTokens::new("ping @[ada] and @[Bob.S], not @carol").collect();
/// assert_eq!(tokens, vec!["ada", "Bob.S"]);
///
/// assert_eq!(extract_mentions("@[Ada] @[ada] @[bob]"), vec!["Ada", "bob"]);
/// ```

use std::collections::HashSet;

pub const MAX_IDENTIFIER_LEN: usize = 64;

fn is_identifier_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'_' | b'.' | b'-')
}

/// Whether `name` can be written inside `@[...]`
pub fn is_mentionable(name: &str) -> bool {
    !name.is_empty() && name.len() <= MAX_IDENTIFIER_LEN && name.bytes().all(is_identifier_byte)
}

/// Lazy iterator over the identifiers mentioned in a text
#[derive(Debug, Clone)]
pub struct MentionTokens<'a> {
    text: &'a str,
    pos: usize,
}

impl<'a> MentionTokens<'a> {
    pub fn new(text: &'a str) -> Self {
        Self { text, pos: 0 }
    }

    /// Attempts to read `[identifier]` right after the `@` at `at`
    fn token_at(&self, at: usize) -> Option<(usize, usize)> {
        let bytes = self.text.as_bytes();

        if at > 0 && bytes[at - 1].is_ascii_alphanumeric() {
            return None;
        }
        if bytes.get(at + 1) != Some(&b'[') {
            return None;
        }

        let start = at + 2;
        let len = bytes[start..]
            .iter()
            .take(MAX_IDENTIFIER_LEN + 1)
            .take_while(|b| is_identifier_byte(**b))
            .count();

        if len == 0 || len > MAX_IDENTIFIER_LEN {
            return None;
        }
        if bytes.get(start + len) != Some(&b']') {
            return None;
        }

        Some((start, start + len))
    }
}

impl<'a> Iterator for MentionTokens<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<Self::Item> {
        while self.pos < self.text.len() {
            let offset = self.text[self.pos..].find('@')?;
            let at = self.pos + offset;

            if let Some((start, end)) = self.token_at(at) {
                self.pos = end + 1;
                return Some(&self.text[start..end]);
            }
            self.pos = at + 1;
        }
        None
    }
}

/// Distinct identifiers in order of first appearance, compared ignoring case
pub fn extract_mentions(text: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    MentionTokens::new(text)
        .filter(|token| seen.insert(token.to_ascii_lowercase()))
        .map(str::to_string)
        .collect()
}
