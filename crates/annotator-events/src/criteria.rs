//! Selection criteria attached to a selector entry.

/// A parsed, semicolon-separated criteria list.
///
/// Tokens are trimmed and empty tokens are dropped, so `"12345; ;67890"`
/// holds two tokens. A criteria list without tokens matches every event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Criteria {
    raw: String,
    tokens: Vec<String>,
}

impl Criteria {
    /// Parses a raw criteria string as found in the selector file.
    pub fn parse(raw: &str) -> Self {
        let tokens = raw
            .split(';')
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .map(str::to_string)
            .collect();
        Self {
            raw: raw.to_string(),
            tokens,
        }
    }

    /// The criteria string exactly as configured.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    /// Returns `true` when no token was configured.
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Matches when any token occurs inside `haystack`, or when empty.
    pub fn any_substring_of(&self, haystack: &str) -> bool {
        self.is_empty() || self.tokens.iter().any(|token| haystack.contains(token.as_str()))
    }

    /// Matches when any token equals `value`, or when empty.
    pub fn any_equal_to(&self, value: &str) -> bool {
        self.is_empty() || self.tokens.iter().any(|token| token == value)
    }
}

impl From<&str> for Criteria {
    fn from(raw: &str) -> Self {
        Self::parse(raw)
    }
}

impl std::fmt::Display for Criteria {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.raw)
    }
}
