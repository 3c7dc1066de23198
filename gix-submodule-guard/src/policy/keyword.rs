//! The word a commit message has to contain when a commit changes a submodule.

use bstr::{BStr, ByteSlice};

use crate::Error;

/// The keyword used when nothing else is configured.
pub const DEFAULT_KEYWORD: &str = "submodule";

/// A non-empty literal, matched case-insensitively anywhere in a commit message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Keyword {
    text: String,
    lowercase: String,
}

impl Keyword {
    /// Create a keyword from `text` without its surrounding whitespace, failing if nothing is left.
    pub fn new(text: impl Into<String>) -> Result<Self, Error> {
        let text = text.into().trim().to_owned();
        if text.is_empty() {
            return Err(Error::Config("the submodule keyword must not be empty".into()));
        }
        let lowercase = text.to_lowercase();
        Ok(Keyword { text, lowercase })
    }

    /// The keyword as configured.
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Returns true if `message` contains the keyword, ignoring case.
    pub fn is_mentioned_in(&self, message: &BStr) -> bool {
        message.to_lowercase().find(self.lowercase.as_bytes()).is_some()
    }
}

impl Default for Keyword {
    fn default() -> Self {
        Keyword {
            text: DEFAULT_KEYWORD.into(),
            lowercase: DEFAULT_KEYWORD.into(),
        }
    }
}

impl std::fmt::Display for Keyword {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matching_ignores_case_and_position() {
        let keyword = Keyword::default();
        for message in [
            "Added library as submodule",
            "SUBMODULE bump",
            "update Submodules\n\nlong body",
            "subject\n\nAlso moves the submodule pointer.",
        ] {
            assert!(keyword.is_mentioned_in(message.into()), "{message:?}");
        }
    }

    #[test]
    fn partial_words_do_not_match() {
        let keyword = Keyword::default();
        for message in ["Added todo to readme file", "sub module", "submodul", ""] {
            assert!(!keyword.is_mentioned_in(message.into()), "{message:?}");
        }
    }

    #[test]
    fn custom_keywords_are_lowercased_once() {
        let keyword = Keyword::new("Vendored").unwrap();
        assert_eq!(keyword.as_str(), "Vendored");
        assert!(keyword.is_mentioned_in("update VENDORED deps".into()));
        assert!(!keyword.is_mentioned_in("update submodule".into()));
    }

    #[test]
    fn unicode_case_folding_applies() {
        let keyword = Keyword::new("Ünterprojekt").unwrap();
        assert!(keyword.is_mentioned_in("ÜNTERPROJEKT aktualisiert".into()));
    }

    #[test]
    fn empty_keywords_are_rejected() {
        assert!(matches!(Keyword::new(""), Err(Error::Config(_))));
        assert!(matches!(Keyword::new("  "), Err(Error::Config(_))));
    }

    #[test]
    fn surrounding_whitespace_is_not_part_of_the_keyword() {
        let keyword = Keyword::new("  submodule\t").unwrap();
        assert_eq!(keyword, Keyword::default());
        assert_eq!(keyword.to_string(), "submodule");
        assert!(keyword.is_mentioned_in("Bump submodule".into()));
        assert!(keyword.is_mentioned_in("submodule:bump".into()));
    }

    #[test]
    fn non_utf8_messages_are_searched_too() {
        let keyword = Keyword::default();
        assert!(keyword.is_mentioned_in(b"\xffbump submodule\xfe".as_bstr()));
    }
}
