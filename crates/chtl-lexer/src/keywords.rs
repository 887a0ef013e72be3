//! Keyword configuration.
//!
//! The keyword set is an ordinary value handed to each [`Lexer`](crate::Lexer)
//! rather than a global table, so one compilation can register aliases
//! (through a `[Configuration] { [Name] { ... } }` block) without affecting any
//! other.

use std::collections::HashMap;

/// Statement keywords.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Keyword {
    Text,
    Style,
    Script,
    Inherit,
    Delete,
    Insert,
    After,
    Before,
    Replace,
    At,
    Top,
    Bottom,
    From,
    As,
    Except,
    Use,
    If,
    Else,
}

const KEYWORDS: &[(Keyword, &str, &str)] = &[
    (Keyword::Text, "text", "KEYWORD_TEXT"),
    (Keyword::Style, "style", "KEYWORD_STYLE"),
    (Keyword::Script, "script", "KEYWORD_SCRIPT"),
    (Keyword::Inherit, "inherit", "KEYWORD_INHERIT"),
    (Keyword::Delete, "delete", "KEYWORD_DELETE"),
    (Keyword::Insert, "insert", "KEYWORD_INSERT"),
    (Keyword::After, "after", "KEYWORD_AFTER"),
    (Keyword::Before, "before", "KEYWORD_BEFORE"),
    (Keyword::Replace, "replace", "KEYWORD_REPLACE"),
    (Keyword::At, "at", "KEYWORD_AT"),
    (Keyword::Top, "top", "KEYWORD_TOP"),
    (Keyword::Bottom, "bottom", "KEYWORD_BOTTOM"),
    (Keyword::From, "from", "KEYWORD_FROM"),
    (Keyword::As, "as", "KEYWORD_AS"),
    (Keyword::Except, "except", "KEYWORD_EXCEPT"),
    (Keyword::Use, "use", "KEYWORD_USE"),
    (Keyword::If, "if", "KEYWORD_IF"),
    (Keyword::Else, "else", "KEYWORD_ELSE"),
];

impl Keyword {
    /// Spelling in the default table.
    pub fn default_word(self) -> &'static str {
        KEYWORDS
            .iter()
            .find(|(kw, _, _)| *kw == self)
            .map(|(_, word, _)| *word)
            .unwrap_or("?")
    }

    /// Keyword named by a `[Name]` configuration key such as `KEYWORD_DELETE`.
    pub fn from_config_key(key: &str) -> Option<Self> {
        KEYWORDS
            .iter()
            .find(|(_, _, config_key)| *config_key == key)
            .map(|(kw, _, _)| *kw)
    }
}

/// Bracketed block keywords: `[Template]`, `[Custom]`, ...
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockKind {
    Template,
    Custom,
    Import,
    Namespace,
    Origin,
    Configuration,
    Name,
}

impl BlockKind {
    pub fn name(self) -> &'static str {
        match self {
            BlockKind::Template => "Template",
            BlockKind::Custom => "Custom",
            BlockKind::Import => "Import",
            BlockKind::Namespace => "Namespace",
            BlockKind::Origin => "Origin",
            BlockKind::Configuration => "Configuration",
            BlockKind::Name => "Name",
        }
    }
}

/// Word → keyword lookup used by the lexer.
#[derive(Debug, Clone)]
pub struct KeywordTable {
    words: HashMap<String, Keyword>,
    blocks: HashMap<String, BlockKind>,
}

impl Default for KeywordTable {
    fn default() -> Self {
        let words = KEYWORDS
            .iter()
            .map(|(kw, word, _)| (word.to_string(), *kw))
            .collect();
        let blocks = [
            BlockKind::Template,
            BlockKind::Custom,
            BlockKind::Import,
            BlockKind::Namespace,
            BlockKind::Origin,
            BlockKind::Configuration,
            BlockKind::Name,
        ]
        .into_iter()
        .map(|b| (b.name().to_string(), b))
        .collect();
        Self { words, blocks }
    }
}

impl KeywordTable {
    pub fn keyword(&self, word: &str) -> Option<Keyword> {
        self.words.get(word).copied()
    }

    /// Block keyword for the text between `[` and `]`.
    pub fn block(&self, name: &str) -> Option<BlockKind> {
        self.blocks.get(name).copied()
    }

    /// Make `word` an additional spelling of `keyword`.
    pub fn alias(&mut self, keyword: Keyword, word: &str) {
        self.words.insert(word.to_string(), keyword);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_table() {
        let table = KeywordTable::default();
        assert_eq!(table.keyword("delete"), Some(Keyword::Delete));
        assert_eq!(table.keyword("div"), None);
        assert_eq!(table.block("Custom"), Some(BlockKind::Custom));
        assert_eq!(table.block("Info"), None);
    }

    #[test]
    fn test_alias_keeps_original_spelling() {
        let mut table = KeywordTable::default();
        table.alias(Keyword::Delete, "remove");
        assert_eq!(table.keyword("remove"), Some(Keyword::Delete));
        assert_eq!(table.keyword("delete"), Some(Keyword::Delete));
    }

    #[test]
    fn test_config_keys() {
        assert_eq!(Keyword::from_config_key("KEYWORD_INSERT"), Some(Keyword::Insert));
        assert_eq!(Keyword::from_config_key("KEYWORD_NOPE"), None);
        assert_eq!(Keyword::Except.default_word(), "except");
    }
}
