//! # Note-Name Translation
//!
//! Bidirectional tables between English shorthand (`Af`, `Cs`) and Italian
//! solfège (`Lab`, `Dod`), each entry also carrying a spelling with proper
//! accidental symbols (`La♭`, `C♯`).
//!
//! The tables are built once with [`NameTables::build`] and passed to whatever
//! needs them; nothing here holds global state.
//!
//! ## Example
//! ```rust
//! use comping::names::{normalize_field, NameTables};
//!
//! let tables = NameTables::build();
//! assert_eq!(tables.forward["Bf"].plain, "Sib");
//! assert_eq!(tables.forward["Bf"].symbol, "Si♭");
//! assert_eq!(tables.reverse["Sib"].plain, "Bf");
//!
//! let proper = tables.proper_notation();
//! assert_eq!(normalize_field("Do Mib Solb", &proper).unwrap(), "Do Mi♭ Sol♭");
//! ```

use std::collections::BTreeMap;

use crate::error::DeckError;
use crate::pitch::{Letter, PitchName};

/// Token → replacement lookup used by [`normalize_field`]
pub type NoteTable = BTreeMap<String, String>;

/// Both spellings of one note name in the target convention
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Spelling {
    /// ASCII suffix spelling (`Lab`, `Af`)
    pub plain: String,
    /// Accidental-symbol spelling (`La♭`, `A♭`)
    pub symbol: String,
}

/// English ⇄ Italian note-name tables
#[derive(Debug, Clone)]
pub struct NameTables {
    /// English plain → Italian spellings
    pub forward: BTreeMap<String, Spelling>,
    /// Italian plain → English spellings
    pub reverse: BTreeMap<String, Spelling>,
}

impl NameTables {
    /// Build both tables over every letter with up to two flats or sharps
    pub fn build() -> Self {
        let mut forward = BTreeMap::new();
        let mut reverse = BTreeMap::new();

        for letter in Letter::ALL {
            for accidental in -2..=2 {
                let Some(name) = PitchName::new(letter, accidental) else {
                    continue;
                };
                let english = name.english_plain();
                let italian = name.italian_plain();

                forward.insert(
                    english.clone(),
                    Spelling {
                        symbol: with_symbols(&italian, 'b', 'd'),
                        plain: italian.clone(),
                    },
                );
                reverse.insert(
                    italian,
                    Spelling {
                        symbol: with_symbols(&english, 'f', 's'),
                        plain: english,
                    },
                );
            }
        }

        Self { forward, reverse }
    }

    /// English plain → Italian plain
    pub fn to_italian(&self) -> NoteTable {
        self.forward
            .iter()
            .map(|(k, v)| (k.clone(), v.plain.clone()))
            .collect()
    }

    /// Italian plain → English plain
    pub fn to_english(&self) -> NoteTable {
        self.reverse
            .iter()
            .map(|(k, v)| (k.clone(), v.plain.clone()))
            .collect()
    }

    /// Italian plain → Italian with accidental symbols
    pub fn proper_notation(&self) -> NoteTable {
        self.forward
            .values()
            .map(|s| (s.plain.clone(), s.symbol.clone()))
            .collect()
    }

    /// Resolve a token in either convention to a pitch name
    ///
    /// Italian tokens (`Mib`) are tried first, then English shorthand (`Eb`, `Ef`).
    pub fn lookup_pitch(&self, token: &str) -> Option<PitchName> {
        match self.reverse.get(token) {
            Some(spelling) => PitchName::parse(&spelling.plain).ok(),
            None => PitchName::parse(token).ok(),
        }
    }
}

/// Replace a trailing ASCII accidental run with its symbol (`Labb` → `La𝄫`)
fn with_symbols(plain: &str, flat: char, sharp: char) -> String {
    let stem = plain.trim_end_matches(&[flat, sharp][..]);
    let suffix = &plain[stem.len()..];

    let symbol = match suffix.chars().count() {
        0 => "",
        1 if suffix.starts_with(flat) => "♭",
        1 => "♯",
        _ if suffix.starts_with(flat) => "𝄫",
        _ => "𝄪",
    };
    format!("{}{}", stem, symbol)
}

/// Map every whitespace-separated token of `text` through `table`
///
/// Empty fields stay empty. Must only run on fields that are fully built: the
/// LilyPond markup depends on the unnormalized shorthand.
///
/// # Errors
/// [`DeckError::UnknownNote`] for the first token missing from the table.
pub fn normalize_field(text: &str, table: &NoteTable) -> Result<String, DeckError> {
    text.split_whitespace()
        .map(|token| {
            table
                .get(token)
                .cloned()
                .ok_or_else(|| DeckError::UnknownNote {
                    token: token.to_string(),
                    field: text.to_string(),
                })
        })
        .collect::<Result<Vec<_>, _>>()
        .map(|tokens| tokens.join(" "))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_sizes() {
        let tables = NameTables::build();
        assert_eq!(tables.forward.len(), 35);
        assert_eq!(tables.reverse.len(), 35);
    }

    #[test]
    fn test_forward_entries() {
        let tables = NameTables::build();
        let entry = |k: &str| tables.forward[k].clone();

        assert_eq!(entry("C").plain, "Do");
        assert_eq!(entry("C").symbol, "Do");
        assert_eq!(entry("Af").plain, "Lab");
        assert_eq!(entry("Af").symbol, "La♭");
        assert_eq!(entry("Fs").plain, "Fad");
        assert_eq!(entry("Fs").symbol, "Fa♯");
        assert_eq!(entry("Gs").plain, "Sold");
        assert_eq!(entry("Bff").symbol, "Si𝄫");
        assert_eq!(entry("Css").symbol, "Do𝄪");
    }

    #[test]
    fn test_reverse_entries() {
        let tables = NameTables::build();
        assert_eq!(tables.reverse["Sib"].plain, "Bf");
        assert_eq!(tables.reverse["Sib"].symbol, "B♭");
        assert_eq!(tables.reverse["Fa"].plain, "F");
        assert_eq!(tables.reverse["Fa"].symbol, "F");
        assert_eq!(tables.reverse["Fab"].symbol, "F♭");
        assert_eq!(tables.reverse["Mid"].symbol, "E♯");
    }

    #[test]
    fn test_tables_are_inverses() {
        let tables = NameTables::build();
        for (english, spelling) in &tables.forward {
            assert_eq!(&tables.reverse[&spelling.plain].plain, english);
        }
        for (italian, spelling) in &tables.reverse {
            assert_eq!(&tables.forward[&spelling.plain].plain, italian);
        }
    }

    #[test]
    fn test_normalize_round_trip() {
        let tables = NameTables::build();
        let to_italian = tables.to_italian();
        let to_english = tables.to_english();

        for english in tables.forward.keys() {
            let italian = normalize_field(english, &to_italian).unwrap();
            assert_eq!(&normalize_field(&italian, &to_english).unwrap(), english);
        }
    }

    #[test]
    fn test_normalize_field_joins_with_single_spaces() {
        let proper = NameTables::build().proper_notation();
        assert_eq!(
            normalize_field("  Re   Fad\tLa ", &proper).unwrap(),
            "Re Fa♯ La"
        );
        assert_eq!(normalize_field("", &proper).unwrap(), "");
    }

    #[test]
    fn test_normalize_field_unknown_token() {
        let proper = NameTables::build().proper_notation();
        match normalize_field("Do Xyz", &proper) {
            Err(DeckError::UnknownNote { token, field }) => {
                assert_eq!(token, "Xyz");
                assert_eq!(field, "Do Xyz");
            }
            other => panic!("expected UnknownNote, got {:?}", other),
        }
    }

    #[test]
    fn test_lookup_pitch_either_convention() {
        let tables = NameTables::build();
        let eb = PitchName::parse("Eb").unwrap();
        assert_eq!(tables.lookup_pitch("Mib"), Some(eb));
        assert_eq!(tables.lookup_pitch("Ef"), Some(eb));
        assert_eq!(tables.lookup_pitch("Eb"), Some(eb));
        assert_eq!(tables.lookup_pitch("Zz"), None);
    }
}
