//! Word/subtype splitting for dictionary tokens.
//!
//! The English dictionaries mark a word's grammatical subtype with a dot
//! suffix: `light.n`, `turn.v`, `off.r`. The engine reports the marked token
//! verbatim.

/// Separator between a word and its subtype.
pub const SUBTYPE_SEPARATOR: char = '.';

/// Split a token at the first [`SUBTYPE_SEPARATOR`].
///
/// Everything after the first separator is the subtype, including any
/// further separators. Tokens without a separator have no subtype.
pub fn split_word_type(token: &str) -> (&str, Option<&str>) {
    match token.split_once(SUBTYPE_SEPARATOR) {
        Some((word, word_type)) => (word, Some(word_type)),
        None => (token, None),
    }
}
