//! Text and language code normalization.
//!
//! Everything that decides whether two strings are "the same" for matching
//! purposes lives here, so the extractor and the injector cannot drift apart.

use thiserror::Error;

/// A language code that cannot be normalized.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid language code '{code}'")]
pub struct InvalidLanguageCode {
    /// The code as given.
    pub code: String,
}

/// Trims, collapses whitespace runs to a single space and optionally lowercases.
///
/// # Examples
/// ```
/// use svg_translate::text::normalize_text;
///
/// assert_eq!(normalize_text("  Hello\n\t World ", true), "Hello World");
/// assert_eq!(normalize_text("Hello World", false), "hello world");
/// ```
#[must_use]
pub fn normalize_text(raw: &str, case_sensitive: bool) -> String {
    let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    if case_sensitive { collapsed } else { collapsed.to_lowercase() }
}

/// Normalizes a language tag to a simple IETF-like form.
///
/// This is a lightweight normalizer, not a BCP 47 parser: the primary subtag is
/// lowercased, two-letter subtags are uppercased and any other subtag is
/// title-cased. `_` and whitespace are accepted as separators.
///
/// # Errors
/// Returns [`InvalidLanguageCode`] when the code is empty after trimming.
pub fn normalize_lang(code: &str) -> Result<String, InvalidLanguageCode> {
    let mut pieces =
        code.split(|c: char| c == '-' || c == '_' || c.is_whitespace()).filter(|p| !p.is_empty());

    let Some(primary) = pieces.next() else {
        return Err(InvalidLanguageCode { code: code.to_string() });
    };

    let mut normalized = primary.to_lowercase();
    for piece in pieces {
        normalized.push('-');
        if piece.chars().count() == 2 {
            normalized.push_str(&piece.to_uppercase());
        } else {
            normalized.push_str(&title_case(piece));
        }
    }

    Ok(normalized)
}

/// `Latn`-style casing for script subtags.
fn title_case(piece: &str) -> String {
    let mut chars = piece.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect()
    })
}

/// Splits a `systemLanguage` attribute value into normalized codes.
///
/// SVG allows a comma-separated list (`"en, fr_ca"`); each entry is normalized
/// independently and order is preserved.
///
/// # Errors
/// Returns [`InvalidLanguageCode`] when any listed entry is empty.
pub fn split_languages(attr: &str) -> Result<Vec<String>, InvalidLanguageCode> {
    attr.split(',').map(normalize_lang).collect()
}

/// Splits a trailing four-digit year token off `text`.
///
/// Returns `(stem, year)` when the last whitespace-separated token is exactly
/// four ASCII digits and something precedes it. Other trailing digit runs
/// (`"Route 66"`, `"Area 51000"`) are not years.
///
/// # Examples
/// ```
/// use svg_translate::text::split_year_suffix;
///
/// assert_eq!(split_year_suffix("Population 2020"), Some(("Population", "2020")));
/// assert_eq!(split_year_suffix("Route 66"), None);
/// assert_eq!(split_year_suffix("2020"), None);
/// ```
#[must_use]
pub fn split_year_suffix(text: &str) -> Option<(&str, &str)> {
    let (stem, year) = text.trim_end().rsplit_once(char::is_whitespace)?;
    if year.len() != 4 || !year.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    let stem = stem.trim_end();
    if stem.is_empty() { None } else { Some((stem, year)) }
}
