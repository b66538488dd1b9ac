// src/language.rs

//! Heuristic script-based language detection and source/target resolution.

use serde::Serialize;

/// Returned when the script mix gives no clear answer.
pub const AUTO: &str = "auto";

/// Language every other language is flipped to when the detected source
/// already matches the selected target.
pub const PIVOT: &str = "en";

/// Resolved language pair for one translation task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LanguagePair {
    pub source: String,
    pub target: String,
}

/// Source and target collapsed into the same language.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LanguageConflict {
    pub language: String,
}

fn is_ignored(c: char) -> bool {
    c.is_whitespace() || matches!(c, '.' | ',' | ';' | ':' | '!' | '?' | '(' | ')' | '-' | '"' | '\'')
}

fn is_cyrillic(c: char) -> bool {
    matches!(c, 'а'..='я' | 'А'..='Я' | 'ё' | 'Ё')
}

/// Classify `text` as `en`, `ru` or `auto` by counting letters per script.
///
/// The winning script needs strictly more letters than each of the other
/// two; a tie, an "other" majority, or no letters at all yields `auto`.
pub fn detect_source(text: &str) -> &'static str {
    let (mut latin, mut cyrillic, mut other) = (0usize, 0usize, 0usize);

    for c in text.chars().filter(|c| !is_ignored(*c)) {
        if c.is_ascii_alphabetic() {
            latin += 1;
        } else if is_cyrillic(c) {
            cyrillic += 1;
        } else if c.is_alphabetic() {
            other += 1;
        }
    }

    if cyrillic > latin && cyrillic > other {
        "ru"
    } else if latin > cyrillic && latin > other {
        "en"
    } else {
        AUTO
    }
}

/// Pick the target language for a detected source and the user's choice.
pub fn resolve_target(source: &str, selected: &str) -> String {
    if source == PIVOT || source == AUTO {
        selected.to_string()
    } else if source == selected {
        PIVOT.to_string()
    } else {
        selected.to_string()
    }
}

/// Detect the source of `text` and resolve the pair against `selected`.
pub fn resolve(text: &str, selected: &str) -> Result<LanguagePair, LanguageConflict> {
    let source = detect_source(text);
    let target = resolve_target(source, selected);

    if source == target {
        return Err(LanguageConflict {
            language: target,
        });
    }

    Ok(LanguagePair {
        source: source.to_string(),
        target,
    })
}

/// English name of a supported language code, used in prompt-style
/// request templates. Unknown codes are returned unchanged.
pub fn language_name(code: &str) -> &str {
    match code {
        "en" => "English",
        "ru" => "Russian",
        "de" => "German",
        "fr" => "French",
        "es" => "Spanish",
        "it" => "Italian",
        "ja" => "Japanese",
        "zh" => "Chinese",
        "ko" => "Korean",
        "ar" => "Arabic",
        other => other,
    }
}
