//! Query classification and target-term extraction.
//!
//! Decides whether a query wants a bare definition (`Lookup`) or an
//! explanation (`Educational`), pulls out the word being asked about, and
//! guesses the lookup direction from Chamorro orthography. Pure functions
//! of the input text; unmatched patterns fall back to conservative
//! defaults instead of erroring.

use std::sync::LazyLock;

use serde::{Deserialize, Serialize};

static WHAT_DOES_RE: LazyLock<regex::Regex> = LazyLock::new(|| {
    regex::Regex::new(r"what does\s+(.+?)\s+mean").expect("what-does regex is valid")
});
static WHAT_IS_IN_ENGLISH_RE: LazyLock<regex::Regex> = LazyLock::new(|| {
    regex::Regex::new(r"what is\s+(.+?)\s+in english").expect("what-is regex is valid")
});
static WORD_FOR_RE: LazyLock<regex::Regex> = LazyLock::new(|| {
    regex::Regex::new(r"word for\s+([^?.!,]+)").expect("word-for regex is valid")
});
static TRANSLATE_RE: LazyLock<regex::Regex> = LazyLock::new(|| {
    regex::Regex::new(r"translate\s+(.+?)\s+to\b").expect("translate regex is valid")
});

/// Phrases that signal a desire to learn rather than look something up.
const EDUCATIONAL_PHRASES: &[&str] = &[
    "how do i",
    "how to",
    "teach me",
    "explain",
    "lesson",
    "grammar",
    "example",
    "practice",
    "learn",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryClass {
    /// Direct word/phrase translation or definition.
    Lookup,
    /// Explanation, grammar, or usage guidance.
    Educational,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LookupDirection {
    ChamorroToEnglish,
    EnglishToChamorro,
}

/// Flashcard context supplied by the caller, used to bias source selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CardType {
    Vocabulary,
    Phrase,
    Numbers,
    Cultural,
}

#[derive(Debug, Clone)]
pub struct ClassifiedQuery {
    pub raw: String,
    pub normalized: String,
    pub class: QueryClass,
    pub target_term: Option<String>,
    pub direction: LookupDirection,
    pub card_type: Option<CardType>,
}

/// Classify a raw query. Defaults to `Lookup` when nothing signals a
/// learning intent.
pub fn classify(query: &str) -> QueryClass {
    let q = query.to_lowercase();
    if EDUCATIONAL_PHRASES.iter().any(|p| q.contains(p)) {
        QueryClass::Educational
    } else {
        QueryClass::Lookup
    }
}

/// Extract the term the user is asking about. Tries each pattern in order;
/// the first match wins, and no match yields `None`.
pub fn extract_target_term(query: &str) -> Option<String> {
    if let Some(term) = extract_quoted(query) {
        return Some(term);
    }
    let q = query.to_lowercase();
    for re in [
        &*WHAT_DOES_RE,
        &*WHAT_IS_IN_ENGLISH_RE,
        &*WORD_FOR_RE,
        &*TRANSLATE_RE,
    ] {
        if let Some(caps) = re.captures(&q) {
            let term = caps[1].trim().trim_matches(|c| c == '\'' || c == '"').trim();
            if !term.is_empty() {
                return Some(term.to_string());
            }
        }
    }
    None
}

/// Quoted-substring extraction. The opening quote must sit at the start of
/// the text or after whitespace, and the closing quote must be followed by
/// whitespace, punctuation, `to`, `in`, `mean`, or the end of the text.
/// Those bounds keep a glota inside a word (lahi', na') from being read as
/// a closing quote.
fn extract_quoted(text: &str) -> Option<String> {
    let chars: Vec<char> = text.chars().collect();
    for quote in ['\'', '"'] {
        let open = chars.iter().enumerate().find_map(|(i, &c)| {
            let at_boundary = i == 0 || chars[i - 1].is_whitespace();
            (c == quote && at_boundary).then_some(i)
        });
        let Some(open) = open else { continue };
        // Take the LAST boundary-valid closing quote so word-internal
        // glotas stay part of the term.
        let close = chars
            .iter()
            .enumerate()
            .skip(open + 1)
            .filter(|&(i, &c)| c == quote && is_closing_boundary(&chars[i + 1..]))
            .map(|(i, _)| i)
            .last();
        if let Some(close) = close {
            let term: String = chars[open + 1..close].iter().collect();
            let term = term.trim();
            if !term.is_empty() {
                return Some(term.to_string());
            }
        }
    }
    None
}

fn is_closing_boundary(rest: &[char]) -> bool {
    match rest.first() {
        None => true,
        Some(c) if c.is_whitespace() || matches!(c, '?' | '.' | ',' | '!') => true,
        _ => {
            let tail: String = rest.iter().take(5).collect::<String>().to_lowercase();
            tail.starts_with("to ") || tail.starts_with("in ") || tail.starts_with("mean")
        }
    }
}

/// Guess the lookup direction. Chamorro orthography (å, ñ, the glota) in
/// the term, or an explicit ask for an English rendering, points at
/// Chamorro→English; everything else is treated as English→Chamorro.
pub fn lookup_direction(term: &str, normalized_query: &str) -> LookupDirection {
    let has_chamorro_marks = term
        .chars()
        .any(|c| matches!(c, 'å' | 'Å' | 'ñ' | 'Ñ' | '\''));
    if has_chamorro_marks
        || normalized_query.contains("in english")
        || normalized_query.contains("mean?")
        || normalized_query.contains("does ")
    {
        LookupDirection::ChamorroToEnglish
    } else {
        LookupDirection::EnglishToChamorro
    }
}

/// Run the full classification pass for one query.
pub fn classify_query(raw: &str, card_type: Option<CardType>) -> ClassifiedQuery {
    let normalized = normalize(raw);
    let class = classify(&normalized);
    let target_term = extract_target_term(raw);
    let direction = lookup_direction(target_term.as_deref().unwrap_or(""), &normalized);
    ClassifiedQuery {
        raw: raw.to_string(),
        normalized,
        class,
        target_term,
        direction,
        card_type,
    }
}

fn normalize(raw: &str) -> String {
    raw.to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}
