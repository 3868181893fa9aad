use std::ops::Range;
use std::sync::OnceLock;

use regex::Regex;

use crate::types::{CandidateSet, Candidates};

// ── Compiled regex cache ─────────────────────────────────────────────────────

macro_rules! re {
    ($name:ident, $pat:expr) => {
        fn $name() -> &'static Regex {
            static R: OnceLock<Regex> = OnceLock::new();
            R.get_or_init(|| Regex::new($pat).expect("invalid regex"))
        }
    };
}

re!(re_token, r"[0-9]+(?:\.[0-9]+)?|\p{L}+|\S");

// ── Vocabulary ───────────────────────────────────────────────────────────────

const DISTANCE_UNIT: &str = "km";

const DISTANCE_KEYWORDS: &[&str] = &["distance", "dist", "trip"];

/// Trip-meter designators that may follow `trip` (`TRIP A 123.4`).
const TRIP_METERS: &[&str] = &["a", "b"];

/// Bytes inspected before / after the start of a bare `<number> km` match.
const EXCLUSION_BEFORE: usize = 8;
const EXCLUSION_AFTER: usize = 12;

// ── Tokens ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
enum TokenKind {
    Number(f64),
    Word,
    Slash,
    /// `:` or `=` between a label and its value.
    Separator,
    Punct,
}

#[derive(Debug, Clone)]
struct Token<'a> {
    kind: TokenKind,
    text: &'a str,
    /// Byte span in the normalized, lower-cased text.
    span: Range<usize>,
}

impl Token<'_> {
    fn number(&self) -> Option<f64> {
        match self.kind {
            TokenKind::Number(n) => Some(n),
            _ => None,
        }
    }

    fn is_word(&self, word: &str) -> bool {
        self.kind == TokenKind::Word && self.text == word
    }

    fn is_word_in(&self, words: &[&str]) -> bool {
        self.kind == TokenKind::Word && words.contains(&self.text)
    }

    /// Any word starting with `l` counts as a fuel volume unit after `km/`
    /// or `km per`: `l`, `lt`, `ltrs`, `liter`, `litre`, OCR'd `lit`.
    fn is_fuel_unit(&self) -> bool {
        self.kind == TokenKind::Word && self.text.starts_with('l')
    }
}

fn tokenize(text: &str) -> Vec<Token<'_>> {
    re_token()
        .find_iter(text)
        .map(|m| {
            let s = m.as_str();
            let kind = if s.starts_with(|c: char| c.is_ascii_digit()) {
                s.parse().map(TokenKind::Number).unwrap_or(TokenKind::Punct)
            } else if s.chars().all(char::is_alphabetic) {
                TokenKind::Word
            } else {
                match s {
                    "/" => TokenKind::Slash,
                    ":" | "=" => TokenKind::Separator,
                    _ => TokenKind::Punct,
                }
            };
            Token { kind, text: s, span: m.range() }
        })
        .collect()
}

// ── Public extraction API ─────────────────────────────────────────────────────

pub struct Extractor;

impl Extractor {
    /// Pull fuel-efficiency and distance candidates out of recognized text.
    /// Never fails; unmatched text yields empty candidate sets.
    pub fn extract(raw_text: &str) -> Candidates {
        let display = normalize_whitespace(raw_text);
        let lower = display.to_lowercase();
        let tokens = tokenize(&lower);

        let km_per_liter = Self::km_per_liter_values(&tokens);
        let distance = Self::distance_values(&tokens);

        Candidates {
            km_per_liter: CandidateSet::new(display.clone(), km_per_liter),
            distance: CandidateSet::new(display, distance),
        }
    }

    // ── Fuel efficiency ───────────────────────────────────────────────────────

    fn km_per_liter_values(tokens: &[Token<'_>]) -> Vec<f64> {
        // `<number> km/l`
        let number_first = (0..tokens.len()).filter_map(|i| {
            let n = tokens[i].number()?;
            fuel_unit_len(tokens, i + 1).map(|_| n)
        });

        // `km/l: <number>`
        let unit_first = (0..tokens.len()).filter_map(|i| {
            let len = fuel_unit_len(tokens, i)?;
            labelled_number(tokens, i + len)
        });

        number_first.chain(unit_first).collect()
    }

    // ── Distance ──────────────────────────────────────────────────────────────

    fn distance_values(tokens: &[Token<'_>]) -> Vec<f64> {
        let markers = efficiency_markers(tokens);

        // `<number> km`, unless an efficiency unit sits right around it.
        let bare_unit = tokens.windows(2).filter_map(|pair| {
            let n = pair[0].number()?;
            if !pair[1].is_word(DISTANCE_UNIT) {
                return None;
            }
            if near_efficiency_marker(&markers, pair[0].span.start) {
                return None;
            }
            Some(n)
        });

        // `distance: <number>`, `trip a 12.3`
        let keyword = (0..tokens.len()).filter_map(|i| {
            if !tokens[i].is_word_in(DISTANCE_KEYWORDS) {
                return None;
            }
            let mut j = i + 1;
            if tokens[i].is_word("trip") && tokens.get(j).is_some_and(|t| t.is_word_in(TRIP_METERS)) {
                j += 1;
            }
            labelled_number(tokens, j)
        });

        bare_unit.chain(keyword).collect()
    }
}

/// Collapse whitespace runs to a single space and trim.
fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Length in tokens of a `km / l` or `km per l` unit starting at `i`.
fn fuel_unit_len(tokens: &[Token<'_>], i: usize) -> Option<usize> {
    let [km, joiner, unit] = tokens.get(i..i + 3)? else {
        return None;
    };
    let joined = joiner.kind == TokenKind::Slash || joiner.is_word("per");
    (km.is_word(DISTANCE_UNIT) && joined && unit.is_fuel_unit()).then_some(3)
}

/// A number at `i`, optionally preceded by a `:` / `=` separator.
fn labelled_number(tokens: &[Token<'_>], i: usize) -> Option<f64> {
    let token = tokens.get(i)?;
    if token.kind == TokenKind::Separator {
        return tokens.get(i + 1)?.number();
    }
    token.number()
}

/// Spans of text that mark a fuel-efficiency unit: `/ l`, `per l` and `km l`.
/// Each span ends just after the first letter of the fuel unit.
fn efficiency_markers(tokens: &[Token<'_>]) -> Vec<Range<usize>> {
    tokens
        .windows(2)
        .filter(|pair| {
            let lead = &pair[0];
            (lead.kind == TokenKind::Slash || lead.is_word("per") || lead.is_word(DISTANCE_UNIT))
                && pair[1].is_fuel_unit()
        })
        .map(|pair| pair[0].span.start..pair[1].span.start + 1)
        .collect()
}

/// True when an efficiency marker lies entirely inside the window around a
/// number starting at byte `start`.
fn near_efficiency_marker(markers: &[Range<usize>], start: usize) -> bool {
    let window = start.saturating_sub(EXCLUSION_BEFORE)..start + EXCLUSION_AFTER;
    markers
        .iter()
        .any(|m| m.start >= window.start && m.end <= window.end)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
