//! # engine::parser
//!
//! **Signal Parser** — turns free-text directives into [`Signal`]s.
//!
//! ## Grammar
//! ```text
//! text   := token*
//! token  := WORD | '=' | SPACE | OTHER
//! WORD   := [A-Za-z0-9_]+
//! pair   := WORD SPACE? '=' SPACE? WORD
//! ```
//!
//! * **Direction** — a WORD containing `entry` (case-insensitive) makes the
//!   signal an ENTRY. Otherwise a WORD containing `exit` makes it an EXIT.
//!   ENTRY is checked first, so a text carrying both keywords is an ENTRY.
//! * **Threshold** — the first pair whose key ends with `stopPx` and whose
//!   value starts with digits. The leading digits are the threshold.
//! * **Symbol** — the first pair whose key ends with `sym`. The whole value
//!   WORD is the symbol.
//!
//! Missing or malformed fields fall back to defaults. The only failure is a
//! text with no direction keyword at all.

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{info, warn};

use crate::models::{Signal, SignalKind};

/// Symbol used when the text carries no `sym=` pair.
pub const DEFAULT_SYMBOL: &str = "BTCUSDT";

/// Threshold used when the text carries no usable `stopPx=` pair.
pub const DEFAULT_THRESHOLD: u64 = 0;

const ENTRY_KEYWORD: &str = "entry";
const EXIT_KEYWORD: &str = "exit";
const THRESHOLD_KEY: &str = "stoppx";
const SYMBOL_KEY: &str = "sym";

// ─── Error ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("no entry/exit keyword found in signal text")]
    NoDirectionKeyword,
}

// ─── Tokenizer ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Token<'a> {
    Word(&'a str),
    Equals,
    Space,
    Other,
}

#[inline]
fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Split `text` into tokens. Consecutive word chars form one `Word`,
/// consecutive whitespace forms one `Space`.
fn tokenize(text: &str) -> Vec<Token<'_>> {
    let mut tokens = Vec::new();
    let mut chars  = text.char_indices().peekable();

    while let Some((start, c)) = chars.next() {
        if is_word_char(c) {
            let mut end = start + c.len_utf8();
            while let Some(&(i, next)) = chars.peek() {
                if !is_word_char(next) {
                    break;
                }
                end = i + next.len_utf8();
                chars.next();
            }
            tokens.push(Token::Word(&text[start..end]));
        } else if c.is_whitespace() {
            while chars.peek().is_some_and(|&(_, next)| next.is_whitespace()) {
                chars.next();
            }
            tokens.push(Token::Space);
        } else if c == '=' {
            tokens.push(Token::Equals);
        } else {
            tokens.push(Token::Other);
        }
    }

    tokens
}

fn words<'a>(tokens: &'a [Token<'a>]) -> impl Iterator<Item = &'a str> + 'a {
    tokens.iter().filter_map(|t| match t {
        Token::Word(w) => Some(*w),
        _ => None,
    })
}

/// Resolve the direction. ENTRY wins over EXIT when both keywords appear.
fn direction(tokens: &[Token<'_>]) -> Option<SignalKind> {
    let has = |keyword: &str| {
        words(tokens).any(|w| w.to_ascii_lowercase().contains(keyword))
    };

    if has(ENTRY_KEYWORD) {
        Some(SignalKind::Entry)
    } else if has(EXIT_KEYWORD) {
        Some(SignalKind::Exit)
    } else {
        None
    }
}

/// Scan `key = value` pairs in order and return the first value `accept`
/// takes. `key_suffix` must be lowercase.
fn first_pair_value<'a, T>(
    tokens:     &[Token<'a>],
    key_suffix: &str,
    accept:     impl Fn(&'a str) -> Option<T>,
) -> Option<T> {
    let skip_space = |mut i: usize| {
        if matches!(tokens.get(i), Some(Token::Space)) {
            i += 1;
        }
        i
    };

    for (i, token) in tokens.iter().enumerate() {
        let Token::Word(key) = token else { continue };
        if !key.to_ascii_lowercase().ends_with(key_suffix) {
            continue;
        }

        let eq = skip_space(i + 1);
        if tokens.get(eq) != Some(&Token::Equals) {
            continue;
        }

        if let Some(Token::Word(value)) = tokens.get(skip_space(eq + 1)) {
            if let Some(found) = accept(*value) {
                return Some(found);
            }
        }
    }

    None
}

fn threshold_value(value: &str) -> Option<u64> {
    let end    = value.find(|c: char| !c.is_ascii_digit()).unwrap_or(value.len());
    let digits = &value[..end];
    if digits.is_empty() {
        return None;
    }

    Some(digits.parse().unwrap_or_else(|_| {
        warn!(digits, "stopPx out of range — using default threshold");
        DEFAULT_THRESHOLD
    }))
}

// ─── Public API ───────────────────────────────────────────────────────────────

/// Parse `text` using the current wall clock as the signal timestamp.
pub fn parse(text: &str) -> Result<Signal, ParseError> {
    parse_at(text, Utc::now())
}

/// Parse `text`, stamping the result with `now`.
pub fn parse_at(text: &str, now: DateTime<Utc>) -> Result<Signal, ParseError> {
    info!(raw = %text, "📩 Parsing signal");

    let tokens = tokenize(text);

    let Some(kind) = direction(&tokens) else {
        warn!(raw = %text, "✗ No entry/exit found in signal");
        return Err(ParseError::NoDirectionKeyword);
    };

    let threshold = first_pair_value(&tokens, THRESHOLD_KEY, threshold_value)
        .unwrap_or(DEFAULT_THRESHOLD);

    let symbol = first_pair_value(&tokens, SYMBOL_KEY, |v| Some(v.to_string()))
        .unwrap_or_else(|| DEFAULT_SYMBOL.to_string());

    info!(%kind, threshold, %symbol, "✓ Signal parsed");

    Ok(Signal {
        kind,
        threshold,
        symbol,
        timestamp: now,
        raw: text.to_string(),
    })
}

// ─── Tests ────────────────────────────────────────────────────────────────────
