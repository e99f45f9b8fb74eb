//! Block tokenizer (spec §4.2 "Parsing contract").
//!
//! A block is upper-cased, whitespace-stripped and comment-extracted before
//! it reaches this module (spec §4.2 responsibility boundary; `tinyg-gcode`
//! does the comment-stripping itself since the line assembler that hands us
//! raw bytes is out of scope — spec §1 "the G-code lexer of arbitrary
//! character quirks").

use crate::modal::ModalGroup;
use crate::status::StatusCode;
use heapless::Vec;

pub const MAX_WORDS_PER_BLOCK: usize = 24;

/// One `letter + numeric value` word (spec §4.2).
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Word {
    pub letter: char,
    pub value: f32,
}

/// Strip a trailing `;...` or in-line `(...)` comment and normalize case.
/// Returns `None` for a blank/comment-only line.
pub fn normalize_line(raw: &str) -> Option<heapless::String<128>> {
    let mut out: heapless::String<128> = heapless::String::new();
    let mut in_paren = false;
    for ch in raw.chars() {
        match ch {
            ';' if !in_paren => break,
            '(' => in_paren = true,
            ')' => in_paren = false,
            _ if in_paren => {}
            c if c.is_whitespace() => {}
            c => {
                let _ = out.push(c.to_ascii_uppercase());
            }
        }
    }
    if out.is_empty() {
        None
    } else {
        Some(out)
    }
}

/// Tokenize a normalized block into its constituent words.
pub fn tokenize(block: &str) -> Result<Vec<Word, MAX_WORDS_PER_BLOCK>, StatusCode> {
    let mut words = Vec::new();
    let chars: heapless::Vec<char, 160> = block.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        let letter = chars[i];
        if !letter.is_ascii_alphabetic() {
            return Err(StatusCode::ExpectedCommandLetter);
        }
        i += 1;
        let start = i;
        if i < chars.len() && (chars[i] == '+' || chars[i] == '-') {
            i += 1;
        }
        let mut saw_digit = false;
        while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
            if chars[i].is_ascii_digit() {
                saw_digit = true;
            }
            i += 1;
        }
        if !saw_digit {
            return Err(StatusCode::BadNumberFormat);
        }
        let mut numbuf: heapless::String<24> = heapless::String::new();
        for &c in &chars[start..i] {
            let _ = numbuf.push(c);
        }
        let value: f32 = numbuf.parse().map_err(|_| StatusCode::BadNumberFormat)?;
        words
            .push(Word { letter, value })
            .map_err(|_| StatusCode::UnsupportedStatement)?;
    }
    Ok(words)
}

/// The modal group a `G`/`M` word belongs to, or `None` for axis/parameter
/// words which never conflict with each other within a block.
pub fn modal_group_of(letter: char, value: f32) -> Option<ModalGroup> {
    match letter {
        'G' => {
            let code = value;
            if [0.0, 1.0, 2.0, 3.0, 80.0].contains(&code) {
                Some(ModalGroup::Motion)
            } else if [17.0, 18.0, 19.0].contains(&code) {
                Some(ModalGroup::Plane)
            } else if [20.0, 21.0].contains(&code) {
                Some(ModalGroup::Units)
            } else if [90.0, 91.0].contains(&code) {
                Some(ModalGroup::Distance)
            } else if [93.0, 94.0].contains(&code) {
                Some(ModalGroup::FeedRateMode)
            } else if (54.0..=59.0).contains(&code) {
                Some(ModalGroup::CoordinateSystem)
            } else if [4.0, 10.0, 28.0, 92.0, 53.0].contains(&code) {
                Some(ModalGroup::NonModal)
            } else {
                None
            }
        }
        'M' => {
            let code = value;
            if [0.0, 2.0, 30.0].contains(&code) {
                Some(ModalGroup::Stopping)
            } else if [3.0, 4.0, 5.0].contains(&code) {
                Some(ModalGroup::Spindle)
            } else {
                None
            }
        }
        _ => None,
    }
}

/// Check that at most one word from each modal group appears in `words`
/// (spec §4.2). Axis/parameter letters are exempt.
pub fn check_modal_group_violations(words: &[Word]) -> Result<(), StatusCode> {
    let mut seen: Vec<ModalGroup, 10> = Vec::new();
    for w in words {
        if let Some(group) = modal_group_of(w.letter, w.value) {
            if seen.contains(&group) {
                return Err(StatusCode::ModalGroupViolation);
            }
            let _ = seen.push(group);
        }
    }
    Ok(())
}
