// Copyright 2026 The Bowtie Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

use std::cmp::Ordering;

use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;

const NARROW_MAX_CHARS: usize = 18;
const MEDIUM_MAX_CHARS: usize = 32;

/// How wide a node card is drawn, chosen from the length of its text.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum WidthClass {
    Narrow,
    Medium,
    Wide,
}

impl WidthClass {
    pub fn for_text(text: &str) -> Self {
        match text.chars().count() {
            n if n <= NARROW_MAX_CHARS => WidthClass::Narrow,
            n if n <= MEDIUM_MAX_CHARS => WidthClass::Medium,
            _ => WidthClass::Wide,
        }
    }
}

/// A label split into the pieces a card renders separately.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LabelParts {
    /// Leading reference code such as `PB-1.2`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub badge: Option<String>,
    /// Leading pictographic character such as a flame or a shield.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub glyph: Option<String>,
    pub text: String,
}

lazy_static! {
    static ref BADGE_RE: Regex = Regex::new(r"^([A-Z]{1,3}-?\d+(?:\.\d+)*)(?:[\s:]+|$)").unwrap();
    static ref GLYPH_RE: Regex = Regex::new(r"^(\p{Extended_Pictographic}\x{FE0F}?)\s*").unwrap();
}

/// Split a label into badge, glyph and remaining text.  Badge and glyph
/// may appear in either order; each is taken at most once.
pub fn parse_label(label: &str) -> LabelParts {
    let mut rest = label.trim();
    let mut parts = LabelParts::default();

    for _ in 0..2 {
        if parts.badge.is_none()
            && let Some(caps) = BADGE_RE.captures(rest)
        {
            parts.badge = Some(caps[1].to_string());
            rest = &rest[caps[0].len()..];
            continue;
        }
        if parts.glyph.is_none()
            && let Some(caps) = GLYPH_RE.captures(rest)
        {
            parts.glyph = Some(caps[1].to_string());
            rest = &rest[caps[0].len()..];
            continue;
        }
        break;
    }

    parts.text = rest.trim().to_string();
    parts
}

/// Compare strings so that embedded numbers sort by value: "B2" < "B10".
/// Text runs compare case-insensitively first; ties fall back to a plain
/// comparison so the order is total.
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let mut left = Runs::new(a);
    let mut right = Runs::new(b);
    loop {
        let ord = match (left.next(), right.next()) {
            (None, None) => break,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(l), Some(r)) => compare_runs(l, r),
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    a.cmp(b)
}

fn compare_runs(l: &str, r: &str) -> Ordering {
    let l_digit = l.starts_with(|c: char| c.is_ascii_digit());
    let r_digit = r.starts_with(|c: char| c.is_ascii_digit());
    match (l_digit, r_digit) {
        (true, true) => {
            let l = l.trim_start_matches('0');
            let r = r.trim_start_matches('0');
            l.len().cmp(&r.len()).then_with(|| l.cmp(r))
        }
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        (false, false) => l.to_lowercase().cmp(&r.to_lowercase()),
    }
}

/// Iterator over maximal runs of ASCII digits and of everything else.
struct Runs<'a> {
    rest: &'a str,
}

impl<'a> Runs<'a> {
    fn new(s: &'a str) -> Self {
        Runs { rest: s }
    }
}

impl<'a> Iterator for Runs<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<&'a str> {
        let first = self.rest.chars().next()?;
        let digits = first.is_ascii_digit();
        let end = self
            .rest
            .char_indices()
            .find(|(_, c)| c.is_ascii_digit() != digits)
            .map(|(i, _)| i)
            .unwrap_or(self.rest.len());
        let (run, rest) = self.rest.split_at(end);
        self.rest = rest;
        Some(run)
    }
}
