use std::sync::LazyLock;

use regex::Regex;

static RANGE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\d+)(?:\.\d+)?\s*(?:-|–|to)\s*(\d+)(?:\.\d+)?\s*(?:\+)?\s*(?:yrs?|years?)?").unwrap()
});
static SINGLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(\d+)(?:\.\d+)?\s*\+?\s*(?:yrs?|years?)?").unwrap());
static LESS_THAN_ONE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)less than (?:1|one) year").unwrap());

/// Inclusive years-of-experience span. A point value has `min == max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct YearSpan {
    pub min: u32,
    pub max: u32,
}

impl YearSpan {
    pub fn point(years: u32) -> Self {
        Self { min: years, max: years }
    }
}

/// "2 yrs" → 2..2, "4-6 Years" → 4..6, "Less than 1 Year" → 0..0, "4.5" → 4..4.
/// Ranges keep both ends; nothing is averaged. Reversed ends are swapped.
pub fn parse_years(text: &str) -> Option<YearSpan> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    if LESS_THAN_ONE_RE.is_match(text) {
        return Some(YearSpan::point(0));
    }
    if let Some(caps) = RANGE_RE.captures(text) {
        let a: u32 = caps[1].parse().ok()?;
        let b: u32 = caps[2].parse().ok()?;
        return Some(YearSpan {
            min: a.min(b),
            max: a.max(b),
        });
    }
    let caps = SINGLE_RE.captures(text)?;
    caps[1].parse().ok().map(YearSpan::point)
}

/// Levels.fyi prints total and at-company experience together: "2 yrs / 1 yr".
/// Returns (total, at_company).
pub fn parse_tenure(text: &str) -> (Option<YearSpan>, Option<u32>) {
    match text.split_once('/') {
        Some((total, at_company)) => (
            parse_years(total),
            parse_years(at_company).map(|s| s.min),
        ),
        None => (parse_years(text), None),
    }
}
