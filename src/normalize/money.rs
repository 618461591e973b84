use std::sync::LazyLock;

use regex::Regex;

// Either space-grouped thousands ("107 000") or a run of digits with , and .
static AMOUNT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(\d{1,3}(?:[ \u{a0}\u{202f}]\d{3})+(?:[.,]\d+)?|\d[\d,.]*)\s*([kKmM]?)([A-Za-z]?)",
    )
    .unwrap()
});

/// Compensation split as printed by the source. All components optional.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Breakdown {
    pub total: Option<u64>,
    pub base: Option<u64>,
    pub stock: Option<u64>,
    pub bonus: Option<u64>,
}

impl Breakdown {
    pub fn is_empty(&self) -> bool {
        self.total.is_none() && self.base.is_none() && self.stock.is_none() && self.bonus.is_none()
    }

    /// Explicit total if printed, otherwise the sum of whatever parts parsed.
    pub fn resolved_total(&self) -> Option<u64> {
        if self.total.is_some() {
            return self.total;
        }
        let parts = [self.base, self.stock, self.bonus];
        if parts.iter().all(Option::is_none) {
            return None;
        }
        Some(parts.iter().flatten().sum())
    }
}

fn is_absent(text: &str) -> bool {
    let t = text.trim();
    t.is_empty() || t == "-" || t == "—" || t.to_ascii_uppercase().contains("N/A")
}

/// Parse one money figure: "$86K", "107 000 $CA", "120,000 CAD", "875,5 k",
/// "71000.0". Returns `None` for N/A, dashes and anything without digits.
pub fn parse_amount(text: &str) -> Option<u64> {
    if is_absent(text) {
        return None;
    }
    let caps = AMOUNT_RE.captures(text)?;
    let number = caps[1].trim_end_matches([',', '.']);
    // A letter glued to the suffix means it was a word ("120 Montreal"), not a unit.
    let suffix = if caps[3].is_empty() { &caps[2] } else { "" };
    let multiplier = match suffix {
        "k" | "K" => 1_000.0,
        "m" | "M" => 1_000_000.0,
        _ => 1.0,
    };
    let value = parse_number(number, !suffix.is_empty())?;
    let scaled = (value * multiplier).round();
    if scaled.is_finite() && scaled >= 0.0 {
        Some(scaled as u64)
    } else {
        None
    }
}

/// Resolve grouping vs decimal separators. A separator followed by exactly
/// three digits groups thousands; anything else is the decimal point. With a
/// k/M suffix a lone separator is always decimal ("107.123k").
fn parse_number(raw: &str, has_suffix: bool) -> Option<f64> {
    let compact: String = raw
        .chars()
        .filter(|c| !matches!(c, ' ' | '\u{a0}' | '\u{202f}'))
        .collect();
    let seps: Vec<usize> = compact
        .char_indices()
        .filter(|(_, c)| *c == ',' || *c == '.')
        .map(|(i, _)| i)
        .collect();

    if seps.is_empty() {
        return compact.parse::<f64>().ok();
    }

    let decimal_at = if has_suffix && seps.len() == 1 {
        Some(seps[0])
    } else {
        let last = *seps.last()?;
        let tail = compact.len() - last - 1;
        if tail == 3 {
            None
        } else {
            Some(last)
        }
    };

    let mut normalized = String::with_capacity(compact.len());
    for (i, c) in compact.char_indices() {
        match c {
            ',' | '.' if Some(i) == decimal_at => normalized.push('.'),
            ',' | '.' => {}
            _ => normalized.push(c),
        }
    }
    normalized.parse::<f64>().ok()
}

/// Parse "107 k | 5 k | 10 k" (base | stock | bonus) or the four-part
/// "total | base | stock | bonus" form. N/A components stay absent.
pub fn parse_breakdown(text: &str) -> Breakdown {
    let parts: Vec<&str> = text.split('|').map(str::trim).collect();
    let amounts: Vec<Option<u64>> = parts.iter().map(|p| parse_amount(p)).collect();
    match amounts.as_slice() {
        [total, base, stock, bonus, ..] => Breakdown {
            total: *total,
            base: *base,
            stock: *stock,
            bonus: *bonus,
        },
        [base, stock, bonus] => Breakdown {
            base: *base,
            stock: *stock,
            bonus: *bonus,
            ..Default::default()
        },
        [base, stock] => Breakdown {
            base: *base,
            stock: *stock,
            ..Default::default()
        },
        [single] => Breakdown {
            total: *single,
            ..Default::default()
        },
        [] => Breakdown::default(),
    }
}

/// Parse "$72K - $110K", "$89K–$160K/yr" or "92-108K". Both ends required.
pub fn parse_range(text: &str) -> Option<(u64, u64)> {
    let cleaned = text
        .replace(['–', '—'], "-")
        .replace("/yr", "")
        .replace("/year", "");
    let (left, right) = cleaned.split_once('-')?;
    if !left.chars().any(|c| c.is_ascii_digit()) || !right.chars().any(|c| c.is_ascii_digit()) {
        return None;
    }
    let mut lo = parse_amount(left)?;
    let hi = parse_amount(right)?;

    // "92-108K": the suffix on the right end applies to a bare left end.
    if lo < 1_000 && hi >= 1_000 && !has_unit(left) && has_unit(right) {
        lo *= unit_multiplier(right);
    }
    Some((lo, hi))
}

fn has_unit(text: &str) -> bool {
    AMOUNT_RE
        .captures(text)
        .is_some_and(|c| !c[2].is_empty() && c[3].is_empty())
}

fn unit_multiplier(text: &str) -> u64 {
    match AMOUNT_RE.captures(text).map(|c| c[2].to_ascii_lowercase()) {
        Some(s) if s == "m" => 1_000_000,
        Some(s) if s == "k" => 1_000,
        _ => 1,
    }
}
