use std::sync::LazyLock;

use regex::Regex;

use crate::record::{FragmentContext, RawRecord};

static LOCATION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^([A-Za-z][A-Za-z .'-]*,\s*[A-Z]{2}(?:,\s*(?:Canada|USA|United States))?)(?:\s*\|\s*(.+))?$",
    )
    .unwrap()
});
static REMOTE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^remote(?:\s*\|\s*(.+))?$").unwrap());
static EXPERIENCE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:\d+(?:\s*-\s*\d+)?\s*(?:yrs?|years?)(?:\s*/\s*\d+\s*(?:yrs?|years?))?|less than 1 year)$")
        .unwrap()
});
static MONEY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\$?\s*\d[\d\s,.]*\s*(?:k|m)?\s*(?:\$\s*CA|CAD|USD|\$)?(?:\s*includes equity)?$")
        .unwrap()
});
static MONEY_MARKER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\d\s*k\b|\$|\bCAD\b|\d{1,3}[ \u{a0}]\d{3}\b").unwrap());
static LEVEL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:L\d|IC\d|E\d|P\d|Senior|Junior|Associate|Staff|Principal|Director|Intermediate)\b.{0,32}$")
        .unwrap()
});
static TITLE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:.*\bML\s*/\s*AI\b.*|.*machine learning.*|.*\bAI Engineer\b.*|software engineer.*)$")
        .unwrap()
});

/// What one line of flattened page text looks like.
#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    Company(String),
    Location { location: String, posted: Option<String> },
    Experience(String),
    Compensation(String),
    Level(String),
    Title(String),
    Text(String),
}

pub fn classify_lines(lines: &[String], companies: &[String]) -> Vec<Block> {
    lines.iter().map(|l| classify_line(l.trim(), companies)).collect()
}

fn classify_line(line: &str, companies: &[String]) -> Block {
    // ── Location, optionally with "| posted" ──
    if let Some(caps) = LOCATION_RE.captures(line) {
        return Block::Location {
            location: caps[1].trim().to_string(),
            posted: caps.get(2).map(|m| m.as_str().trim().to_string()),
        };
    }
    if let Some(caps) = REMOTE_RE.captures(line) {
        return Block::Location {
            location: "Remote".into(),
            posted: caps.get(1).map(|m| m.as_str().trim().to_string()),
        };
    }

    // ── Experience: "2 yrs", "2-4 yrs", "2 yrs / 1 yr" ──
    if EXPERIENCE_RE.is_match(line) {
        return Block::Experience(line.to_string());
    }

    // ── Compensation: needs a money marker so bare years/page numbers stay text ──
    if line.contains('|') {
        let parts: Vec<&str> = line.split('|').map(str::trim).collect();
        let moneyish = parts
            .iter()
            .all(|p| p.eq_ignore_ascii_case("N/A") || MONEY_RE.is_match(p));
        if parts.len() >= 2 && moneyish && parts.iter().any(|p| MONEY_MARKER_RE.is_match(p)) {
            return Block::Compensation(line.to_string());
        }
    } else if MONEY_RE.is_match(line) && MONEY_MARKER_RE.is_match(line) {
        return Block::Compensation(line.to_string());
    }

    if LEVEL_RE.is_match(line) {
        return Block::Level(line.to_string());
    }

    if let Some(name) = match_company(line, companies) {
        return Block::Company(name);
    }

    if line.len() <= 40 && TITLE_RE.is_match(line) {
        return Block::Title(line.to_string());
    }

    Block::Text(line.to_string())
}

/// A short line naming a known employer. Keeps the page's spelling
/// ("Intact Financial") when the line is name-sized.
fn match_company(line: &str, companies: &[String]) -> Option<String> {
    let lower = line.to_lowercase();
    let known = companies.iter().find(|c| {
        let c = c.to_lowercase();
        lower == c || lower.starts_with(&format!("{} ", c)) || lower.starts_with(&format!("{}.", c))
    })?;
    if line.len() <= 40 {
        Some(line.to_string())
    } else {
        Some(known.clone())
    }
}

/// Walk classified lines and emit a candidate each time a compensation line
/// closes an entry that already has an employer and a location. A breakdown
/// line right after the headline figure belongs to the same entry.
pub fn assemble(blocks: &[Block], file: &str) -> Vec<RawRecord> {
    let mut records = Vec::new();
    let mut cur = RawRecord::default();
    let mut start = 0;
    let mut i = 0;

    while i < blocks.len() {
        match &blocks[i] {
            Block::Company(name) => {
                cur = RawRecord {
                    company: Some(name.clone()),
                    ..Default::default()
                };
                start = i;
            }
            Block::Location { location, posted } => {
                cur.location = Some(location.clone());
                if posted.is_some() {
                    cur.posted_date = posted.clone();
                }
            }
            Block::Level(level) => cur.level = Some(level.clone()),
            Block::Title(title) => cur.job_title = Some(title.clone()),
            Block::Experience(text) => {
                if cur.experience.is_none() {
                    cur.experience = Some(text.clone());
                } else if cur.experience_at_company.is_none() {
                    cur.experience_at_company = Some(text.clone());
                }
            }
            Block::Compensation(text) if cur.company.is_some() && cur.location.is_some() => {
                if text.contains('|') {
                    cur.breakdown = Some(text.clone());
                } else {
                    cur.compensation = Some(text.clone());
                    // Scan ahead for the breakdown (skipping free text)
                    let mut j = i + 1;
                    while j < blocks.len() && j < i + 4 {
                        match &blocks[j] {
                            Block::Text(_) => j += 1,
                            Block::Compensation(b) if b.contains('|') => {
                                cur.breakdown = Some(b.clone());
                                i = j;
                                break;
                            }
                            _ => break,
                        }
                    }
                }
                cur.context = FragmentContext {
                    file: file.to_string(),
                    fragment: start,
                    strategy: "line-blocks",
                };
                records.push(std::mem::take(&mut cur));
            }
            Block::Compensation(_) | Block::Text(_) => {}
        }
        i += 1;
    }

    records
}
