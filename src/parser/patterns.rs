use std::sync::LazyLock;

use regex::Regex;

use crate::record::{FragmentContext, RawRecord};

static INLINE_ENTRY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?P<company>[^,|]+?),\s*(?P<city>[A-Za-z][A-Za-z .'-]*?),\s*(?P<region>[A-Z]{2}),\s*(?P<country>Canada|USA|United States),\s*(?P<level>[^,]+?),\s*(?P<comp>[^,]+?),\s*(?P<exp>[^,]+)$",
    )
    .unwrap()
});

static SUBMISSION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(?P<title>AI Engineer)\s*\|?\s*(?P<exp>\d+\s*-\s*\d+\s+Years?|Less than 1 Year|\d+\+?\s+Years?)\s*(?P<location>[^|$]+?)\s*submitted on\s+(?P<date>[A-Za-z]+\s+\d{1,2},\s+\d{4})\s*(?P<salary>\$?[\d,.]+\s*K?\s*[-–]\s*\$?[\d,.]+\s*K?|\$?[\d,.]+\s*K)\s*/\s*yr",
    )
    .unwrap()
});

/// One entry per line: "Acme Inc, Montreal, QC, Canada, L3, 107k|5k|10k, 2 yrs/2 yrs".
pub fn inline_entries(lines: &[String], file: &str) -> Vec<RawRecord> {
    let mut records = Vec::new();
    for (idx, line) in lines.iter().enumerate() {
        let Some(caps) = INLINE_ENTRY_RE.captures(line.trim()) else {
            continue;
        };
        let comp = caps["comp"].trim().to_string();
        let (compensation, breakdown) = if comp.contains('|') {
            (None, Some(comp))
        } else {
            (Some(comp), None)
        };
        records.push(RawRecord {
            company: Some(caps["company"].trim().to_string()),
            location: Some(format!(
                "{}, {}, {}",
                caps["city"].trim(),
                &caps["region"],
                &caps["country"]
            )),
            level: Some(caps["level"].trim().to_string()),
            experience: Some(caps["exp"].trim().to_string()),
            compensation,
            breakdown,
            context: FragmentContext {
                file: file.to_string(),
                fragment: idx,
                strategy: "inline-entries",
            },
            ..Default::default()
        });
    }
    records
}

/// User submissions over the flattened page:
/// "AI Engineer | 4-6 Years Montreal, QC submitted on Jan 5, 2025 $92K-$108K /yr".
pub fn glassdoor_submissions(text: &str, file: &str) -> Vec<RawRecord> {
    SUBMISSION_RE
        .captures_iter(text)
        .enumerate()
        .map(|(idx, caps)| {
            let salary = caps["salary"].trim().to_string();
            let is_range = salary.contains('-') || salary.contains('–');
            RawRecord {
                job_title: Some(caps["title"].to_string()),
                experience: Some(caps["exp"].trim().to_string()),
                location: Some(caps["location"].trim().to_string()),
                posted_date: Some(caps["date"].trim().to_string()),
                range: is_range.then(|| salary.clone()),
                compensation: (!is_range).then_some(salary),
                context: FragmentContext {
                    file: file.to_string(),
                    fragment: idx,
                    strategy: "glassdoor-submissions",
                },
                ..Default::default()
            }
        })
        .collect()
}
