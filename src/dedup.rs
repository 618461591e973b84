//! Duplicate suppression ahead of aggregation.
//!
//! Both strategies only filter: records are never modified, the first one
//! seen is kept, and later duplicates are counted and dropped.

use std::collections::{BTreeSet, HashMap, HashSet};

use tracing::{debug, info};

use crate::record::SalaryRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DedupStrategy {
    /// Identical (location, salary_median, experience_years_min).
    Exact,
    /// Same company and city with medians closer than `tolerance`.
    Fuzzy { tolerance: u64 },
    None,
}

#[derive(Debug, Default)]
pub struct DedupOutcome {
    pub kept: Vec<SalaryRecord>,
    pub dropped: usize,
}

pub fn dedup(records: Vec<SalaryRecord>, strategy: DedupStrategy) -> DedupOutcome {
    match strategy {
        DedupStrategy::None => DedupOutcome {
            kept: records,
            dropped: 0,
        },
        DedupStrategy::Exact => exact(records),
        DedupStrategy::Fuzzy { tolerance } => {
            let mut index = FuzzyIndex::new(tolerance);
            let mut out = DedupOutcome::default();
            for rec in records {
                if index.is_duplicate(&rec) {
                    out.dropped += 1;
                } else {
                    index.insert(&rec);
                    out.kept.push(rec);
                }
            }
            out
        }
    }
}

fn exact(records: Vec<SalaryRecord>) -> DedupOutcome {
    let mut seen: HashSet<(String, u64, Option<u32>)> = HashSet::new();
    let mut out = DedupOutcome::default();
    for rec in records {
        let key = (
            rec.location.clone(),
            rec.salary_median,
            rec.experience_years_min,
        );
        if seen.insert(key) {
            out.kept.push(rec);
        } else {
            debug!(location = %rec.location, median = rec.salary_median, "Exact duplicate dropped");
            out.dropped += 1;
        }
    }
    out
}

/// Medians seen so far per (company, city), case-insensitive.
struct FuzzyIndex {
    tolerance: u64,
    seen: HashMap<(String, String), Vec<u64>>,
}

impl FuzzyIndex {
    fn new(tolerance: u64) -> Self {
        Self {
            tolerance,
            seen: HashMap::new(),
        }
    }

    fn key(rec: &SalaryRecord) -> (String, String) {
        (rec.company.trim().to_lowercase(), rec.city.trim().to_lowercase())
    }

    fn is_duplicate(&self, rec: &SalaryRecord) -> bool {
        self.seen.get(&Self::key(rec)).is_some_and(|medians| {
            medians
                .iter()
                .any(|&m| m.abs_diff(rec.salary_median) < self.tolerance)
        })
    }

    fn insert(&mut self, rec: &SalaryRecord) {
        self.seen.entry(Self::key(rec)).or_default().push(rec.salary_median);
    }
}

#[derive(Debug, Default)]
pub struct MergeOutcome {
    pub records: Vec<SalaryRecord>,
    /// Prior rows removed because their source is being re-ingested.
    pub replaced: usize,
    pub added: usize,
    /// Batch rows dropped as near-duplicates of retained rows.
    pub dropped: usize,
}

/// Fold a freshly extracted batch into the master dataset. Every prior row
/// whose source appears in the batch is replaced; the remaining rows are
/// kept in order and batch rows close to one of them are dropped.
pub fn merge_into_master(
    existing: Vec<SalaryRecord>,
    batch: Vec<SalaryRecord>,
    tolerance: u64,
) -> MergeOutcome {
    let sources: BTreeSet<String> = batch.iter().map(|r| r.source.clone()).collect();
    let before = existing.len();
    let retained: Vec<SalaryRecord> = existing
        .into_iter()
        .filter(|r| !sources.contains(&r.source))
        .collect();

    let mut index = FuzzyIndex::new(tolerance);
    for rec in &retained {
        index.insert(rec);
    }

    let mut out = MergeOutcome {
        replaced: before - retained.len(),
        records: retained,
        ..Default::default()
    };
    for rec in batch {
        if index.is_duplicate(&rec) {
            debug!(company = %rec.company, city = %rec.city, median = rec.salary_median, "Batch row overlaps master");
            out.dropped += 1;
        } else {
            out.added += 1;
            out.records.push(rec);
        }
    }

    info!(
        sources = ?sources,
        replaced = out.replaced,
        added = out.added,
        dropped = out.dropped,
        "Merged batch into master"
    );
    out
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::NaiveDate;

    pub(crate) fn record(source: &str, company: &str, city: &str, median: u64, exp: Option<u32>) -> SalaryRecord {
        SalaryRecord {
            source: source.into(),
            collection_date: NaiveDate::from_ymd_opt(2026, 1, 12).unwrap(),
            company: company.into(),
            location: format!("{}, QC, Canada", city),
            city: city.into(),
            province: Some("QC".into()),
            country: "Canada".into(),
            job_title: "AI Engineer".into(),
            level: None,
            experience_years_min: exp,
            experience_years_max: exp,
            experience_years_at_company: None,
            experience_level: None,
            salary_min: median,
            salary_median: median,
            salary_max: median,
            base_salary: None,
            stock: None,
            bonus: None,
            posted_date: None,
            source_file: None,
        }
    }

    #[test]
    fn exact_keeps_first_of_identical_keys() {
        let mut a = record("Glassdoor", "Unknown", "Montreal", 100_000, Some(4));
        a.source_file = Some("a.html".into());
        let mut b = a.clone();
        b.source_file = Some("b.html".into());
        let c = record("Glassdoor", "Unknown", "Montreal", 100_000, Some(5));

        let out = dedup(vec![a, b, c], DedupStrategy::Exact);
        assert_eq!(out.kept.len(), 2);
        assert_eq!(out.dropped, 1);
        assert_eq!(out.kept[0].source_file.as_deref(), Some("a.html"));
    }

    #[test]
    fn exact_ignores_company() {
        // the key is location + median + experience only
        let a = record("Glassdoor", "Acme", "Montreal", 100_000, None);
        let b = record("Glassdoor", "Beta", "Montreal", 100_000, None);
        assert_eq!(dedup(vec![a, b], DedupStrategy::Exact).kept.len(), 1);
    }

    #[test]
    fn fuzzy_tolerance_is_strict() {
        let base = record("Levels.fyi", "Acme", "Montreal", 100_000, None);
        let near = record("Levels.fyi", "ACME", "montreal", 104_999, None);
        let edge = record("Levels.fyi", "Acme", "Montreal", 105_000, None);
        let other_city = record("Levels.fyi", "Acme", "Toronto", 100_000, None);

        let out = dedup(
            vec![base, near, edge, other_city],
            DedupStrategy::Fuzzy { tolerance: 5_000 },
        );
        assert_eq!(out.dropped, 1);
        let medians: Vec<u64> = out.kept.iter().map(|r| r.salary_median).collect();
        assert_eq!(medians, vec![100_000, 105_000, 100_000]);
    }

    #[test]
    fn none_keeps_everything() {
        let a = record("Glassdoor", "Acme", "Montreal", 100_000, None);
        let out = dedup(vec![a.clone(), a], DedupStrategy::None);
        assert_eq!(out.kept.len(), 2);
        assert_eq!(out.dropped, 0);
    }

    #[test]
    fn merge_replaces_same_source_rows() {
        let existing = vec![
            record("Glassdoor", "Chubb", "Toronto", 110_000, None),
            record("Levels.fyi", "Zapier", "Toronto", 200_000, None),
            record("Levels.fyi", "Intact", "Montreal", 120_000, None),
        ];
        let batch = vec![
            record("Levels.fyi", "Intact", "Montreal", 121_000, None),
            // overlaps the retained Glassdoor row
            record("Levels.fyi", "Chubb", "Toronto", 112_000, None),
            record("Levels.fyi", "Cohere", "Toronto", 180_000, None),
        ];
        let out = merge_into_master(existing, batch, 5_000);
        assert_eq!(out.replaced, 2);
        assert_eq!(out.added, 2);
        assert_eq!(out.dropped, 1);
        let companies: Vec<&str> = out.records.iter().map(|r| r.company.as_str()).collect();
        assert_eq!(companies, vec!["Chubb", "Intact", "Cohere"]);
        assert_eq!(out.records[1].salary_median, 121_000);
    }
}
