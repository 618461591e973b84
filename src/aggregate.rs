use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

use itertools::Itertools;

use crate::record::{ExperienceBuckets, SalaryRecord};

/// Dimension a summary is keyed by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupBy {
    City,
    ExperienceLevel,
    Source,
    Company,
    Country,
}

impl GroupBy {
    pub const ALL: [GroupBy; 5] = [
        GroupBy::City,
        GroupBy::ExperienceLevel,
        GroupBy::Source,
        GroupBy::Company,
        GroupBy::Country,
    ];

    /// Key column header in the output CSV.
    pub fn column(&self) -> &'static str {
        match self {
            GroupBy::City => "city",
            GroupBy::ExperienceLevel => "experience_level",
            GroupBy::Source => "source",
            GroupBy::Company => "company",
            GroupBy::Country => "country",
        }
    }

    /// Suffix of `agg_by_<name>.csv`.
    pub fn file_name(&self) -> &'static str {
        match self {
            GroupBy::ExperienceLevel => "experience",
            other => other.column(),
        }
    }

    /// Records without a bucket are left out of experience groupings.
    fn key(&self, rec: &SalaryRecord) -> Option<String> {
        match self {
            GroupBy::City => Some(rec.city.clone()),
            GroupBy::ExperienceLevel => rec.experience_level.clone(),
            GroupBy::Source => Some(rec.source.clone()),
            GroupBy::Company => Some(rec.company.clone()),
            GroupBy::Country => Some(rec.country.clone()),
        }
    }
}

/// Descriptive statistics of one group's `salary_median` values.
#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    pub count: usize,
    pub mean: f64,
    pub median: f64,
    pub min: u64,
    pub max: u64,
    pub p25: f64,
    pub p75: f64,
    /// Sample standard deviation; absent below two values.
    pub stddev: Option<f64>,
}

/// Linear interpolation between the order statistics bracketing
/// `q * (n - 1)`. `sorted` must be non-empty and ascending.
pub fn quantile(sorted: &[u64], q: f64) -> f64 {
    let pos = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    sorted[lo] as f64 + (sorted[hi] as f64 - sorted[lo] as f64) * frac
}

pub fn summarize(values: &[u64]) -> Option<Summary> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_unstable();
    let n = sorted.len();
    let mean = sorted.iter().map(|&v| v as f64).sum::<f64>() / n as f64;
    let stddev = (n >= 2).then(|| {
        let ss: f64 = sorted.iter().map(|&v| (v as f64 - mean).powi(2)).sum();
        (ss / (n - 1) as f64).sqrt()
    });
    Some(Summary {
        count: n,
        mean,
        median: quantile(&sorted, 0.5),
        min: sorted[0],
        max: sorted[n - 1],
        p25: quantile(&sorted, 0.25),
        p75: quantile(&sorted, 0.75),
        stddev,
    })
}

#[derive(Debug, Clone, PartialEq)]
pub struct AggregateRow {
    pub key: String,
    pub stats: Summary,
}

/// One row per distinct key. Keys sort alphabetically, except experience
/// levels which follow bucket order.
pub fn group_stats(records: &[SalaryRecord], by: GroupBy, buckets: &ExperienceBuckets) -> Vec<AggregateRow> {
    let groups = records
        .iter()
        .filter_map(|r| by.key(r).map(|k| (k, r.salary_median)))
        .into_group_map();

    groups
        .into_iter()
        .filter_map(|(key, values)| summarize(&values).map(|stats| AggregateRow { key, stats }))
        .sorted_by(|a, b| compare_keys(by, buckets, &a.key, &b.key))
        .collect()
}

fn compare_keys(by: GroupBy, buckets: &ExperienceBuckets, a: &str, b: &str) -> Ordering {
    if by == GroupBy::ExperienceLevel {
        let rank = |k: &str| buckets.rank(k).unwrap_or(usize::MAX);
        rank(a).cmp(&rank(b)).then_with(|| a.cmp(b))
    } else {
        a.cmp(b)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EmployerRank {
    pub company: String,
    pub count: usize,
    pub median: f64,
    pub mean: f64,
    pub min: u64,
    pub max: u64,
    /// Most common city among the employer's records.
    pub top_location: String,
}

/// Employers ordered by median pay, highest first. Groups smaller than
/// `min_count` and the placeholder employer are left out.
pub fn rank_companies(records: &[SalaryRecord], min_count: usize, unknown_company: &str) -> Vec<EmployerRank> {
    let by_company = records
        .iter()
        .filter(|r| r.company != unknown_company)
        .into_group_map_by(|r| r.company.clone());

    by_company
        .into_iter()
        .filter(|(_, recs)| recs.len() >= min_count)
        .filter_map(|(company, recs)| {
            let values: Vec<u64> = recs.iter().map(|r| r.salary_median).collect();
            let stats = summarize(&values)?;
            Some(EmployerRank {
                company,
                count: stats.count,
                median: stats.median,
                mean: stats.mean,
                min: stats.min,
                max: stats.max,
                top_location: modal_city(&recs),
            })
        })
        .sorted_by(|a, b| {
            b.median
                .total_cmp(&a.median)
                .then_with(|| a.company.cmp(&b.company))
        })
        .collect()
}

/// Ties go to the alphabetically first city.
fn modal_city(recs: &[&SalaryRecord]) -> String {
    let counts: BTreeMap<&str, usize> = recs.iter().map(|r| r.city.as_str()).counts().into_iter().collect();
    counts
        .iter()
        .max_by(|a, b| a.1.cmp(b.1).then_with(|| b.0.cmp(a.0)))
        .map(|(city, _)| city.to_string())
        .unwrap_or_default()
}

/// Median `salary_median` per (row, column) cell. `None` marks a cell with
/// no records.
#[derive(Debug, Clone, PartialEq)]
pub struct PivotTable {
    pub row_header: &'static str,
    pub columns: Vec<String>,
    pub rows: Vec<(String, Vec<Option<f64>>)>,
}

pub fn pivot(records: &[SalaryRecord], rows: GroupBy, cols: GroupBy, buckets: &ExperienceBuckets) -> PivotTable {
    let mut cells: HashMap<(String, String), Vec<u64>> = HashMap::new();
    for rec in records {
        if let (Some(r), Some(c)) = (rows.key(rec), cols.key(rec)) {
            cells.entry((r, c)).or_default().push(rec.salary_median);
        }
    }

    // Experience columns are fixed so the header doesn't shift between runs.
    let columns: Vec<String> = if cols == GroupBy::ExperienceLevel {
        buckets.labels().to_vec()
    } else {
        cells.keys().map(|(_, c)| c.clone()).unique().sorted().collect()
    };
    let row_keys: Vec<String> = cells
        .keys()
        .map(|(r, _)| r.clone())
        .unique()
        .sorted_by(|a, b| compare_keys(rows, buckets, a, b))
        .collect();

    let table = row_keys
        .into_iter()
        .map(|r| {
            let values = columns
                .iter()
                .map(|c| {
                    cells
                        .get(&(r.clone(), c.clone()))
                        .and_then(|v| summarize(v))
                        .map(|s| s.median)
                })
                .collect();
            (r, values)
        })
        .collect();

    PivotTable {
        row_header: rows.column(),
        columns,
        rows: table,
    }
}
