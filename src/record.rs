use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Where a candidate came from, for logs and the JSON dump.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct FragmentContext {
    pub file: String,
    /// Index of the container or line/match the candidate was built from.
    pub fragment: usize,
    pub strategy: &'static str,
}

/// A candidate straight out of the extractor: every field is still the text
/// the page (or CSV cell) carried. Parsing happens in `normalize`.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct RawRecord {
    pub company: Option<String>,
    pub location: Option<String>,
    pub posted_date: Option<String>,
    pub level: Option<String>,
    pub job_title: Option<String>,
    /// Total experience ("2 yrs", "4-6 Years", "2 yrs / 1 yr").
    pub experience: Option<String>,
    pub experience_at_company: Option<String>,
    /// Single headline compensation figure.
    pub compensation: Option<String>,
    /// Pipe-delimited base | stock | bonus (optionally led by a total).
    pub breakdown: Option<String>,
    /// "min - max" text.
    pub range: Option<String>,
    pub median: Option<String>,
    /// Separate min/max cells (CSV producers).
    pub salary_min: Option<String>,
    pub salary_max: Option<String>,
    pub experience_max: Option<String>,
    pub base: Option<String>,
    pub stock: Option<String>,
    pub bonus: Option<String>,
    /// Provenance columns carried by CSV producers; override the run defaults.
    pub source: Option<String>,
    pub collection_date: Option<String>,
    pub context: FragmentContext,
}

impl RawRecord {
    pub fn has_compensation_text(&self) -> bool {
        [
            &self.compensation,
            &self.breakdown,
            &self.range,
            &self.median,
            &self.salary_min,
            &self.salary_max,
        ]
        .iter()
        .any(|f| f.as_deref().is_some_and(|s| !s.trim().is_empty()))
    }
}

/// One normalized compensation data point; one row of the master CSV.
/// Field order is the column order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SalaryRecord {
    pub source: String,
    pub collection_date: NaiveDate,
    pub company: String,
    pub location: String,
    pub city: String,
    pub province: Option<String>,
    pub country: String,
    pub job_title: String,
    pub level: Option<String>,
    pub experience_years_min: Option<u32>,
    pub experience_years_max: Option<u32>,
    pub experience_years_at_company: Option<u32>,
    pub experience_level: Option<String>,
    pub salary_min: u64,
    /// Total compensation.
    pub salary_median: u64,
    pub salary_max: u64,
    pub base_salary: Option<u64>,
    pub stock: Option<u64>,
    pub bonus: Option<u64>,
    pub posted_date: Option<String>,
    pub source_file: Option<String>,
}

pub const MASTER_COLUMNS: &[&str] = &[
    "source",
    "collection_date",
    "company",
    "location",
    "city",
    "province",
    "country",
    "job_title",
    "level",
    "experience_years_min",
    "experience_years_max",
    "experience_years_at_company",
    "experience_level",
    "salary_min",
    "salary_median",
    "salary_max",
    "base_salary",
    "stock",
    "bonus",
    "posted_date",
    "source_file",
];

/// Fixed-boundary experience bins. With bounds `[3, 6, 9, 12]` the buckets
/// are 0-3, 4-6, 7-9, 10-12 and 13+, each right-closed.
#[derive(Debug, Clone, PartialEq)]
pub struct ExperienceBuckets {
    bounds: Vec<u32>,
    labels: Vec<String>,
}

impl ExperienceBuckets {
    pub fn new(bounds: &[u32]) -> Self {
        let mut bounds = bounds.to_vec();
        bounds.sort_unstable();
        bounds.dedup();

        let mut labels = Vec::with_capacity(bounds.len() + 1);
        let mut lower = 0;
        for &upper in &bounds {
            labels.push(format!("{}-{} years", lower, upper));
            lower = upper.saturating_add(1);
        }
        labels.push(format!("{}+ years", lower));
        Self { bounds, labels }
    }

    pub fn index_of(&self, years: u32) -> usize {
        self.bounds
            .iter()
            .position(|&upper| years <= upper)
            .unwrap_or(self.bounds.len())
    }

    pub fn label(&self, years: u32) -> &str {
        &self.labels[self.index_of(years)]
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Sort position of a label produced by this bucket set.
    pub fn rank(&self, label: &str) -> Option<usize> {
        self.labels.iter().position(|l| l == label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn default_buckets() -> ExperienceBuckets {
        ExperienceBuckets::new(&[3, 6, 9, 12])
    }

    #[test]
    fn labels_follow_bounds() {
        let b = default_buckets();
        assert_eq!(
            b.labels(),
            &["0-3 years", "4-6 years", "7-9 years", "10-12 years", "13+ years"]
        );
    }

    #[test]
    fn boundaries_are_right_closed() {
        let b = default_buckets();
        assert_eq!(b.label(0), "0-3 years");
        assert_eq!(b.label(3), "0-3 years");
        assert_eq!(b.label(4), "4-6 years");
        assert_eq!(b.label(6), "4-6 years");
        assert_eq!(b.label(7), "7-9 years");
        assert_eq!(b.label(12), "10-12 years");
        assert_eq!(b.label(13), "13+ years");
        assert_eq!(b.label(45), "13+ years");
    }

    #[test]
    fn every_year_lands_in_exactly_one_bucket() {
        let b = default_buckets();
        let ranges: [(u32, Option<u32>); 5] =
            [(0, Some(3)), (4, Some(6)), (7, Some(9)), (10, Some(12)), (13, None)];
        for years in 0..=200u32 {
            let hits = ranges
                .iter()
                .filter(|(lo, hi)| years >= *lo && hi.map_or(true, |h| years <= h))
                .count();
            assert_eq!(hits, 1, "year {} matched {} ranges", years, hits);
            let idx = b.index_of(years);
            let (lo, hi) = ranges[idx];
            assert!(years >= lo && hi.map_or(true, |h| years <= h));
        }
    }

    #[test]
    fn unsorted_bounds_are_normalized() {
        let b = ExperienceBuckets::new(&[6, 3, 6]);
        assert_eq!(b.labels(), &["0-3 years", "4-6 years", "7+ years"]);
        assert_eq!(b.rank("4-6 years"), Some(1));
        assert_eq!(b.rank("nope"), None);
    }

    #[test]
    fn maximal_bound_does_not_overflow() {
        let b = ExperienceBuckets::new(&[3, u32::MAX]);
        assert_eq!(b.labels().len(), 3);
        assert_eq!(b.label(u32::MAX), format!("4-{} years", u32::MAX));
        assert_eq!(b.index_of(u32::MAX), 1);
    }

    #[test]
    fn compensation_text_detection() {
        let mut raw = RawRecord::default();
        assert!(!raw.has_compensation_text());
        raw.breakdown = Some("  ".into());
        assert!(!raw.has_compensation_text());
        raw.range = Some("$72K - $110K".into());
        assert!(raw.has_compensation_text());
    }
}
