pub mod experience;
pub mod location;
pub mod money;

use std::fmt;

use chrono::NaiveDate;
use tracing::debug;

use crate::record::{ExperienceBuckets, RawRecord, SalaryRecord};
use crate::settings::PipelineConfig;
use experience::{parse_tenure, parse_years};
use money::{parse_amount, parse_breakdown, parse_range, Breakdown};

/// Run-level defaults applied to every candidate of one extraction run.
#[derive(Debug, Clone)]
pub struct NormalizeContext {
    pub source_label: String,
    pub collection_date: NaiveDate,
    pub default_location: Option<String>,
    pub job_title: String,
}

/// Why a candidate never became a `SalaryRecord`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Rejection {
    /// No compensation text parsed to a number.
    NoCompensation,
    /// Figures parsed, but all fell outside the sanity band.
    OutOfBand,
    /// min <= median <= max does not hold.
    InvertedRange,
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Rejection::NoCompensation => "no compensation",
            Rejection::OutOfBand => "outside sanity band",
            Rejection::InvertedRange => "inverted min/median/max",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Compensation {
    min: u64,
    median: u64,
    max: u64,
    parts: Breakdown,
}

pub struct Normalizer<'a> {
    cfg: &'a PipelineConfig,
    ctx: &'a NormalizeContext,
    buckets: ExperienceBuckets,
}

impl<'a> Normalizer<'a> {
    pub fn new(cfg: &'a PipelineConfig, ctx: &'a NormalizeContext) -> Self {
        Self {
            cfg,
            ctx,
            buckets: cfg.buckets(),
        }
    }

    pub fn normalize(&self, raw: &RawRecord) -> Result<SalaryRecord, Rejection> {
        let comp = self.compensation(raw)?;

        let location = non_empty(&raw.location)
            .or_else(|| self.ctx.default_location.clone())
            .or_else(|| location::location_from_filename(&raw.context.file))
            .unwrap_or_else(|| "Unknown".into());
        let place = location::decompose(&location, self.cfg);

        let (span, mut at_company) = raw
            .experience
            .as_deref()
            .map(parse_tenure)
            .unwrap_or((None, None));
        if let Some(text) = raw.experience_at_company.as_deref() {
            at_company = parse_years(text).map(|s| s.min).or(at_company);
        }
        let years_min = span.map(|s| s.min);
        let mut years_max = span.map(|s| s.max);
        if let Some(max) = raw.experience_max.as_deref().and_then(parse_years) {
            years_max = Some(max.max);
        }
        // A max below the min is a mislabelled column, not a range.
        if let (Some(lo), Some(hi)) = (years_min, years_max) {
            if hi < lo {
                debug!(file = %raw.context.file, lo, hi, "Experience max below min, clamping");
                years_max = Some(lo);
            }
        }

        let source = non_empty(&raw.source).unwrap_or_else(|| self.ctx.source_label.clone());
        let collection_date = raw
            .collection_date
            .as_deref()
            .and_then(|d| NaiveDate::parse_from_str(d.trim(), "%Y-%m-%d").ok())
            .unwrap_or(self.ctx.collection_date);

        Ok(SalaryRecord {
            source,
            collection_date,
            company: non_empty(&raw.company).unwrap_or_else(|| self.cfg.unknown_company.clone()),
            location,
            city: place.city,
            province: place.province,
            country: place.country,
            job_title: non_empty(&raw.job_title).unwrap_or_else(|| self.ctx.job_title.clone()),
            level: non_empty(&raw.level).filter(|l| l != "-"),
            experience_years_min: years_min,
            experience_years_max: years_max,
            experience_years_at_company: at_company,
            experience_level: years_min.map(|y| self.buckets.label(y).to_string()),
            salary_min: comp.min,
            salary_median: comp.median,
            salary_max: comp.max,
            base_salary: comp.parts.base,
            stock: comp.parts.stock,
            bonus: comp.parts.bonus,
            posted_date: non_empty(&raw.posted_date),
            source_file: Some(raw.context.file.clone()).filter(|f| !f.is_empty()),
        })
    }

    fn compensation(&self, raw: &RawRecord) -> Result<Compensation, Rejection> {
        let mut parts = raw.breakdown.as_deref().map(parse_breakdown).unwrap_or_default();
        let mut headline = None;
        if let Some(text) = raw.compensation.as_deref() {
            if text.contains('|') {
                let inline = parse_breakdown(text);
                if parts.is_empty() {
                    parts = inline;
                }
            } else {
                headline = parse_amount(text);
            }
        }
        // Separate component cells (CSV producers)
        parts.base = parts.base.or_else(|| raw.base.as_deref().and_then(parse_amount));
        parts.stock = parts.stock.or_else(|| raw.stock.as_deref().and_then(parse_amount));
        parts.bonus = parts.bonus.or_else(|| raw.bonus.as_deref().and_then(parse_amount));
        // An out-of-band headline ("2024") gives way to the breakdown total.
        let headline = headline
            .filter(|&h| self.cfg.in_sanity_band(h))
            .or_else(|| parts.resolved_total())
            .or(headline);

        let (range_lo, range_hi) = match raw.range.as_deref().and_then(parse_range) {
            Some((lo, hi)) => (Some(lo), Some(hi)),
            None => (None, None),
        };
        let min = range_lo.or_else(|| raw.salary_min.as_deref().and_then(parse_amount));
        let max = range_hi.or_else(|| raw.salary_max.as_deref().and_then(parse_amount));
        let median = raw.median.as_deref().and_then(parse_amount).or(headline);

        if [min, median, max].iter().all(Option::is_none) {
            return Err(Rejection::NoCompensation);
        }

        let band = |v: Option<u64>| -> Option<u64> {
            match v {
                Some(x) if !self.cfg.in_sanity_band(x) => {
                    debug!(file = %raw.context.file, amount = x, "Discarding figure outside sanity band");
                    None
                }
                other => other,
            }
        };
        let min = band(min);
        let max = band(max);
        let median = band(median).or(match (min, max) {
            (Some(lo), Some(hi)) => Some(lo / 2 + hi / 2 + (lo % 2 + hi % 2) / 2),
            (Some(v), None) | (None, Some(v)) => Some(v),
            (None, None) => None,
        });

        let Some(median) = median else {
            return Err(Rejection::OutOfBand);
        };
        let min = min.unwrap_or(median);
        let max = max.unwrap_or(median);
        if min > median || median > max {
            debug!(file = %raw.context.file, min, median, max, "Inverted compensation triple");
            return Err(Rejection::InvertedRange);
        }

        Ok(Compensation {
            min,
            median,
            max,
            parts,
        })
    }
}

fn non_empty(field: &Option<String>) -> Option<String> {
    field
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
