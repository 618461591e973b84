use std::collections::BTreeMap;

use itertools::Itertools;

use crate::aggregate::{self, GroupBy};
use crate::normalize::Rejection;
use crate::record::SalaryRecord;
use crate::settings::PipelineConfig;

/// Counters for one extraction run. Printed even when the run fails so that
/// dropped data is visible.
#[derive(Debug, Default)]
pub struct RunSummary {
    pub documents: usize,
    pub failed_documents: usize,
    /// Documents that were read but where no strategy recognised anything.
    pub empty_documents: usize,
    pub candidates: usize,
    pub accepted: usize,
    pub rejections: BTreeMap<Rejection, usize>,
    pub duplicates_dropped: usize,
    /// Strategy name → documents it succeeded on.
    pub strategies: BTreeMap<&'static str, usize>,
}

impl RunSummary {
    pub fn reject(&mut self, reason: Rejection) {
        *self.rejections.entry(reason).or_default() += 1;
    }

    pub fn kept(&self) -> usize {
        self.accepted.saturating_sub(self.duplicates_dropped)
    }

    pub fn print(&self) {
        println!(
            "Read {} documents ({} failed, {} with no entries).",
            self.documents, self.failed_documents, self.empty_documents
        );
        if !self.strategies.is_empty() {
            let used = self
                .strategies
                .iter()
                .map(|(name, n)| format!("{} x{}", name, n))
                .join(", ");
            println!("  strategies: {}", used);
        }
        println!(
            "Extracted {} candidates, {} normalized ({}).",
            self.candidates,
            self.accepted,
            percent(self.accepted, self.candidates)
        );
        for (reason, n) in &self.rejections {
            println!("  rejected {:>5}  {}", n, reason);
        }
        println!(
            "Dropped {} duplicates; {} records kept.",
            self.duplicates_dropped,
            self.kept()
        );
    }
}

fn percent(part: usize, total: usize) -> String {
    if total == 0 {
        return "0.0%".into();
    }
    format!("{:.1}%", part as f64 * 100.0 / total as f64)
}

/// Console overview of a master dataset.
pub fn print_overview(records: &[SalaryRecord], cfg: &PipelineConfig) {
    if records.is_empty() {
        println!("Master dataset is empty.");
        return;
    }
    let medians: Vec<u64> = records.iter().map(|r| r.salary_median).collect();
    let Some(all) = aggregate::summarize(&medians) else {
        return;
    };
    let companies = records.iter().map(|r| r.company.as_str()).unique().count();
    let dates = records.iter().map(|r| r.collection_date).minmax();

    println!("Records:   {}", all.count);
    println!("Companies: {}", companies);
    if let Some((first, last)) = dates.into_option() {
        println!("Collected: {} to {}", first, last);
    }
    println!(
        "Salary:    median {:.0} | p25 {:.0} | p75 {:.0} | min {} | max {}",
        all.median, all.p25, all.p75, all.min, all.max
    );

    let buckets = cfg.buckets();
    for by in [GroupBy::Source, GroupBy::City, GroupBy::ExperienceLevel] {
        println!("\n--- By {} ---", by.column());
        println!("{:<24} | {:>5} | {:>10} | {:>10} | {:>10}", by.column(), "n", "median", "min", "max");
        println!("{}", "-".repeat(71));
        for row in aggregate::group_stats(records, by, &buckets) {
            println!(
                "{:<24} | {:>5} | {:>10.0} | {:>10} | {:>10}",
                truncate(&row.key, 24),
                row.stats.count,
                row.stats.median,
                row.stats.min,
                row.stats.max
            );
        }
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max - 3).collect();
        format!("{}...", truncated)
    }
}
