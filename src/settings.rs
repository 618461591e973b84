use std::path::Path;

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::Deserialize;
use tracing::debug;

use crate::record::ExperienceBuckets;

/// Every tunable the pipeline reads. Built once in `main` and handed to each
/// stage by reference.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Headline figures outside `[sanity_min, sanity_max]` are treated as noise.
    pub sanity_min: u64,
    pub sanity_max: u64,
    /// Right-closed upper bounds of the experience buckets.
    pub experience_bounds: Vec<u32>,
    /// Fuzzy dedup: same company and city with medians closer than this.
    pub dedup_tolerance: u64,
    pub default_country: String,
    pub known_countries: Vec<String>,
    /// Ranking views drop groups smaller than this.
    pub min_group_count: usize,
    pub unknown_company: String,
    pub default_job_title: String,
    /// Employers recognised by the plain-text fallback.
    pub company_lookup: Vec<String>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            sanity_min: 40_000,
            sanity_max: 500_000,
            experience_bounds: vec![3, 6, 9, 12],
            dedup_tolerance: 5_000,
            default_country: "Canada".into(),
            known_countries: vec!["Canada".into(), "USA".into(), "United States".into()],
            min_group_count: 2,
            unknown_company: "Unknown".into(),
            default_job_title: "AI Engineer".into(),
            company_lookup: DEFAULT_COMPANIES.iter().map(|s| s.to_string()).collect(),
        }
    }
}

const DEFAULT_COMPANIES: &[&str] = &[
    "Synechron", "Matador", "Zapier", "Intact", "ETS", "Hightouch", "Guidepoint", "Tecsys",
    "Chubb", "Dialpad", "Google", "Meta", "Amazon", "Microsoft", "Apple", "Netflix", "Stripe",
    "Airbnb", "Uber", "Shopify", "Nvidia", "Salesforce", "Adobe", "Intel", "IBM", "Coinbase",
    "Databricks", "Instacart", "Palantir", "Cohere", "Wealthsimple", "Mila", "ServiceNow",
];

impl PipelineConfig {
    /// Defaults, overlaid by an optional config file, overlaid by `SALARY_*`
    /// environment variables.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder();
        if let Some(p) = path {
            builder = builder.add_source(File::from(p).required(true));
        }
        let settings = builder
            .add_source(
                Environment::with_prefix("SALARY")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("experience_bounds")
                    .with_list_parse_key("known_countries")
                    .with_list_parse_key("company_lookup"),
            )
            .build()
            .context("Failed to load pipeline configuration")?;
        let cfg: PipelineConfig = settings
            .try_deserialize()
            .context("Invalid pipeline configuration")?;
        debug!(?cfg, "Configuration loaded");
        Ok(cfg)
    }

    pub fn buckets(&self) -> ExperienceBuckets {
        ExperienceBuckets::new(&self.experience_bounds)
    }

    pub fn in_sanity_band(&self, amount: u64) -> bool {
        (self.sanity_min..=self.sanity_max).contains(&amount)
    }
}
