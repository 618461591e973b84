pub mod blocks;
pub mod flatten;
pub mod patterns;
pub mod profiles;
pub mod structural;

use scraper::Html;
use tracing::{debug, warn};

use crate::record::RawRecord;
use crate::settings::PipelineConfig;
use flatten::FlatText;
use profiles::{SourceProfile, Strategy, TextPattern};

/// Candidates pulled from one document, and which strategy produced them.
#[derive(Debug, Default)]
pub struct Extraction {
    pub candidates: Vec<RawRecord>,
    pub strategy: Option<&'static str>,
}

/// Try the profile's strategies in order; the first one that yields any
/// candidate wins and the rest are never run.
pub fn extract_document(
    file: &str,
    html_text: &str,
    profile: &SourceProfile,
    cfg: &PipelineConfig,
) -> Extraction {
    let html = Html::parse_document(html_text);
    let mut flat: Option<FlatText> = None;

    for strategy in profile.strategies {
        let candidates = match strategy {
            Strategy::Structural(spec) => structural::extract(&html, spec, file),
            Strategy::Text(pattern) => {
                let text = flat.get_or_insert_with(|| FlatText::from_html(&html));
                run_text(*pattern, text, file, cfg)
            }
        };
        debug!(file, strategy = strategy.name(), count = candidates.len(), "Strategy tried");
        if !candidates.is_empty() {
            return Extraction {
                candidates,
                strategy: Some(strategy.name()),
            };
        }
    }

    warn!(file, source = profile.key, "No salary entries recognised in document");
    Extraction::default()
}

fn run_text(pattern: TextPattern, text: &FlatText, file: &str, cfg: &PipelineConfig) -> Vec<RawRecord> {
    match pattern {
        TextPattern::InlineEntries => patterns::inline_entries(&text.lines, file),
        TextPattern::GlassdoorSubmissions => patterns::glassdoor_submissions(&text.joined(), file),
        TextPattern::LineBlocks => {
            let blocks = blocks::classify_lines(&text.lines, &cfg.company_lookup);
            blocks::assemble(&blocks, file)
        }
    }
}
