use crate::error::{PipelineError, PipelineResult};

/// How one source lays out its pages, and the order in which extraction
/// strategies are tried against them.
#[derive(Debug)]
pub struct SourceProfile {
    pub key: &'static str,
    pub label: &'static str,
    pub job_title: &'static str,
    pub strategies: &'static [Strategy],
}

#[derive(Debug)]
pub enum Strategy {
    /// One record per repeating container, fields by CSS selector.
    Structural(&'static StructuralSpec),
    /// Plain-text recovery over the flattened page.
    Text(TextPattern),
}

impl Strategy {
    pub fn name(&self) -> &'static str {
        match self {
            Strategy::Structural(spec) => spec.name,
            Strategy::Text(TextPattern::InlineEntries) => "inline-entries",
            Strategy::Text(TextPattern::LineBlocks) => "line-blocks",
            Strategy::Text(TextPattern::GlassdoorSubmissions) => "glassdoor-submissions",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextPattern {
    /// "Company, City, PR, Country, Level, comp, experience" on one line.
    InlineEntries,
    /// Lines classified one by one and assembled into records.
    LineBlocks,
    /// "AI Engineer | 4-6 Years Montreal, QC submitted on ... $92K-$108K /yr".
    GlassdoorSubmissions,
}

#[derive(Debug)]
pub struct StructuralSpec {
    pub name: &'static str,
    pub container: &'static str,
    pub fields: FieldSource,
}

#[derive(Debug)]
pub enum FieldSource {
    Selectors(FieldMap),
    /// Container text is matched with the card regexes in `structural`.
    CardText { must_mention: &'static str },
}

/// Alternative selectors per field, tried in order, evaluated inside the
/// container. Empty slices mean the source never carries that field.
#[derive(Debug)]
pub struct FieldMap {
    pub company: &'static [&'static str],
    /// "Montreal, QC, Canada | 2 days ago" when `location_has_date`.
    pub location: &'static [&'static str],
    pub location_has_date: bool,
    pub level: &'static [&'static str],
    pub job_title: &'static [&'static str],
    pub experience: &'static [&'static str],
    pub experience_at_company: &'static [&'static str],
    pub compensation: &'static [&'static str],
    pub breakdown: &'static [&'static str],
    pub range: &'static [&'static str],
    pub median: &'static [&'static str],
    pub require_company: bool,
}

const NONE: &[&str] = &[];

static LEVELS_TABLE: StructuralSpec = StructuralSpec {
    name: "levels-table",
    container: r#"tr[class*="salary-row_collapsedSalaryRow"]"#,
    fields: FieldSource::Selectors(FieldMap {
        company: &[
            r#"a[class*="salary-row_companyName"]"#,
            r#"p[class*="salary-row_companyName"]"#,
        ],
        location: &[r#"span[class*="css-xlmjpr"]"#, r#"[class*="salary-row_location"]"#],
        location_has_date: true,
        level: &[r#"p[class*="salary-row_levelName"]"#],
        job_title: NONE,
        experience: &[r#"td[class*="css-w3va9g"] p.MuiTypography-body1"#],
        experience_at_company: &[r#"td[class*="css-w3va9g"] span.MuiTypography-caption"#],
        compensation: &[r#"td[class*="salary-row_totalCompCell"] p.MuiTypography-body1"#],
        breakdown: &[r#"td[class*="salary-row_totalCompCell"] span.MuiTypography-caption"#],
        range: NONE,
        median: NONE,
        require_company: true,
    }),
};

static GLASSDOOR_CARDS: StructuralSpec = StructuralSpec {
    name: "glassdoor-cards",
    container: concat!(
        r#"div[class*="salary" i], div[class*="submission" i], div[class*="report" i], "#,
        r#"article[class*="salary" i], article[class*="submission" i], article[class*="report" i]"#,
    ),
    fields: FieldSource::CardText {
        must_mention: "AI Engineer",
    },
};

static GLASSDOOR_EMPLOYERS: StructuralSpec = StructuralSpec {
    name: "glassdoor-employers",
    container: r#"div[class*="SalariesList_Item"]"#,
    fields: FieldSource::Selectors(FieldMap {
        company: &[r#"p[class*="salary-card_EmployerName"]"#],
        location: NONE,
        location_has_date: false,
        level: NONE,
        job_title: &[r#"section[class*="salary-card_TitleTrim"]"#],
        experience: NONE,
        experience_at_company: NONE,
        compensation: NONE,
        breakdown: NONE,
        range: &[r#"div[class*="salary-card_TotalPay"]"#],
        median: &[r#"div[class*="salary-card_BreakdownBold"]"#],
        require_company: true,
    }),
};

pub static PROFILES: &[SourceProfile] = &[
    SourceProfile {
        key: "levelsfyi",
        label: "Levels.fyi",
        job_title: "ML / AI Engineer",
        strategies: &[
            Strategy::Structural(&LEVELS_TABLE),
            Strategy::Text(TextPattern::InlineEntries),
            Strategy::Text(TextPattern::LineBlocks),
        ],
    },
    SourceProfile {
        key: "glassdoor",
        label: "Glassdoor",
        job_title: "AI Engineer",
        strategies: &[
            Strategy::Text(TextPattern::GlassdoorSubmissions),
            Strategy::Structural(&GLASSDOOR_CARDS),
        ],
    },
    SourceProfile {
        key: "glassdoor-companies",
        label: "Glassdoor",
        job_title: "AI Engineer",
        strategies: &[Strategy::Structural(&GLASSDOOR_EMPLOYERS)],
    },
];

/// Resolve a source by key or label, ignoring case and punctuation
/// ("Levels.fyi", "levels-fyi" and "levelsfyi" are the same source).
pub fn lookup(name: &str) -> PipelineResult<&'static SourceProfile> {
    let wanted = squash(name);
    PROFILES
        .iter()
        .find(|p| squash(p.key) == wanted)
        .or_else(|| PROFILES.iter().find(|p| squash(p.label) == wanted))
        .ok_or_else(|| PipelineError::UnknownSource(name.to_string()))
}

fn squash(s: &str) -> String {
    s.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}
