use std::fs;
use std::path::{Path, PathBuf};

use csv::StringRecord;
use tracing::{debug, warn};

use crate::error::{PipelineError, PipelineResult};
use crate::record::{FragmentContext, RawRecord, SalaryRecord, MASTER_COLUMNS};

/// What kind of artifact a discovered file is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Html,
    Csv,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SourceFile {
    pub path: PathBuf,
    pub kind: DocumentKind,
}

impl SourceFile {
    pub fn name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

fn kind_of(path: &Path) -> Option<DocumentKind> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "html" | "htm" => Some(DocumentKind::Html),
        "csv" => Some(DocumentKind::Csv),
        _ => None,
    }
}

/// A single file, or every `.html`/`.htm`/`.csv` directly inside a directory,
/// sorted by file name so that first-seen dedup is reproducible.
pub fn discover(input: &Path) -> PipelineResult<Vec<SourceFile>> {
    if !input.exists() {
        return Err(PipelineError::MissingInput(input.to_path_buf()));
    }
    if input.is_file() {
        // An explicitly named file is taken as given; unknown extensions read as HTML.
        let kind = kind_of(input).unwrap_or(DocumentKind::Html);
        return Ok(vec![SourceFile {
            path: input.to_path_buf(),
            kind,
        }]);
    }

    let mut files = Vec::new();
    for entry in fs::read_dir(input)? {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        if let Some(kind) = kind_of(&path) {
            files.push(SourceFile { path, kind });
        }
    }
    if files.is_empty() {
        return Err(PipelineError::NoInputFiles(input.to_path_buf()));
    }
    files.sort_by(|a, b| a.path.file_name().cmp(&b.path.file_name()));
    debug!(count = files.len(), dir = %input.display(), "Discovered input files");
    Ok(files)
}

/// Whole document as UTF-8. Invalid encodings surface as an I/O error.
pub fn read_html(path: &Path) -> PipelineResult<String> {
    Ok(fs::read_to_string(path)?)
}

// ── CSV producers ──

const COMPENSATION: &[&str] = &[
    "salary_median",
    "salary_median_cad",
    "total_compensation_cad",
    "median_salary_cad",
    "salary",
];
const SALARY_MIN: &[&str] = &["salary_min", "salary_min_cad", "min_salary_cad"];
const SALARY_MAX: &[&str] = &["salary_max", "salary_max_cad", "max_salary_cad"];
const COMPANY: &[&str] = &["company", "company_name"];
const LOCATION: &[&str] = &["location_full", "location"];
const LEVEL: &[&str] = &["level"];
const JOB_TITLE: &[&str] = &["job_title"];
const EXP_MIN: &[&str] = &[
    "experience_years_min",
    "experience_min_years",
    "exp_years_min",
    "years_total",
];
const EXP_MAX: &[&str] = &["experience_years_max", "experience_max_years", "exp_years_max"];
const EXP_AT_COMPANY: &[&str] = &[
    "experience_years_at_company",
    "years_at_company",
    "company_experience_years",
];
const BASE: &[&str] = &["base_salary", "base_salary_cad"];
const STOCK: &[&str] = &["stock", "stock_cad", "stock_yearly_cad"];
const BONUS: &[&str] = &["bonus", "bonus_cad"];
const POSTED: &[&str] = &["posted_date", "submitted_date", "date"];
const SOURCE: &[&str] = &["source"];
const COLLECTION_DATE: &[&str] = &["collection_date"];

/// Header positions resolved through the alias lists; first alias present wins.
#[derive(Debug, Default)]
struct ColumnMap {
    compensation: Option<usize>,
    salary_min: Option<usize>,
    salary_max: Option<usize>,
    company: Option<usize>,
    location: Option<usize>,
    level: Option<usize>,
    job_title: Option<usize>,
    exp_min: Option<usize>,
    exp_max: Option<usize>,
    exp_at_company: Option<usize>,
    base: Option<usize>,
    stock: Option<usize>,
    bonus: Option<usize>,
    posted: Option<usize>,
    source: Option<usize>,
    collection_date: Option<usize>,
}

impl ColumnMap {
    fn resolve(headers: &StringRecord, file: &Path) -> PipelineResult<Self> {
        let find = |aliases: &[&str]| {
            aliases.iter().find_map(|alias| {
                headers
                    .iter()
                    .position(|h| h.trim().eq_ignore_ascii_case(alias))
            })
        };
        let map = ColumnMap {
            compensation: find(COMPENSATION),
            salary_min: find(SALARY_MIN),
            salary_max: find(SALARY_MAX),
            company: find(COMPANY),
            location: find(LOCATION),
            level: find(LEVEL),
            job_title: find(JOB_TITLE),
            exp_min: find(EXP_MIN),
            exp_max: find(EXP_MAX),
            exp_at_company: find(EXP_AT_COMPANY),
            base: find(BASE),
            stock: find(STOCK),
            bonus: find(BONUS),
            posted: find(POSTED),
            source: find(SOURCE),
            collection_date: find(COLLECTION_DATE),
        };

        if map.compensation.is_none() {
            return Err(PipelineError::MissingColumn {
                file: file.to_path_buf(),
                column: COMPENSATION.join("|"),
            });
        }
        if map.location.is_none() && map.company.is_none() {
            return Err(PipelineError::MissingColumn {
                file: file.to_path_buf(),
                column: "location|company".into(),
            });
        }
        Ok(map)
    }
}

fn cell(row: &StringRecord, idx: Option<usize>) -> Option<String> {
    let value = row.get(idx?)?.trim();
    (!value.is_empty()).then(|| value.to_string())
}

/// Rows of an already-tabular producer as raw candidates. A missing required
/// column fails the whole file; a malformed row is skipped.
pub fn read_csv_candidates(path: &Path) -> PipelineResult<Vec<RawRecord>> {
    let mut rdr = csv::Reader::from_path(path)?;
    let headers = rdr.headers()?.clone();
    let cols = ColumnMap::resolve(&headers, path)?;
    let file = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let mut out = Vec::new();
    for (idx, row) in rdr.records().enumerate() {
        let row = match row {
            Ok(r) => r,
            Err(e) => {
                warn!(file = %file, row = idx + 1, error = %e, "Skipping malformed CSV row");
                continue;
            }
        };
        out.push(RawRecord {
            company: cell(&row, cols.company),
            location: cell(&row, cols.location),
            posted_date: cell(&row, cols.posted),
            level: cell(&row, cols.level),
            job_title: cell(&row, cols.job_title),
            experience: cell(&row, cols.exp_min),
            experience_at_company: cell(&row, cols.exp_at_company),
            compensation: cell(&row, cols.compensation),
            salary_min: cell(&row, cols.salary_min),
            salary_max: cell(&row, cols.salary_max),
            experience_max: cell(&row, cols.exp_max),
            base: cell(&row, cols.base),
            stock: cell(&row, cols.stock),
            bonus: cell(&row, cols.bonus),
            source: cell(&row, cols.source),
            collection_date: cell(&row, cols.collection_date),
            context: FragmentContext {
                file: file.clone(),
                fragment: idx,
                strategy: "csv",
            },
            ..Default::default()
        });
    }
    Ok(out)
}

/// Load a master dataset written by this tool.
pub fn read_master(path: &Path) -> PipelineResult<Vec<SalaryRecord>> {
    if !path.exists() {
        return Err(PipelineError::MissingInput(path.to_path_buf()));
    }
    let mut rdr = csv::Reader::from_path(path)?;
    let headers = rdr.headers()?.clone();
    for column in MASTER_COLUMNS {
        if !headers.iter().any(|h| h == *column) {
            return Err(PipelineError::MissingColumn {
                file: path.to_path_buf(),
                column: column.to_string(),
            });
        }
    }
    let mut records = Vec::new();
    for row in rdr.deserialize() {
        records.push(row?);
    }
    debug!(count = records.len(), path = %path.display(), "Loaded master dataset");
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(dir: &Path, name: &str, body: &str) -> PathBuf {
        let p = dir.join(name);
        fs::write(&p, body).unwrap();
        p
    }

    #[test]
    fn discovery_is_lexicographic_and_filtered() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "levels_toronto.html", "");
        write(dir.path(), "glassdoor_montreal.HTM", "");
        write(dir.path(), "seed.csv", "");
        write(dir.path(), "notes.txt", "");
        fs::create_dir(dir.path().join("sub.html")).unwrap();

        let files = discover(dir.path()).unwrap();
        let names: Vec<String> = files.iter().map(SourceFile::name).collect();
        assert_eq!(names, vec!["glassdoor_montreal.HTM", "levels_toronto.html", "seed.csv"]);
        assert_eq!(files[2].kind, DocumentKind::Csv);
        assert_eq!(files[0].kind, DocumentKind::Html);
    }

    #[test]
    fn missing_and_empty_inputs() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            discover(&dir.path().join("nope")),
            Err(PipelineError::MissingInput(_))
        ));
        assert!(matches!(discover(dir.path()), Err(PipelineError::NoInputFiles(_))));
    }

    #[test]
    fn invalid_utf8_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("bad.html");
        fs::write(&p, [0xff, 0xfe, 0x00, 0xc3]).unwrap();
        assert!(matches!(read_html(&p), Err(PipelineError::Io(_))));
    }

    #[test]
    fn csv_aliases_resolve() {
        let dir = tempfile::tempdir().unwrap();
        let p = write(
            dir.path(),
            "submissions.csv",
            "job_title,experience_min_years,experience_max_years,location,location_full,submitted_date,salary_min_cad,salary_max_cad,salary_median_cad\n\
             AI Engineer,4,6,Montreal,\"Montreal, QC\",\"Jan 5, 2025\",92000,108000,100000\n\
             AI Engineer,0,1,Toronto,\"Toronto, ON\",,85000,85000,\n",
        );
        let recs = read_csv_candidates(&p).unwrap();
        assert_eq!(recs.len(), 2);
        assert_eq!(recs[0].location.as_deref(), Some("Montreal, QC"));
        assert_eq!(recs[0].experience.as_deref(), Some("4"));
        assert_eq!(recs[0].experience_max.as_deref(), Some("6"));
        assert_eq!(recs[0].compensation.as_deref(), Some("100000"));
        assert_eq!(recs[0].salary_min.as_deref(), Some("92000"));
        assert_eq!(recs[0].posted_date.as_deref(), Some("Jan 5, 2025"));
        assert_eq!(recs[0].context.strategy, "csv");
        // empty cells are absent, not empty strings
        assert_eq!(recs[1].compensation, None);
        assert_eq!(recs[1].posted_date, None);
    }

    #[test]
    fn missing_required_column_names_it() {
        let dir = tempfile::tempdir().unwrap();
        let no_comp = write(dir.path(), "a.csv", "company,location\nAcme,Montreal\n");
        match read_csv_candidates(&no_comp) {
            Err(PipelineError::MissingColumn { column, .. }) => {
                assert!(column.starts_with("salary_median|"))
            }
            other => panic!("expected MissingColumn, got {:?}", other),
        }

        let no_place = write(dir.path(), "b.csv", "salary,level\n120000,L3\n");
        match read_csv_candidates(&no_place) {
            Err(PipelineError::MissingColumn { column, .. }) => assert_eq!(column, "location|company"),
            other => panic!("expected MissingColumn, got {:?}", other),
        }
    }

    #[test]
    fn master_requires_every_column() {
        let dir = tempfile::tempdir().unwrap();
        let p = write(dir.path(), "master.csv", "source,company\nGlassdoor,Acme\n");
        assert!(matches!(
            read_master(&p),
            Err(PipelineError::MissingColumn { ref column, .. }) if column == "collection_date"
        ));
    }
}
