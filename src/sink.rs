use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use csv::{Writer, WriterBuilder};
use tracing::info;

use crate::aggregate::{self, AggregateRow, EmployerRank, GroupBy, PivotTable};
use crate::error::PipelineResult;
use crate::record::{RawRecord, SalaryRecord, MASTER_COLUMNS};
use crate::settings::PipelineConfig;

pub const TOP_EMPLOYERS_FILE: &str = "top_employers.csv";
pub const PIVOT_FILE: &str = "matrix_city_experience.csv";

fn ensure_parent(path: &Path) -> PipelineResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    Ok(())
}

/// Headers are written by hand so an empty table still has its columns.
fn open(path: &Path) -> PipelineResult<Writer<File>> {
    ensure_parent(path)?;
    Ok(WriterBuilder::new().has_headers(false).from_path(path)?)
}

fn fmt_f64(v: f64) -> String {
    format!("{:.2}", v)
}

fn fmt_opt(v: Option<f64>) -> String {
    v.map(fmt_f64).unwrap_or_default()
}

/// Replace `path` with the records in master-column order.
pub fn write_master(path: &Path, records: &[SalaryRecord]) -> PipelineResult<()> {
    let mut w = open(path)?;
    w.write_record(MASTER_COLUMNS)?;
    for rec in records {
        w.serialize(rec)?;
    }
    w.flush()?;
    info!(path = %path.display(), rows = records.len(), "Wrote master dataset");
    Ok(())
}

pub fn write_aggregate(path: &Path, key_column: &str, rows: &[AggregateRow]) -> PipelineResult<()> {
    let mut w = open(path)?;
    w.write_record([key_column, "count", "mean", "median", "min", "max", "p25", "p75", "stddev"])?;
    for row in rows {
        let s = &row.stats;
        w.write_record([
            row.key.clone(),
            s.count.to_string(),
            fmt_f64(s.mean),
            fmt_f64(s.median),
            s.min.to_string(),
            s.max.to_string(),
            fmt_f64(s.p25),
            fmt_f64(s.p75),
            fmt_opt(s.stddev),
        ])?;
    }
    w.flush()?;
    Ok(())
}

pub fn write_rankings(path: &Path, ranks: &[EmployerRank]) -> PipelineResult<()> {
    let mut w = open(path)?;
    w.write_record(["company", "count", "median", "mean", "min", "max", "top_location"])?;
    for r in ranks {
        w.write_record([
            r.company.clone(),
            r.count.to_string(),
            fmt_f64(r.median),
            fmt_f64(r.mean),
            r.min.to_string(),
            r.max.to_string(),
            r.top_location.clone(),
        ])?;
    }
    w.flush()?;
    Ok(())
}

pub fn write_pivot(path: &Path, table: &PivotTable) -> PipelineResult<()> {
    let mut w = open(path)?;
    let mut header = vec![table.row_header.to_string()];
    header.extend(table.columns.iter().cloned());
    w.write_record(&header)?;
    for (key, cells) in &table.rows {
        let mut row = vec![key.clone()];
        row.extend(cells.iter().map(|c| fmt_opt(*c)));
        w.write_record(&row)?;
    }
    w.flush()?;
    Ok(())
}

/// Every aggregate view of `records` into `out_dir`. Returns the files written.
pub fn write_report(out_dir: &Path, records: &[SalaryRecord], cfg: &PipelineConfig) -> PipelineResult<Vec<PathBuf>> {
    fs::create_dir_all(out_dir)?;
    let buckets = cfg.buckets();
    let mut written = Vec::new();

    for by in GroupBy::ALL {
        let path = out_dir.join(format!("agg_by_{}.csv", by.file_name()));
        let rows = aggregate::group_stats(records, by, &buckets);
        write_aggregate(&path, by.column(), &rows)?;
        written.push(path);
    }

    let ranks = aggregate::rank_companies(records, cfg.min_group_count, &cfg.unknown_company);
    let path = out_dir.join(TOP_EMPLOYERS_FILE);
    write_rankings(&path, &ranks)?;
    written.push(path);

    let table = aggregate::pivot(records, GroupBy::City, GroupBy::ExperienceLevel, &buckets);
    let path = out_dir.join(PIVOT_FILE);
    write_pivot(&path, &table)?;
    written.push(path);

    info!(dir = %out_dir.display(), files = written.len(), "Wrote aggregate views");
    Ok(written)
}

/// Raw candidates with their document context, for inspecting extraction.
pub fn write_candidates_json(path: &Path, candidates: &[RawRecord]) -> PipelineResult<()> {
    ensure_parent(path)?;
    let file = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(file, candidates)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dedup::tests::record;
    use crate::reader;

    #[test]
    fn master_round_trips_through_reader() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out/master.csv");
        let mut a = record("Levels.fyi", "Acme Inc", "Montreal", 122_000, Some(2));
        a.level = Some("L3".into());
        a.base_salary = Some(107_000);
        a.experience_level = Some("0-3 years".into());
        let b = record("Glassdoor", "Unknown", "Toronto", 95_000, None);

        write_master(&path, &[a.clone(), b.clone()]).unwrap();
        let text = fs::read_to_string(&path).unwrap();
        assert!(text.starts_with(&MASTER_COLUMNS.join(",")));
        assert_eq!(reader::read_master(&path).unwrap(), vec![a, b]);
    }

    #[test]
    fn empty_master_still_has_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("master.csv");
        write_master(&path, &[]).unwrap();
        let text = fs::read_to_string(&path).unwrap();
        assert_eq!(text.trim_end(), MASTER_COLUMNS.join(","));
    }

    #[test]
    fn aggregate_floats_have_two_decimals() {
        let dir = tempfile::tempdir().unwrap();
        let recs = vec![
            record("Levels.fyi", "Acme", "Montreal", 100_000, None),
            record("Levels.fyi", "Acme", "Montreal", 101_001, None),
            record("Levels.fyi", "Acme", "Laval", 90_000, None),
        ];
        let written = write_report(dir.path(), &recs, &PipelineConfig::default()).unwrap();
        assert_eq!(written.len(), 7);

        let city = fs::read_to_string(dir.path().join("agg_by_city.csv")).unwrap();
        let lines: Vec<&str> = city.lines().collect();
        assert_eq!(lines[0], "city,count,mean,median,min,max,p25,p75,stddev");
        assert_eq!(lines[1], "Laval,1,90000.00,90000.00,90000,90000,90000.00,90000.00,");
        assert!(lines[2].starts_with("Montreal,2,100500.50,100500.50,100000,101001,"));

        let top = fs::read_to_string(dir.path().join(TOP_EMPLOYERS_FILE)).unwrap();
        assert_eq!(top.lines().nth(1), Some("Acme,3,100000.00,97000.33,90000,101001,Montreal"));

        let matrix = fs::read_to_string(dir.path().join(PIVOT_FILE)).unwrap();
        // no record has an experience bucket, so only the header remains
        assert_eq!(matrix.lines().count(), 1);
        assert!(matrix.starts_with("city,0-3 years,4-6 years"));
    }

    #[test]
    fn candidates_dump_is_json_array() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cands.json");
        let raw = RawRecord {
            company: Some("Acme Inc".into()),
            ..Default::default()
        };
        write_candidates_json(&path, &[raw]).unwrap();
        let v: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(v[0]["company"], "Acme Inc");
        assert_eq!(v[0]["context"]["strategy"], "");
    }
}
