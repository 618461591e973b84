use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, warn};

use super::flatten::collapse_ws;
use super::profiles::{FieldMap, FieldSource, StructuralSpec};
use crate::record::{FragmentContext, RawRecord};

static CARD_EXP_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\d+\s*-\s*\d+\s*Years?|Less than 1 Year|\d+\+?\s*Years?").unwrap()
});
static CARD_LOC_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([A-Za-z][A-Za-z .'-]*),\s*([A-Z]{2})\b").unwrap());
static CARD_DATE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)submitted on\s+([A-Za-z]+\s+\d{1,2},\s+\d{4})").unwrap()
});
static CARD_SALARY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\$?[\d,.]+\s*K?(?:\s*[-–]\s*\$?[\d,.]+\s*K?)?)\s*\|?\s*/\s*yr").unwrap()
});

fn selector(css: &str) -> Option<Selector> {
    match Selector::parse(css) {
        Ok(sel) => Some(sel),
        Err(e) => {
            warn!(selector = css, error = %e, "Invalid selector, skipping");
            None
        }
    }
}

/// One candidate per container matched by `spec`. Pages without the
/// expected containers produce nothing.
pub fn extract(html: &Html, spec: &StructuralSpec, file: &str) -> Vec<RawRecord> {
    let Some(container) = selector(spec.container) else {
        return Vec::new();
    };
    match &spec.fields {
        FieldSource::Selectors(map) => by_selectors(html, &container, map, spec.name, file),
        FieldSource::CardText { must_mention } => {
            by_card_text(html, &container, must_mention, spec.name, file)
        }
    }
}

fn by_selectors(
    html: &Html,
    container: &Selector,
    map: &FieldMap,
    strategy: &'static str,
    file: &str,
) -> Vec<RawRecord> {
    let mut records = Vec::new();

    for (idx, el) in html.select(container).enumerate() {
        let company = first_text(&el, map.company);
        if company.is_none() && map.require_company {
            debug!(file, fragment = idx, "No employer in container, skipping");
            continue;
        }

        let (location, posted_date) = match first_text(&el, map.location) {
            Some(text) if map.location_has_date => match text.split_once('|') {
                Some((loc, date)) => (
                    Some(loc.trim().to_string()),
                    Some(date.trim().to_string()).filter(|d| !d.is_empty()),
                ),
                None => (Some(text), None),
            },
            other => (other, None),
        };

        let rec = RawRecord {
            company,
            location,
            posted_date,
            level: first_text(&el, map.level),
            job_title: first_text(&el, map.job_title),
            experience: first_text(&el, map.experience),
            experience_at_company: first_text(&el, map.experience_at_company),
            compensation: first_text(&el, map.compensation),
            breakdown: first_text(&el, map.breakdown),
            range: first_text(&el, map.range),
            median: first_text(&el, map.median),
            context: FragmentContext {
                file: file.to_string(),
                fragment: idx,
                strategy,
            },
            ..Default::default()
        };

        if !rec.has_compensation_text() {
            debug!(file, fragment = idx, "No compensation in container, skipping");
            continue;
        }
        records.push(rec);
    }

    records
}

fn first_text(el: &ElementRef, selectors: &[&str]) -> Option<String> {
    selectors.iter().find_map(|css| {
        let sel = selector(css)?;
        let found = el.select(&sel).next()?;
        let text = collapse_ws(&found.text().collect::<Vec<_>>().join(" "));
        (!text.is_empty()).then_some(text)
    })
}

/// Free-form cards: the card's text nodes joined with `|`, then matched
/// field by field. Only the innermost matching card is used so that nested
/// wrappers don't yield the same submission twice.
fn by_card_text(
    html: &Html,
    container: &Selector,
    must_mention: &str,
    strategy: &'static str,
    file: &str,
) -> Vec<RawRecord> {
    let mut records = Vec::new();

    for (idx, card) in html.select(container).enumerate() {
        if card.select(container).next().is_some() {
            continue;
        }
        let text = card
            .text()
            .map(collapse_ws)
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join("|");
        if !text.contains(must_mention) {
            continue;
        }

        let (Some(loc), Some(salary)) = (CARD_LOC_RE.captures(&text), CARD_SALARY_RE.captures(&text))
        else {
            debug!(file, fragment = idx, "Card missing location or salary, skipping");
            continue;
        };
        let salary = salary[1].trim().to_string();
        let is_range = salary.contains('-') || salary.contains('–');

        records.push(RawRecord {
            job_title: Some(must_mention.to_string()),
            location: Some(format!("{}, {}", loc[1].trim(), &loc[2])),
            experience: CARD_EXP_RE.find(&text).map(|m| m.as_str().to_string()),
            posted_date: CARD_DATE_RE.captures(&text).map(|c| c[1].to_string()),
            range: is_range.then(|| salary.clone()),
            compensation: (!is_range).then_some(salary),
            context: FragmentContext {
                file: file.to_string(),
                fragment: idx,
                strategy,
            },
            ..Default::default()
        });
    }

    records
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::profiles::{lookup, Strategy};

    fn spec_for(source: &str, name: &str) -> &'static StructuralSpec {
        lookup(source)
            .unwrap()
            .strategies
            .iter()
            .find_map(|s| match s {
                Strategy::Structural(spec) if spec.name == name => Some(*spec),
                _ => None,
            })
            .unwrap()
    }

    const LEVELS_ROW: &str = r#"<table><tbody>
        <tr class="salary-row_collapsedSalaryRow__abc">
          <td><a class="salary-row_companyName__x">Acme Inc</a>
              <span class="css-xlmjpr">Montreal, QC, Canada | 3 days ago</span></td>
          <td><p class="salary-row_levelName__y">L3</p></td>
          <td class="css-w3va9g"><p class="MuiTypography-body1">2 yrs</p>
              <span class="MuiTypography-caption">2 yrs</span></td>
          <td class="salary-row_totalCompCell__z"><p class="MuiTypography-body1">122 000 $CA</p>
              <span class="MuiTypography-caption">107k | 5k | 10k</span></td>
        </tr>
        <tr class="salary-row_collapsedSalaryRow__abc">
          <td><span class="css-xlmjpr">Toronto, ON, Canada</span></td>
          <td class="salary-row_totalCompCell__z"><p class="MuiTypography-body1">150 000 $CA</p></td>
        </tr>
        </tbody></table>"#;

    #[test]
    fn levels_rows_by_selector() {
        let html = Html::parse_document(LEVELS_ROW);
        let recs = extract(&html, spec_for("levelsfyi", "levels-table"), "levels.html");
        // second row has no employer
        assert_eq!(recs.len(), 1);
        let r = &recs[0];
        assert_eq!(r.company.as_deref(), Some("Acme Inc"));
        assert_eq!(r.location.as_deref(), Some("Montreal, QC, Canada"));
        assert_eq!(r.posted_date.as_deref(), Some("3 days ago"));
        assert_eq!(r.level.as_deref(), Some("L3"));
        assert_eq!(r.experience.as_deref(), Some("2 yrs"));
        assert_eq!(r.experience_at_company.as_deref(), Some("2 yrs"));
        assert_eq!(r.compensation.as_deref(), Some("122 000 $CA"));
        assert_eq!(r.breakdown.as_deref(), Some("107k | 5k | 10k"));
        assert_eq!(r.context.strategy, "levels-table");
    }

    #[test]
    fn missing_markers_fail_closed() {
        let html = Html::parse_document("<html><body><p>Acme Inc 122k</p></body></html>");
        for (source, name) in [
            ("levelsfyi", "levels-table"),
            ("glassdoor", "glassdoor-cards"),
            ("glassdoor-companies", "glassdoor-employers"),
        ] {
            assert!(extract(&html, spec_for(source, name), "x.html").is_empty());
        }
    }

    #[test]
    fn employer_cards() {
        let html = Html::parse_document(
            r#"<div class="SalariesList_Item__1">
                 <p class="salary-card_EmployerName__a">Chubb</p>
                 <section class="salary-card_TitleTrim__b">AI Engineer</section>
                 <div class="salary-card_TotalPay__c">$72K - $110K/yr</div>
                 <div class="salary-card_BreakdownBold__d">$89K</div>
               </div>
               <div class="SalariesList_Item__1"><p>no employer</p></div>"#,
        );
        let recs = extract(&html, spec_for("glassdoor-companies", "glassdoor-employers"), "glassdoor_toronto.html");
        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].company.as_deref(), Some("Chubb"));
        assert_eq!(recs[0].range.as_deref(), Some("$72K - $110K/yr"));
        assert_eq!(recs[0].median.as_deref(), Some("$89K"));
        assert_eq!(recs[0].job_title.as_deref(), Some("AI Engineer"));
        assert_eq!(recs[0].location, None);
    }

    #[test]
    fn nested_cards_yield_innermost_only() {
        let html = Html::parse_document(
            r#"<div class="salary-list">
                 <div class="salary-report">
                   <span>AI Engineer</span><span>4-6 Years</span><span>Montreal, QC</span>
                   <span>submitted on Jan 5, 2025</span><span>$92K-$108K</span><span>/yr</span>
                 </div>
                 <div class="salary-report"><span>Data Analyst</span><span>Laval, QC</span><span>$70K /yr</span></div>
               </div>"#,
        );
        let recs = extract(&html, spec_for("glassdoor", "glassdoor-cards"), "g.html");
        assert_eq!(recs.len(), 1);
        let r = &recs[0];
        assert_eq!(r.location.as_deref(), Some("Montreal, QC"));
        assert_eq!(r.experience.as_deref(), Some("4-6 Years"));
        assert_eq!(r.posted_date.as_deref(), Some("Jan 5, 2025"));
        assert_eq!(r.range.as_deref(), Some("$92K-$108K"));
        assert_eq!(r.context.fragment, 1);
    }

    #[test]
    fn card_classes_match_case_insensitively() {
        let html = Html::parse_document(
            r#"<div class="SalaryCard_x">
                 <span>AI Engineer</span><span>2-4 Years</span><span>Toronto, ON</span>
                 <span>$95K /yr</span>
               </div>
               <article class="Submission-Item">
                 <span>AI Engineer</span><span>7-9 Years</span><span>Ottawa, ON</span>
                 <span>submitted on Feb 2, 2025</span><span>$120K - $140K</span><span>/yr</span>
               </article>
               <article class="REPORT"><span>AI Engineer</span><span>Laval, QC</span><span>$88K/yr</span></article>"#,
        );
        let recs = extract(&html, spec_for("glassdoor", "glassdoor-cards"), "g.html");
        assert_eq!(recs.len(), 3);
        assert_eq!(recs[0].location.as_deref(), Some("Toronto, ON"));
        assert_eq!(recs[0].compensation.as_deref(), Some("$95K"));
        assert_eq!(recs[1].location.as_deref(), Some("Ottawa, ON"));
        assert_eq!(recs[1].range.as_deref(), Some("$120K - $140K"));
        assert_eq!(recs[2].location.as_deref(), Some("Laval, QC"));
    }
}
