use regex::Regex;

use crate::settings::PipelineConfig;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Place {
    pub city: String,
    pub province: Option<String>,
    pub country: String,
}

/// Split "Montreal, QC, Canada" into its parts. The city is whatever precedes
/// the first comma; the country is the first known country named after it,
/// falling back to the configured default.
pub fn decompose(location: &str, cfg: &PipelineConfig) -> Place {
    let location = location.trim();
    let (city, rest) = match location.split_once(',') {
        Some((city, rest)) => (city.trim(), rest.trim()),
        None => (location, ""),
    };

    // "QC", "QC, Canada" or "WA United States"
    let province = rest
        .split(',')
        .next()
        .and_then(|seg| seg.split_whitespace().next())
        .filter(|p| p.len() == 2 && p.chars().all(|c| c.is_ascii_uppercase()))
        .map(str::to_string);

    let country = detect_country(rest, cfg).unwrap_or_else(|| cfg.default_country.clone());

    Place {
        city: if city.is_empty() { "Unknown".into() } else { city.to_string() },
        province,
        country,
    }
}

fn detect_country(rest: &str, cfg: &PipelineConfig) -> Option<String> {
    if rest.is_empty() {
        return None;
    }
    cfg.known_countries
        .iter()
        .find(|c| contains_word(rest, c))
        .map(|c| canonical_country(c))
}

fn contains_word(haystack: &str, needle: &str) -> bool {
    if needle.is_empty() {
        return false;
    }
    let pattern = format!(r"(?i)\b{}\b", regex::escape(needle));
    Regex::new(&pattern)
        .ok()
        .map(|re| re.is_match(haystack))
        .unwrap_or(false)
}

fn canonical_country(name: &str) -> String {
    match name.to_lowercase().as_str() {
        "usa" | "united states" | "us" => "USA".into(),
        _ => name.to_string(),
    }
}

/// "glassdoor_montreal.html" → "Montreal", "levels_new_york.html" → "New York".
pub fn location_from_filename(file_name: &str) -> Option<String> {
    let stem = file_name.rsplit_once('.').map_or(file_name, |(s, _)| s);
    let (_, place) = stem.split_once('_')?;
    let words: Vec<String> = place
        .split(['_', '-'])
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect();
    if words.is_empty() {
        None
    } else {
        Some(words.join(" "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_canadian_location() {
        let cfg = PipelineConfig::default();
        let p = decompose("Montreal, QC, Canada", &cfg);
        assert_eq!(p.city, "Montreal");
        assert_eq!(p.province.as_deref(), Some("QC"));
        assert_eq!(p.country, "Canada");
    }

    #[test]
    fn us_location_is_canonicalized() {
        let cfg = PipelineConfig::default();
        let p = decompose("San Francisco, CA, United States", &cfg);
        assert_eq!(p.city, "San Francisco");
        assert_eq!(p.province.as_deref(), Some("CA"));
        assert_eq!(p.country, "USA");
    }

    #[test]
    fn bare_city_gets_default_country() {
        let cfg = PipelineConfig::default();
        let p = decompose("Toronto", &cfg);
        assert_eq!(p.city, "Toronto");
        assert_eq!(p.province, None);
        assert_eq!(p.country, "Canada");

        let remote = decompose("Remote", &cfg);
        assert_eq!(remote.city, "Remote");
    }

    #[test]
    fn city_named_like_country_is_not_country() {
        let cfg = PipelineConfig::default();
        // country is only read after the first comma
        let p = decompose("Canada Place, BC", &cfg);
        assert_eq!(p.city, "Canada Place");
        assert_eq!(p.country, "Canada");
        assert_eq!(p.province.as_deref(), Some("BC"));
    }

    #[test]
    fn country_without_separating_comma() {
        let cfg = PipelineConfig::default();
        let p = decompose("Seattle, WA United States", &cfg);
        assert_eq!(p.city, "Seattle");
        assert_eq!(p.province.as_deref(), Some("WA"));
        assert_eq!(p.country, "USA");

        let p = decompose("Austin, TX USA | 3 days ago", &cfg);
        assert_eq!(p.country, "USA");

        // "Canadian" is not the word "Canada"
        let p = decompose("Toronto, ON Canadian Tire HQ, USA", &cfg);
        assert_eq!(p.country, "USA");
    }

    #[test]
    fn filename_locations() {
        assert_eq!(location_from_filename("glassdoor_montreal.html").as_deref(), Some("Montreal"));
        assert_eq!(location_from_filename("levels_new_york.html").as_deref(), Some("New York"));
        assert_eq!(location_from_filename("page.html"), None);
    }
}
