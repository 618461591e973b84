use scraper::{Html, Node};

const SKIPPED: &[&str] = &["script", "style", "noscript", "template", "head"];

/// The visible text of a page, one text node per line.
#[derive(Debug, Clone, Default)]
pub struct FlatText {
    pub lines: Vec<String>,
}

impl FlatText {
    pub fn from_html(html: &Html) -> Self {
        let mut lines = Vec::new();
        for node in html.root_element().descendants() {
            let Node::Text(text) = node.value() else {
                continue;
            };
            let hidden = node.ancestors().any(|a| {
                a.value()
                    .as_element()
                    .is_some_and(|e| SKIPPED.contains(&e.name()))
            });
            if hidden {
                continue;
            }
            let line = collapse_ws(text);
            if !line.is_empty() {
                lines.push(line);
            }
        }
        Self { lines }
    }

    /// All lines joined by single spaces.
    pub fn joined(&self) -> String {
        self.lines.join(" ")
    }
}

pub fn collapse_ws(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
