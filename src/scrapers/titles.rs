//! Matching of configured production titles against listing text.

use crate::utils::fold;

/// Case- and diacritic-insensitive substring matcher for target titles.
#[derive(Debug, Clone)]
pub struct TitleMatcher {
    /// (canonical title, folded title)
    titles: Vec<(String, String)>,
}

impl TitleMatcher {
    pub fn new<I, S>(titles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut seen: Vec<(String, String)> = Vec::new();
        for title in titles {
            let canonical = title.as_ref().trim().to_string();
            let folded = fold(&canonical);
            if folded.is_empty() || seen.iter().any(|(_, f)| *f == folded) {
                continue;
            }
            seen.push((canonical, folded));
        }
        Self { titles: seen }
    }

    /// Canonical title of the first target mentioned in `text`.
    pub fn find(&self, text: &str) -> Option<&str> {
        let folded = fold(text);
        self.titles
            .iter()
            .find(|(_, f)| folded.contains(f.as_str()))
            .map(|(canonical, _)| canonical.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.titles.is_empty()
    }
}
