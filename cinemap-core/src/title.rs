use regex::Regex;

/// Turns the raw title column into the name shown to the user.
pub trait TitleParser {
    fn parse_title(&self, raw: &str) -> Option<String>;
}

impl<F> TitleParser for F
where
    F: Fn(&str) -> Option<String>,
{
    fn parse_title(&self, raw: &str) -> Option<String> {
        self(raw)
    }
}

/// Understands the IMDb title notation:
/// `"Series" (2004) {Episode (#1.2)}`, `Movie (1999/II) (TV)`, `Unknown (????)`.
pub struct ImdbTitleParser {
    year_marker: Regex,
}

impl ImdbTitleParser {
    pub fn new() -> Self {
        Self {
            year_marker: Regex::new(r"\s*\((?:\d{4}|\?{4})(?:/[IVXLCDM]+)?\)")
                .expect("year marker pattern"),
        }
    }
}

impl Default for ImdbTitleParser {
    fn default() -> Self {
        Self::new()
    }
}

impl TitleParser for ImdbTitleParser {
    fn parse_title(&self, raw: &str) -> Option<String> {
        let raw = raw.trim();
        let without_episode = match raw.find('{') {
            Some(idx) => &raw[..idx],
            None => raw,
        };
        let bare = match self.year_marker.find(without_episode) {
            Some(m) => &without_episode[..m.start()],
            None => without_episode,
        };
        let title = bare.trim().trim_matches('"').trim();
        match title.is_empty() {
            true => None,
            false => Some(title.to_string()),
        }
    }
}
