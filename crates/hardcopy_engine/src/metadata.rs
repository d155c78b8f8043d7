/// The `<metadata>` block embedded in captured pages: a JSON array of
/// display strings whose last entry reads `"<N> words"`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ArticleMetadata {
    pub entries: Vec<String>,
}

impl ArticleMetadata {
    /// A site name equal to the byline is listed once.
    pub fn from_parts(byline: Option<&str>, site_name: Option<&str>, word_count: u32) -> Self {
        let byline = byline.map(str::trim).filter(|b| !b.is_empty());
        let site_name = site_name
            .map(str::trim)
            .filter(|s| !s.is_empty() && Some(*s) != byline);
        let mut entries: Vec<String> = [byline, site_name]
            .into_iter()
            .flatten()
            .map(str::to_string)
            .collect();
        entries.push(format!("{word_count} words"));
        Self { entries }
    }

    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        let entries: Vec<String> = serde_json::from_str(text.trim())?;
        Ok(Self { entries })
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self.entries)
    }

    /// The human-readable line shown under the article title.
    pub fn display_line(&self) -> String {
        self.entries.join(" • ")
    }

    pub fn word_count(&self) -> Option<u32> {
        self.entries
            .last()?
            .trim()
            .strip_suffix("words")?
            .trim()
            .parse()
            .ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn word_count_comes_from_last_entry() {
        let meta = ArticleMetadata::parse(r#"["Jane Doe", "The Paper", "1234 words"]"#).unwrap();
        assert_eq!(meta.word_count(), Some(1234));
        assert_eq!(meta.display_line(), "Jane Doe • The Paper • 1234 words");

        let meta = ArticleMetadata::parse(r#"["Jane Doe"]"#).unwrap();
        assert_eq!(meta.word_count(), None);
        assert!(ArticleMetadata::parse("not json").is_err());
    }

    #[test]
    fn parts_skip_missing_values() {
        let meta = ArticleMetadata::from_parts(None, Some(" Site "), 7);
        assert_eq!(meta.entries, vec!["Site".to_string(), "7 words".to_string()]);
        assert_eq!(meta.to_json().unwrap(), r#"["Site","7 words"]"#);

        let meta = ArticleMetadata::from_parts(Some("Paper"), Some("Paper"), 1);
        assert_eq!(meta.display_line(), "Paper • 1 words");
    }
}
