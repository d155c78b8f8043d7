use std::time::Duration;

/// Tunables for a run. `Default` gives the production values.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineSettings {
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub redirect_limit: usize,
    /// Upper bound for a single downloaded asset.
    pub max_asset_bytes: u64,
    /// Upper bound for a captured page.
    pub max_page_bytes: u64,
    pub max_concurrent_fetches: usize,
    /// Assets at or below this size are treated as broken (tracking pixels,
    /// empty responses) and replaced by the placeholder.
    pub min_image_bytes: u64,
    /// URL prefixes of CDNs that transcode images regardless of the suffix in
    /// the URL; their assets always go through extension discovery.
    pub content_negotiating_hosts: Vec<String>,
    pub converter_program: String,
    /// URL fragments of sites whose readability output is checked against the
    /// raw page word count.
    pub disparity_hosts: Vec<String>,
    pub disparity_min_words: u32,
    pub disparity_ratio: f64,
    pub long_article_words: u32,
    pub page_content_types: Vec<String>,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(60),
            redirect_limit: 10,
            max_asset_bytes: 50 * 1024 * 1024,
            max_page_bytes: 20 * 1024 * 1024,
            max_concurrent_fetches: 8,
            min_image_bytes: 128,
            content_negotiating_hosts: vec!["https://substackcdn.com".to_string()],
            converter_program: "ffmpeg".to_string(),
            disparity_hosts: vec!["www.newyorker.com/".to_string()],
            disparity_min_words: 500,
            disparity_ratio: 2.0,
            long_article_words: 3000,
            page_content_types: vec![
                "text/html".to_string(),
                "application/xhtml+xml".to_string(),
            ],
        }
    }
}

impl EngineSettings {
    pub fn is_content_negotiating(&self, url: &str) -> bool {
        self.content_negotiating_hosts
            .iter()
            .any(|prefix| url.starts_with(prefix.as_str()))
    }

    pub(crate) fn fetch_limit(&self) -> usize {
        self.max_concurrent_fetches.max(1)
    }
}
