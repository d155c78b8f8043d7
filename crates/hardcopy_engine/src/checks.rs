use engine_logging::engine_debug;

use crate::settings::EngineSettings;

/// Word counts gathered for one article while it was written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArticleReport {
    pub url: String,
    /// Count recorded by the capture step for the readable variant.
    pub metadata_words: Option<u32>,
    /// Count over the rendered raw-page Markdown.
    pub raw_markdown_words: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CheckOptions {
    pub readability: bool,
    pub ignore_long_articles: bool,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ArticleCheckError {
    #[error(
        "readable variant of {url} kept {metadata_words} words but the raw page has {raw_words}; rerun with --use-raw-html"
    )]
    ReadabilityDisparity {
        url: String,
        metadata_words: u32,
        raw_words: u32,
    },
    #[error("{url} has {words} words (limit {limit}); run it on its own or pass --ignore-long-articles")]
    TooLong { url: String, words: u32, limit: u32 },
}

/// Reject a batch in which an article lost most of its text to readability
/// extraction, or in which a long article is bundled with others.
pub fn check_articles(
    reports: &[ArticleReport],
    settings: &EngineSettings,
    options: CheckOptions,
) -> Result<(), ArticleCheckError> {
    for report in reports {
        let Some(words) = report.metadata_words else {
            engine_debug!("No word count recorded for {}, skipping checks", report.url);
            continue;
        };

        let watched = settings
            .disparity_hosts
            .iter()
            .any(|host| report.url.contains(host.as_str()));
        if options.readability
            && watched
            && words > settings.disparity_min_words
            && f64::from(report.raw_markdown_words) / f64::from(words) > settings.disparity_ratio
        {
            return Err(ArticleCheckError::ReadabilityDisparity {
                url: report.url.clone(),
                metadata_words: words,
                raw_words: report.raw_markdown_words,
            });
        }

        if words >= settings.long_article_words && reports.len() > 1 && !options.ignore_long_articles {
            return Err(ArticleCheckError::TooLong {
                url: report.url.clone(),
                words,
                limit: settings.long_article_words,
            });
        }
    }
    Ok(())
}
