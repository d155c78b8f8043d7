use once_cell::sync::Lazy;
use regex::Regex;

static LINK_WITH_SHORTCODE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\[.*?\]\(.*?\)( \{[a-zA-Z0-9]{3}\})?").expect("hardcoded regex pattern is valid")
});
static LONE_BULLET: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^\s*\*\s*$").expect("hardcoded regex pattern is valid"));

pub trait WordCounter: Send + Sync {
    fn count(&self, text: &str) -> u32;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct WhitespaceWordCounter;

impl WordCounter for WhitespaceWordCounter {
    fn count(&self, text: &str) -> u32 {
        text.split_whitespace().count() as u32
    }
}

/// Counts prose words in rendered Markdown. Link text, shortcodes and bare
/// `*` lines do not count.
#[derive(Debug, Default, Clone, Copy)]
pub struct MarkdownWordCounter;

impl WordCounter for MarkdownWordCounter {
    fn count(&self, text: &str) -> u32 {
        let without_links = LINK_WITH_SHORTCODE.replace_all(text, "");
        let without_bullets = LONE_BULLET.replace_all(&without_links, "");
        WhitespaceWordCounter.count(&without_bullets)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn links_and_lone_bullets_do_not_count() {
        let markdown = "One two [three four](https://x.y/) {AbC} five.\n\n*\n\n* * *\n\nsix";
        // "* * *" is not a lone bullet and counts as three tokens.
        assert_eq!(MarkdownWordCounter.count(markdown), 7);
    }

    #[test]
    fn whitespace_counter_counts_tokens() {
        assert_eq!(WhitespaceWordCounter.count("  a b\n\tc  "), 3);
    }
}
