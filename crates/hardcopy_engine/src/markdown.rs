//! HTML to Markdown through `html2md`, with the image, link and table tags
//! routed to a [`RenderRules`] implementation.

use std::collections::HashMap;
use std::sync::Arc;

use html2md::common::get_tag_attr;
use html2md::{Handle, StructuredPrinter, TagHandler, TagHandlerFactory};

use crate::discover::table_id_from_class;

/// Elements whose content never reaches the Markdown.
const SILENT_TAGS: &[&str] = &["head", "script", "style", "noscript", "template", "metadata"];

/// An `<img>` element as seen by [`RenderRules::image`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImageTag {
    pub src: String,
    pub alt: String,
    pub title: Option<String>,
}

impl ImageTag {
    fn from_handle(tag: &Handle) -> Self {
        Self {
            src: get_tag_attr(tag, "src").unwrap_or_default(),
            alt: get_tag_attr(tag, "alt").unwrap_or_default(),
            title: get_tag_attr(tag, "title"),
        }
    }

    /// Markdown for the image as written in the document.
    pub fn to_markdown(&self) -> String {
        if self.src.is_empty() {
            return String::new();
        }
        self.with_src(&self.src)
    }

    /// Markdown for the image pointing at `src` instead.
    pub fn with_src(&self, src: &str) -> String {
        let alt = self.alt.split_whitespace().collect::<Vec<_>>().join(" ");
        format!("![{alt}]({src}{})", title_part(self.title.as_deref()))
    }
}

/// Hooks for the elements whose rendering depends on run state.
pub trait RenderRules: Send + Sync {
    fn image(&self, image: &ImageTag) -> String {
        image.to_markdown()
    }

    /// Called for anchors with a non-empty `href`; `content` is the Markdown
    /// already rendered for the anchor's children.
    fn link(&self, href: &str, content: &str, title: Option<&str>) -> String {
        link_markdown(href, content, title)
    }

    /// Whether [`RenderRules::table`] replaces tables. When false, html2md
    /// renders them itself.
    fn replaces_tables(&self) -> bool {
        false
    }

    /// Replacement for a whole `<table>`, given its capture id if it has one.
    fn table(&self, _table_id: Option<&str>) -> String {
        String::new()
    }
}

/// Renders every element the html2md way.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlainRules;

impl RenderRules for PlainRules {}

pub fn render_markdown(html: &str, rules: Arc<dyn RenderRules>) -> String {
    let mut handlers: HashMap<String, Box<dyn TagHandlerFactory>> = HashMap::new();
    handlers.insert("img".into(), RuleFactory::boxed(&rules, RuleTag::Image));
    handlers.insert("a".into(), RuleFactory::boxed(&rules, RuleTag::Link));
    if rules.replaces_tables() {
        handlers.insert("table".into(), RuleFactory::boxed(&rules, RuleTag::Table));
    }
    for tag in SILENT_TAGS {
        handlers.insert((*tag).to_string(), Box::new(SilentFactory));
    }
    html2md::parse_html_custom(html, &handlers)
}

pub fn link_markdown(href: &str, content: &str, title: Option<&str>) -> String {
    let href = href.trim().replace('(', "\\(").replace(')', "\\)");
    format!("[{content}]({href}{})", title_part(title))
}

fn title_part(title: Option<&str>) -> String {
    match title.map(str::trim).filter(|t| !t.is_empty()) {
        Some(title) => format!(" \"{}\"", title.replace('"', "\\\"")),
        None => String::new(),
    }
}

#[derive(Clone, Copy)]
enum RuleTag {
    Image,
    Link,
    Table,
}

struct RuleFactory {
    rules: Arc<dyn RenderRules>,
    tag: RuleTag,
}

impl RuleFactory {
    fn boxed(rules: &Arc<dyn RenderRules>, tag: RuleTag) -> Box<dyn TagHandlerFactory> {
        Box::new(Self {
            rules: Arc::clone(rules),
            tag,
        })
    }
}

impl TagHandlerFactory for RuleFactory {
    fn instantiate(&self) -> Box<dyn TagHandler> {
        let rules = Arc::clone(&self.rules);
        match self.tag {
            RuleTag::Image => Box::new(ImageHandler { rules }),
            RuleTag::Link => Box::new(LinkHandler {
                rules,
                start: 0,
                href: None,
                title: None,
            }),
            RuleTag::Table => Box::new(TableHandler { rules }),
        }
    }
}

struct ImageHandler {
    rules: Arc<dyn RenderRules>,
}

impl TagHandler for ImageHandler {
    fn handle(&mut self, tag: &Handle, printer: &mut StructuredPrinter) {
        let image = ImageTag::from_handle(tag);
        printer.append_str(&self.rules.image(&image));
    }

    fn after_handle(&mut self, _printer: &mut StructuredPrinter) {}
}

/// Lets html2md render the anchor's children, then swaps that output for
/// the rules' link.
struct LinkHandler {
    rules: Arc<dyn RenderRules>,
    start: usize,
    href: Option<String>,
    title: Option<String>,
}

impl TagHandler for LinkHandler {
    fn handle(&mut self, tag: &Handle, printer: &mut StructuredPrinter) {
        self.start = printer.data.len();
        self.href = get_tag_attr(tag, "href").filter(|href| !href.trim().is_empty());
        self.title = get_tag_attr(tag, "title");
    }

    fn after_handle(&mut self, printer: &mut StructuredPrinter) {
        let Some(href) = self.href.as_deref() else {
            return;
        };
        let content = printer.data.split_off(self.start);
        let link = self.rules.link(href, content.trim(), self.title.as_deref());
        printer.append_str(&link);
    }
}

struct TableHandler {
    rules: Arc<dyn RenderRules>,
}

impl TagHandler for TableHandler {
    fn handle(&mut self, tag: &Handle, printer: &mut StructuredPrinter) {
        let table_id = get_tag_attr(tag, "class").and_then(|class| table_id_from_class(&class));
        printer.insert_newline();
        printer.insert_newline();
        printer.append_str(&self.rules.table(table_id.as_deref()));
    }

    fn after_handle(&mut self, printer: &mut StructuredPrinter) {
        printer.insert_newline();
        printer.insert_newline();
    }

    fn skip_descendants(&self) -> bool {
        true
    }
}

struct SilentFactory;

impl TagHandlerFactory for SilentFactory {
    fn instantiate(&self) -> Box<dyn TagHandler> {
        Box::new(SilentHandler)
    }
}

struct SilentHandler;

impl TagHandler for SilentHandler {
    fn handle(&mut self, _tag: &Handle, _printer: &mut StructuredPrinter) {}

    fn after_handle(&mut self, _printer: &mut StructuredPrinter) {}

    fn skip_descendants(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn plain(html: &str) -> String {
        render_markdown(html, Arc::new(PlainRules))
    }

    #[test]
    fn text_that_looks_like_markup_is_escaped() {
        let markdown = plain("<p>* not a list</p><p>snake_case_name [1]</p>");
        assert!(markdown.contains("\\* not a list"), "{markdown}");
        assert!(markdown.contains("snake\\_case\\_name"), "{markdown}");
        assert!(!markdown.lines().any(|line| line.starts_with("* ")), "{markdown}");
    }

    #[test]
    fn metadata_and_scripts_are_skipped() {
        let html = "<head><title>t</title></head><body><metadata>[\"x\"]</metadata><script>var a;</script><p>kept</p></body>";
        assert_eq!(plain(html), "kept");
    }

    #[test]
    fn links_keep_their_title_and_escape_parens() {
        let markdown = plain(r#"<p>See <a href="https://example.com/a(b)" title="T">this</a></p>"#);
        assert_eq!(markdown, "See [this](https://example.com/a\\(b\\) \"T\")");
    }

    #[test]
    fn anchors_without_href_keep_their_text() {
        assert_eq!(plain(r#"<p><a name="top">Top</a></p>"#), "Top");
    }

    #[test]
    fn images_collapse_alt_whitespace_and_drop_empty_sources() {
        let markdown = plain("<p><img src=\"x.png\" alt=\"An\n   image\"><img alt=\"no source\"></p>");
        assert_eq!(markdown, "![An image](x.png)");
    }

    #[test]
    fn tables_render_as_html2md_tables_by_default() {
        let markdown = plain("<table><tr><td>cell</td></tr></table>");
        assert!(markdown.contains("cell"), "{markdown}");
    }

    struct Screenshots;

    impl RenderRules for Screenshots {
        fn replaces_tables(&self) -> bool {
            true
        }

        fn table(&self, table_id: Option<&str>) -> String {
            format!("[table {}]", table_id.unwrap_or("none"))
        }
    }

    #[test]
    fn table_rules_replace_the_whole_table() {
        let html = r#"<p>a</p><table class="wide unique_id_2"><tr><td>hidden</td></tr></table><p>b</p>"#;
        let markdown = render_markdown(html, Arc::new(Screenshots));
        assert!(markdown.contains("[table unique_id_2]"), "{markdown}");
        assert!(!markdown.contains("hidden"), "{markdown}");
    }
}
