use std::path::{Path, PathBuf};

use chrono::{Datelike, Days, Local, NaiveDate};

use crate::persist::{ensure_output_dir, PersistError};
use crate::sanitize::sanitize_to_filename;

const MEDIA_DIR: &str = "media";
const CACHE_DIR: &str = "cache";

/// Directory layout of one weekly book:
///
/// ```text
/// <output_root>/<year>^<week>/
///     <article>.md, <article>.rdoff.md
///     media/   downloaded images, redirects, table screenshots
///     cache/   captured pages
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookLayout {
    label: String,
    root: PathBuf,
    media_dir: PathBuf,
    cache_dir: PathBuf,
}

impl BookLayout {
    pub fn for_date(output_root: &Path, today: NaiveDate) -> Self {
        let label = week_label(today);
        let root = output_root.join(&label);
        Self {
            media_dir: root.join(MEDIA_DIR),
            cache_dir: root.join(CACHE_DIR),
            label,
            root,
        }
    }

    pub fn current(output_root: &Path) -> Self {
        Self::for_date(output_root, Local::now().date_naive())
    }

    pub fn ensure(&self) -> Result<(), PersistError> {
        ensure_output_dir(&self.root)?;
        ensure_output_dir(&self.media_dir)?;
        ensure_output_dir(&self.cache_dir)
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn media_dir(&self) -> &Path {
        &self.media_dir
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    pub fn book_name(&self, postfix: &str) -> String {
        format!("{}-{}", self.label, postfix)
    }

    /// Cached captures of `url`: readable variant, raw variant.
    pub fn capture_paths(&self, url: &str) -> (PathBuf, PathBuf) {
        let stem = sanitize_to_filename(url);
        (
            self.cache_dir.join(format!("{stem}.html")),
            self.cache_dir.join(format!("{stem}.rdoff.html")),
        )
    }

    /// Markdown file names for `url`, relative to [`Self::root`].
    pub fn markdown_names(url: &str) -> (String, String) {
        let stem = sanitize_to_filename(url);
        (format!("{stem}.md"), format!("{stem}.rdoff.md"))
    }
}

/// `<year>^<ISO week of the most recent Sunday>`. The year is the current
/// one even when that Sunday fell in the previous year.
pub fn week_label(today: NaiveDate) -> String {
    let back = u64::from(today.weekday().num_days_from_sunday());
    let last_sunday = today.checked_sub_days(Days::new(back)).unwrap_or(today);
    format!("{}^{}", today.year(), last_sunday.iso_week().week())
}
