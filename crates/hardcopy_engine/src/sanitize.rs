use std::path::{Path, PathBuf};

use url::{Position, Url};

const MAX_NAME_LEN: usize = 200;
const SOURCE_DOCUMENT_EXTENSION: &str = ".md";
const SUPPORTED_IMAGE_EXTENSIONS: &[&str] = &[".jpg", ".jpeg", ".png", ".webp"];
const CONVERTIBLE_EXTENSION: &str = ".webp";
const CONVERTED_EXTENSION: &str = ".jpg";

/// Deterministic local name for a remote URL:
/// `{lowercased host+path, non-alphanumerics collapsed to '_'}{extension}`.
///
/// Query strings and fragments are ignored, the scheme word is dropped and the
/// result is capped at 200 characters including the extension. A `.md`
/// extension is dropped so asset names never collide with article documents.
pub fn sanitize_to_filename(url: &str) -> String {
    let location = strip_query_and_fragment(url);
    let (stem, extension) = split_extension(&location);
    let extension = if extension.eq_ignore_ascii_case(SOURCE_DOCUMENT_EXTENSION) {
        String::new()
    } else {
        extension.to_ascii_lowercase()
    };

    let mut compacted = String::with_capacity(stem.len());
    let mut prev_underscore = false;
    for c in stem.chars() {
        if c.is_ascii_alphanumeric() || c == '.' {
            compacted.push(c.to_ascii_lowercase());
            prev_underscore = false;
        } else if !prev_underscore {
            compacted.push('_');
            prev_underscore = true;
        }
    }

    let without_scheme = compacted
        .strip_prefix("https_")
        .or_else(|| compacted.strip_prefix("http_"))
        .unwrap_or(&compacted);
    let mut name = without_scheme.trim_matches('_').to_string();

    // Only ASCII survives the loop above, so byte truncation is char-safe.
    name.truncate(MAX_NAME_LEN - extension.len());
    name.push_str(&extension);
    name
}

/// Local path of the asset behind `url` inside `media_dir`.
///
/// With `conversion` set, a `.webp` name is swapped for the `.jpg` the
/// converter will produce.
pub fn image_path_for_url(url: &str, media_dir: &Path, conversion: bool) -> PathBuf {
    let mut name = sanitize_to_filename(url);
    if conversion && name.ends_with(CONVERTIBLE_EXTENSION) {
        name.truncate(name.len() - CONVERTIBLE_EXTENSION.len());
        name.push_str(CONVERTED_EXTENSION);
    }
    media_dir.join(name)
}

/// True when the path carries one of the image suffixes handled without probing.
pub fn is_supported_image(path: &Path) -> bool {
    let name = file_name_lowercase(path);
    SUPPORTED_IMAGE_EXTENSIONS
        .iter()
        .any(|ext| name.ends_with(ext))
}

/// True when the file at `path` must go through the image converter.
pub fn needs_conversion(path: &Path) -> bool {
    file_name_lowercase(path).ends_with(CONVERTIBLE_EXTENSION)
}

/// Markdown-friendly path of `target` relative to `document_dir`, always
/// `./`-prefixed and `/`-separated.
pub fn relative_markdown_path(document_dir: &Path, target: &Path) -> String {
    let relative = target.strip_prefix(document_dir).unwrap_or(target);
    let joined = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/");
    if relative.is_absolute() {
        joined
    } else {
        format!("./{joined}")
    }
}

fn file_name_lowercase(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default()
}

fn strip_query_and_fragment(url: &str) -> String {
    match Url::parse(url) {
        Ok(parsed) if parsed.has_host() => parsed[..Position::AfterPath].to_string(),
        _ => url
            .split(['?', '#'])
            .next()
            .unwrap_or_default()
            .to_string(),
    }
}

fn split_extension(location: &str) -> (&str, &str) {
    if let Some(dot) = location.rfind('.') {
        let ext = &location[dot + 1..];
        if (1..=4).contains(&ext.len()) && ext.bytes().all(|b| b.is_ascii_alphabetic()) {
            return (&location[..dot], &location[dot..]);
        }
    }
    (location, "")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scheme_query_and_fragment_are_dropped() {
        assert_eq!(
            sanitize_to_filename("https://Example.com/Images/Photo.PNG?w=300#top"),
            "example.com_images_photo.png"
        );
        assert_eq!(
            sanitize_to_filename("http://example.com/a/b"),
            "example.com_a_b"
        );
    }

    #[test]
    fn markdown_extension_is_dropped() {
        assert_eq!(
            sanitize_to_filename("https://example.com/posts/readme.md"),
            "example.com_posts_readme"
        );
    }

    #[test]
    fn runs_of_separators_collapse() {
        assert_eq!(
            sanitize_to_filename("https://example.com//a--b__c/"),
            "example.com_a_b_c"
        );
    }

    #[test]
    fn long_urls_are_truncated_keeping_extension() {
        let url = format!("https://example.com/{}.jpeg", "x".repeat(500));
        let name = sanitize_to_filename(&url);
        assert_eq!(name.len(), MAX_NAME_LEN);
        assert!(name.ends_with(".jpeg"));
    }

    #[test]
    fn unparseable_input_is_still_sanitized() {
        assert_eq!(sanitize_to_filename("not a url?x=1"), "not_a_url");
    }

    #[test]
    fn webp_is_renamed_only_with_conversion() {
        let media = Path::new("book/media");
        let url = "https://cdn.example.com/pic.webp";
        assert_eq!(
            image_path_for_url(url, media, true),
            media.join("cdn.example.com_pic.jpg")
        );
        assert_eq!(
            image_path_for_url(url, media, false),
            media.join("cdn.example.com_pic.webp")
        );
    }

    #[test]
    fn supported_suffixes() {
        assert!(is_supported_image(Path::new("m/a.jpg")));
        assert!(is_supported_image(Path::new("m/a.JPEG")));
        assert!(is_supported_image(Path::new("m/a.webp")));
        assert!(!is_supported_image(Path::new("m/a.gif")));
        assert!(!is_supported_image(Path::new("m/image_php")));
    }

    #[test]
    fn relative_paths_drop_the_document_dir() {
        let doc = Path::new("out/2024^12");
        let asset = doc.join("media").join("a.png");
        assert_eq!(relative_markdown_path(doc, &asset), "./media/a.png");
    }
}
