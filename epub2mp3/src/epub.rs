// EPUB parsing into plain-text chapters

use anyhow::{Context, Result};
use epub::doc::EpubDoc;
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::Path;

/// First h1-h3 heading in a document, used as the chapter title
static HEADING_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<h[1-3][^>]*>(.*?)</h[1-3]>").unwrap());

static TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").unwrap());

// Wide enough that html2text never wraps prose mid-sentence
const TEXT_WIDTH: usize = 10_000;

/// A parsed book
#[derive(Debug)]
pub struct Book {
    pub title: String,
    pub author: Option<String>,
    pub chapters: Vec<Chapter>,
}

/// One spine document with non-empty text content
#[derive(Debug)]
pub struct Chapter {
    pub title: String,
    pub content: String,
}

impl Book {
    /// Approximate word count across all chapters
    pub fn total_words(&self) -> usize {
        self.chapters
            .iter()
            .map(|c| c.content.split_whitespace().count())
            .sum()
    }
}

/// Parse an EPUB file into plain-text chapters, in spine order.
///
/// Documents with no text content (covers, image-only pages) are skipped.
/// Chapters without a heading get a positional fallback title.
pub fn parse_epub(path: &Path) -> Result<Book> {
    let mut doc = EpubDoc::new(path)
        .with_context(|| format!("Failed to open EPUB: {}", path.display()))?;

    let title = doc.mdata("title").map(|m| m.value.clone()).unwrap_or_else(|| {
        path.file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "Untitled".to_string())
    });
    let author = doc.mdata("creator").map(|m| m.value.clone());

    let mut chapters = Vec::new();
    let mut spine_item = 0usize;

    loop {
        if let Some((html, _mime)) = doc.get_current_str() {
            let content = html_to_text(&html)
                .with_context(|| format!("Failed to extract text from spine item {}", spine_item))?;

            // Covers and image-only pages carry no text
            if !content.trim().is_empty() {
                let chapter_title = extract_title(&html)
                    .unwrap_or_else(|| format!("Chapter {}", chapters.len() + 1));

                chapters.push(Chapter {
                    title: chapter_title,
                    content,
                });
            }
        }

        spine_item += 1;
        if !doc.go_next() {
            break;
        }
    }

    Ok(Book {
        title,
        author,
        chapters,
    })
}

fn html_to_text(html: &str) -> Result<String> {
    let text = html2text::from_read(html.as_bytes(), TEXT_WIDTH);
    Ok(text.trim().to_string())
}

/// Pull the chapter title from the first heading, tags stripped
fn extract_title(html: &str) -> Option<String> {
    let captures = HEADING_RE.captures(html)?;
    let raw = captures.get(1)?.as_str();
    let clean = TAG_RE.replace_all(raw, "");
    let clean = clean.split_whitespace().collect::<Vec<_>>().join(" ");

    if clean.is_empty() { None } else { Some(clean) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_title_from_heading() {
        let html = "<html><body><h1>The Beginning</h1><p>Once upon a time</p></body></html>";
        assert_eq!(extract_title(html), Some("The Beginning".to_string()));
    }

    #[test]
    fn test_extract_title_strips_nested_tags() {
        let html = "<h2 class=\"ch\"><span>Chapter</span> <em>One</em></h2>";
        assert_eq!(extract_title(html), Some("Chapter One".to_string()));
    }

    #[test]
    fn test_extract_title_prefers_first_heading() {
        let html = "<h1>First</h1><h2>Second</h2>";
        assert_eq!(extract_title(html), Some("First".to_string()));
    }

    #[test]
    fn test_extract_title_none_without_heading() {
        assert_eq!(extract_title("<p>No heading here</p>"), None);
        assert_eq!(extract_title("<h1></h1><p>x</p>"), None);
    }

    #[test]
    fn test_html_to_text_strips_markup() {
        let text = html_to_text("<p>Hello <b>world</b></p>").unwrap();
        assert!(text.contains("Hello"));
        assert!(text.contains("world"));
        assert!(!text.contains('<'));
    }
}
