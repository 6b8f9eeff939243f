//! Reduce documentation HTML to readable plain text.

use crate::types::FetchedPage;
use regex::Regex;
use std::time::SystemTime;

/// Elements whose entire contents are chrome rather than documentation.
const STRIPPED_ELEMENTS: &[&str] = &[
    "script", "style", "noscript", "svg", "nav", "header", "footer", "aside", "form", "iframe",
    "button",
];

/// Tags that start a new line in the extracted text.
const BLOCK_TAGS: &str = r"(?i)</?(?:p|div|section|article|main|h[1-6]|li|ul|ol|dl|dt|dd|tr|table|pre|blockquote|br|hr)\b[^>]*>";

/// Pre-compiled patterns for HTML cleanup.
#[derive(Debug)]
pub struct HtmlCleaner {
    stripped: Vec<Regex>,
    comment: Regex,
    title: Regex,
    title_suffix: Regex,
    heading: Regex,
    main: Regex,
    article: Regex,
    body: Regex,
    block: Regex,
    tag: Regex,
    spaces: Regex,
    blank_lines: Regex,
}

impl HtmlCleaner {
    pub fn new() -> Result<Self, regex::Error> {
        let stripped = STRIPPED_ELEMENTS
            .iter()
            .map(|tag| Regex::new(&format!(r"(?is)<{tag}\b[^>]*>.*?</{tag}\s*>")))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            stripped,
            comment: Regex::new(r"(?s)<!--.*?-->")?,
            title: Regex::new(r"(?is)<title[^>]*>(.*?)</title\s*>")?,
            // "Motion Magic | Phoenix 6 documentation" -> "Motion Magic"
            title_suffix: Regex::new(r"\s+[—|·\-]\s+.*$")?,
            heading: Regex::new(r"(?is)<h1\b[^>]*>(.*?)</h1\s*>")?,
            main: Regex::new(r"(?is)<main\b[^>]*>(.*)</main\s*>")?,
            article: Regex::new(r"(?is)<article\b[^>]*>(.*)</article\s*>")?,
            body: Regex::new(r"(?is)<body\b[^>]*>(.*)</body\s*>")?,
            block: Regex::new(BLOCK_TAGS)?,
            tag: Regex::new(r"(?s)<[^>]+>")?,
            spaces: Regex::new(r"[ \t\r\x0B\x0C]+")?,
            blank_lines: Regex::new(r"\n\s*\n+")?,
        })
    }

    /// Extract the title and main text of a page.
    ///
    /// Prefers `<main>`, then `<article>`, then `<body>`; navigation, scripts and
    /// other chrome are dropped before text extraction.
    pub fn clean(&self, url: &str, html: &str) -> FetchedPage {
        let title = self.extract_title(html);

        let mut html = self.comment.replace_all(html, "").into_owned();
        for pattern in &self.stripped {
            html = pattern.replace_all(&html, " ").into_owned();
        }

        let content = [&self.main, &self.article, &self.body]
            .iter()
            .find_map(|pattern| pattern.captures(&html))
            .and_then(|caps| caps.get(1))
            .map_or(html.as_str(), |m| m.as_str());

        FetchedPage {
            url: url.to_string(),
            title,
            text: self.to_text(content),
            fetched_at: SystemTime::now(),
        }
    }

    fn extract_title(&self, html: &str) -> Option<String> {
        if let Some(raw) = self.title.captures(html).and_then(|c| c.get(1)) {
            let title = decode_entities(raw.as_str().trim());
            let title = self.title_suffix.replace(&title, "").trim().to_string();
            if !title.is_empty() {
                return Some(title);
            }
        }

        self.heading
            .captures(html)
            .and_then(|c| c.get(1))
            .map(|m| self.to_text(m.as_str()))
            .filter(|t| !t.is_empty())
    }

    fn to_text(&self, fragment: &str) -> String {
        let text = self.block.replace_all(fragment, "\n");
        let text = self.tag.replace_all(&text, "");
        let text = decode_entities(&text);
        let text = self.spaces.replace_all(&text, " ");
        let lines: Vec<&str> = text.lines().map(str::trim).collect();
        let text = lines.join("\n");
        self.blank_lines
            .replace_all(&text, "\n\n")
            .trim()
            .to_string()
    }
}

fn decode_entities(text: &str) -> String {
    text.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&#x27;", "'")
        .replace("&para;", "")
        .replace("&amp;", "&")
}
