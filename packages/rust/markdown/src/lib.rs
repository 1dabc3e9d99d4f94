//! Page text normalization for extracted website content.
//!
//! Two entry points:
//! - [`html_to_markdown`] for raw HTML fetched directly (strips page chrome,
//!   converts with `htmd`, then cleans up).
//! - [`normalize`] for Markdown already produced by a scraping service.
//!
//! Both run the same cleanup pipeline, so downstream consumers see one format
//! regardless of which scraper produced the page.

mod cleanup;

use scraper::{Html, Selector};
use tracing::{debug, instrument};
use url::Url;

use leadscope_shared::{LeadscopeError, Result};

/// Tags dropped before conversion. Business pages carry a lot of chrome that
/// adds nothing to intelligence gathering.
const SKIP_TAGS: [&str; 11] = [
    "script", "style", "nav", "header", "footer", "aside", "form", "iframe", "noscript", "svg",
    "button",
];

/// Content containers tried in priority order before falling back to `<body>`.
const CONTENT_SELECTORS: [&str; 5] = ["main", "[role=\"main\"]", "article", "#content", ".content"];

/// Convert a full HTML page to normalized Markdown.
///
/// Relative links are resolved against `source_url` when given.
#[instrument(skip(html), fields(url = source_url.map(Url::as_str).unwrap_or("")))]
pub fn html_to_markdown(html: &str, source_url: Option<&Url>) -> Result<String> {
    let content_html = extract_content_html(html);

    let converter = htmd::HtmlToMarkdown::builder()
        .skip_tags(SKIP_TAGS.to_vec())
        .build();

    let raw = converter
        .convert(&content_html)
        .map_err(|e| LeadscopeError::parse(format!("html conversion failed: {e}")))?;

    debug!(raw_len = raw.len(), "html conversion complete");

    Ok(cleanup::run_pipeline(&raw, source_url))
}

/// Normalize Markdown returned by a scraping service.
pub fn normalize(markdown: &str) -> String {
    cleanup::run_pipeline(markdown, None)
}

/// Cut `text` to at most `max_chars` characters on a char boundary.
///
/// Prefers the last paragraph break inside the limit so truncated pages end
/// on a whole block.
pub fn truncate(text: &str, max_chars: usize) -> String {
    let Some((cut, _)) = text.char_indices().nth(max_chars) else {
        return text.to_string();
    };

    let head = &text[..cut];
    let end = match head.rfind("\n\n") {
        Some(idx) if idx >= head.len() / 2 => idx,
        _ => head.len(),
    };

    format!("{}\n", head[..end].trim_end())
}

/// Pick the main content element, falling back to `<body>`, then the input.
fn extract_content_html(html: &str) -> String {
    let doc = Html::parse_document(html);

    for sel_str in CONTENT_SELECTORS {
        if let Ok(selector) = Selector::parse(sel_str) {
            if let Some(el) = doc.select(&selector).next() {
                let inner = el.inner_html();
                if !inner.trim().is_empty() {
                    return inner;
                }
            }
        }
    }

    if let Ok(body_sel) = Selector::parse("body") {
        if let Some(body) = doc.select(&body_sel).next() {
            return body.inner_html();
        }
    }

    html.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converts_main_content() {
        let html = "<html><body><main><h1>About Acme</h1><p>We build rockets.</p></main></body></html>";
        let md = html_to_markdown(html, None).unwrap();
        assert!(md.contains("# About Acme"));
        assert!(md.contains("We build rockets."));
        assert!(md.ends_with('\n'));
    }

    #[test]
    fn strips_page_chrome() {
        let html = r#"<html><body>
            <header><a href="/">Acme</a></header>
            <nav><a href="/pricing">Pricing</a></nav>
            <main><h1>Leadership</h1><p>Jane Doe, CEO.</p></main>
            <footer><p>Copyright 2024 Acme</p></footer>
            <script>track()</script>
        </body></html>"#;

        let md = html_to_markdown(html, None).unwrap();
        assert!(md.contains("Jane Doe, CEO."));
        assert!(!md.contains("Copyright 2024"));
        assert!(!md.contains("Pricing"));
        assert!(!md.contains("track()"));
    }

    #[test]
    fn falls_back_to_body() {
        let html = "<html><body><h1>Careers</h1><p>We are hiring.</p></body></html>";
        let md = html_to_markdown(html, None).unwrap();
        assert!(md.contains("Careers"));
        assert!(md.contains("We are hiring."));
    }

    #[test]
    fn resolves_relative_links_against_source() {
        let base = Url::parse("https://acme.example/about").unwrap();
        let html = r#"<main><p>See <a href="/team">our team</a>.</p></main>"#;
        let md = html_to_markdown(html, Some(&base)).unwrap();
        assert!(md.contains("[our team](https://acme.example/team)"));
    }

    #[test]
    fn no_html_tags_in_output() {
        let html = r#"<main><h2>Customers</h2><div class="card"><p><strong>Globex</strong> uses Acme.</p></div></main>"#;
        let md = html_to_markdown(html, None).unwrap();
        assert!(!md.contains("<p>"));
        assert!(!md.contains("<div"));
        assert!(md.contains("Globex"));
    }

    #[test]
    fn normalize_cleans_service_markdown() {
        let input = "# Team   \n\n\n\n\n![logo](https://cdn.example/logo.png)\n\n<span>Jane</span> leads sales.\n\n\n";
        let md = normalize(input);
        assert_eq!(md, "# Team\n\nJane leads sales.\n");
    }

    #[test]
    fn truncate_keeps_short_text() {
        assert_eq!(truncate("short", 100), "short");
    }

    #[test]
    fn truncate_prefers_paragraph_break() {
        let text = format!("{}\n\n{}", "a".repeat(60), "b".repeat(60));
        let cut = truncate(&text, 100);
        assert_eq!(cut, format!("{}\n", "a".repeat(60)));
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        let text = "é".repeat(20);
        let cut = truncate(&text, 5);
        assert_eq!(cut.trim_end().chars().count(), 5);
    }
}
