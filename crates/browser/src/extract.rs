//! Readable-content extraction from a rendered document.

use std::io::Cursor;

use {
    html5ever::{ParseOpts, parse_document, tendril::TendrilSink},
    markup5ever_rcdom::{Handle, NodeData, RcDom},
    url::Url,
};

/// Primary content of a page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Article {
    pub title: String,
    /// Whitespace-trimmed, never empty. Paragraphs are separated by a blank line.
    pub text: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("failed to parse document: {0}")]
    Parse(String),
}

/// Turns serialized HTML into an [`Article`].
pub trait Extractor: Send + Sync {
    /// `base` resolves relative links in the document. Returns `Ok(None)`
    /// when the page has no article-like text.
    fn extract(&self, html: &str, base: &Url) -> Result<Option<Article>, ExtractError>;
}

/// Mozilla-Readability-style scoring via the `readability` crate.
///
/// Text is rendered from the cleaned top-candidate markup. Nothing under
/// `<head>` is ever part of it.
#[derive(Debug, Default, Clone, Copy)]
pub struct ReadabilityExtractor;

impl Extractor for ReadabilityExtractor {
    fn extract(&self, html: &str, base: &Url) -> Result<Option<Article>, ExtractError> {
        let mut cursor = Cursor::new(html.as_bytes());
        let product = readability::extractor::extract(&mut cursor, base)
            .map_err(|e| ExtractError::Parse(e.to_string()))?;

        let text = render_text(&product.content);
        if text.is_empty() {
            return Ok(None);
        }
        Ok(Some(Article {
            title: product.title.trim().to_string(),
            text,
        }))
    }
}

/// Elements whose subtree never contributes readable text.
const SKIPPED: &[&str] = &[
    "head", "title", "script", "style", "noscript", "template", "meta", "link", "iframe",
    "object", "svg", "canvas",
];

/// Elements that start and end a paragraph.
const BLOCKS: &[&str] = &[
    "address", "article", "aside", "blockquote", "dd", "div", "dl", "dt", "figcaption",
    "figure", "footer", "h1", "h2", "h3", "h4", "h5", "h6", "header", "hr", "li", "main", "nav",
    "ol", "p", "pre", "section", "table", "td", "th", "tr", "ul",
];

/// Render HTML markup as plain text: whitespace collapsed inside a
/// paragraph, paragraphs joined by a blank line, `<br>` kept as a newline.
fn render_text(markup: &str) -> String {
    let dom = parse_document(RcDom::default(), ParseOpts::default()).one(markup);
    let mut renderer = TextRenderer::default();
    renderer.walk(&dom.document);
    renderer.finish()
}

#[derive(Default)]
struct TextRenderer {
    paragraphs: Vec<String>,
    line: String,
    pending_space: bool,
}

impl TextRenderer {
    fn walk(&mut self, node: &Handle) {
        match &node.data {
            NodeData::Text { contents } => self.push_text(&contents.borrow()),
            NodeData::Element { name, .. } => {
                let tag: &str = &name.local;
                if SKIPPED.contains(&tag) {
                    return;
                }
                if tag == "br" {
                    self.line_break();
                    return;
                }
                let block = BLOCKS.contains(&tag);
                if block {
                    self.end_paragraph();
                }
                self.walk_children(node);
                if block {
                    self.end_paragraph();
                }
            },
            NodeData::Document => self.walk_children(node),
            _ => {},
        }
    }

    fn walk_children(&mut self, node: &Handle) {
        for child in node.children.borrow().iter() {
            self.walk(child);
        }
    }

    fn push_text(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        if text.starts_with(char::is_whitespace) {
            self.pending_space = true;
        }
        for word in text.split_whitespace() {
            if self.pending_space && !self.line.is_empty() && !self.line.ends_with('\n') {
                self.line.push(' ');
            }
            self.line.push_str(word);
            self.pending_space = true;
        }
        self.pending_space = text.ends_with(char::is_whitespace);
    }

    fn line_break(&mut self) {
        let kept = self.line.trim_end().len();
        self.line.truncate(kept);
        if !self.line.is_empty() {
            self.line.push('\n');
        }
        self.pending_space = false;
    }

    fn end_paragraph(&mut self) {
        let paragraph = self.line.trim();
        if !paragraph.is_empty() {
            self.paragraphs.push(paragraph.to_string());
        }
        self.line.clear();
        self.pending_space = false;
    }

    fn finish(mut self) -> String {
        self.end_paragraph();
        self.paragraphs.join("\n\n")
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    const ARTICLE: &str = r#"<html>
<head><title>Rust at the edge</title></head>
<body>
  <nav><a href="/">Home</a> | <a href="/about">About</a></nav>
  <article>
    <h1>Rust at the edge</h1>
    <p>Running a text proxy in front of a headless browser turns heavy pages into plain reading material for slow links.</p>
    <p>The browser renders scripts and lazy content first, then the extractor keeps only the paragraphs that carry the story.</p>
    <p>Navigation bars, footers and cookie banners are scored low and dropped, so readers get the words they came for.</p>
  </article>
  <footer>Copyright notice</footer>
</body>
</html>"#;

    fn base() -> Url {
        Url::parse("https://example.com/article").unwrap()
    }

    #[test]
    fn extracts_article_paragraphs() {
        let article = ReadabilityExtractor
            .extract(ARTICLE, &base())
            .unwrap()
            .unwrap();
        assert_eq!(article.title, "Rust at the edge");
        assert_eq!(
            article.text,
            "Running a text proxy in front of a headless browser turns heavy pages into plain \
             reading material for slow links.\n\n\
             The browser renders scripts and lazy content first, then the extractor keeps only \
             the paragraphs that carry the story.\n\n\
             Navigation bars, footers and cookie banners are scored low and dropped, so readers \
             get the words they came for."
        );
    }

    #[test]
    fn title_alone_is_not_an_article() {
        let result = ReadabilityExtractor
            .extract(
                "<html><head><title>Example Domain</title></head><body></body></html>",
                &base(),
            )
            .unwrap();
        assert_eq!(result, None);
    }

    #[test]
    fn script_only_body_yields_none() {
        let html = r#"<html><head><title>App</title></head><body>
<div id="root"></div>
<script src="/static/js/main.js"></script>
<script>window.__STATE__ = {"user": null};</script>
<noscript>You need to enable JavaScript to run this app.</noscript>
</body></html>"#;
        assert_eq!(ReadabilityExtractor.extract(html, &base()).unwrap(), None);
    }

    #[test]
    fn rendering_keeps_paragraph_and_line_breaks() {
        assert_eq!(
            render_text("<p>One <b>two</b>\n three</p>\n<p>Line<br>break</p>"),
            "One two three\n\nLine\nbreak"
        );
    }

    #[test]
    fn rendering_skips_head_and_scripts() {
        assert_eq!(
            render_text(
                "<html><head><title>T</title><style>p{}</style></head>\
                 <body><script>var x;</script><div>Body <i>text</i></div></body></html>"
            ),
            "Body text"
        );
    }

    #[test]
    fn empty_body_yields_none() {
        let result = ReadabilityExtractor
            .extract("<html><head></head><body></body></html>", &base())
            .unwrap();
        assert_eq!(result, None);
    }

    #[test]
    fn whitespace_only_body_yields_none() {
        let result = ReadabilityExtractor
            .extract("<html><body>\n   \n\t</body></html>", &base())
            .unwrap();
        assert_eq!(result, None);
    }
}
