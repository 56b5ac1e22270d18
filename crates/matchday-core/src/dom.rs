//! Read-only snapshot of a rendered page.
//!
//! A [`crate::BrowserSession`] hands back the live DOM serialized as HTML;
//! [`Document`] parses it once and answers selector queries against it. All
//! queries are infallible: absence is an empty `Vec` or `None`.

use scraper::{ElementRef, Html};

pub use scraper::Selector;

use crate::error::AppError;

/// Compile a CSS selector, mapping failures into [`AppError::InvalidSelector`].
pub fn compile(selector: &str) -> Result<Selector, AppError> {
    Selector::parse(selector).map_err(|e| AppError::InvalidSelector(format!("{selector}: {e}")))
}

/// Elements that start and end a line when rendered.
const BLOCK_TAGS: &[&str] = &[
    "address",
    "article",
    "aside",
    "blockquote",
    "caption",
    "dd",
    "div",
    "dl",
    "dt",
    "figcaption",
    "figure",
    "footer",
    "form",
    "h1",
    "h2",
    "h3",
    "h4",
    "h5",
    "h6",
    "header",
    "hr",
    "li",
    "main",
    "nav",
    "ol",
    "p",
    "pre",
    "section",
    "table",
    "tbody",
    "tfoot",
    "thead",
    "tr",
    "ul",
];

/// Elements whose content is never rendered as text.
const SKIPPED_TAGS: &[&str] = &["head", "noscript", "script", "style", "template"];

/// A parsed page.
pub struct Document {
    html: Html,
}

impl Document {
    pub fn parse(html: &str) -> Self {
        Self {
            html: Html::parse_document(html),
        }
    }

    /// All matching elements, in document order.
    pub fn select(&self, selector: &Selector) -> Vec<Node<'_>> {
        self.html.select(selector).map(Node).collect()
    }

    pub fn first(&self, selector: &Selector) -> Option<Node<'_>> {
        self.html.select(selector).next().map(Node)
    }

    pub fn contains(&self, selector: &Selector) -> bool {
        self.first(selector).is_some()
    }
}

/// One element of a [`Document`].
#[derive(Clone, Copy)]
pub struct Node<'a>(ElementRef<'a>);

impl<'a> Node<'a> {
    /// Matching descendants, in document order.
    pub fn select(&self, selector: &Selector) -> Vec<Node<'a>> {
        self.0.select(selector).map(Node).collect()
    }

    pub fn first(&self, selector: &Selector) -> Option<Node<'a>> {
        self.0.select(selector).next().map(Node)
    }

    pub fn attr(&self, name: &str) -> Option<&'a str> {
        self.0.value().attr(name)
    }

    pub fn classes(&self) -> impl Iterator<Item = &'a str> + 'a {
        self.0.value().classes()
    }

    /// Serialized markup of the element's children.
    pub fn inner_html(&self) -> String {
        self.0.inner_html()
    }

    /// Text as a browser would render it: block boundaries and `<br>` become
    /// line breaks, runs of whitespace collapse to one space, and each line
    /// is trimmed. Empty lines are dropped.
    pub fn text(&self) -> String {
        let mut raw = String::new();
        render_text(self.0, &mut raw);
        raw.split('\n')
            .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
            .filter(|line| !line.is_empty())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

fn render_text(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        match child.value() {
            scraper::Node::Text(text) => {
                out.extend(text.chars().map(|c| if c.is_whitespace() { ' ' } else { c }));
            }
            scraper::Node::Element(el) => {
                let name = el.name();
                if SKIPPED_TAGS.contains(&name) {
                    continue;
                }
                if name == "br" {
                    out.push('\n');
                    continue;
                }
                let Some(child_element) = ElementRef::wrap(child) else {
                    continue;
                };
                let block = BLOCK_TAGS.contains(&name);
                if block {
                    out.push('\n');
                }
                render_text(child_element, out);
                if block {
                    out.push('\n');
                } else if matches!(name, "td" | "th") {
                    out.push(' ');
                }
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sel(s: &str) -> Selector {
        compile(s).unwrap()
    }

    #[test]
    fn test_text_breaks_on_block_elements_and_br() {
        let doc = Document::parse(
            r#"<table><tr><td id="c">
                Marquinhos   <span class="score">1-0</span>
                <div class="gray">( Nail Umyarov )</div>
            </td></tr></table>"#,
        );
        let cell = doc.first(&sel("#c")).unwrap();
        assert_eq!(cell.text(), "Marquinhos 1-0\n( Nail Umyarov )");

        let doc = Document::parse("<p id='p'>Daniil Khlusevich<br>(Pablo Solari)</p>");
        assert_eq!(
            doc.first(&sel("#p")).unwrap().text(),
            "Daniil Khlusevich\n(Pablo Solari)"
        );
    }

    #[test]
    fn test_text_skips_scripts_and_blank_lines() {
        let doc = Document::parse(
            "<div id='d'><script>var x = 1;</script><div>  </div><span>kept</span></div>",
        );
        assert_eq!(doc.first(&sel("#d")).unwrap().text(), "kept");
    }

    #[test]
    fn test_select_preserves_document_order() {
        let doc = Document::parse(
            "<div><b class='t'>one</b><i><b class='t'>two</b></i><b class='t'>three</b></div>",
        );
        let texts: Vec<String> = doc.select(&sel(".t")).iter().map(Node::text).collect();
        assert_eq!(texts, vec!["one", "two", "three"]);
    }

    #[test]
    fn test_attributes_and_classes() {
        let doc =
            Document::parse(r#"<span id="s" class="sm-event-icon incident-14" data-x="1"></span>"#);
        let node = doc.first(&sel("#s")).unwrap();
        assert_eq!(node.attr("data-x"), Some("1"));
        assert_eq!(node.attr("missing"), None);
        assert!(node.classes().any(|c| c == "incident-14"));
        assert!(!node.classes().any(|c| c == "incident-1"));
    }

    #[test]
    fn test_missing_elements_are_empty_not_errors() {
        let doc = Document::parse("<p>nothing here</p>");
        assert!(doc.select(&sel("table")).is_empty());
        assert!(doc.first(&sel("table")).is_none());
        assert!(!doc.contains(&sel("table")));
    }

    #[test]
    fn test_invalid_selector_is_reported() {
        let err = compile("td[").unwrap_err();
        assert!(matches!(err, AppError::InvalidSelector(_)));
    }
}
