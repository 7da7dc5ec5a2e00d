use lazy_static::lazy_static;
use scraper::{ElementRef, Html, Node, Selector};

lazy_static! {
    static ref TITLE: Selector = Selector::parse("title").expect("valid selector");
    static ref BODY: Selector = Selector::parse("body").expect("valid selector");
}

const SKIPPED: &[&str] = &["script", "style", "noscript", "template", "head"];

const BLOCKS: &[&str] = &[
    "address", "article", "aside", "blockquote", "br", "dd", "div", "dl", "dt", "figcaption", "figure",
    "footer", "form", "h1", "h2", "h3", "h4", "h5", "h6", "header", "hr", "li", "main", "nav", "ol", "p",
    "pre", "section", "table", "td", "th", "tr", "ul",
];

/// Visible text of a stored HTML page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageText {
    pub title: String,
    /// Body text with whitespace collapsed to single spaces.
    pub body: String,
}

impl PageText {
    /// Title followed by body, the text that gets lemmatized.
    pub fn full_text(&self) -> String {
        match (self.title.is_empty(), self.body.is_empty()) {
            (true, _) => self.body.clone(),
            (false, true) => self.title.clone(),
            (false, false) => format!("{} {}", self.title, self.body),
        }
    }
}

pub fn extract(html: &str) -> PageText {
    let doc = Html::parse_document(html);
    let title = doc
        .select(&TITLE)
        .next()
        .map(|n| collapse_whitespace(&n.text().collect::<String>()))
        .unwrap_or_default();

    let mut raw = String::new();
    match doc.select(&BODY).next() {
        Some(body) => collect_text(body, &mut raw),
        None => collect_text(doc.root_element(), &mut raw),
    }
    PageText { title, body: collapse_whitespace(&raw) }
}

fn collect_text(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => out.push_str(text),
            Node::Element(el) => {
                let name = el.name();
                if SKIPPED.contains(&name) {
                    continue;
                }
                let block = BLOCKS.contains(&name);
                if block {
                    out.push(' ');
                }
                if let Some(child_el) = ElementRef::wrap(child) {
                    collect_text(child_el, out);
                }
                if block {
                    out.push(' ');
                }
            }
            _ => {}
        }
    }
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_title_and_visible_text() {
        let html = r#"<html><head><title> Foxes
            of the world </title><style>p { color: red }</style></head>
            <body><h1>Foxes</h1><p>The red fox.</p><script>var fox = 1;</script><p>Arctic fox</p></body></html>"#;
        let text = extract(html);
        assert_eq!(text.title, "Foxes of the world");
        assert_eq!(text.body, "Foxes The red fox. Arctic fox");
        assert!(!text.body.contains("var"));
    }

    #[test]
    fn inline_elements_do_not_split_words() {
        let text = extract("<body><p>qu<b>ick</b> fox</p></body>");
        assert_eq!(text.body, "quick fox");
    }

    #[test]
    fn handles_fragments_without_body() {
        let text = extract("plain words only");
        assert_eq!(text.title, "");
        assert_eq!(text.body, "plain words only");
        assert_eq!(text.full_text(), "plain words only");
    }
}
