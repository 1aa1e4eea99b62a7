use log::warn;
use scraper::{ElementRef, Html, Node, Selector};

/// Elements that break a line when a browser renders `innerText`.
const BLOCK_ELEMENTS: &[&str] = &[
    "address", "article", "aside", "br", "dd", "div", "dl", "dt", "footer", "h1", "h2", "h3",
    "h4", "h5", "h6", "header", "li", "ol", "p", "section", "table", "td", "th", "tr", "ul",
];

/*
   Selectors that fail to parse are dropped with a warning so a single bad
   entry in a site table does not disable the rest of it
*/
pub fn compile_selectors(raw: &[String]) -> Vec<Selector> {
    raw.iter()
        .filter_map(|selector| match Selector::parse(selector) {
            Ok(parsed) => Some(parsed),
            Err(e) => {
                warn!("Skipping unsupported selector '{}': {:?}", selector, e);
                None
            }
        })
        .collect()
}

/// Every element matching any of `selectors`, in document order.
pub fn select_any<'a>(doc: &'a Html, selectors: &[Selector]) -> Vec<ElementRef<'a>> {
    if selectors.is_empty() {
        return Vec::new();
    }

    doc.root_element()
        .descendants()
        .filter_map(ElementRef::wrap)
        .filter(|element| selectors.iter().any(|selector| selector.matches(element)))
        .collect()
}

pub fn first_any<'a>(doc: &'a Html, selectors: &[Selector]) -> Option<ElementRef<'a>> {
    doc.root_element()
        .descendants()
        .filter_map(ElementRef::wrap)
        .find(|element| selectors.iter().any(|selector| selector.matches(element)))
}

/*
   Approximates innerText: text nodes are concatenated, block elements are
   padded with a break on both sides, and whitespace runs collapse to one
   space
*/
pub fn inner_text(element: ElementRef) -> String {
    let mut raw = String::new();
    push_text(element, &mut raw);
    collapse_whitespace(&raw)
}

fn push_text(element: ElementRef, raw: &mut String) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => raw.push_str(text),
            Node::Element(el) => {
                if let Some(child_element) = ElementRef::wrap(child) {
                    let block = BLOCK_ELEMENTS.contains(&el.name());
                    if block {
                        raw.push(' ');
                    }
                    push_text(child_element, raw);
                    if block {
                        raw.push(' ');
                    }
                }
            }
            _ => {}
        }
    }
}

pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub fn non_empty(text: String) -> Option<String> {
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}
