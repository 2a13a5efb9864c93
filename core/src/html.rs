use lazy_static::lazy_static;
use scraper::{Html, Selector};
use std::collections::HashSet;
use url::Url;

lazy_static! {
    static ref ANCHOR: Selector = Selector::parse("a[href]").expect("valid selector");
}

/// Elements whose text never reaches the index.
const HIDDEN: &[&str] = &["head", "script", "style", "noscript", "svg", "template"];

/// Drop the fragment so `page#a` and `page#b` are one location.
pub fn normalize(url: &Url) -> Url {
    let mut url = url.clone();
    url.set_fragment(None);
    url
}

/// Absolute http(s) links in document order, resolved against `base`, without duplicates.
pub fn extract_links(base: &Url, html: &str) -> Vec<Url> {
    let doc = Html::parse_document(html);
    let mut seen = HashSet::new();
    let mut links = Vec::new();
    for anchor in doc.select(&ANCHOR) {
        let Some(href) = anchor.value().attr("href") else { continue };
        let Ok(url) = base.join(href.trim()) else { continue };
        if !matches!(url.scheme(), "http" | "https") {
            continue;
        }
        let url = normalize(&url);
        if seen.insert(url.as_str().to_string()) {
            links.push(url);
        }
    }
    links
}

/// Visible text of `html` with entities decoded, one space between text nodes.
pub fn strip_markup(html: &str) -> String {
    let doc = Html::parse_document(html);
    let mut out = String::new();
    for node in doc.tree.root().descendants() {
        let Some(text) = node.value().as_text() else { continue };
        let hidden = node.ancestors().any(|parent| {
            parent.value().as_element().is_some_and(|el| HIDDEN.contains(&el.name()))
        });
        if !hidden {
            out.push_str(text);
            out.push(' ');
        }
    }
    out
}
