use scraper::{ElementRef, Html, Selector};

/// Extract plain text from scraped statute HTML: scripts and styles dropped,
/// block elements become line breaks, blank lines removed.
pub(crate) fn html_to_text(html: &str) -> String {
    let document = Html::parse_document(html);
    let mut parts: Vec<String> = Vec::new();

    let mut found_root = false;
    if let Ok(selector) = Selector::parse("body") {
        if let Some(element) = document.select(&selector).next() {
            collect_element_text(&element, &mut parts);
            found_root = true;
        }
    }

    if !found_root {
        if let Ok(selector) = Selector::parse("html") {
            if let Some(element) = document.select(&selector).next() {
                collect_element_text(&element, &mut parts);
            }
        }
    }

    parts
        .join(" ")
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<&str>>()
        .join("\n")
}

fn collect_element_text(element: &ElementRef, parts: &mut Vec<String>) {
    let tag_name = element.value().name();
    if matches!(tag_name, "script" | "style" | "noscript") {
        return;
    }

    for node in element.children() {
        if let Some(text) = node.value().as_text() {
            let trimmed = text.trim();
            if !trimmed.is_empty() {
                parts.push(trimmed.to_string());
            }
        } else if let Some(child) = ElementRef::wrap(node) {
            collect_element_text(&child, parts);

            let child_tag = child.value().name();
            if matches!(
                child_tag,
                "p" | "div" | "h1" | "h2" | "h3" | "h4" | "h5" | "h6" | "li" | "br" | "tr"
                    | "table"
            ) {
                parts.push("\n".to_string());
            }
        }
    }
}
