pub mod html;
pub mod serp;


use scraper::ElementRef;

/// Collapse runs of whitespace into single spaces and trim the ends
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// All descendant text of an element, whitespace-normalised
pub fn element_text(el: ElementRef) -> String {
    collapse_whitespace(&el.text().collect::<String>())
}
