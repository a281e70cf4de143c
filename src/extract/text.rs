//! Visible-text extraction from parsed HTML.

use scraper::Html;

/// Collect a document's text nodes in pre-order, trimmed and joined by
/// single spaces.
pub fn extract_text(html: &str) -> String {
    let document = Html::parse_document(html);

    let mut out = String::new();
    for node in document.root_element().descendants() {
        if let Some(text) = node.value().as_text() {
            let trimmed = text.trim();
            if !trimmed.is_empty() {
                out.push_str(trimmed);
                out.push(' ');
            }
        }
    }
    out.trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joins_text_nodes_with_single_spaces() {
        let html = "<p> Hello </p><p>World</p>";
        assert_eq!(extract_text(html), "Hello World");
    }

    #[test]
    fn skips_whitespace_only_nodes() {
        let html = "<div>  \n  </div><span>text</span>";
        assert_eq!(extract_text(html), "text");
    }

    #[test]
    fn walks_nested_elements_in_document_order() {
        let html = "<div>first <b>second</b></div><p>third</p>";
        assert_eq!(extract_text(html), "first second third");
    }

    #[test]
    fn empty_document_yields_empty_text() {
        assert_eq!(extract_text(""), "");
        assert_eq!(extract_text("<div></div>"), "");
    }
}
