use scraper::Html;

/// Flattens an HTML description fragment into plain text with single spaces.
/// Text without markup comes back whitespace-normalized.
pub fn plain_text(html: &str) -> String {
    let fragment = Html::parse_fragment(html);
    let text = fragment.root_element().text().collect::<Vec<_>>().join(" ");
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_tags() {
        assert_eq!(
            plain_text("<p>Must know <b>Python</b></p><ul><li>SQL</li><li>R</li></ul>"),
            "Must know Python SQL R"
        );
    }

    #[test]
    fn test_decodes_entities() {
        assert_eq!(plain_text("Salary &amp; benefits"), "Salary & benefits");
    }

    #[test]
    fn test_plain_text_passes_through() {
        assert_eq!(plain_text("  $45,000 -\n $55,000 a year "), "$45,000 - $55,000 a year");
    }
}
