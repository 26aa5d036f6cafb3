//! Post-processing of raw model output into editor-ready HTML

use super::prompt::GenerationMode;
use once_cell::sync::Lazy;
use regex::Regex;

static CITATION: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[\d+(?:,\s*\d+)*\]").unwrap());
static MD_BOLD: Lazy<Regex> = Lazy::new(|| Regex::new(r"\*\*(.*?)\*\*").unwrap());
static MD_HEADING: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)##\s*(.*?)$").unwrap());

/// Removing one citation can join its neighbours into another, so repeat
/// until none is left.
fn strip_citations(text: &str) -> String {
    let mut text = text.to_string();
    while CITATION.is_match(&text) {
        text = CITATION.replace_all(&text, "").into_owned();
    }
    text
}

fn strip_artifacts(text: &str) -> String {
    strip_citations(text)
        .replace("```html", "")
        .replace("```", "")
}

/// Clean raw vendor output for the given mode.
///
/// Citations and code fences are always removed. Article output also gets
/// leftover Markdown bold and `##` headings converted; news output with no
/// heading at all is wrapped as a minimal report.
pub fn clean_html(raw: &str, mode: GenerationMode, topic: &str) -> String {
    let text = strip_artifacts(raw);

    match mode {
        GenerationMode::Article => {
            let text = MD_BOLD.replace_all(&text, "<strong>$1</strong>");
            let text = MD_HEADING.replace_all(&text, "<h2>$1</h2>");
            text.trim().to_string()
        }
        GenerationMode::News => {
            let text = text.trim();
            if text.contains("<h") {
                text.to_string()
            } else {
                format!(
                    "<h1>Latest News: {}</h1><p>{}</p>",
                    topic,
                    text.replace("\n\n", "</p><p>")
                )
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_strips_citations_and_fences() {
        let raw = "```html\n<h1>Title</h1><p>Claim [1] and more [2, 3].</p>\n```";
        assert_eq!(
            clean_html(raw, GenerationMode::Article, "x"),
            "<h1>Title</h1><p>Claim  and more .</p>"
        );
    }

    #[test]
    fn test_article_converts_markdown_remnants() {
        let raw = "## Intro\n<p>This is **important** text.</p>";
        assert_eq!(
            clean_html(raw, GenerationMode::Article, "x"),
            "<h2>Intro</h2>\n<p>This is <strong>important</strong> text.</p>"
        );
    }

    #[test]
    fn test_news_keeps_markdown_but_wraps_plain_text() {
        let raw = "First paragraph [4].\n\nSecond paragraph.";
        assert_eq!(
            clean_html(raw, GenerationMode::News, "Rate cuts"),
            "<h1>Latest News: Rate cuts</h1><p>First paragraph .</p><p>Second paragraph.</p>"
        );

        let html = "<h1>Rates</h1><p>**Fed** acts.</p>";
        assert_eq!(clean_html(html, GenerationMode::News, "Rate cuts"), html);
    }

    #[test]
    fn test_nested_citations_leave_nothing_behind() {
        for mode in [GenerationMode::Article, GenerationMode::News] {
            let cleaned = clean_html("<p>Claim [1[2]] done [[3]4].</p>", mode, "x");
            assert!(!CITATION.is_match(&cleaned), "{}", cleaned);
        }
        assert_eq!(
            clean_html("<p>Claim [1[2]] done.</p>", GenerationMode::Article, "x"),
            "<p>Claim  done.</p>"
        );
    }

    #[test]
    fn test_bracketed_words_survive() {
        let raw = "<p>See [note] and [a1].</p>";
        assert_eq!(clean_html(raw, GenerationMode::Article, "x"), raw);
    }
}
