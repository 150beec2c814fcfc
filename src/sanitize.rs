use std::sync::LazyLock;

use regex::Regex;

static NBSP_PARA_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<p[^>]*>(?:&nbsp;|\u{a0})</p>").unwrap());

/// Repair the known artifacts the legacy editor leaves in article HTML:
/// literal line breaks inside markup, placeholder paragraphs holding a
/// single non-breaking space, and double-wrapped paragraph tags.
pub fn clean_up(html: &str) -> String {
    let mut out: String = html.chars().filter(|c| *c != '\r' && *c != '\n').collect();
    out = NBSP_PARA_RE.replace_all(&out, "").into_owned();

    // Collapse to fixpoint so triple-wrapping also reduces to one tag.
    loop {
        let collapsed = out.replace("<p><p>", "<p>").replace("</p></p>", "</p>");
        if collapsed == out {
            break;
        }
        out = collapsed;
    }
    out
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_carriage_returns_and_line_feeds() {
        assert_eq!(clean_up("<p>a\r\nb</p>\n"), "<p>ab</p>");
    }

    #[test]
    fn removes_nbsp_only_paragraphs() {
        assert_eq!(clean_up("<p>keep</p><p>&nbsp;</p><p>\u{a0}</p>"), "<p>keep</p>");
        assert_eq!(clean_up("<p class=\"x\">&nbsp;</p>"), "");
    }

    #[test]
    fn keeps_paragraphs_that_merely_contain_an_nbsp() {
        assert_eq!(clean_up("<p>a&nbsp;b</p>"), "<p>a&nbsp;b</p>");
    }

    #[test]
    fn collapses_duplicate_wrapping_tags() {
        assert_eq!(clean_up("<p><p>text</p></p>"), "<p>text</p>");
        assert_eq!(clean_up("<p><p><p>deep</p></p></p>"), "<p>deep</p>");
    }

    #[test]
    fn newline_between_duplicate_tags_still_collapses() {
        assert_eq!(clean_up("<p>\n<p>text</p>\n</p>"), "<p>text</p>");
    }
}
