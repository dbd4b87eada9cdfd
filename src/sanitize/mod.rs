//! Markup sanitizer for backend text.
//!
//! Backend replies are free text that may contain arbitrary markup.
//! Everything tag-shaped is stripped except an explicit allow-list,
//! and this runs on every reply before it is displayed or parsed, and
//! on any error text derived from user-controlled input.

use std::sync::LazyLock;

use regex::Regex;

/// Matches anything tag-shaped: `<name ...>`, `</name>`, `<name/>`.
static TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"</?\s*([a-zA-Z][a-zA-Z0-9-]*)[^<>]*>").unwrap());

/// A complete triple-backtick fenced block.
static FENCE_SPAN_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)```.*?```").unwrap());

/// Default tags preserved in review output.
pub const REVIEW_ALLOWED_TAGS: &[&str] = &["pre", "code", "b", "i"];

/// Strip all markup tags except those named in `allow`.
///
/// Tag-name comparison is case-insensitive; attributes on disallowed
/// tags are removed along with the tag. Non-tag uses of `<` and `>`
/// (e.g. `a < b`) are left alone. Fenced code blocks pass through
/// verbatim: generics and includes in suggested code are not markup.
pub fn sanitize(text: &str, allow: &[&str]) -> String {
    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    for span in FENCE_SPAN_RE.find_iter(text) {
        out.push_str(&strip_tags(&text[last..span.start()], allow));
        out.push_str(span.as_str());
        last = span.end();
    }
    out.push_str(&strip_tags(&text[last..], allow));
    out
}

fn strip_tags(text: &str, allow: &[&str]) -> String {
    TAG_RE
        .replace_all(text, |caps: &regex::Captures<'_>| {
            let name = caps[1].to_lowercase();
            if allow.iter().any(|a| a.eq_ignore_ascii_case(&name)) {
                caps[0].to_string()
            } else {
                String::new()
            }
        })
        .into_owned()
}

/// Strip every markup tag; used for chat bubbles and error messages
/// where plain text is expected.
pub fn sanitize_plain(text: &str) -> String {
    sanitize(text, &[])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_script_tags() {
        let input = "hello <script>alert('x')</script> world";
        assert_eq!(sanitize_plain(input), "hello alert('x') world");
    }

    #[test]
    fn keeps_allowed_tags() {
        let input = "<b>bold</b> and <script>bad</script>";
        assert_eq!(
            sanitize(input, REVIEW_ALLOWED_TAGS),
            "<b>bold</b> and bad"
        );
    }

    #[test]
    fn keeps_code_and_pre() {
        let input = "<pre><code>let x = 1;</code></pre>";
        assert_eq!(sanitize(input, REVIEW_ALLOWED_TAGS), input);
    }

    #[test]
    fn empty_allow_list_strips_everything() {
        let input = "<pre>x</pre><b>y</b><i>z</i>";
        assert_eq!(sanitize_plain(input), "xyz");
    }

    #[test]
    fn tag_names_case_insensitive() {
        assert_eq!(sanitize("<B>x</B>", REVIEW_ALLOWED_TAGS), "<B>x</B>");
        assert_eq!(sanitize("<SCRIPT>x</SCRIPT>", REVIEW_ALLOWED_TAGS), "x");
    }

    #[test]
    fn removes_attributes_with_disallowed_tags() {
        let input = r#"<img src="x" onerror="alert(1)">text"#;
        assert_eq!(sanitize_plain(input), "text");
    }

    #[test]
    fn leaves_comparison_operators_alone() {
        let input = "if a < b && b > c { }";
        assert_eq!(sanitize_plain(input), input);
    }

    #[test]
    fn plain_text_passes_through() {
        let input = "no markup here, just text.";
        assert_eq!(sanitize_plain(input), input);
    }

    #[test]
    fn self_closing_tags_stripped() {
        assert_eq!(sanitize_plain("a<br/>b"), "ab");
    }

    #[test]
    fn fenced_code_is_left_verbatim() {
        let input =
            "note <script>x</script>\n```\nlet xs: Vec<String> = Vec::new();\n```\n<i>done</i>";
        let out = sanitize_plain(input);
        assert!(out.contains("let xs: Vec<String> = Vec::new();"));
        assert!(!out.contains("<script>"));
        assert!(!out.contains("<i>"));
    }

    #[test]
    fn tags_between_two_fences_are_stripped() {
        let input = "```\n<a>\n```\n<script>bad</script>\n```\n<b>\n```";
        let out = sanitize(input, REVIEW_ALLOWED_TAGS);
        assert!(out.contains("<a>"));
        assert!(!out.contains("script"));
    }
}
