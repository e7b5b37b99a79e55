use regex::Regex;
use std::sync::OnceLock;
use tracing::debug;

const NO_ANSWER_MESSAGE: &str = "No answer generated. Please try again.";

/// URL-ish tokens: explicit http(s) scheme or a bare www. host, terminated
/// by whitespace, quotes, angle brackets, or a closing parenthesis.
fn url_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r#"(https?://[^\s<>"')]+|www\.[^\s<>"')]+)"#).expect("valid url regex")
    })
}

/// Prepare a raw answer for HTML display: convert newlines to `<br>` and
/// turn URL tokens into safe hyperlinks. An empty answer becomes a fixed
/// placeholder message.
///
/// Substitution is a single pass over the match spans, so a token that is
/// a substring of an earlier match can never rewrite the inside of an
/// already-built anchor. Each distinct token is linked at its first
/// occurrence only; repeats stay plain text.
pub fn format_answer(answer: &str) -> String {
    if answer.trim().is_empty() {
        return NO_ANSWER_MESSAGE.to_string();
    }

    let formatted = answer.replace('\n', "<br>");

    let mut result = String::with_capacity(formatted.len());
    let mut seen: Vec<&str> = Vec::new();
    let mut last = 0;

    for found in url_pattern().find_iter(&formatted) {
        let token = found.as_str();
        result.push_str(&formatted[last..found.start()]);
        last = found.end();

        if seen.contains(&token) {
            result.push_str(token);
            continue;
        }
        seen.push(token);

        match sanitize_url(token) {
            Some(href) => result.push_str(&format!(
                r#"<a href="{href}" target="_blank" rel="noopener noreferrer" style="color: #1a3e8c; text-decoration: underline;">{token}</a>"#
            )),
            None => {
                debug!("Dropping malformed URL candidate: {token}");
                result.push_str(token);
            }
        }
    }
    result.push_str(&formatted[last..]);

    result
}

/// Validate and percent-encode a URL candidate. Schemeless tokens get
/// `https://` prepended. Candidates with no host are rejected so they
/// never end up in an href.
pub fn sanitize_url(candidate: &str) -> Option<String> {
    if candidate.is_empty() {
        return None;
    }

    let with_scheme = if candidate.starts_with("http://") || candidate.starts_with("https://") {
        candidate.to_string()
    } else {
        format!("https://{candidate}")
    };

    // The parser would swallow an empty authority ("http:///path") and
    // promote the first path segment to a host; reject those up front.
    let after_scheme = with_scheme.split_once("://").map(|(_, rest)| rest)?;
    if after_scheme.is_empty() || after_scheme.starts_with('/') {
        return None;
    }

    let parsed = reqwest::Url::parse(&with_scheme).ok()?;
    match parsed.host_str() {
        Some(host) if !host.is_empty() => Some(parsed.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_answer_gets_placeholder() {
        assert_eq!(format_answer(""), NO_ANSWER_MESSAGE);
        assert_eq!(format_answer("   "), NO_ANSWER_MESSAGE);
    }

    #[test]
    fn newlines_become_breaks() {
        assert_eq!(format_answer("one\ntwo"), "one<br>two");
    }

    #[test]
    fn http_url_becomes_link() {
        let out = format_answer("see https://example.com/page for details");
        assert!(out.contains(r#"<a href="https://example.com/page""#));
        assert!(out.contains(r#"rel="noopener noreferrer""#));
        assert!(out.contains(r#"target="_blank""#));
        assert!(out.contains(">https://example.com/page</a>"));
    }

    #[test]
    fn www_url_gets_https_scheme() {
        let out = format_answer("visit www.example.org today");
        assert!(out.contains(r#"<a href="https://www.example.org/""#));
        assert!(out.contains(">www.example.org</a>"));
    }

    #[test]
    fn link_count_matches_distinct_tokens() {
        let out = format_answer("a https://one.test b https://two.test c https://one.test");
        assert_eq!(out.matches("<a href=").count(), 2);
    }

    #[test]
    fn hostless_candidate_left_untouched() {
        let input = "broken http:///nohost token";
        let out = format_answer(input);
        assert_eq!(out, input);
    }

    #[test]
    fn empty_authority_is_rejected() {
        assert!(sanitize_url("http:///nohost").is_none());
        assert!(sanitize_url("https:///a/b").is_none());
        assert!(sanitize_url("http://").is_none());
    }

    #[test]
    fn scheme_prefixed_token_inside_larger_match_does_not_nest_markup() {
        let out = format_answer("see https://www.x.test or www.x.test");
        assert_eq!(out.matches("<a href=").count(), 2);
        assert!(!out.contains(r#"href="https://<a"#));
        assert!(out.contains(">https://www.x.test</a>"));
        assert!(out.contains(">www.x.test</a>"));
    }

    #[test]
    fn url_path_is_percent_encoded() {
        let sanitized = sanitize_url("https://example.com/a b").unwrap();
        assert_eq!(sanitized, "https://example.com/a%20b");
    }

    #[test]
    fn formatting_never_yields_empty_output() {
        for input in ["x", "\n", "https://example.com", "no urls here"] {
            assert!(!format_answer(input).is_empty());
        }
    }
}
