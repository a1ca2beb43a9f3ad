use regex::RegexBuilder;
use serde::Serialize;

/// A run of text, marked when it matched a search term.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HighlightSpan {
    pub text: String,
    pub highlighted: bool,
}

impl HighlightSpan {
    fn plain(text: &str) -> Self {
        Self {
            text: text.to_string(),
            highlighted: false,
        }
    }

    fn marked(text: &str) -> Self {
        Self {
            text: text.to_string(),
            highlighted: true,
        }
    }
}

/// Splits the query on whitespace into terms longer than one character.
pub fn query_terms(query: &str) -> Vec<String> {
    query
        .split_whitespace()
        .filter(|term| term.len() > 1)
        .map(str::to_string)
        .collect()
}

/// Marks the substrings of `text` matching any query term, preserving
/// original order and casing. An empty or whitespace-only query yields the
/// input as a single unstyled span.
pub fn highlight(text: &str, query: &str) -> Vec<HighlightSpan> {
    let terms = query_terms(query);
    if terms.is_empty() {
        return vec![HighlightSpan::plain(text)];
    }

    let escaped: Vec<String> = terms.iter().map(|term| regex::escape(term)).collect();
    let pattern = match RegexBuilder::new(&escaped.join("|"))
        .case_insensitive(true)
        .build()
    {
        Ok(pattern) => pattern,
        Err(_) => return vec![HighlightSpan::plain(text)],
    };

    let lowered_terms: Vec<String> = terms.iter().map(|term| term.to_lowercase()).collect();
    let mut spans = Vec::new();
    let mut cursor = 0;
    for found in pattern.find_iter(text) {
        if found.start() > cursor {
            spans.push(HighlightSpan::plain(&text[cursor..found.start()]));
        }
        let matched = found.as_str();
        if lowered_terms.iter().any(|term| *term == matched.to_lowercase()) {
            spans.push(HighlightSpan::marked(matched));
        } else {
            spans.push(HighlightSpan::plain(matched));
        }
        cursor = found.end();
    }
    if cursor < text.len() {
        spans.push(HighlightSpan::plain(&text[cursor..]));
    }
    if spans.is_empty() {
        spans.push(HighlightSpan::plain(text));
    }
    spans
}

/// Flattens spans back into the original text.
pub fn plain_text(spans: &[HighlightSpan]) -> String {
    spans.iter().map(|span| span.text.as_str()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_query_returns_single_unstyled_span() {
        let spans = highlight("The Quick Fox", "");
        assert_eq!(spans, vec![HighlightSpan::plain("The Quick Fox")]);

        let spans = highlight("The Quick Fox", "   ");
        assert_eq!(spans, vec![HighlightSpan::plain("The Quick Fox")]);
    }

    #[test]
    fn marks_case_insensitive_match_preserving_casing() {
        let spans = highlight("The Quick Fox", "quick");
        assert_eq!(
            spans,
            vec![
                HighlightSpan::plain("The "),
                HighlightSpan::marked("Quick"),
                HighlightSpan::plain(" Fox"),
            ]
        );
    }

    #[test]
    fn multiple_terms_all_marked() {
        let spans = highlight("customer churn by customer segment", "customer segment");
        let marked: Vec<_> = spans
            .iter()
            .filter(|span| span.highlighted)
            .map(|span| span.text.as_str())
            .collect();
        assert_eq!(marked, vec!["customer", "customer", "segment"]);
        assert_eq!(plain_text(&spans), "customer churn by customer segment");
    }

    #[test]
    fn short_terms_are_dropped() {
        assert_eq!(query_terms("a quick z fox"), vec!["quick", "fox"]);
        let spans = highlight("a quick fox", "a");
        assert_eq!(spans, vec![HighlightSpan::plain("a quick fox")]);
    }

    #[test]
    fn regex_metacharacters_are_escaped() {
        let spans = highlight("price (usd) table", "(usd)");
        assert_eq!(
            spans,
            vec![
                HighlightSpan::plain("price "),
                HighlightSpan::marked("(usd)"),
                HighlightSpan::plain(" table"),
            ]
        );
    }

    #[test]
    fn no_match_returns_whole_text_unstyled() {
        let spans = highlight("The Quick Fox", "zebra");
        assert_eq!(spans, vec![HighlightSpan::plain("The Quick Fox")]);
    }
}
