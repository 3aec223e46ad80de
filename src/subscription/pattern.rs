//! Turning subscription patterns back into concrete paths
//!
//! Initialization needs the paths a pattern stands for. Each outermost
//! capturing group (plain or named) is a wildcard position; everything else
//! is taken literally once anchors are dropped and escapes removed.
//! Non-capturing groups are walked through, not replaced.

use regex_syntax::ast::{parse::Parser, Ast, GroupKind};
use std::ops::Range;
use tracing::debug;

/// Byte ranges (parentheses included) of the outermost capturing groups
///
/// A pattern that does not parse has no wildcard positions.
pub fn capture_spans(pattern: &str) -> Vec<Range<usize>> {
    let ast = match Parser::new().parse(pattern) {
        Ok(ast) => ast,
        Err(e) => {
            debug!("Pattern '{}' does not parse: {}", pattern, e);
            return Vec::new();
        }
    };

    let mut spans = Vec::new();
    collect_groups(&ast, &mut spans);
    spans
}

fn collect_groups(ast: &Ast, spans: &mut Vec<Range<usize>>) {
    match ast {
        Ast::Group(group) => match group.kind {
            GroupKind::CaptureIndex(_) | GroupKind::CaptureName { .. } => {
                spans.push(group.span.start.offset..group.span.end.offset);
            }
            GroupKind::NonCapturing(_) => collect_groups(&group.ast, spans),
        },
        Ast::Concat(concat) => {
            for child in &concat.asts {
                collect_groups(child, spans);
            }
        }
        Ast::Alternation(alternation) => {
            for child in &alternation.asts {
                collect_groups(child, spans);
            }
        }
        Ast::Repetition(repetition) => collect_groups(&repetition.ast, spans),
        _ => {}
    }
}

/// Replace every capturing group with `value` and literalize the rest
pub fn substitute(pattern: &str, value: &str) -> String {
    let mut out = String::with_capacity(pattern.len());
    let mut cursor = 0;

    for span in capture_spans(pattern) {
        out.push_str(&literal(&pattern[cursor..span.start]));
        out.push_str(value);
        cursor = span.end;
    }
    out.push_str(&literal(&pattern[cursor..]));

    out
}

/// Literal text of a pattern without wildcards
///
/// Drops `^` / `$` anchors and backslashes in front of escaped characters.
pub fn literal(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len());
    let mut chars = pattern.chars();

    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                if let Some(escaped) = chars.next() {
                    out.push(escaped);
                }
            }
            '^' | '$' => {}
            other => out.push(other),
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_group() {
        let pattern = r"screenList/items/(\w+)/control/pp/label";
        assert_eq!(capture_spans(pattern).len(), 1);
        assert_eq!(substitute(pattern, "2"), "screenList/items/2/control/pp/label");
    }

    #[test]
    fn test_same_value_in_every_group() {
        let pattern = r"^screenList/items/(\w+)/layerList/items/(\d+)/x$";
        assert_eq!(substitute(pattern, "1"), "screenList/items/1/layerList/items/1/x");
    }

    #[test]
    fn test_non_capturing_groups_are_kept() {
        let pattern = r"(?:screenList|auxiliaryScreenList)/items/(\w+)";
        assert_eq!(capture_spans(pattern), vec![41..46]);
        assert_eq!(
            substitute(pattern, "S1"),
            "(?:screenList|auxiliaryScreenList)/items/S1"
        );
    }

    #[test]
    fn test_named_and_nested_groups() {
        let pattern = r"items/(?P<screen>S(\d+))/x/(?<layer>\w+)";
        let spans = capture_spans(pattern);
        assert_eq!(spans.len(), 2);
        assert_eq!(substitute(pattern, "v"), "items/v/x/v");
    }

    #[test]
    fn test_unparsable_pattern_has_no_spans() {
        assert!(capture_spans(r"items/(\w+").is_empty());
    }

    #[test]
    fn test_bracket_first_in_class() {
        let pattern = r"x/[]()]/(\w+)";
        assert_eq!(capture_spans(pattern), vec![8..13]);
        assert_eq!(substitute(pattern, "v"), "x/[]()]/v");
    }

    #[test]
    fn test_nested_class() {
        let pattern = r"x/[a[()]]/(\d+)/y";
        assert_eq!(capture_spans(pattern), vec![10..15]);
        assert_eq!(substitute(pattern, "3"), "x/[a[()]]/3/y");
    }

    #[test]
    fn test_escaped_and_class_parens_ignored() {
        let pattern = r"label\(1\)/[()]/(\w+)";
        assert_eq!(capture_spans(pattern).len(), 1);
        assert_eq!(substitute(pattern, "S2"), "label(1)/[()]/S2");
    }

    #[test]
    fn test_literal_strips_anchors_and_escapes() {
        assert_eq!(
            literal(r"^REMOTE/live/screens/screenAuxSelection$"),
            "REMOTE/live/screens/screenAuxSelection"
        );
        assert_eq!(literal(r"device/timer\.1"), "device/timer.1");
    }
}
