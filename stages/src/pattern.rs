//! Regular-expression stages.

use std::iter;

use lazypipe::{Flow, Node, TransformFactory};
use regex::Regex;

use crate::error::StageError;
use crate::text::{Line, TextItem};

/// What `sed` does with lines the pattern does not match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Substitute {
    /// Pass unmatched lines through unchanged.
    #[default]
    Inclusive,
    /// Drop unmatched lines.
    Exclusive,
}

struct SedConfig {
    pattern: String,
    replacement: String,
    mode: Substitute,
}

/// Keep lines in which `pattern` matches anywhere.
///
/// `Err` items pass through. An invalid pattern yields a single
/// [`StageError::Regex`] when the node is first pulled.
pub fn grep<T: TextItem + 'static>(pattern: impl Into<String>) -> Node<T, Line> {
    TransformFactory::new("grep", |input: Flow<T>, pattern: &String| -> Flow<Line> {
        let regex = match compile(pattern) {
            Ok(regex) => regex,
            Err(err) => return Box::new(iter::once(Err(err))),
        };
        Box::new(
            input
                .map(TextItem::into_line)
                .filter(move |line| line.as_ref().map_or(true, |text| regex.is_match(text))),
        )
    })
    .bind(pattern.into())
}

/// Replace the first match of `pattern` in each line with `replacement`.
///
/// The replacement may reference capture groups as `$1` or `${name}`. The
/// text outside the match is kept as is.
pub fn sed<T: TextItem + 'static>(
    pattern: impl Into<String>,
    replacement: impl Into<String>,
    mode: Substitute,
) -> Node<T, Line> {
    let config = SedConfig {
        pattern: pattern.into(),
        replacement: replacement.into(),
        mode,
    };
    TransformFactory::new("sed", |input: Flow<T>, config: &SedConfig| -> Flow<Line> {
        let regex = match compile(&config.pattern) {
            Ok(regex) => regex,
            Err(err) => return Box::new(iter::once(Err(err))),
        };
        let replacement = config.replacement.clone();
        let mode = config.mode;
        Box::new(input.map(TextItem::into_line).filter_map(move |line| {
            let text = match line {
                Ok(text) => text,
                Err(err) => return Some(Err(err)),
            };
            match substitute_first(&regex, &text, &replacement) {
                Some(replaced) => Some(Ok(replaced)),
                None if mode == Substitute::Inclusive => Some(Ok(text)),
                None => None,
            }
        }))
    })
    .bind(config)
}

fn compile(pattern: &str) -> Result<Regex, StageError> {
    Regex::new(pattern).map_err(|err| {
        tracing::warn!(%pattern, "invalid regular expression");
        StageError::from(err)
    })
}

fn substitute_first(regex: &Regex, text: &str, replacement: &str) -> Option<String> {
    let captures = regex.captures(text)?;
    let whole = captures.get(0)?;
    let mut out = String::with_capacity(text.len() + replacement.len());
    out.push_str(&text[..whole.start()]);
    captures.expand(replacement, &mut out);
    out.push_str(&text[whole.end()..]);
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(node: &Node<&'static str, Line>, input: Vec<&'static str>) -> Vec<String> {
        node.feed(input).collect::<Result<_, _>>().unwrap()
    }

    #[test]
    fn test_grep_keeps_matching_lines() {
        let node = grep("^b");
        assert_eq!(node.name(), "grep");
        assert_eq!(texts(&node, vec!["apple", "banana", "berry"]), vec!["banana", "berry"]);
    }

    #[test]
    fn test_grep_passes_errors_through() {
        let node = grep::<Line>("keep");
        let input: Vec<Line> = vec![
            Ok("drop".to_string()),
            Err(StageError::io("x", std::io::Error::other("boom"))),
            Ok("keep me".to_string()),
        ];
        let out: Vec<Line> = node.feed(input).collect();
        assert_eq!(out.len(), 2);
        assert!(out[0].is_err());
        assert_eq!(out[1].as_ref().unwrap(), "keep me");
    }

    #[test]
    fn test_grep_invalid_pattern_reports_once() {
        let node = grep::<&str>("(unclosed");
        let out: Vec<Line> = node.feed(vec!["a", "b"]).collect();
        assert_eq!(out.len(), 1);
        assert!(matches!(out[0], Err(StageError::Regex(_))));
    }

    #[test]
    fn test_sed_replaces_first_match_only() {
        let node = sed("o", "0", Substitute::Inclusive);
        assert_eq!(node.name(), "sed");
        assert_eq!(texts(&node, vec!["foo boo"]), vec!["f0o boo"]);
    }

    #[test]
    fn test_sed_expands_groups_and_keeps_surroundings() {
        let node = sed(r"(\w+)@(\w+)", "$2 at $1", Substitute::Inclusive);
        assert_eq!(
            texts(&node, vec!["mail: bob@home, thanks"]),
            vec!["mail: home at bob, thanks"]
        );
    }

    #[test]
    fn test_sed_inclusive_keeps_unmatched() {
        let node = sed("cat", "dog", Substitute::Inclusive);
        assert_eq!(texts(&node, vec!["cat", "cow"]), vec!["dog", "cow"]);
    }

    #[test]
    fn test_sed_exclusive_drops_unmatched() {
        let node = sed("cat", "dog", Substitute::Exclusive);
        assert_eq!(texts(&node, vec!["cat", "cow", "a cat"]), vec!["dog", "a dog"]);
    }
}
