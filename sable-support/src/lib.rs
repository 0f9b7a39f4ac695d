use std::borrow::Cow;
use std::fmt;

fn escape_single_quotes(input: &str) -> Cow<'_, str> {
    if input.contains('\'') {
        Cow::Owned(input.replace('\'', "\\'"))
    } else {
        Cow::Borrowed(input)
    }
}

/// Wraps a source name in single quotes for use inside a diagnostic message.
pub fn quoted(name: &str) -> String {
    format!("'{}'", escape_single_quotes(name))
}

/// Renders `a`, `'a' and 'b'`, or `'a', 'b' and 'c'`.
pub fn join_quoted<I, S>(names: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let quoted_names: Vec<String> = names
        .into_iter()
        .map(|name| quoted(name.as_ref()))
        .collect();
    match quoted_names.split_last() {
        None => String::new(),
        Some((last, [])) => last.clone(),
        Some((last, rest)) => format!("{} and {}", rest.join(", "), last),
    }
}

pub fn plural(count: usize, noun: &str) -> String {
    if count == 1 {
        format!("{count} {noun}")
    } else {
        format!("{count} {noun}s")
    }
}

/// Formats a "expected X, found Y" message with an optional leading context.
pub fn mismatch(context: &str, expected: impl fmt::Display, found: impl fmt::Display) -> String {
    if context.is_empty() {
        format!("expected {expected}, found {found}")
    } else {
        format!("{context}: expected {expected}, found {found}")
    }
}
