//! Rendering of filter expressions into query-language text.
//!
//! Only equality is supported: every operator renders as `field:value`.
//! An unquoted multi-word value matches when ANY of its words matches; wrap
//! the value in double quotes to match the exact phrase instead.

use tabsearch_types::{FieldValue, FilterCondition, FilterExpression, FilterToken};

use crate::codec::encode_text;

/// Characters with meaning in the query grammar.
const SPECIAL_CHARS: &[char] = &[
    '\\', '+', '-', '&', '|', '!', '(', ')', '{', '}', '[', ']', '^', '"', '~', '*', '?', ':',
    '/', '\'', '`', '<', '>', '=',
];

/// Backslash-escape query grammar characters in a bare term.
pub fn escape_term(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if SPECIAL_CHARS.contains(&c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Escape the text inside a quoted phrase.
pub fn escape_phrase(phrase: &str) -> String {
    let mut escaped = String::with_capacity(phrase.len());
    for c in phrase.chars() {
        if c == '"' || c == '\\' {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn is_quoted(value: &str) -> bool {
    value.len() > 2 && value.starts_with('"') && value.ends_with('"')
}

/// Render one `(field, operator, value)` condition.
///
/// The operator is accepted but not interpreted.
pub fn render_condition(field: &str, _operator: &str, value: &str) -> String {
    if is_quoted(value) {
        let inner = &value[1..value.len() - 1];
        return format!("{}:\"{}\"", field, escape_phrase(inner));
    }

    let clauses: Vec<String> = value
        .split_whitespace()
        .map(|token| format!("{}:{}", field, escape_term(token)))
        .collect();

    match clauses.len() {
        0 => format!("{}:\"\"", field),
        1 => clauses.into_iter().next().unwrap_or_default(),
        _ => format!("({})", clauses.join(" OR ")),
    }
}

/// Render a whole filter expression.
///
/// Grouping markers pass through, combinators become ` AND ` / ` OR `, and
/// conditions go through [`render_condition`].
pub fn render_filter(filter: &FilterExpression) -> String {
    let mut text = String::new();
    for token in filter.tokens() {
        match token {
            FilterToken::GroupStart => text.push('('),
            FilterToken::GroupEnd => text.push(')'),
            FilterToken::And => text.push_str(" AND "),
            FilterToken::Or => text.push_str(" OR "),
            FilterToken::Condition(condition) => text.push_str(&render_condition(
                &condition.field,
                &condition.operator,
                &condition.value,
            )),
        }
    }
    text
}

/// Build a condition from a typed value using its canonical text.
pub fn typed_condition(field: &str, operator: &str, value: &FieldValue) -> FilterCondition {
    FilterCondition::new(field, operator, encode_text(value))
}
