//! Structured filter expressions.
//!
//! A filter is an ordered token sequence: grouping markers, AND/OR
//! combinators and terminal `(field, operator, value)` conditions.

use serde::{Deserialize, Serialize};

/// A terminal filter condition.
///
/// The operator is carried for callers but every operator currently matches
/// by equality.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterCondition {
    pub field: String,
    #[serde(default = "default_operator")]
    pub operator: String,
    /// Literal value text; wrap in double quotes to match a phrase.
    pub value: String,
}

fn default_operator() -> String {
    "=".to_string()
}

impl FilterCondition {
    pub fn new(
        field: impl Into<String>,
        operator: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self {
            field: field.into(),
            operator: operator.into(),
            value: value.into(),
        }
    }
}

/// One token of a filter expression.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterToken {
    GroupStart,
    GroupEnd,
    And,
    Or,
    Condition(FilterCondition),
}

/// Ordered filter token sequence.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FilterExpression {
    tokens: Vec<FilterToken>,
}

impl FilterExpression {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_tokens(tokens: Vec<FilterToken>) -> Self {
        Self { tokens }
    }

    pub fn push(&mut self, token: FilterToken) {
        self.tokens.push(token);
    }

    pub fn group_start(mut self) -> Self {
        self.push(FilterToken::GroupStart);
        self
    }

    pub fn group_end(mut self) -> Self {
        self.push(FilterToken::GroupEnd);
        self
    }

    pub fn and(mut self) -> Self {
        self.push(FilterToken::And);
        self
    }

    pub fn or(mut self) -> Self {
        self.push(FilterToken::Or);
        self
    }

    pub fn condition(
        mut self,
        field: impl Into<String>,
        operator: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.push(FilterToken::Condition(FilterCondition::new(
            field, operator, value,
        )));
        self
    }

    pub fn tokens(&self) -> &[FilterToken] {
        &self.tokens
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}
