//! Filter conditions evaluated against the evaluation context.
//!
//! A condition is one or more filters joined by `&`; all of them must hold.
//! Each filter reads `subject operator operand`, where `${name}` tokens on
//! either side are replaced by the context value stored under `name` (or the
//! empty string when nothing is stored).
//!
//! An operand may itself contain `&`: a `&` only starts a new filter when it
//! sits outside a `[...]` list and the text after it reads as a complete
//! filter. `${name} = A&B` is therefore one filter comparing against `A&B`.
//!
//! | Operator                   | Meaning                                 |
//! |----------------------------|-----------------------------------------|
//! | `=` `!=`                   | numeric equality if both sides are numbers, else text |
//! | `>` `>=` `<` `<=`          | numeric comparison, false for non-numbers |
//! | `in [a\|b]` `is [a\|b]`    | subject equals one of the listed values |
//! | `not in [a\|b]`            | subject equals none of them             |
//! | `contain` `not contain`    | substring test                          |
//! | `start with` `end with`    | prefix / suffix test                    |
//! | `match`                    | subject fully matches the regex operand |
//!
//! ```rust
//! use term_flatfile::context::{EvaluationContext, FilterList, InMemoryContext};
//!
//! let mut ctx = InMemoryContext::new();
//! ctx.set_data("state", "CA".into());
//! ctx.set_data("amount", "150".into());
//!
//! let filters = FilterList::parse("${state} in [CA|NV] & ${amount} > 100").unwrap();
//! assert!(filters.is_matched(&ctx, "example").unwrap());
//! ```

use super::EvaluationContext;
use crate::aggregate::is_within_range;
use crate::prelude::*;
use crate::validators::cached_regex;
use bigdecimal::BigDecimal;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::cmp::Ordering;
use tracing::debug;

static FILTER_REGEX: Lazy<Regex> = Lazy::new(|| {
    // The subject treats ${...} as one token so names like ${in} stay intact
    #[allow(clippy::expect_used)]
    Regex::new(
        r"^\s*(?P<subject>(?:\$\{[^}]*\}|[^$]|\$)+?)\s*(?P<op>!=|>=|<=|=|>|<|\bnot in\b|\bin\b|\bis\b|\bnot contain\b|\bcontain\b|\bstart with\b|\bend with\b|\bmatch\b)\s*(?P<operand>.*?)\s*$",
    )
    .expect("Hard-coded regex pattern should be valid")
});

static VARIABLE_REGEX: Lazy<Regex> = Lazy::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"\$\{([^}]+)\}").expect("Hard-coded regex pattern should be valid")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operator {
    Equal,
    NotEqual,
    Greater,
    GreaterOrEqual,
    Less,
    LessOrEqual,
    In,
    NotIn,
    Contain,
    NotContain,
    StartWith,
    EndWith,
    Match,
}

impl Operator {
    fn parse(token: &str) -> Option<Self> {
        Some(match token {
            "=" => Operator::Equal,
            "!=" => Operator::NotEqual,
            ">" => Operator::Greater,
            ">=" => Operator::GreaterOrEqual,
            "<" => Operator::Less,
            "<=" => Operator::LessOrEqual,
            "in" | "is" => Operator::In,
            "not in" => Operator::NotIn,
            "contain" => Operator::Contain,
            "not contain" => Operator::NotContain,
            "start with" => Operator::StartWith,
            "end with" => Operator::EndWith,
            "match" => Operator::Match,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone)]
struct Filter {
    subject: String,
    operator: Operator,
    operand: String,
}

impl Filter {
    fn parse(text: &str, condition: &str) -> Result<Self> {
        let caps = FILTER_REGEX.captures(text).ok_or_else(|| {
            TermError::invalid_condition(condition, format!("no operator found in '{text}'"))
        })?;

        let operator = Operator::parse(&caps["op"]).ok_or_else(|| {
            TermError::invalid_condition(condition, format!("unknown operator '{}'", &caps["op"]))
        })?;

        Ok(Self {
            subject: caps["subject"].to_string(),
            operator,
            operand: caps["operand"].to_string(),
        })
    }

    fn is_matched<C>(&self, ctx: &C, condition: &str) -> Result<bool>
    where
        C: EvaluationContext + ?Sized,
    {
        let subject = resolve(ctx, &self.subject);
        let operand = resolve(ctx, &self.operand);
        let subject = subject.trim();
        let operand = operand.trim();

        let matched = match self.operator {
            Operator::Equal => values_equal(subject, operand),
            Operator::NotEqual => !values_equal(subject, operand),
            Operator::Greater => compare(subject, operand) == Some(Ordering::Greater),
            Operator::GreaterOrEqual => matches!(
                compare(subject, operand),
                Some(Ordering::Greater | Ordering::Equal)
            ),
            Operator::Less => compare(subject, operand) == Some(Ordering::Less),
            Operator::LessOrEqual => matches!(
                compare(subject, operand),
                Some(Ordering::Less | Ordering::Equal)
            ),
            Operator::In => list_items(operand).any(|item| values_equal(subject, item)),
            Operator::NotIn => !list_items(operand).any(|item| values_equal(subject, item)),
            Operator::Contain => subject.contains(operand),
            Operator::NotContain => !subject.contains(operand),
            Operator::StartWith => subject.starts_with(operand),
            Operator::EndWith => subject.ends_with(operand),
            Operator::Match => cached_regex(&format!("^(?:{operand})$"))
                .map_err(|e| TermError::invalid_condition(condition, e.to_string()))?
                .is_match(subject),
        };
        Ok(matched)
    }
}

/// A parsed condition: every filter must match.
#[derive(Debug, Clone)]
pub struct FilterList {
    condition: String,
    filters: Vec<Filter>,
}

impl FilterList {
    /// Parses a condition string.
    ///
    /// # Errors
    ///
    /// Returns [`TermError::InvalidCondition`] for an empty condition or a
    /// filter without a recognized operator.
    pub fn parse(condition: &str) -> Result<Self> {
        let filters = split_filters(condition)
            .iter()
            .map(|part| part.trim())
            .filter(|part| !part.is_empty())
            .map(|part| Filter::parse(part, condition))
            .collect::<Result<Vec<_>>>()?;

        if filters.is_empty() {
            return Err(TermError::invalid_condition(condition, "condition is empty"));
        }

        Ok(Self {
            condition: condition.to_string(),
            filters,
        })
    }

    /// Returns the condition as written.
    pub fn condition(&self) -> &str {
        &self.condition
    }

    /// Number of filters in the condition.
    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    /// Evaluates every filter against the context.
    pub fn is_matched<C>(&self, ctx: &C, label: &str) -> Result<bool>
    where
        C: EvaluationContext + ?Sized,
    {
        for filter in &self.filters {
            if !filter.is_matched(ctx, &self.condition)? {
                debug!(condition = %self.condition, label = %label, "Filter not matched");
                return Ok(false);
            }
        }
        debug!(condition = %self.condition, label = %label, "Filter matched");
        Ok(true)
    }
}

/// Splits on the `&` that separate filters, keeping those inside operands.
fn split_filters(condition: &str) -> Vec<String> {
    let mut parts: Vec<String> = Vec::new();
    for piece in condition.split('&') {
        match parts.last_mut() {
            Some(last) if continues_operand(last, piece) => {
                last.push('&');
                last.push_str(piece);
            }
            _ => parts.push(piece.to_string()),
        }
    }
    parts
}

fn continues_operand(previous: &str, piece: &str) -> bool {
    if piece.trim().is_empty() || previous.trim().is_empty() {
        return false;
    }
    let open_list = previous.matches('[').count() > previous.matches(']').count();
    open_list || !FILTER_REGEX.is_match(piece)
}

fn resolve<C>(ctx: &C, text: &str) -> String
where
    C: EvaluationContext + ?Sized,
{
    VARIABLE_REGEX
        .replace_all(text, |caps: &Captures<'_>| {
            ctx.get_object_data(&caps[1])
                .map(ToString::to_string)
                .unwrap_or_default()
        })
        .into_owned()
}

// Exponents past the aggregate bound compare as text
fn as_number(text: &str) -> Option<BigDecimal> {
    text.parse().ok().filter(is_within_range)
}

fn compare(left: &str, right: &str) -> Option<Ordering> {
    Some(as_number(left)?.cmp(&as_number(right)?))
}

fn values_equal(left: &str, right: &str) -> bool {
    match (as_number(left), as_number(right)) {
        (Some(l), Some(r)) => l == r,
        _ => left == right,
    }
}

fn list_items(operand: &str) -> impl Iterator<Item = &str> {
    let inner = operand
        .strip_prefix('[')
        .and_then(|s| s.strip_suffix(']'))
        .unwrap_or(operand);
    inner.split('|').map(str::trim)
}
