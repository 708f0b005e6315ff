//! Exact-decimal running aggregates.
//!
//! Each aggregate name owns one [`Accumulator`] holding the exposed value
//! together with the running sum and update counter that AVERAGE needs. The
//! store lives for a whole run so every function computes cross-record
//! statistics rather than per-record ones.

use crate::core::MapFunction;
use crate::prelude::*;
use bigdecimal::BigDecimal;
use num_bigint::{BigInt, Sign};
use num_traits::Zero;
use std::collections::BTreeMap;

/// Number of fractional digits kept by AVERAGE.
pub const AVERAGE_SCALE: i64 = 25;

/// Largest decimal exponent, in either direction, accepted by the store.
pub const MAX_EXPONENT: i64 = 1_000;

/// Returns true when `value` can be rescaled exactly.
///
/// Values such as `1E+100000000` parse fine but would need a power of ten
/// with a hundred million digits to align with an ordinary amount.
///
/// ```rust
/// use bigdecimal::BigDecimal;
/// use std::str::FromStr;
/// use term_flatfile::aggregate::is_within_range;
///
/// assert!(is_within_range(&BigDecimal::from_str("-1234.5678").unwrap()));
/// assert!(!is_within_range(&BigDecimal::from_str("1E+4294967271").unwrap()));
/// ```
pub fn is_within_range(value: &BigDecimal) -> bool {
    let (_, exponent) = value.as_bigint_and_exponent();
    exponent.unsigned_abs() <= MAX_EXPONENT.unsigned_abs()
}

/// Renders `value` without expanding its exponent.
fn scientific(value: &BigDecimal) -> String {
    let (digits, exponent) = value.as_bigint_and_exponent();
    format!("{digits}E{}", exponent.checked_neg().unwrap_or(i64::MAX))
}

fn ensure_within_range(name: &str, value: &BigDecimal) -> Result<()> {
    if is_within_range(value) {
        Ok(())
    } else {
        Err(TermError::NumericParse {
            field: name.to_string(),
            value: scientific(value),
        })
    }
}

/// Running state of one named aggregate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Accumulator {
    kind: MapFunction,
    value: BigDecimal,
    sum: BigDecimal,
    counter: u64,
}

impl Accumulator {
    fn seed(kind: MapFunction, value: BigDecimal) -> Self {
        let sum = match kind {
            MapFunction::Count => BigDecimal::zero(),
            _ => value.clone(),
        };
        Self {
            kind,
            value,
            sum,
            counter: 1,
        }
    }

    /// The function that created this aggregate.
    pub fn kind(&self) -> MapFunction {
        self.kind
    }

    /// The exposed aggregate value.
    pub fn value(&self) -> &BigDecimal {
        &self.value
    }

    /// Running sum of every value fed so far (zero for COUNT).
    pub fn sum(&self) -> &BigDecimal {
        &self.sum
    }

    /// Number of updates applied so far.
    pub fn counter(&self) -> u64 {
        self.counter
    }
}

/// Aggregates of one run keyed by their `mapTo` name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AggregateStore {
    entries: BTreeMap<String, Accumulator>,
}

impl AggregateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the current value of an aggregate.
    pub fn get(&self, name: &str) -> Option<&BigDecimal> {
        self.entries.get(name).map(Accumulator::value)
    }

    /// Returns the current value, or zero if the aggregate was never written.
    pub fn value_or_zero(&self, name: &str) -> BigDecimal {
        self.get(name).cloned().unwrap_or_else(BigDecimal::zero)
    }

    pub fn accumulator(&self, name: &str) -> Option<&Accumulator> {
        self.entries.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates aggregates in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Accumulator)> {
        self.entries.iter().map(|(name, acc)| (name.as_str(), acc))
    }

    /// Applies `function` to the aggregate `name`.
    ///
    /// `value` is ignored by COUNT and required by every other function.
    pub fn apply(
        &mut self,
        function: MapFunction,
        name: &str,
        value: Option<BigDecimal>,
    ) -> Result<()> {
        if function == MapFunction::Count {
            return self.count(name);
        }

        let value = value.ok_or_else(|| {
            TermError::Internal(format!("{function} on '{name}' requires a value"))
        })?;
        match function {
            MapFunction::Aggregate => self.aggregate(name, value),
            MapFunction::Min => self.min(name, value),
            MapFunction::Max => self.max(name, value),
            MapFunction::Average => self.average(name, value),
            MapFunction::Count => self.count(name),
        }
    }

    /// Adds `value` to the running sum.
    pub fn aggregate(&mut self, name: &str, value: BigDecimal) -> Result<()> {
        ensure_within_range(name, &value)?;
        match self.existing(name, MapFunction::Aggregate)? {
            Some(acc) => {
                acc.value = &acc.value + &value;
                acc.sum = acc.value.clone();
                acc.counter += 1;
            }
            None => self.seed(name, MapFunction::Aggregate, value),
        }
        Ok(())
    }

    /// Keeps the smallest value seen.
    pub fn min(&mut self, name: &str, value: BigDecimal) -> Result<()> {
        ensure_within_range(name, &value)?;
        match self.existing(name, MapFunction::Min)? {
            Some(acc) => {
                acc.sum = &acc.sum + &value;
                acc.counter += 1;
                if value < acc.value {
                    acc.value = value;
                }
            }
            None => self.seed(name, MapFunction::Min, value),
        }
        Ok(())
    }

    /// Keeps the largest value seen.
    pub fn max(&mut self, name: &str, value: BigDecimal) -> Result<()> {
        ensure_within_range(name, &value)?;
        match self.existing(name, MapFunction::Max)? {
            Some(acc) => {
                acc.sum = &acc.sum + &value;
                acc.counter += 1;
                if value > acc.value {
                    acc.value = value;
                }
            }
            None => self.seed(name, MapFunction::Max, value),
        }
        Ok(())
    }

    /// Updates the running mean.
    ///
    /// The first value is stored as is; later values store
    /// `sum / counter` at [`AVERAGE_SCALE`] digits, rounded away from zero.
    ///
    /// # Errors
    ///
    /// Returns [`TermError::NumericParse`] for a value outside
    /// [`is_within_range`]; the aggregate is left unchanged.
    pub fn average(&mut self, name: &str, value: BigDecimal) -> Result<()> {
        ensure_within_range(name, &value)?;
        match self.existing(name, MapFunction::Average)? {
            Some(acc) => {
                let sum = &acc.sum + &value;
                let counter = acc.counter + 1;
                acc.value = divide_round_up(&sum, counter, AVERAGE_SCALE)?;
                acc.sum = sum;
                acc.counter = counter;
            }
            None => self.seed(name, MapFunction::Average, value),
        }
        Ok(())
    }

    /// Increments the counter, seeding it at 1.
    pub fn count(&mut self, name: &str) -> Result<()> {
        match self.existing(name, MapFunction::Count)? {
            Some(acc) => {
                acc.counter += 1;
                acc.value = BigDecimal::from(acc.counter);
            }
            None => self.seed(name, MapFunction::Count, BigDecimal::from(1u64)),
        }
        Ok(())
    }

    fn existing(&mut self, name: &str, kind: MapFunction) -> Result<Option<&mut Accumulator>> {
        match self.entries.get_mut(name) {
            Some(acc) if acc.kind != kind => Err(TermError::AggregateConflict {
                name: name.to_string(),
                existing: acc.kind.to_string(),
                requested: kind.to_string(),
            }),
            other => Ok(other),
        }
    }

    fn seed(&mut self, name: &str, kind: MapFunction, value: BigDecimal) {
        self.entries
            .insert(name.to_string(), Accumulator::seed(kind, value));
    }
}

/// Divides exactly and keeps `scale` fractional digits, rounding away from
/// zero whenever the discarded remainder is non-zero.
///
/// # Errors
///
/// Returns [`TermError::Internal`] for a zero divisor, and
/// [`TermError::NumericParse`] when the dividend or `scale` lies outside
/// [`MAX_EXPONENT`].
pub fn divide_round_up(dividend: &BigDecimal, divisor: u64, scale: i64) -> Result<BigDecimal> {
    if divisor == 0 {
        return Err(TermError::Internal(format!(
            "cannot divide {} by zero",
            scientific(dividend)
        )));
    }
    let (digits, exponent) = dividend.as_bigint_and_exponent();

    // dividend = digits * 10^-exponent, target = quotient * 10^-scale
    let in_range =
        is_within_range(dividend) && scale.unsigned_abs() <= MAX_EXPONENT.unsigned_abs();
    let shift = scale
        .checked_sub(exponent)
        .filter(|_| in_range)
        .and_then(|shift| u32::try_from(shift.unsigned_abs()).ok())
        .ok_or_else(|| TermError::NumericParse {
            field: format!("scale {scale}"),
            value: scientific(dividend),
        })?;
    let ten = BigInt::from(10u8);

    let mut denominator = BigInt::from(divisor);
    let numerator = if exponent <= scale {
        digits * ten.pow(shift)
    } else {
        denominator *= ten.pow(shift);
        digits
    };

    let mut quotient = &numerator / &denominator;
    let remainder = &numerator % &denominator;
    if !remainder.is_zero() {
        if numerator.sign() == Sign::Minus {
            quotient -= BigInt::from(1);
        } else {
            quotient += BigInt::from(1);
        }
    }
    Ok(BigDecimal::new(quotient, scale))
}
