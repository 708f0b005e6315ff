//! Cross-record aggregation.
//!
//! Map-function directives feed field values into named aggregates held by an
//! [`AggregateStore`]. The store outlives single records, so a directive such
//! as `AVERAGE(amount) -> avg_amount` yields the running mean over every record
//! processed so far, and a later directive's condition can read it back from
//! the evaluation context.

pub mod accumulator;
pub mod map_function;

pub use accumulator::{
    divide_round_up, is_within_range, Accumulator, AggregateStore, AVERAGE_SCALE, MAX_EXPONENT,
};
pub use map_function::{collect_map_values, MapPlan};
