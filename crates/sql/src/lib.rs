//! SQL synthesis and validation for Quarry.
//!
//! This crate produces validated SQL text; it never executes anything.
//! - **Sanitizing**: identifiers, field lists and string literals (`sql_generator`).
//! - **Date bounds**: temporal predicate detection and partition pruning (`temporal`).
//! - **Predicates**: single-expression enforcement via `sqlparser` (`predicate`).
//! - **Statements**: source, materializing and subset SELECTs (`sql_gen`).
pub mod predicate;
pub mod sql_gen;
pub mod sql_generator;
pub mod temporal;

pub use sql_gen::{
    clamp_limit, create_table_as, materialize_select, source_select, subset_select,
    DEFAULT_LIMIT, MAX_LIMIT,
};
pub use sql_generator::SqlGenError;
