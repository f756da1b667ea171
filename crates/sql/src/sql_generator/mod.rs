pub mod error;
pub mod sanitize;

pub use error::SqlGenError;
pub use sanitize::{
    escape_string_literal, parse_field_list, render_field_list, validate_identifier,
    validate_owner,
};
