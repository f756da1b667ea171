//! CLI command implementations, one module per command group.

mod estimate;
mod helpers;
mod init;
mod subset;

pub use estimate::estimate;
pub use init::init;
pub use subset::{create, delete, extend, list, query};

#[cfg(test)]
mod tests;
