//! Mock configuration: typed options and their parsing errors.

pub mod error;
pub mod options;
