//! CLI command implementations

pub(crate) mod apply;
pub(crate) mod common;
pub(crate) mod migrate;
pub(crate) mod seed;
pub(crate) mod status;
pub(crate) mod validate;
