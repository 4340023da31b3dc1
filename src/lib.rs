// Library crate exposing modules for integration tests

pub mod aggregate;
pub mod audit;
pub mod cli;
pub mod diag;
pub mod history;
pub mod model;
pub mod policy;
pub mod report;
pub mod util;
