pub mod analyzers;
pub mod api;
pub mod cache;
pub mod catalog;
pub mod config;
pub mod fetch;
pub mod infra;
pub mod output;
pub mod parser;
pub mod services;
pub mod stats;
pub mod synthetic;

pub use analyzers::types::{RawRow, Scope, ScopeLevel};
pub use catalog::Catalog;
