//! Concrete upstream adapters: hierarchy catalogs and sheet row sources.

pub mod hierarchy;
pub mod sheets;
