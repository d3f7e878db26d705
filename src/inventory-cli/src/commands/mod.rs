//! Command handlers

pub mod archive;
pub mod configure;
pub mod store;
