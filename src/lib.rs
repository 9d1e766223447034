//! CapMitra: conversational loan-origination core.

pub mod advisor;
pub mod collaborators;
pub mod config;
pub mod error;
pub mod flow;
pub mod identity;
pub mod plan;
pub mod underwriting;
