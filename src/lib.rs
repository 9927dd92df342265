//! # Tenant SQL Library
//!
//! Object reference extraction and tenant qualifier rewriting for T-SQL
//! scripts.
//!
//! - [`refs`] - database objects a script references
//! - [`parser`] - batch splitting and the syntax gate
//! - [`qualifier`] - schema/prefix and database-user rewrites
//! - [`mapping`] - tenant mappings and their stores
//! - [`render`] - normalize for storage, render for a customer

pub mod app;
pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod mapping;
pub mod output;
pub mod parser;
pub mod qualifier;
pub mod refs;
pub mod render;
