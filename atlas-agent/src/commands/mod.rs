//! CLI Commands

pub mod cache;
pub mod run;
pub mod sync;
