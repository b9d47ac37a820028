//! Derived metrics computed over repository data.
//!
//! # Responsibility
//! - Keep pure calculations apart from storage and lifecycle concerns.

pub mod grade_aggregator;
