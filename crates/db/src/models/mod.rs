//! Row structs and insert DTOs.
//!
//! Each submodule contains:
//! - `FromRow` structs matching the database rows
//! - conversions into the `extprop-core` domain types

pub mod entity;
pub mod property;
pub mod repair;
