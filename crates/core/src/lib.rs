//! Extended-property validation, repair and revert engine.
//!
//! Pure domain logic with zero database dependencies. Stores are reached
//! through the traits in [`store`]; `extprop-db` implements them for
//! Postgres and [`memory`] implements them in-process.

pub mod audit;
pub mod compare;
pub mod condition;
pub mod dates;
pub mod derive;
pub mod engine;
pub mod entity;
pub mod error;
pub mod memory;
pub mod normalize;
pub mod path;
pub mod pattern;
pub mod pipeline;
pub mod repair;
pub mod requirement;
pub mod revert;
pub mod rules;
pub mod store;
pub mod types;
pub mod violation;
