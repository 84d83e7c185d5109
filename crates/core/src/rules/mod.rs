//! Rule documents: the declarative model and its loader.

pub mod loader;
pub mod model;

pub use loader::{load_from_path, load_from_str, FileRuleSource, RuleSource, StaticRuleSource};
pub use model::{
    Candidate, CandidateKind, Constraints, GroupFailurePolicy, OnFailure, Requirement, Rule,
    RuleDefaults, RuleDocument, RulesetInfo, Source,
};
