//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async methods that
//! accept `&PgPool` as the first argument.

pub mod document_repo;
pub mod property_definition_repo;
pub mod property_value_repo;
pub mod repair_audit_repo;
pub mod repair_run_repo;
pub mod student_repo;

pub use document_repo::DocumentRepo;
pub use property_definition_repo::PropertyDefinitionRepo;
pub use property_value_repo::PropertyValueRepo;
pub use repair_audit_repo::RepairAuditRepo;
pub use repair_run_repo::RepairRunRepo;
pub use student_repo::StudentRepo;
