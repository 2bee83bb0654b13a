//! Services Layer
//!
//! Business logic shared by the interactive commands and the tests. Each
//! service is a unit struct with associated functions taking `&AppState`.
//!
//! # Architecture
//!
//! ```text
//! Operator --> Commands --> Services --> CompanyApi (REST)
//!                              │
//!                              └──> CompanyCache / DeletionGuard / NotificationCenter
//! ```
//!
//! # Services
//!
//! - `CompanyService` - Load/filter the cache, detail view, create, update, register
//! - `DeletionService` - Dependency check, confirmation and delete

pub mod company_service;
pub mod deletion_service;

pub use company_service::{CompanyInput, CompanyService, RegistrationForm};
pub use deletion_service::DeletionService;
