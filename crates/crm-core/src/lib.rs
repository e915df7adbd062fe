//! CRM Core: domain models, the ability grammar, and the repository
//! traits that every storage backend implements.
//!
//! Domain records (companies, contacts, deals, activities) always belong to
//! exactly one team. The traits in [`repository`] take the owning `team_id`
//! on every call so that a backend cannot serve a record outside it.

pub mod ability;
pub mod error;
pub mod models;
pub mod password;
pub mod repository;

pub use ability::{Ability, Action, Entity};
pub use error::{CrmError, CrmResult};
