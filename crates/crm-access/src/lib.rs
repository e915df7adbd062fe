//! CRM Access: tenant resolution, team scoping and the role/permission
//! gate, plus the account and team services built on them.
//!
//! A request resolves a [`TenantContext`] once, then reaches domain records
//! only through a [`ScopedStore`] (or a [`GuardedStore`], which also
//! consults the [`PermissionGate`] before any side effect).

pub mod account;
pub mod config;
pub mod context;
pub mod error;
pub mod gate;
pub mod guard;
pub mod resolver;
pub mod scope;
pub mod team;

pub use account::{AccountService, RegisterInput};
pub use config::AccessConfig;
pub use context::{Resolution, TenantContext};
pub use error::AccessError;
pub use gate::PermissionGate;
pub use guard::GuardedStore;
pub use resolver::TenantResolver;
pub use scope::ScopedStore;
pub use team::TeamService;
