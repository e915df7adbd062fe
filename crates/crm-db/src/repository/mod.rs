//! SurrealDB repository implementations.

mod activity;
mod company;
mod contact;
mod deal;
mod permission;
mod role;
mod support;
mod team;
mod user;

pub use activity::SurrealActivityRepository;
pub use company::SurrealCompanyRepository;
pub use contact::SurrealContactRepository;
pub use deal::SurrealDealRepository;
pub use permission::SurrealPermissionRepository;
pub use role::SurrealRoleRepository;
pub use team::SurrealTeamRepository;
pub use user::SurrealUserRepository;
