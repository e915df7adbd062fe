//! Domain models for the CRM access core.
//!
//! `team`, `user`, `role` and `permission` describe who may act where.
//! `company`, `contact`, `deal` and `activity` are the team-owned domain
//! records; their `Create*`/`Update*` inputs never carry a team id.

pub mod activity;
pub mod company;
pub mod contact;
pub mod deal;
pub mod permission;
pub mod role;
pub mod team;
pub mod user;
