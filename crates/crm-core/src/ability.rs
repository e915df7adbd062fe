//! Ability grammar: `{action}:{entity}` permission strings.
//!
//! Abilities are the atomic capabilities granted to roles, e.g.
//! `create:Company` or `delete_any:Deal`. Matching is exact: there are no
//! wildcards and no prefix matching, so an ability never grants more than
//! the one action on the one entity it names.

use serde::{Deserialize, Serialize};

use crate::error::CrmError;

/// What the actor wants to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    ViewAny,
    View,
    Create,
    Update,
    Delete,
    /// Bulk deletion.
    DeleteAny,
}

impl Action {
    pub const ALL: [Action; 6] = [
        Action::ViewAny,
        Action::View,
        Action::Create,
        Action::Update,
        Action::Delete,
        Action::DeleteAny,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Action::ViewAny => "view_any",
            Action::View => "view",
            Action::Create => "create",
            Action::Update => "update",
            Action::Delete => "delete",
            Action::DeleteAny => "delete_any",
        }
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Action {
    type Err = CrmError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Action::ALL
            .into_iter()
            .find(|action| action.as_str() == value)
            .ok_or_else(|| CrmError::Validation {
                message: format!("unknown action: {value}"),
            })
    }
}

/// The kind of thing an action applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Entity {
    Company,
    Contact,
    Deal,
    Activity,
    Team,
    User,
    Role,
}

impl Entity {
    pub const ALL: [Entity; 7] = [
        Entity::Company,
        Entity::Contact,
        Entity::Deal,
        Entity::Activity,
        Entity::Team,
        Entity::User,
        Entity::Role,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Entity::Company => "Company",
            Entity::Contact => "Contact",
            Entity::Deal => "Deal",
            Entity::Activity => "Activity",
            Entity::Team => "Team",
            Entity::User => "User",
            Entity::Role => "Role",
        }
    }

    /// Storage table backing this entity.
    pub fn table(self) -> &'static str {
        match self {
            Entity::Company => "company",
            Entity::Contact => "contact",
            Entity::Deal => "deal",
            Entity::Activity => "activity",
            Entity::Team => "team",
            Entity::User => "user",
            Entity::Role => "role",
        }
    }
}

impl std::fmt::Display for Entity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Entity {
    type Err = CrmError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Entity::ALL
            .into_iter()
            .find(|entity| entity.as_str() == value)
            .ok_or_else(|| CrmError::Validation {
                message: format!("unknown entity: {value}"),
            })
    }
}

/// A single `{action}:{entity}` capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Ability {
    pub action: Action,
    pub entity: Entity,
}

impl Ability {
    pub const fn new(action: Action, entity: Entity) -> Self {
        Self { action, entity }
    }

    /// Every valid ability, in a stable order.
    pub fn catalog() -> impl Iterator<Item = Ability> {
        Entity::ALL.into_iter().flat_map(|entity| {
            Action::ALL
                .into_iter()
                .map(move |action| Ability::new(action, entity))
        })
    }

    pub fn parse(value: &str) -> Result<Self, CrmError> {
        value.parse()
    }
}

impl std::fmt::Display for Ability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.action, self.entity)
    }
}

impl std::str::FromStr for Ability {
    type Err = CrmError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let (action, entity) = value.split_once(':').ok_or_else(|| CrmError::Validation {
            message: format!("invalid ability: {value}"),
        })?;
        if entity.contains(':') {
            return Err(CrmError::Validation {
                message: format!("invalid ability: {value}"),
            });
        }
        Ok(Self::new(action.parse()?, entity.parse()?))
    }
}
