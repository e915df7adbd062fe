//! Account registration and password authentication.

use crm_core::error::{CrmError, CrmResult};
use crm_core::models::team::CreateTeam;
use crm_core::models::user::{CreateUser, User};
use crm_core::password::Passwords;
use crm_core::repository::{TeamRepository, UserRepository};
use tracing::{info, warn};

use crate::config::AccessConfig;
use crate::error::AccessError;

/// Input for [`AccountService::register`].
#[derive(Debug, Clone)]
pub struct RegisterInput {
    pub name: String,
    pub email: String,
    pub password: String,
}

pub struct AccountService<U: UserRepository, T: TeamRepository> {
    users: U,
    teams: T,
    passwords: Passwords,
    config: AccessConfig,
}

impl<U: UserRepository, T: TeamRepository> AccountService<U, T> {
    pub fn new(users: U, teams: T, config: AccessConfig) -> Self {
        Self {
            users,
            teams,
            passwords: Passwords::new(config.pepper.clone()),
            config,
        }
    }

    /// Create a user together with its personal team, and make that team the
    /// user's current one.
    pub async fn register(&self, input: RegisterInput) -> CrmResult<User> {
        if input.password.chars().count() < self.config.min_password_length {
            return Err(AccessError::PasswordTooShort {
                min: self.config.min_password_length,
            }
            .into());
        }

        let team_name = personal_team_name(&input.name);
        let user = self
            .users
            .create(CreateUser {
                name: input.name,
                email: input.email,
                password: input.password,
                is_super_admin: false,
            })
            .await?;

        let team = match self
            .teams
            .create(CreateTeam {
                owner_id: user.id,
                name: team_name,
                personal_team: true,
            })
            .await
        {
            Ok(team) => team,
            Err(e) => {
                warn!(user_id = %user.id, error = %e, "Personal team creation failed, removing user");
                self.users.delete(user.id).await?;
                return Err(e);
            }
        };

        let user = self.users.set_current_team(user.id, Some(team.id)).await?;

        info!(user_id = %user.id, team_id = %team.id, "User registered");

        Ok(user)
    }

    /// Check an email/password pair. Unknown emails and wrong passwords fail
    /// the same way.
    pub async fn authenticate(&self, email: &str, password: &str) -> CrmResult<User> {
        let user = match self.users.get_by_email(email).await {
            Ok(user) => user,
            Err(CrmError::NotFound { .. }) => return Err(AccessError::InvalidCredentials.into()),
            Err(e) => return Err(e),
        };

        if !self.passwords.verify(password, &user.password_hash)? {
            return Err(AccessError::InvalidCredentials.into());
        }

        Ok(user)
    }
}

/// "Ada's Team" for "Ada Lovelace".
fn personal_team_name(name: &str) -> String {
    let first = name.split_whitespace().next().unwrap_or(name);
    format!("{first}'s Team")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn personal_team_uses_first_name() {
        assert_eq!(personal_team_name("Ada Lovelace"), "Ada's Team");
        assert_eq!(personal_team_name("Prince"), "Prince's Team");
    }
}
