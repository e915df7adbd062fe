//! Integration tests for account registration and the team service.

use crm_access::{
    AccessConfig, AccountService, PermissionGate, RegisterInput, TeamService, TenantContext,
    TenantResolver,
};
use crm_core::error::CrmError;
use crm_core::models::company::CreateCompany;
use crm_core::models::role::CreateRole;
use crm_core::models::user::User;
use crm_core::repository::{
    Pagination, PermissionRepository, RoleRepository, TeamRepository, TeamScopedRepository,
    UserRepository,
};
use crm_db::repository::{
    SurrealCompanyRepository, SurrealPermissionRepository, SurrealRoleRepository,
    SurrealTeamRepository, SurrealUserRepository,
};
use surrealdb::Surreal;
use surrealdb::engine::local::{Db, Mem};
use uuid::Uuid;

type Accounts = AccountService<SurrealUserRepository<Db>, SurrealTeamRepository<Db>>;
type Teams = TeamService<
    SurrealUserRepository<Db>,
    SurrealTeamRepository<Db>,
    SurrealRoleRepository<Db>,
    SurrealPermissionRepository<Db>,
>;

/// Spin up in-memory DB, run migrations and seed the permission catalog.
async fn setup() -> (Surreal<Db>, Accounts, Teams) {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    crm_db::run_migrations(&db).await.unwrap();
    crm_db::ensure_permission_catalog(&db).await.unwrap();

    let config = AccessConfig::default();
    let accounts = AccountService::new(
        SurrealUserRepository::new(db.clone()),
        SurrealTeamRepository::new(db.clone()),
        config.clone(),
    );
    let teams = TeamService::new(
        SurrealUserRepository::new(db.clone()),
        SurrealTeamRepository::new(db.clone()),
        SurrealRoleRepository::new(db.clone()),
        PermissionGate::new(SurrealPermissionRepository::new(db.clone()), &config),
    );
    (db, accounts, teams)
}

async fn register(accounts: &Accounts, name: &str) -> User {
    accounts
        .register(RegisterInput {
            name: name.into(),
            email: format!("{}@example.com", name.to_lowercase()),
            password: "correct horse battery".into(),
        })
        .await
        .unwrap()
}

async fn context(db: &Surreal<Db>, user_id: Uuid) -> TenantContext {
    TenantResolver::new(
        SurrealUserRepository::new(db.clone()),
        SurrealTeamRepository::new(db.clone()),
    )
    .resolve(Some(user_id), None)
    .await
    .unwrap()
    .require()
    .unwrap()
}

// -----------------------------------------------------------------------
// Accounts
// -----------------------------------------------------------------------

#[tokio::test]
async fn register_creates_personal_team() {
    let (db, accounts, _) = setup().await;
    let user = register(&accounts, "Ada Lovelace").await;

    let team_id = user.current_team_id.expect("current team set");
    let team = SurrealTeamRepository::new(db.clone())
        .get_by_id(team_id)
        .await
        .unwrap();
    assert!(team.personal_team);
    assert_eq!(team.owner_id, user.id);
    assert_eq!(team.name, "Ada's Team");
}

#[tokio::test]
async fn register_rejects_short_passwords() {
    let (_, accounts, _) = setup().await;

    let err = accounts
        .register(RegisterInput {
            name: "Shorty".into(),
            email: "shorty@example.com".into(),
            password: "short".into(),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, CrmError::Validation { .. }));
}

#[tokio::test]
async fn authenticate_checks_password() {
    let (_, accounts, _) = setup().await;
    let user = register(&accounts, "Alice").await;

    let authed = accounts
        .authenticate("alice@example.com", "correct horse battery")
        .await
        .unwrap();
    assert_eq!(authed.id, user.id);

    let wrong = accounts
        .authenticate("alice@example.com", "wrong password!")
        .await
        .unwrap_err();
    let unknown = accounts
        .authenticate("nobody@example.com", "correct horse battery")
        .await
        .unwrap_err();
    assert_eq!(wrong.to_string(), unknown.to_string());
    assert!(matches!(wrong, CrmError::AuthenticationFailed { .. }));
}

// -----------------------------------------------------------------------
// Teams
// -----------------------------------------------------------------------

#[tokio::test]
async fn create_and_switch_teams() {
    let (db, accounts, teams) = setup().await;
    let alice = register(&accounts, "Alice").await;
    let personal = alice.current_team_id.unwrap();
    let ctx = context(&db, alice.id).await;

    let shared = teams.create_team(&ctx, "Sales").await.unwrap();
    assert!(!shared.personal_team);
    assert_eq!(context(&db, alice.id).await.team_id(), shared.id);

    let switched = teams.switch_team(alice.id, personal).await.unwrap();
    assert_eq!(switched.current_team_id, Some(personal));

    let bob = register(&accounts, "Bob").await;
    let err = teams
        .switch_team(bob.id, shared.id)
        .await
        .unwrap_err();
    assert!(matches!(err, CrmError::AuthorizationDenied { .. }));
}

#[tokio::test]
async fn only_owner_or_team_updaters_manage_members() {
    let (db, accounts, teams) = setup().await;
    let owner = register(&accounts, "Owner").await;
    let member = register(&accounts, "Member").await;
    let outsider = register(&accounts, "Outsider").await;
    let team_id = owner.current_team_id.unwrap();

    let owner_ctx = context(&db, owner.id).await;
    teams.add_member(&owner_ctx, member.id).await.unwrap();

    teams.switch_team(member.id, team_id).await.unwrap();
    let member_ctx = context(&db, member.id).await;
    assert_eq!(member_ctx.team_id(), team_id);

    let err = teams.add_member(&member_ctx, outsider.id).await.unwrap_err();
    assert!(matches!(err, CrmError::AuthorizationDenied { .. }));
    assert!(
        !SurrealTeamRepository::new(db.clone())
            .is_member(team_id, outsider.id)
            .await
            .unwrap()
    );

    // The owner cannot be removed.
    let err = teams
        .remove_member(&owner_ctx, owner.id)
        .await
        .unwrap_err();
    assert!(matches!(err, CrmError::Validation { .. }));

    teams.remove_member(&owner_ctx, member.id).await.unwrap();
    let member = SurrealUserRepository::new(db.clone())
        .get_by_id(member.id)
        .await
        .unwrap();
    assert_eq!(member.current_team_id, None);
}

#[tokio::test]
async fn role_assignment_requires_update_role() {
    let (db, accounts, teams) = setup().await;
    let owner = register(&accounts, "Owner").await;
    let member = register(&accounts, "Member").await;
    let team_id = owner.current_team_id.unwrap();
    let owner_ctx = context(&db, owner.id).await;
    teams.add_member(&owner_ctx, member.id).await.unwrap();

    let roles = SurrealRoleRepository::new(db.clone());
    let permissions = SurrealPermissionRepository::new(db.clone());
    let admin = roles
        .create(CreateRole {
            team_id,
            name: "Admin".into(),
            description: String::new(),
        })
        .await
        .unwrap();
    let update_role = permissions.get_by_name("update:Role").await.unwrap();
    permissions
        .grant_to_role(team_id, admin.id, update_role.id)
        .await
        .unwrap();

    // Owning the team does not imply update:Role.
    let err = teams
        .assign_role(&owner_ctx, member.id, admin.id)
        .await
        .unwrap_err();
    assert!(matches!(err, CrmError::AuthorizationDenied { .. }));
    assert!(
        roles
            .get_user_roles(team_id, member.id)
            .await
            .unwrap()
            .is_empty()
    );

    roles.assign_to_user(team_id, owner.id, admin.id).await.unwrap();
    teams
        .assign_role(&owner_ctx, member.id, admin.id)
        .await
        .unwrap();
    assert_eq!(
        roles.get_user_roles(team_id, member.id).await.unwrap().len(),
        1
    );

    // Non-members and foreign roles are not found.
    let outsider = register(&accounts, "Outsider").await;
    let err = teams
        .assign_role(&owner_ctx, outsider.id, admin.id)
        .await
        .unwrap_err();
    assert!(matches!(err, CrmError::NotFound { .. }));

    let foreign_role = roles
        .create(CreateRole {
            team_id: outsider.current_team_id.unwrap(),
            name: "Admin".into(),
            description: String::new(),
        })
        .await
        .unwrap();
    let err = teams
        .assign_role(&owner_ctx, member.id, foreign_role.id)
        .await
        .unwrap_err();
    assert!(matches!(err, CrmError::NotFound { .. }));

    teams
        .revoke_role(&owner_ctx, member.id, admin.id)
        .await
        .unwrap();
    assert!(
        roles
            .get_user_roles(team_id, member.id)
            .await
            .unwrap()
            .is_empty()
    );
}

#[tokio::test]
async fn delete_team_is_owner_only_and_cascades() {
    let (db, accounts, teams) = setup().await;
    let owner = register(&accounts, "Owner").await;
    let member = register(&accounts, "Member").await;

    let owner_ctx = context(&db, owner.id).await;

    // Personal teams are kept.
    let err = teams.delete_team(&owner_ctx).await.unwrap_err();
    assert!(matches!(err, CrmError::Validation { .. }));

    let shared = teams.create_team(&owner_ctx, "Shared").await.unwrap();
    let shared_ctx = context(&db, owner.id).await;
    assert_eq!(shared_ctx.team_id(), shared.id);
    teams.add_member(&shared_ctx, member.id).await.unwrap();

    let companies = SurrealCompanyRepository::new(db.clone());
    companies
        .create(
            shared.id,
            CreateCompany {
                name: "Initech".into(),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    let role = SurrealRoleRepository::new(db.clone())
        .create(CreateRole {
            team_id: shared.id,
            name: "Sales".into(),
            description: String::new(),
        })
        .await
        .unwrap();

    teams.switch_team(member.id, shared.id).await.unwrap();
    let member_ctx = context(&db, member.id).await;
    let err = teams.delete_team(&member_ctx).await.unwrap_err();
    assert!(matches!(err, CrmError::AuthorizationDenied { .. }));

    teams.delete_team(&shared_ctx).await.unwrap();

    assert_eq!(
        companies
            .list(shared.id, Pagination::default())
            .await
            .unwrap()
            .total,
        0
    );
    assert!(
        SurrealRoleRepository::new(db.clone())
            .get_by_id(shared.id, role.id)
            .await
            .is_err()
    );

    // Both fall back to their personal teams.
    assert_eq!(
        context(&db, owner.id).await.team_id(),
        owner.current_team_id.unwrap()
    );
    assert_eq!(
        context(&db, member.id).await.team_id(),
        member.current_team_id.unwrap()
    );
}
