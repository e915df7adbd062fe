//! Integration tests for Role and Permission repositories using in-memory SurrealDB.

use crm_core::error::CrmError;
use crm_core::models::permission::CreatePermission;
use crm_core::models::role::{CreateRole, UpdateRole};
use crm_core::models::team::CreateTeam;
use crm_core::models::user::CreateUser;
use crm_core::repository::{
    Pagination, PermissionRepository, RoleRepository, TeamRepository, UserRepository,
};
use crm_db::repository::{
    SurrealPermissionRepository, SurrealRoleRepository, SurrealTeamRepository,
    SurrealUserRepository,
};
use surrealdb::Surreal;
use surrealdb::engine::local::Mem;
use uuid::Uuid;

/// Helper: spin up in-memory DB, run migrations, create one user and two
/// teams owned by that user.
async fn setup() -> (Surreal<surrealdb::engine::local::Db>, Uuid, Uuid, Uuid) {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    crm_db::run_migrations(&db).await.unwrap();

    let user = SurrealUserRepository::new(db.clone())
        .create(CreateUser {
            name: "Alice".into(),
            email: "alice@example.com".into(),
            password: "correct horse battery".into(),
            is_super_admin: false,
        })
        .await
        .unwrap();

    let teams = SurrealTeamRepository::new(db.clone());
    let team_a = teams
        .create(CreateTeam {
            owner_id: user.id,
            name: "Team A".into(),
            personal_team: false,
        })
        .await
        .unwrap();
    let team_b = teams
        .create(CreateTeam {
            owner_id: user.id,
            name: "Team B".into(),
            personal_team: false,
        })
        .await
        .unwrap();

    (db, user.id, team_a.id, team_b.id)
}

fn role(team_id: Uuid, name: &str) -> CreateRole {
    CreateRole {
        team_id,
        name: name.into(),
        description: String::new(),
    }
}

// -----------------------------------------------------------------------
// Role tests
// -----------------------------------------------------------------------

#[tokio::test]
async fn role_crud_within_team() {
    let (db, _, team_a, team_b) = setup().await;
    let roles = SurrealRoleRepository::new(db);

    let created = roles.create(role(team_a, "Sales")).await.unwrap();
    assert_eq!(created.team_id, team_a);

    let fetched = roles.get_by_id(team_a, created.id).await.unwrap();
    assert_eq!(fetched.name, "Sales");

    // Invisible from another team.
    let err = roles.get_by_id(team_b, created.id).await.unwrap_err();
    assert!(matches!(err, CrmError::NotFound { .. }));

    let updated = roles
        .update(
            team_a,
            created.id,
            UpdateRole {
                description: Some("Closes deals".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.description, "Closes deals");

    let err = roles
        .update(team_b, created.id, UpdateRole::default())
        .await
        .unwrap_err();
    assert!(matches!(err, CrmError::NotFound { .. }));

    let listed = roles.list(team_a, Pagination::default()).await.unwrap();
    assert_eq!(listed.total, 1);
    assert_eq!(
        roles.list(team_b, Pagination::default()).await.unwrap().total,
        0
    );

    let err = roles.delete(team_b, created.id).await.unwrap_err();
    assert!(matches!(err, CrmError::NotFound { .. }));
    roles.delete(team_a, created.id).await.unwrap();
    assert!(roles.get_by_id(team_a, created.id).await.is_err());
}

#[tokio::test]
async fn role_names_conflict_within_team() {
    let (db, _, team_a, team_b) = setup().await;
    let roles = SurrealRoleRepository::new(db);

    roles.create(role(team_a, "Admin")).await.unwrap();
    roles.create(role(team_b, "Admin")).await.unwrap();

    let err = roles.create(role(team_a, "Admin")).await.unwrap_err();
    assert!(matches!(err, CrmError::AlreadyExists { .. }));
}

#[tokio::test]
async fn user_roles_are_per_team() {
    let (db, user_id, team_a, team_b) = setup().await;
    let roles = SurrealRoleRepository::new(db);

    let sales_a = roles.create(role(team_a, "Sales")).await.unwrap();
    let sales_b = roles.create(role(team_b, "Sales")).await.unwrap();

    roles.assign_to_user(team_a, user_id, sales_a.id).await.unwrap();

    let in_a = roles.get_user_roles(team_a, user_id).await.unwrap();
    assert_eq!(in_a.len(), 1);
    assert_eq!(in_a[0].id, sales_a.id);
    assert!(roles.get_user_roles(team_b, user_id).await.unwrap().is_empty());

    // A role cannot be assigned through a team that does not own it.
    let err = roles
        .assign_to_user(team_a, user_id, sales_b.id)
        .await
        .unwrap_err();
    assert!(matches!(err, CrmError::NotFound { .. }));

    roles
        .unassign_from_user(team_a, user_id, sales_a.id)
        .await
        .unwrap();
    assert!(roles.get_user_roles(team_a, user_id).await.unwrap().is_empty());
}

// -----------------------------------------------------------------------
// Permission tests
// -----------------------------------------------------------------------

#[tokio::test]
async fn permission_catalog_crud() {
    let (db, _, _, _) = setup().await;
    let permissions = SurrealPermissionRepository::new(db);

    let created = permissions
        .create(CreatePermission {
            name: "view:Deal".into(),
            description: "See a deal".into(),
        })
        .await
        .unwrap();

    let fetched = permissions.get_by_name("view:Deal").await.unwrap();
    assert_eq!(fetched.id, created.id);

    let err = permissions
        .create(CreatePermission {
            name: "view:Deal".into(),
            description: String::new(),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, CrmError::AlreadyExists { .. }));

    assert_eq!(
        permissions.list(Pagination::default()).await.unwrap().total,
        1
    );

    permissions.delete(created.id).await.unwrap();
    assert!(permissions.get_by_name("view:Deal").await.is_err());
    assert!(matches!(
        permissions.delete(created.id).await.unwrap_err(),
        CrmError::NotFound { .. }
    ));
}

#[tokio::test]
async fn effective_permission_names_follow_team_roles() {
    let (db, user_id, team_a, team_b) = setup().await;
    crm_db::ensure_permission_catalog(&db).await.unwrap();

    let roles = SurrealRoleRepository::new(db.clone());
    let permissions = SurrealPermissionRepository::new(db);

    let view_deal = permissions.get_by_name("view:Deal").await.unwrap();
    let update_deal = permissions.get_by_name("update:Deal").await.unwrap();

    let viewer = roles.create(role(team_a, "Viewer")).await.unwrap();
    let editor = roles.create(role(team_a, "Editor")).await.unwrap();
    let other = roles.create(role(team_b, "Editor")).await.unwrap();

    permissions
        .grant_to_role(team_a, viewer.id, view_deal.id)
        .await
        .unwrap();
    permissions
        .grant_to_role(team_a, editor.id, view_deal.id)
        .await
        .unwrap();
    permissions
        .grant_to_role(team_a, editor.id, update_deal.id)
        .await
        .unwrap();
    permissions
        .grant_to_role(team_b, other.id, update_deal.id)
        .await
        .unwrap();

    roles.assign_to_user(team_a, user_id, viewer.id).await.unwrap();
    roles.assign_to_user(team_a, user_id, editor.id).await.unwrap();

    let names = permissions
        .get_user_permission_names(team_a, user_id)
        .await
        .unwrap();
    assert_eq!(names, vec!["update:Deal".to_string(), "view:Deal".to_string()]);

    // No role held in team B, so nothing granted there.
    assert!(
        permissions
            .get_user_permission_names(team_b, user_id)
            .await
            .unwrap()
            .is_empty()
    );

    let granted = permissions
        .get_role_permissions(team_a, editor.id)
        .await
        .unwrap();
    assert_eq!(granted.len(), 2);

    permissions
        .revoke_from_role(team_a, editor.id, update_deal.id)
        .await
        .unwrap();
    let names = permissions
        .get_user_permission_names(team_a, user_id)
        .await
        .unwrap();
    assert_eq!(names, vec!["view:Deal".to_string()]);

    // Granting through a foreign team is rejected.
    let err = permissions
        .grant_to_role(team_a, other.id, view_deal.id)
        .await
        .unwrap_err();
    assert!(matches!(err, CrmError::NotFound { .. }));
}

#[tokio::test]
async fn removing_member_strips_team_roles() {
    let (db, owner_id, team_a, _) = setup().await;

    let users = SurrealUserRepository::new(db.clone());
    let teams = SurrealTeamRepository::new(db.clone());
    let roles = SurrealRoleRepository::new(db);

    let member = users
        .create(CreateUser {
            name: "Bob".into(),
            email: "bob@example.com".into(),
            password: "correct horse battery".into(),
            is_super_admin: false,
        })
        .await
        .unwrap();
    teams.add_member(team_a, member.id).await.unwrap();

    let sales = roles.create(role(team_a, "Sales")).await.unwrap();
    roles.assign_to_user(team_a, member.id, sales.id).await.unwrap();
    roles.assign_to_user(team_a, owner_id, sales.id).await.unwrap();

    teams.remove_member(team_a, member.id).await.unwrap();

    assert!(roles.get_user_roles(team_a, member.id).await.unwrap().is_empty());
    assert_eq!(roles.get_user_roles(team_a, owner_id).await.unwrap().len(), 1);
}
