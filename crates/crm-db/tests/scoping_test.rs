//! Integration tests for team isolation of the domain record repositories
//! using in-memory SurrealDB.

use crm_core::error::CrmError;
use crm_core::models::activity::{ActivityKind, CreateActivity, UpdateActivity};
use crm_core::models::company::{CreateCompany, UpdateCompany};
use crm_core::models::contact::{CreateContact, UpdateContact};
use crm_core::models::deal::{CreateDeal, DealStage, UpdateDeal};
use crm_core::models::team::CreateTeam;
use crm_core::models::user::CreateUser;
use crm_core::repository::{Pagination, TeamRepository, TeamScopedRepository, UserRepository};
use crm_db::repository::{
    SurrealActivityRepository, SurrealCompanyRepository, SurrealContactRepository,
    SurrealDealRepository, SurrealTeamRepository, SurrealUserRepository,
};
use surrealdb::Surreal;
use surrealdb::engine::local::{Db, Mem};
use uuid::Uuid;

/// Helper: in-memory DB with two teams owned by different users.
async fn setup() -> (Surreal<Db>, Uuid, Uuid) {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    crm_db::run_migrations(&db).await.unwrap();

    let users = SurrealUserRepository::new(db.clone());
    let teams = SurrealTeamRepository::new(db.clone());

    let mut team_ids = Vec::new();
    for name in ["alice", "bob"] {
        let user = users
            .create(CreateUser {
                name: name.into(),
                email: format!("{name}@example.com"),
                password: "correct horse battery".into(),
                is_super_admin: false,
            })
            .await
            .unwrap();
        let team = teams
            .create(CreateTeam {
                owner_id: user.id,
                name: format!("{name} team"),
                personal_team: true,
            })
            .await
            .unwrap();
        team_ids.push(team.id);
    }

    (db, team_ids[0], team_ids[1])
}

fn company(name: &str) -> CreateCompany {
    CreateCompany {
        name: name.into(),
        ..Default::default()
    }
}

fn deal(company_id: Option<Uuid>, contact_id: Option<Uuid>) -> CreateDeal {
    CreateDeal {
        company_id,
        contact_id,
        title: "Annual licence".into(),
        amount_cents: 120_000,
        currency: "EUR".into(),
        stage: DealStage::Prospecting,
        expected_close_at: None,
    }
}

fn activity(
    company_id: Option<Uuid>,
    contact_id: Option<Uuid>,
    deal_id: Option<Uuid>,
) -> CreateActivity {
    CreateActivity {
        kind: ActivityKind::Call,
        subject: "Follow up".into(),
        description: None,
        due_at: None,
        company_id,
        contact_id,
        deal_id,
    }
}

fn assert_not_found<T: std::fmt::Debug>(result: Result<T, CrmError>) {
    match result {
        Err(CrmError::NotFound { .. }) => {}
        other => panic!("expected NotFound, got {other:?}"),
    }
}

// -----------------------------------------------------------------------
// Companies
// -----------------------------------------------------------------------

#[tokio::test]
async fn company_is_stamped_with_team() {
    let (db, team_a, _) = setup().await;
    let repo = SurrealCompanyRepository::new(db);

    let created = repo.create(team_a, company("Initech")).await.unwrap();
    assert_eq!(created.team_id, team_a);
    assert_eq!(repo.owner_of(created.id).await.unwrap(), Some(team_a));
    assert_eq!(repo.owner_of(Uuid::new_v4()).await.unwrap(), None);
}

#[tokio::test]
async fn foreign_company_is_invisible() {
    let (db, team_a, team_b) = setup().await;
    let repo = SurrealCompanyRepository::new(db);

    let theirs = repo.create(team_b, company("Globex")).await.unwrap();
    repo.create(team_a, company("Initech")).await.unwrap();

    assert_not_found(repo.get_by_id(team_a, theirs.id).await);
    assert_not_found(
        repo.update(
            team_a,
            theirs.id,
            UpdateCompany {
                name: Some("Hijacked".into()),
                ..Default::default()
            },
        )
        .await,
    );
    assert_not_found(repo.delete(team_a, theirs.id).await);

    // Untouched in its own team.
    let still = repo.get_by_id(team_b, theirs.id).await.unwrap();
    assert_eq!(still.name, "Globex");

    let listed = repo.list(team_a, Pagination::default()).await.unwrap();
    assert_eq!(listed.total, 1);
    assert!(listed.items.iter().all(|c| c.team_id == team_a));
}

#[tokio::test]
async fn delete_missing_company_is_not_found() {
    let (db, team_a, _) = setup().await;
    let repo = SurrealCompanyRepository::new(db);

    assert_not_found(repo.delete(team_a, Uuid::new_v4()).await);
}

#[tokio::test]
async fn deleting_company_detaches_contacts() {
    let (db, team_a, _) = setup().await;
    let companies = SurrealCompanyRepository::new(db.clone());
    let contacts = SurrealContactRepository::new(db);

    let acme = companies.create(team_a, company("Acme")).await.unwrap();
    let jane = contacts
        .create(
            team_a,
            CreateContact {
                company_id: Some(acme.id),
                first_name: "Jane".into(),
                last_name: "Doe".into(),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(jane.company_id, Some(acme.id));

    companies.delete(team_a, acme.id).await.unwrap();

    let jane = contacts.get_by_id(team_a, jane.id).await.unwrap();
    assert_eq!(jane.company_id, None);
}

// -----------------------------------------------------------------------
// Contacts
// -----------------------------------------------------------------------

fn contact(first: &str, company_id: Option<Uuid>) -> CreateContact {
    CreateContact {
        company_id,
        first_name: first.into(),
        last_name: "Doe".into(),
        ..Default::default()
    }
}

#[tokio::test]
async fn foreign_contact_is_invisible() {
    let (db, team_a, team_b) = setup().await;
    let contacts = SurrealContactRepository::new(db);

    let theirs = contacts.create(team_b, contact("Milton", None)).await.unwrap();

    assert_not_found(contacts.get_by_id(team_a, theirs.id).await);
    assert_not_found(
        contacts
            .update(
                team_a,
                theirs.id,
                UpdateContact {
                    first_name: Some("Hijacked".into()),
                    ..Default::default()
                },
            )
            .await,
    );
    assert_not_found(contacts.delete(team_a, theirs.id).await);

    let still = contacts.get_by_id(team_b, theirs.id).await.unwrap();
    assert_eq!(still.first_name, "Milton");
    assert_eq!(
        contacts
            .list(team_a, Pagination::default())
            .await
            .unwrap()
            .total,
        0
    );
}

#[tokio::test]
async fn deleting_contact_detaches_deals_and_activities() {
    let (db, team_a, _) = setup().await;
    let contacts = SurrealContactRepository::new(db.clone());
    let deals = SurrealDealRepository::new(db.clone());
    let activities = SurrealActivityRepository::new(db);

    let jane = contacts.create(team_a, contact("Jane", None)).await.unwrap();
    let deal = deals
        .create(team_a, deal(None, Some(jane.id)))
        .await
        .unwrap();
    let call = activities
        .create(team_a, activity(None, Some(jane.id), Some(deal.id)))
        .await
        .unwrap();

    contacts.delete(team_a, jane.id).await.unwrap();

    let deal = deals.get_by_id(team_a, deal.id).await.unwrap();
    assert_eq!(deal.contact_id, None);
    let call = activities.get_by_id(team_a, call.id).await.unwrap();
    assert_eq!(call.contact_id, None);
    assert_eq!(call.deal_id, Some(deal.id));
}

// -----------------------------------------------------------------------
// Cross-record references
// -----------------------------------------------------------------------

#[tokio::test]
async fn contact_cannot_reference_foreign_company() {
    let (db, team_a, team_b) = setup().await;
    let companies = SurrealCompanyRepository::new(db.clone());
    let contacts = SurrealContactRepository::new(db);

    let foreign = companies.create(team_b, company("Globex")).await.unwrap();
    let own = companies.create(team_a, company("Initech")).await.unwrap();

    assert_not_found(
        contacts
            .create(
                team_a,
                CreateContact {
                    company_id: Some(foreign.id),
                    first_name: "Peter".into(),
                    last_name: "Gibbons".into(),
                    ..Default::default()
                },
            )
            .await,
    );

    let peter = contacts
        .create(
            team_a,
            CreateContact {
                company_id: Some(own.id),
                first_name: "Peter".into(),
                last_name: "Gibbons".into(),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_not_found(
        contacts
            .update(
                team_a,
                peter.id,
                UpdateContact {
                    company_id: Some(Some(foreign.id)),
                    ..Default::default()
                },
            )
            .await,
    );

    let cleared = contacts
        .update(
            team_a,
            peter.id,
            UpdateContact {
                company_id: Some(None),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(cleared.company_id, None);
}

#[tokio::test]
async fn deal_lifecycle_and_references() {
    let (db, team_a, team_b) = setup().await;
    let companies = SurrealCompanyRepository::new(db.clone());
    let deals = SurrealDealRepository::new(db);

    let acme = companies.create(team_a, company("Acme")).await.unwrap();
    let foreign = companies.create(team_b, company("Globex")).await.unwrap();

    let deal = deals
        .create(
            team_a,
            CreateDeal {
                company_id: Some(acme.id),
                contact_id: None,
                title: "Annual licence".into(),
                amount_cents: 120_000,
                currency: "EUR".into(),
                stage: DealStage::Prospecting,
                expected_close_at: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(deal.stage, DealStage::Prospecting);
    assert_eq!(deal.team_id, team_a);

    let won = deals
        .update(
            team_a,
            deal.id,
            UpdateDeal {
                stage: Some(DealStage::ClosedWon),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert!(won.stage.is_closed());
    assert_eq!(won.amount_cents, 120_000);

    assert_not_found(
        deals
            .update(
                team_a,
                deal.id,
                UpdateDeal {
                    company_id: Some(Some(foreign.id)),
                    ..Default::default()
                },
            )
            .await,
    );
    assert_not_found(deals.get_by_id(team_b, deal.id).await);

    deals.delete(team_a, deal.id).await.unwrap();
    assert_not_found(deals.get_by_id(team_a, deal.id).await);
}

#[tokio::test]
async fn foreign_deal_delete_is_not_found_and_keeps_the_deal() {
    let (db, team_a, team_b) = setup().await;
    let deals = SurrealDealRepository::new(db);

    let theirs = deals.create(team_b, deal(None, None)).await.unwrap();

    assert_not_found(deals.delete(team_a, theirs.id).await);
    assert_eq!(
        deals.get_by_id(team_b, theirs.id).await.unwrap().title,
        "Annual licence"
    );
}

#[tokio::test]
async fn deleting_deal_detaches_activities() {
    let (db, team_a, _) = setup().await;
    let contacts = SurrealContactRepository::new(db.clone());
    let deals = SurrealDealRepository::new(db.clone());
    let activities = SurrealActivityRepository::new(db);

    let jane = contacts.create(team_a, contact("Jane", None)).await.unwrap();
    let won = deals.create(team_a, deal(None, None)).await.unwrap();
    let call = activities
        .create(team_a, activity(None, Some(jane.id), Some(won.id)))
        .await
        .unwrap();

    deals.delete(team_a, won.id).await.unwrap();

    let call = activities.get_by_id(team_a, call.id).await.unwrap();
    assert_eq!(call.deal_id, None);
    assert_eq!(call.contact_id, Some(jane.id));
}

#[tokio::test]
async fn delete_many_is_all_or_nothing() {
    let (db, team_a, team_b) = setup().await;
    let companies = SurrealCompanyRepository::new(db.clone());
    let contacts = SurrealContactRepository::new(db);

    let acme = companies.create(team_a, company("Acme")).await.unwrap();
    let initech = companies.create(team_a, company("Initech")).await.unwrap();
    let globex = companies.create(team_b, company("Globex")).await.unwrap();
    let jane = contacts
        .create(team_a, contact("Jane", Some(acme.id)))
        .await
        .unwrap();

    // One foreign id fails the whole batch.
    assert_not_found(
        companies
            .delete_many(team_a, &[acme.id, initech.id, globex.id])
            .await,
    );
    assert_eq!(
        companies
            .list(team_a, Pagination::default())
            .await
            .unwrap()
            .total,
        2
    );
    assert_eq!(
        contacts.get_by_id(team_a, jane.id).await.unwrap().company_id,
        Some(acme.id)
    );

    // Duplicates count once.
    let deleted = companies
        .delete_many(team_a, &[acme.id, initech.id, acme.id])
        .await
        .unwrap();
    assert_eq!(deleted, 2);
    assert_eq!(
        companies
            .list(team_a, Pagination::default())
            .await
            .unwrap()
            .total,
        0
    );
    assert_eq!(
        contacts.get_by_id(team_a, jane.id).await.unwrap().company_id,
        None
    );
    assert!(companies.get_by_id(team_b, globex.id).await.is_ok());
}

#[tokio::test]
async fn activity_lifecycle_and_references() {
    let (db, team_a, team_b) = setup().await;
    let companies = SurrealCompanyRepository::new(db.clone());
    let activities = SurrealActivityRepository::new(db);

    let foreign = companies.create(team_b, company("Globex")).await.unwrap();

    assert_not_found(
        activities
            .create(
                team_a,
                CreateActivity {
                    kind: ActivityKind::Call,
                    subject: "Intro".into(),
                    description: None,
                    due_at: None,
                    company_id: Some(foreign.id),
                    contact_id: None,
                    deal_id: None,
                },
            )
            .await,
    );

    let call = activities
        .create(
            team_a,
            CreateActivity {
                kind: ActivityKind::Call,
                subject: "Intro".into(),
                description: Some("First call".into()),
                due_at: Some(chrono::Utc::now()),
                company_id: None,
                contact_id: None,
                deal_id: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(call.completed_at, None);

    let done = activities
        .update(
            team_a,
            call.id,
            UpdateActivity {
                completed_at: Some(Some(chrono::Utc::now())),
                kind: Some(ActivityKind::Meeting),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert!(done.completed_at.is_some());
    assert_eq!(done.kind, ActivityKind::Meeting);

    assert_not_found(activities.delete(team_b, call.id).await);
    activities.delete(team_a, call.id).await.unwrap();
    assert_eq!(
        activities
            .list(team_a, Pagination::default())
            .await
            .unwrap()
            .total,
        0
    );
}

#[tokio::test]
async fn deleting_team_removes_its_records_only() {
    let (db, team_a, team_b) = setup().await;
    let teams = SurrealTeamRepository::new(db.clone());
    let companies = SurrealCompanyRepository::new(db);

    companies.create(team_a, company("Initech")).await.unwrap();
    let kept = companies.create(team_b, company("Globex")).await.unwrap();

    teams.delete(team_a).await.unwrap();

    assert_eq!(
        companies
            .list(team_a, Pagination::default())
            .await
            .unwrap()
            .total,
        0
    );
    assert!(companies.get_by_id(team_b, kept.id).await.is_ok());
}
