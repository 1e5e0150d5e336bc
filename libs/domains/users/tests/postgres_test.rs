//! Integration tests for PgUserRepository
//!
//! These run against a real PostgreSQL container and need Docker:
//! `cargo test -p domain_users -- --ignored`

use domain_users::*;
use test_utils::assertions::assert_ascending;
use test_utils::{TestDataBuilder, TestDatabase};

fn input(builder: &TestDataBuilder, suffix: &str) -> CreateUser {
    CreateUser {
        username: builder.username(suffix),
        email: builder.email(suffix),
        first_name: "Pg".to_string(),
        last_name: "User".to_string(),
        role: Role::User,
    }
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_postgres_lifecycle() {
    let db = TestDatabase::new().await;
    let service = UserService::new(PgUserRepository::new(db.connection()));
    let builder = TestDataBuilder::from_test_name("pg_lifecycle");

    let created = service.create_user(input(&builder, "main")).await.unwrap();
    assert!(created.active);

    let fetched = service.get_user(created.id).await.unwrap();
    assert_eq!(fetched.username, created.username);

    let updated = service
        .update_user(
            created.id,
            UpdateUser {
                last_name: Some("Renamed".to_string()),
                ..UpdateUser::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.last_name, "Renamed");
    assert!(updated.updated_at >= created.updated_at);

    let deactivated = service.soft_delete_user(created.id).await.unwrap();
    assert!(!deactivated.active);

    service.hard_delete_user(created.id).await.unwrap();
    assert!(matches!(
        service.get_user(created.id).await,
        Err(UserError::NotFound(_))
    ));

    let recreated = service.create_user(input(&builder, "main")).await.unwrap();
    assert!(recreated.id > created.id);
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_postgres_unique_constraint_surfaces_as_conflict() {
    let db = TestDatabase::new().await;
    let repo = PgUserRepository::new(db.connection());
    let builder = TestDataBuilder::from_test_name("pg_unique");

    let service = UserService::new(PgUserRepository::new(db.connection()));
    let first = service.create_user(input(&builder, "dup")).await.unwrap();

    // Bypass the service pre-check so the database constraint has to catch it
    let mut duplicate = input(&builder, "other");
    duplicate.username = first.username.clone();
    let err = repo
        .insert(models::NewUser::new(duplicate, chrono::Utc::now()))
        .await
        .unwrap_err();

    match err {
        UserError::Conflict { field, value } => {
            assert_eq!(field, UniqueField::Username);
            assert_eq!(value, first.username);
        }
        other => panic!("expected conflict, got {other:?}"),
    }
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_postgres_pagination_orders_by_id() {
    let db = TestDatabase::new().await;
    let service = UserService::new(PgUserRepository::new(db.connection()));
    let builder = TestDataBuilder::from_test_name("pg_pagination");

    for i in 0..12 {
        service
            .create_user(input(&builder, &format!("p{i}")))
            .await
            .unwrap();
    }
    service.soft_delete_user(1).await.unwrap();

    let page = service
        .list_users(ListParams::new(2, 5, true))
        .await
        .unwrap();
    assert_eq!(page.total, 11);
    assert_eq!(page.pages, 3);
    let ids: Vec<i64> = page.users.iter().map(|u| u.id).collect();
    assert_eq!(ids.len(), 5);
    assert_ascending(&ids, "page 2");

    let all = service
        .list_users(ListParams::new(1, 100, false))
        .await
        .unwrap();
    assert_eq!(all.total, 12);
}
