//! Racing writers against the in-memory store.

use domain_users::*;
use futures::future::join_all;
use test_utils::TestDataBuilder;

fn input(username: &str, email: &str) -> CreateUser {
    CreateUser {
        username: username.to_string(),
        email: email.to_string(),
        first_name: "Race".to_string(),
        last_name: "Condition".to_string(),
        role: Role::User,
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_creates_with_same_username_yield_one_winner() {
    let service = UserService::new(InMemoryUserRepository::new());
    let builder = TestDataBuilder::from_test_name("concurrent_same_username");
    let username = builder.username("shared");

    let tasks = (0..16).map(|i| {
        let service = service.clone();
        let username = username.clone();
        let email = builder.email(&format!("racer{i}"));
        tokio::spawn(async move { service.create_user(input(&username, &email)).await })
    });

    let results: Vec<_> = join_all(tasks)
        .await
        .into_iter()
        .map(|joined| joined.expect("task panicked"))
        .collect();

    let winners = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(winners, 1);
    assert!(
        results
            .iter()
            .filter_map(|r| r.as_ref().err())
            .all(|e| matches!(e, UserError::Conflict { field: UniqueField::Username, .. }))
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_distinct_creates_get_distinct_ids() {
    let service = UserService::new(InMemoryUserRepository::new());
    let builder = TestDataBuilder::from_test_name("concurrent_distinct");

    let tasks = (0..20).map(|i| {
        let service = service.clone();
        let username = builder.username(&format!("u{i}"));
        let email = builder.email(&format!("u{i}"));
        tokio::spawn(async move { service.create_user(input(&username, &email)).await })
    });

    let mut ids: Vec<i64> = join_all(tasks)
        .await
        .into_iter()
        .map(|joined| joined.expect("task panicked").expect("create failed").id)
        .collect();
    ids.sort_unstable();
    ids.dedup();

    assert_eq!(ids.len(), 20);

    let page = service
        .list_users(ListParams::new(1, MAX_PAGE_SIZE, true))
        .await
        .unwrap();
    assert_eq!(page.total, 20);
}
