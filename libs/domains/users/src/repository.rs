use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::error::{UserError, UserResult};
use crate::models::{NewUser, UniqueField, User, UserChanges, UserQuery};

/// Record store contract for users.
///
/// Implementations enforce username/email uniqueness themselves and report a
/// violation as [`UserError::Conflict`]; the service pre-check is only a fast path.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Insert a row and return it with its assigned id
    async fn insert(&self, user: NewUser) -> UserResult<User>;

    async fn find_by_id(&self, id: i64) -> UserResult<Option<User>>;

    /// Find the user holding `value` in `field`, ignoring `exclude_id`
    async fn find_by_unique_field(
        &self,
        field: UniqueField,
        value: &str,
        exclude_id: Option<i64>,
    ) -> UserResult<Option<User>>;

    /// One slice ordered by id ascending, plus the unsliced match count
    async fn find_page(&self, query: UserQuery) -> UserResult<(Vec<User>, u64)>;

    /// Apply changes to an existing row. `NotFound` when the id is absent.
    async fn update(&self, id: i64, changes: UserChanges) -> UserResult<User>;

    /// Remove a row. `false` when nothing was deleted.
    async fn delete(&self, id: i64) -> UserResult<bool>;
}

#[derive(Debug)]
struct Store {
    users: BTreeMap<i64, User>,
    next_id: i64,
}

impl Store {
    fn holder_of(&self, field: UniqueField, value: &str, exclude_id: Option<i64>) -> Option<&User> {
        self.users
            .values()
            .find(|u| Some(u.id) != exclude_id && u.unique_value(field) == value)
    }
}

impl Default for Store {
    fn default() -> Self {
        Self {
            users: BTreeMap::new(),
            next_id: 1,
        }
    }
}

/// In-memory implementation of UserRepository (for development/testing).
///
/// Ids come from a counter that only moves forward, so a hard-deleted id is
/// never handed out again.
#[derive(Debug, Default, Clone)]
pub struct InMemoryUserRepository {
    store: Arc<RwLock<Store>>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn insert(&self, user: NewUser) -> UserResult<User> {
        let mut store = self.store.write().await;

        for field in [UniqueField::Username, UniqueField::Email] {
            let value = user.unique_value(field);
            if store.holder_of(field, value, None).is_some() {
                return Err(UserError::conflict(field, value));
            }
        }

        let id = store.next_id;
        store.next_id += 1;

        let user = user.into_user(id);
        store.users.insert(id, user.clone());

        tracing::info!(user_id = id, "Created user");
        Ok(user)
    }

    async fn find_by_id(&self, id: i64) -> UserResult<Option<User>> {
        let store = self.store.read().await;
        Ok(store.users.get(&id).cloned())
    }

    async fn find_by_unique_field(
        &self,
        field: UniqueField,
        value: &str,
        exclude_id: Option<i64>,
    ) -> UserResult<Option<User>> {
        let store = self.store.read().await;
        Ok(store.holder_of(field, value, exclude_id).cloned())
    }

    async fn find_page(&self, query: UserQuery) -> UserResult<(Vec<User>, u64)> {
        let store = self.store.read().await;

        let matching: Vec<&User> = store
            .users
            .values()
            .filter(|u| !query.active_only || u.active)
            .collect();
        let total = matching.len() as u64;

        let offset = usize::try_from(query.offset).unwrap_or(usize::MAX);
        let limit = usize::try_from(query.limit).unwrap_or(usize::MAX);

        let users = matching
            .into_iter()
            .skip(offset)
            .take(limit)
            .cloned()
            .collect();

        Ok((users, total))
    }

    async fn update(&self, id: i64, changes: UserChanges) -> UserResult<User> {
        let mut store = self.store.write().await;

        if !store.users.contains_key(&id) {
            return Err(UserError::NotFound(id));
        }

        for (field, value) in changes.fields.unique_values() {
            if store.holder_of(field, value, Some(id)).is_some() {
                return Err(UserError::conflict(field, value));
            }
        }

        let user = store.users.get_mut(&id).ok_or(UserError::NotFound(id))?;
        user.apply_changes(changes);

        tracing::info!(user_id = id, "Updated user");
        Ok(user.clone())
    }

    async fn delete(&self, id: i64) -> UserResult<bool> {
        let mut store = self.store.write().await;
        let removed = store.users.remove(&id).is_some();

        if removed {
            tracing::info!(user_id = id, "Deleted user");
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Role, UpdateUser};
    use chrono::Utc;

    fn new_user(username: &str, email: &str) -> NewUser {
        let now = Utc::now();
        NewUser {
            username: username.to_string(),
            email: email.to_string(),
            first_name: "Test".to_string(),
            last_name: "User".to_string(),
            role: Role::User,
            active: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_insert_assigns_increasing_ids() {
        let repo = InMemoryUserRepository::new();

        let first = repo.insert(new_user("alice", "alice@example.com")).await.unwrap();
        let second = repo.insert(new_user("bob", "bob@example.com")).await.unwrap();

        assert_eq!(first.id, 1);
        assert_eq!(second.id, 2);
        assert_eq!(repo.find_by_id(1).await.unwrap(), Some(first));
    }

    #[tokio::test]
    async fn test_insert_enforces_unique_username_and_email() {
        let repo = InMemoryUserRepository::new();
        repo.insert(new_user("alice", "alice@example.com")).await.unwrap();

        let err = repo
            .insert(new_user("alice", "other@example.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, UserError::Conflict { field: UniqueField::Username, .. }));

        let err = repo
            .insert(new_user("other", "alice@example.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, UserError::Conflict { field: UniqueField::Email, .. }));
    }

    #[tokio::test]
    async fn test_ids_are_not_reused_after_delete() {
        let repo = InMemoryUserRepository::new();
        let user = repo.insert(new_user("alice", "alice@example.com")).await.unwrap();

        assert!(repo.delete(user.id).await.unwrap());
        assert!(!repo.delete(user.id).await.unwrap());

        let again = repo.insert(new_user("alice", "alice@example.com")).await.unwrap();
        assert!(again.id > user.id);
    }

    #[tokio::test]
    async fn test_find_by_unique_field_respects_exclusion() {
        let repo = InMemoryUserRepository::new();
        let user = repo.insert(new_user("alice", "alice@example.com")).await.unwrap();

        let found = repo
            .find_by_unique_field(UniqueField::Email, "alice@example.com", None)
            .await
            .unwrap();
        assert_eq!(found.map(|u| u.id), Some(user.id));

        let excluded = repo
            .find_by_unique_field(UniqueField::Email, "alice@example.com", Some(user.id))
            .await
            .unwrap();
        assert!(excluded.is_none());
    }

    #[tokio::test]
    async fn test_find_page_filters_orders_and_counts() {
        let repo = InMemoryUserRepository::new();
        for i in 1..=5 {
            repo.insert(new_user(&format!("user{i}"), &format!("user{i}@example.com")))
                .await
                .unwrap();
        }
        repo.update(2, UserChanges::deactivate(Utc::now())).await.unwrap();

        let (users, total) = repo
            .find_page(UserQuery {
                active_only: true,
                offset: 1,
                limit: 2,
            })
            .await
            .unwrap();
        assert_eq!(total, 4);
        assert_eq!(users.iter().map(|u| u.id).collect::<Vec<_>>(), vec![3, 4]);

        let (users, total) = repo
            .find_page(UserQuery {
                active_only: false,
                offset: 10,
                limit: 10,
            })
            .await
            .unwrap();
        assert_eq!(total, 5);
        assert!(users.is_empty());
    }

    #[tokio::test]
    async fn test_update_missing_and_conflicting() {
        let repo = InMemoryUserRepository::new();
        repo.insert(new_user("alice", "alice@example.com")).await.unwrap();
        let bob = repo.insert(new_user("bob", "bob@example.com")).await.unwrap();

        let err = repo
            .update(99, UserChanges::deactivate(Utc::now()))
            .await
            .unwrap_err();
        assert!(matches!(err, UserError::NotFound(99)));

        let steal = UserChanges::new(
            UpdateUser {
                username: Some("alice".to_string()),
                ..UpdateUser::default()
            },
            Utc::now(),
        );
        let err = repo.update(bob.id, steal).await.unwrap_err();
        assert!(matches!(err, UserError::Conflict { field: UniqueField::Username, .. }));

        let keep_own = UserChanges::new(
            UpdateUser {
                username: Some("bob".to_string()),
                ..UpdateUser::default()
            },
            Utc::now(),
        );
        assert!(repo.update(bob.id, keep_own).await.is_ok());
    }
}
