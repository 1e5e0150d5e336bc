use chrono::Utc;
use std::sync::Arc;
use validator::Validate;

use crate::error::{UserError, UserResult};
use crate::models::{
    CreateUser, ListParams, NewUser, UniqueField, UpdateUser, User, UserChanges, UserPage,
};
use crate::repository::UserRepository;

/// Service layer for user lifecycle rules
pub struct UserService<R: UserRepository> {
    repository: Arc<R>,
}

impl<R: UserRepository> Clone for UserService<R> {
    fn clone(&self) -> Self {
        Self {
            repository: Arc::clone(&self.repository),
        }
    }
}

impl<R: UserRepository> UserService<R> {
    pub fn new(repository: R) -> Self {
        Self {
            repository: Arc::new(repository),
        }
    }

    /// Field checks for a new user, then username and email availability.
    pub async fn validate_new(&self, candidate: &CreateUser) -> UserResult<()> {
        candidate.validate()?;

        self.ensure_available(UniqueField::Username, &candidate.username, None)
            .await?;
        self.ensure_available(UniqueField::Email, &candidate.email, None)
            .await
    }

    /// Field checks on the supplied fields only. A user keeping its own
    /// username or email is not a conflict.
    pub async fn validate_update(&self, existing_id: i64, changes: &UpdateUser) -> UserResult<()> {
        changes.validate()?;

        for (field, value) in changes.unique_values() {
            self.ensure_available(field, value, Some(existing_id))
                .await?;
        }
        Ok(())
    }

    async fn ensure_available(
        &self,
        field: UniqueField,
        value: &str,
        exclude_id: Option<i64>,
    ) -> UserResult<()> {
        match self
            .repository
            .find_by_unique_field(field, value, exclude_id)
            .await?
        {
            Some(_) => Err(UserError::conflict(field, value)),
            None => Ok(()),
        }
    }

    /// Create a new active user
    pub async fn create_user(&self, input: CreateUser) -> UserResult<User> {
        self.validate_new(&input).await?;

        let user = self.repository.insert(NewUser::new(input, Utc::now())).await?;
        tracing::debug!(user_id = user.id, username = %user.username, "User registered");
        Ok(user)
    }

    /// Get a user by ID, soft-deleted users included
    pub async fn get_user(&self, id: i64) -> UserResult<User> {
        self.repository
            .find_by_id(id)
            .await?
            .ok_or(UserError::NotFound(id))
    }

    pub async fn find_user_by_username(&self, username: &str) -> UserResult<User> {
        self.find_by(UniqueField::Username, username).await
    }

    pub async fn find_user_by_email(&self, email: &str) -> UserResult<User> {
        self.find_by(UniqueField::Email, email).await
    }

    async fn find_by(&self, field: UniqueField, value: &str) -> UserResult<User> {
        self.repository
            .find_by_unique_field(field, value, None)
            .await?
            .ok_or_else(|| UserError::NotFoundBy {
                field,
                value: value.to_string(),
            })
    }

    /// Update the supplied fields of a user
    pub async fn update_user(&self, id: i64, input: UpdateUser) -> UserResult<User> {
        self.get_user(id).await?;
        self.validate_update(id, &input).await?;

        self.repository
            .update(id, UserChanges::new(input, Utc::now()))
            .await
    }

    /// Mark a user inactive. Repeating it is a no-op.
    pub async fn soft_delete_user(&self, id: i64) -> UserResult<User> {
        let user = self.get_user(id).await?;
        if !user.active {
            return Ok(user);
        }

        let user = self
            .repository
            .update(id, UserChanges::deactivate(Utc::now()))
            .await?;
        tracing::info!(user_id = id, "Soft-deleted user");
        Ok(user)
    }

    /// Remove a user for good, freeing its username and email
    pub async fn hard_delete_user(&self, id: i64) -> UserResult<()> {
        if self.repository.delete(id).await? {
            tracing::info!(user_id = id, "Hard-deleted user");
            Ok(())
        } else {
            Err(UserError::NotFound(id))
        }
    }

    /// One page of users ordered by id
    pub async fn list_users(&self, params: ListParams) -> UserResult<UserPage> {
        params.validate()?;

        let (users, total) = self.repository.find_page(params.to_query()).await?;
        Ok(UserPage::new(users, total, &params))
    }
}
