use async_trait::async_trait;
use sea_orm::ActiveValue::Set;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, SqlErr,
};

use crate::{
    entity,
    error::{UserError, UserResult},
    models::{NewUser, UniqueField, User, UserChanges, UserQuery},
    repository::UserRepository,
};

/// PostgreSQL-backed [`UserRepository`]. The `UNIQUE` constraints on
/// `username` and `email` are the final word on uniqueness.
pub struct PgUserRepository {
    db: DatabaseConnection,
}

impl PgUserRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

/// Which unique column a constraint violation message refers to.
fn conflict_field(message: &str) -> UniqueField {
    if message.contains("username") {
        UniqueField::Username
    } else {
        UniqueField::Email
    }
}

/// Map a write failure, turning unique violations into `Conflict` with the value we tried to store.
fn write_error(err: DbErr, attempted: &[(UniqueField, &str)]) -> UserError {
    if let Some(SqlErr::UniqueConstraintViolation(message)) = err.sql_err() {
        let field = conflict_field(&message);
        let value = attempted
            .iter()
            .find(|(f, _)| *f == field)
            .map(|(_, v)| v.to_string())
            .unwrap_or_default();
        return UserError::conflict(field, value);
    }
    store_error(err)
}

fn store_error(err: DbErr) -> UserError {
    UserError::Store(format!("Database error: {}", err))
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn insert(&self, user: NewUser) -> UserResult<User> {
        let username = user.username.clone();
        let email = user.email.clone();
        let active_model: entity::ActiveModel = user.into();

        let model = active_model.insert(&self.db).await.map_err(|e| {
            write_error(
                e,
                &[
                    (UniqueField::Username, username.as_str()),
                    (UniqueField::Email, email.as_str()),
                ],
            )
        })?;

        tracing::info!(user_id = model.id, "Created user");
        Ok(model.into())
    }

    async fn find_by_id(&self, id: i64) -> UserResult<Option<User>> {
        let model = entity::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(store_error)?;

        Ok(model.map(Into::into))
    }

    async fn find_by_unique_field(
        &self,
        field: UniqueField,
        value: &str,
        exclude_id: Option<i64>,
    ) -> UserResult<Option<User>> {
        let column = match field {
            UniqueField::Username => entity::Column::Username,
            UniqueField::Email => entity::Column::Email,
        };

        let mut query = entity::Entity::find().filter(column.eq(value));
        if let Some(id) = exclude_id {
            query = query.filter(entity::Column::Id.ne(id));
        }

        let model = query.one(&self.db).await.map_err(store_error)?;
        Ok(model.map(Into::into))
    }

    async fn find_page(&self, query: UserQuery) -> UserResult<(Vec<User>, u64)> {
        let mut select = entity::Entity::find();
        if query.active_only {
            select = select.filter(entity::Column::Active.eq(true));
        }

        let total = select.clone().count(&self.db).await.map_err(store_error)?;

        let models = select
            .order_by_asc(entity::Column::Id)
            .offset(query.offset)
            .limit(query.limit)
            .all(&self.db)
            .await
            .map_err(store_error)?;

        Ok((models.into_iter().map(Into::into).collect(), total))
    }

    async fn update(&self, id: i64, changes: UserChanges) -> UserResult<User> {
        let model = entity::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(store_error)?
            .ok_or(UserError::NotFound(id))?;

        let attempted: Vec<(UniqueField, String)> = changes
            .fields
            .unique_values()
            .map(|(field, value)| (field, value.to_string()))
            .collect();

        let UserChanges { fields, updated_at } = changes;
        let mut active_model: entity::ActiveModel = model.into();

        if let Some(username) = fields.username {
            active_model.username = Set(username);
        }
        if let Some(email) = fields.email {
            active_model.email = Set(email);
        }
        if let Some(first_name) = fields.first_name {
            active_model.first_name = Set(first_name);
        }
        if let Some(last_name) = fields.last_name {
            active_model.last_name = Set(last_name);
        }
        if let Some(role) = fields.role {
            active_model.role = Set(role);
        }
        if let Some(active) = fields.active {
            active_model.active = Set(active);
        }
        active_model.updated_at = Set(updated_at.into());

        // The row can vanish between the read above and this write
        let updated = active_model.update(&self.db).await.map_err(|e| match e {
            DbErr::RecordNotUpdated => UserError::NotFound(id),
            e => {
                let attempted: Vec<(UniqueField, &str)> =
                    attempted.iter().map(|(f, v)| (*f, v.as_str())).collect();
                write_error(e, &attempted)
            }
        })?;

        tracing::info!(user_id = id, "Updated user");
        Ok(updated.into())
    }

    async fn delete(&self, id: i64) -> UserResult<bool> {
        let result = entity::Entity::delete_by_id(id)
            .exec(&self.db)
            .await
            .map_err(store_error)?;

        if result.rows_affected > 0 {
            tracing::info!(user_id = id, "Deleted user");
            Ok(true)
        } else {
            Ok(false)
        }
    }
}
