use crate::models::{NewUser, Role, User};
use sea_orm::ActiveValue::{NotSet, Set};
use sea_orm::entity::prelude::*;

/// Sea-ORM Entity for the users table
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    #[sea_orm(unique)]
    pub username: String,
    #[sea_orm(unique)]
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role: Role,
    pub active: bool,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub const TAG: &'static str = "users";
}

impl From<Model> for User {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            username: model.username,
            email: model.email,
            first_name: model.first_name,
            last_name: model.last_name,
            role: model.role,
            active: model.active,
            created_at: model.created_at.into(),
            updated_at: model.updated_at.into(),
        }
    }
}

// The id column is left unset so the sequence assigns it
impl From<NewUser> for ActiveModel {
    fn from(user: NewUser) -> Self {
        ActiveModel {
            id: NotSet,
            username: Set(user.username),
            email: Set(user.email),
            first_name: Set(user.first_name),
            last_name: Set(user.last_name),
            role: Set(user.role),
            active: Set(user.active),
            created_at: Set(user.created_at.into()),
            updated_at: Set(user.updated_at.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_model_round_trips_into_user() {
        let now = Utc::now();
        let model = Model {
            id: 7,
            username: "johndoe".to_string(),
            email: "john@example.com".to_string(),
            first_name: "John".to_string(),
            last_name: "Doe".to_string(),
            role: Role::Admin,
            active: false,
            created_at: now.into(),
            updated_at: now.into(),
        };

        let user = User::from(model);
        assert_eq!(user.id, 7);
        assert_eq!(user.role, Role::Admin);
        assert!(!user.active);
        assert_eq!(user.created_at, now);
    }

    #[test]
    fn test_new_user_leaves_id_unset() {
        let now = Utc::now();
        let new_user = NewUser {
            username: "johndoe".to_string(),
            email: "john@example.com".to_string(),
            first_name: "John".to_string(),
            last_name: "Doe".to_string(),
            role: Role::User,
            active: true,
            created_at: now,
            updated_at: now,
        };

        let active: ActiveModel = new_user.into();
        assert_eq!(active.id, NotSet);
        assert_eq!(active.username, Set("johndoe".to_string()));
        assert_eq!(active.active, Set(true));
    }
}
