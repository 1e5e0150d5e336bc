use chrono::{DateTime, Utc};
use sea_orm::sea_query::StringLen;
use sea_orm::{DeriveActiveEnum, EnumIter};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

/// Default number of users per page
pub const DEFAULT_PAGE_SIZE: i64 = 10;

/// Largest page a caller may request
pub const MAX_PAGE_SIZE: i64 = 100;

/// Access role of a user
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    Default,
    DeriveActiveEnum,
    EnumIter,
    ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Role {
    #[sea_orm(string_value = "admin")]
    Admin,
    #[default]
    #[sea_orm(string_value = "user")]
    User,
    #[sea_orm(string_value = "guest")]
    Guest,
}

/// Columns that must be unique across every stored user, soft-deleted ones included
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "lowercase")]
pub enum UniqueField {
    Username,
    Email,
}

/// A stored user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct User {
    /// Store-assigned identifier, never reused
    #[schema(example = 1)]
    pub id: i64,
    #[schema(example = "johndoe")]
    pub username: String,
    #[schema(example = "john@example.com")]
    pub email: String,
    #[schema(example = "John")]
    pub first_name: String,
    #[schema(example = "Doe")]
    pub last_name: String,
    pub role: Role,
    /// `false` once soft-deleted
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn unique_value(&self, field: UniqueField) -> &str {
        match field {
            UniqueField::Username => &self.username,
            UniqueField::Email => &self.email,
        }
    }

    /// Overwrite the supplied fields and stamp `updated_at`.
    pub fn apply_changes(&mut self, changes: UserChanges) {
        let UserChanges { fields, updated_at } = changes;

        if let Some(username) = fields.username {
            self.username = username;
        }
        if let Some(email) = fields.email {
            self.email = email;
        }
        if let Some(first_name) = fields.first_name {
            self.first_name = first_name;
        }
        if let Some(last_name) = fields.last_name {
            self.last_name = last_name;
        }
        if let Some(role) = fields.role {
            self.role = role;
        }
        if let Some(active) = fields.active {
            self.active = active;
        }
        self.updated_at = updated_at;
    }
}

/// DTO for creating a user. New users always start active.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[schema(example = json!({
    "username": "johndoe",
    "email": "john@example.com",
    "first_name": "John",
    "last_name": "Doe",
    "role": "user"
}))]
pub struct CreateUser {
    #[validate(length(min = 1, max = 50))]
    pub username: String,
    #[validate(email, length(max = 255))]
    pub email: String,
    #[validate(length(min = 1, max = 100))]
    pub first_name: String,
    #[validate(length(min = 1, max = 100))]
    pub last_name: String,
    #[serde(default)]
    pub role: Role,
}

/// DTO for a partial update. `None` leaves the field untouched.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Validate, ToSchema)]
#[schema(example = json!({
    "first_name": "Jane",
    "last_name": "Smith",
    "email": "jane@example.com"
}))]
pub struct UpdateUser {
    #[validate(length(min = 1, max = 50))]
    pub username: Option<String>,
    #[validate(email, length(max = 255))]
    pub email: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub first_name: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub last_name: Option<String>,
    pub role: Option<Role>,
    /// `true` restores a soft-deleted user
    pub active: Option<bool>,
}

impl UpdateUser {
    /// The unique columns this update would change, with their new values.
    pub fn unique_values(&self) -> impl Iterator<Item = (UniqueField, &str)> {
        [
            (UniqueField::Username, self.username.as_deref()),
            (UniqueField::Email, self.email.as_deref()),
        ]
        .into_iter()
        .filter_map(|(field, value)| value.map(|v| (field, v)))
    }
}

/// Listing parameters
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Validate, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListParams {
    /// 1-based page number
    #[serde(default = "default_page")]
    #[validate(range(min = 1))]
    #[param(minimum = 1, default = 1)]
    pub page: i64,
    /// Users per page
    #[serde(default = "default_size")]
    #[validate(range(min = 1, max = 100))]
    #[param(minimum = 1, maximum = 100, default = 10)]
    pub size: i64,
    /// Exclude soft-deleted users
    #[serde(default = "default_active_only")]
    #[param(default = true)]
    pub active_only: bool,
}

fn default_page() -> i64 {
    1
}

fn default_size() -> i64 {
    DEFAULT_PAGE_SIZE
}

fn default_active_only() -> bool {
    true
}

impl Default for ListParams {
    fn default() -> Self {
        Self {
            page: default_page(),
            size: default_size(),
            active_only: default_active_only(),
        }
    }
}

impl ListParams {
    pub fn new(page: i64, size: i64, active_only: bool) -> Self {
        Self {
            page,
            size,
            active_only,
        }
    }

    /// Store query for these (already validated) parameters.
    ///
    /// The offset saturates at `i64::MAX`, past any real row, so an absurd
    /// page number reads as an empty page instead of wrapping.
    pub fn to_query(&self) -> UserQuery {
        let size = self.size.max(1) as u64;
        let skipped_pages = self.page.max(1) as u64 - 1;
        UserQuery {
            active_only: self.active_only,
            offset: skipped_pages.saturating_mul(size).min(i64::MAX as u64),
            limit: size,
        }
    }
}

/// Filtered slice request handed to the record store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UserQuery {
    pub active_only: bool,
    pub offset: u64,
    pub limit: u64,
}

/// One page of users plus the metadata to walk the rest
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct UserPage {
    pub users: Vec<User>,
    /// Matching users across all pages
    pub total: u64,
    pub page: i64,
    pub size: i64,
    /// `ceil(total / size)`, 0 when nothing matches
    pub pages: u64,
    pub has_next: bool,
    pub has_previous: bool,
}

impl UserPage {
    pub fn new(users: Vec<User>, total: u64, params: &ListParams) -> Self {
        let size = params.size.max(1) as u64;
        let pages = total.div_ceil(size);

        Self {
            users,
            total,
            page: params.page,
            size: params.size,
            pages,
            has_next: (params.page as u64) < pages,
            has_previous: params.page > 1,
        }
    }
}

/// Row handed to the store on insert
#[derive(Debug, Clone, PartialEq)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role: Role,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl NewUser {
    pub fn new(input: CreateUser, now: DateTime<Utc>) -> Self {
        Self {
            username: input.username,
            email: input.email,
            first_name: input.first_name,
            last_name: input.last_name,
            role: input.role,
            active: true,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn into_user(self, id: i64) -> User {
        User {
            id,
            username: self.username,
            email: self.email,
            first_name: self.first_name,
            last_name: self.last_name,
            role: self.role,
            active: self.active,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }

    pub fn unique_value(&self, field: UniqueField) -> &str {
        match field {
            UniqueField::Username => &self.username,
            UniqueField::Email => &self.email,
        }
    }
}

/// Field changes plus the timestamp the store must record
#[derive(Debug, Clone, PartialEq)]
pub struct UserChanges {
    pub fields: UpdateUser,
    pub updated_at: DateTime<Utc>,
}

impl UserChanges {
    pub fn new(fields: UpdateUser, updated_at: DateTime<Utc>) -> Self {
        Self { fields, updated_at }
    }

    pub fn deactivate(updated_at: DateTime<Utc>) -> Self {
        Self::new(
            UpdateUser {
                active: Some(false),
                ..UpdateUser::default()
            },
            updated_at,
        )
    }
}
