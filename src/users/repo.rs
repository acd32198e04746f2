use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use time::OffsetDateTime;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "user_role", rename_all = "PascalCase")]
pub enum Role {
    User,
    Admin,
}

impl Default for Role {
    fn default() -> Self {
        Role::User
    }
}

/// Identity record as stored. Not serializable: the wire shape is
/// `auth::dto::PublicUser`, which has no digest field.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: i64,
    pub email: String,
    /// `None` for admin-created accounts that never set a password.
    pub password_hash: Option<String>,
    pub username: String,
    pub phone: Option<String>,
    pub location: Option<String>,
    pub role: Role,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

#[derive(Debug)]
pub struct NewUser<'a> {
    pub email: &'a str,
    pub password_hash: Option<&'a str>,
    pub username: &'a str,
    pub phone: Option<&'a str>,
    pub location: Option<&'a str>,
    pub role: Role,
}

/// Partial update; `phone`/`location` distinguish "absent" from "set null"
/// via the double Option.
#[derive(Debug, Default, Deserialize)]
pub struct UserChanges {
    pub email: Option<String>,
    pub username: Option<String>,
    #[serde(default, deserialize_with = "deserialize_nullable")]
    pub phone: Option<Option<String>>,
    #[serde(default, deserialize_with = "deserialize_nullable")]
    pub location: Option<Option<String>>,
    pub role: Option<Role>,
}

fn deserialize_nullable<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Some)
}

impl UserChanges {
    pub fn is_empty(&self) -> bool {
        self.email.is_none()
            && self.username.is_none()
            && self.phone.is_none()
            && self.location.is_none()
            && self.role.is_none()
    }
}

const COLUMNS: &str =
    "id, email, password_hash, username, phone, location, role, created_at, updated_at";

impl User {
    pub async fn find_by_id(db: &PgPool, id: i64) -> sqlx::Result<Option<User>> {
        sqlx::query_as::<_, User>(&format!("SELECT {COLUMNS} FROM users WHERE id = $1"))
            .bind(id)
            .fetch_optional(db)
            .await
    }

    pub async fn find_by_email(db: &PgPool, email: &str) -> sqlx::Result<Option<User>> {
        sqlx::query_as::<_, User>(&format!("SELECT {COLUMNS} FROM users WHERE email = $1"))
            .bind(email)
            .fetch_optional(db)
            .await
    }

    pub async fn find_by_username(db: &PgPool, username: &str) -> sqlx::Result<Option<User>> {
        sqlx::query_as::<_, User>(&format!("SELECT {COLUMNS} FROM users WHERE username = $1"))
            .bind(username)
            .fetch_optional(db)
            .await
    }

    pub async fn email_or_username_taken(
        db: &PgPool,
        email: &str,
        username: &str,
    ) -> sqlx::Result<bool> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM users WHERE email = $1 OR username = $2)",
        )
        .bind(email)
        .bind(username)
        .fetch_one(db)
        .await
    }

    pub async fn username_taken(db: &PgPool, username: &str) -> sqlx::Result<bool> {
        sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM users WHERE username = $1)")
            .bind(username)
            .fetch_one(db)
            .await
    }

    pub async fn create(db: &PgPool, new: NewUser<'_>) -> sqlx::Result<User> {
        sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (email, password_hash, username, phone, location, role)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {COLUMNS}
            "#
        ))
        .bind(new.email)
        .bind(new.password_hash)
        .bind(new.username)
        .bind(new.phone)
        .bind(new.location)
        .bind(new.role)
        .fetch_one(db)
        .await
    }

    pub async fn update(db: &PgPool, id: i64, changes: &UserChanges) -> sqlx::Result<User> {
        let mut qb: QueryBuilder<Postgres> = QueryBuilder::new("UPDATE users SET updated_at = now()");
        if let Some(email) = &changes.email {
            qb.push(", email = ").push_bind(email);
        }
        if let Some(username) = &changes.username {
            qb.push(", username = ").push_bind(username);
        }
        if let Some(phone) = &changes.phone {
            qb.push(", phone = ").push_bind(phone.as_deref());
        }
        if let Some(location) = &changes.location {
            qb.push(", location = ").push_bind(location.as_deref());
        }
        if let Some(role) = changes.role {
            qb.push(", role = ").push_bind(role);
        }
        qb.push(" WHERE id = ").push_bind(id);
        qb.push(&format!(" RETURNING {COLUMNS}"));
        qb.build_query_as::<User>().fetch_one(db).await
    }

    pub async fn delete(db: &PgPool, id: i64) -> sqlx::Result<()> {
        sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(db)
            .await?;
        Ok(())
    }

    pub async fn list(
        db: &PgPool,
        role: Option<Role>,
        limit: i64,
        offset: i64,
    ) -> sqlx::Result<Vec<User>> {
        sqlx::query_as::<_, User>(&format!(
            r#"
            SELECT {COLUMNS} FROM users
            WHERE ($1::user_role IS NULL OR role = $1)
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#
        ))
        .bind(role)
        .bind(limit)
        .bind(offset)
        .fetch_all(db)
        .await
    }

    pub async fn count(db: &PgPool, role: Option<Role>) -> sqlx::Result<i64> {
        sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM users WHERE ($1::user_role IS NULL OR role = $1)",
        )
        .bind(role)
        .fetch_one(db)
        .await
    }
}
