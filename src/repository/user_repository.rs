use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use sqlx::{FromRow, SqlitePool};

use crate::{
    domain::{Role, User},
    error::{AppError, Result},
    repository::UserRepository,
};

#[derive(FromRow)]
struct UserRow {
    id: i64,
    username: String,
    first_name: String,
    last_name: String,
    email: String,
    is_active: i32,
    is_staff: i32,
}

pub struct SqliteUserRepository {
    pool: SqlitePool,
}

impl SqliteUserRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_user(row: UserRow, roles: Vec<Role>) -> User {
        User {
            id: row.id,
            username: row.username,
            first_name: row.first_name,
            last_name: row.last_name,
            email: row.email,
            is_active: row.is_active != 0,
            is_staff: row.is_staff != 0,
            roles,
        }
    }

    fn parse_role(s: &str) -> Result<Role> {
        Role::from_str(s).ok_or_else(|| AppError::Database(format!("Invalid role: {}", s)))
    }

    async fn roles_for(&self, user_id: i64) -> Result<Vec<Role>> {
        let rows: Vec<(String,)> =
            sqlx::query_as("SELECT role FROM user_roles WHERE user_id = ? ORDER BY role")
                .bind(user_id)
                .fetch_all(&self.pool)
                .await
                .map_err(|e| AppError::Database(e.to_string()))?;

        rows.iter().map(|(role,)| Self::parse_role(role)).collect()
    }
}

#[async_trait]
impl UserRepository for SqliteUserRepository {
    async fn find_by_username(&self, username: &str) -> Result<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, username, first_name, last_name, email, is_active, is_staff
            FROM users
            WHERE username = ?
            "#,
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        match row {
            Some(r) => {
                let roles = self.roles_for(r.id).await?;
                Ok(Some(Self::row_to_user(r, roles)))
            }
            None => Ok(None),
        }
    }

    async fn list_active(&self) -> Result<Vec<User>> {
        let rows = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, username, first_name, last_name, email, is_active, is_staff
            FROM users
            WHERE is_active = 1
            ORDER BY id
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        let role_rows: Vec<(i64, String)> =
            sqlx::query_as("SELECT user_id, role FROM user_roles ORDER BY user_id, role")
                .fetch_all(&self.pool)
                .await
                .map_err(|e| AppError::Database(e.to_string()))?;

        let mut roles_by_user: HashMap<i64, Vec<Role>> = HashMap::new();
        for (user_id, role) in &role_rows {
            roles_by_user
                .entry(*user_id)
                .or_default()
                .push(Self::parse_role(role)?);
        }

        Ok(rows
            .into_iter()
            .map(|row| {
                let roles = roles_by_user.remove(&row.id).unwrap_or_default();
                Self::row_to_user(row, roles)
            })
            .collect())
    }

    async fn programme_ids_for(&self, user_id: i64) -> Result<HashSet<i64>> {
        let rows: Vec<(i64,)> =
            sqlx::query_as("SELECT programme_id FROM user_programmes WHERE user_id = ?")
                .bind(user_id)
                .fetch_all(&self.pool)
                .await
                .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(rows.into_iter().map(|(id,)| id).collect())
    }

    async fn programme_member_ids(&self, programme_id: i64) -> Result<HashSet<i64>> {
        let rows: Vec<(i64,)> =
            sqlx::query_as("SELECT user_id FROM user_programmes WHERE programme_id = ?")
                .bind(programme_id)
                .fetch_all(&self.pool)
                .await
                .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(rows.into_iter().map(|(id,)| id).collect())
    }
}
