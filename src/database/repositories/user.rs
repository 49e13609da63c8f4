//! User repository implementation

use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::database::connection::map_constraint_error;
use crate::models::user::{CreateUserRequest, UpdateUserRequest, User, UserScope};
use crate::utils::errors::MenuError;

const USER_COLUMNS: &str = "id, username, name, email, image, is_staff, role, address, location, province, phone, password_hash, created_at, updated_at";

#[derive(Clone)]
#[derive(Debug)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a new user
    pub async fn create(&self, request: CreateUserRequest) -> Result<User, MenuError> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (username, name, email, password_hash, role, is_staff, image, address, location, province, phone)
            VALUES ($1, $2, $3, $4, $5, $6, COALESCE($7, 'avatar/default.jpg'), $8, $9, $10, $11)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(request.username)
        .bind(request.name)
        .bind(request.email)
        .bind(request.password_hash)
        .bind(request.role.as_str())
        .bind(request.is_staff)
        .bind(request.image)
        .bind(request.address)
        .bind(request.location)
        .bind(request.province)
        .bind(request.phone)
        .fetch_one(&self.pool)
        .await
        .map_err(|error| map_constraint_error(error, "A user with that username or email already exists."))?;

        Ok(user)
    }

    /// Find user by ID
    pub async fn find_by_id(&self, id: i64) -> Result<Option<User>, MenuError> {
        let user = sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    /// Find user by ID within a visibility scope
    pub async fn find_in_scope(&self, id: i64, scope: UserScope) -> Result<Option<User>, MenuError> {
        let mut query = QueryBuilder::<Postgres>::new(format!("SELECT {USER_COLUMNS} FROM users WHERE id = "));
        query.push_bind(id);
        push_scope(&mut query, scope);

        let user = query.build_query_as::<User>().fetch_optional(&self.pool).await?;
        Ok(user)
    }

    /// Find user by username
    pub async fn find_by_username(&self, username: &str) -> Result<Option<User>, MenuError> {
        let user = sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE username = $1"))
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    /// Whether a username or email is taken by an account other than `exclude_id`
    pub async fn identity_taken(
        &self,
        username: Option<&str>,
        email: Option<&str>,
        exclude_id: Option<i64>,
    ) -> Result<(bool, bool), MenuError> {
        let (username_taken, email_taken): (bool, bool) = sqlx::query_as(
            r#"
            SELECT
                EXISTS (SELECT 1 FROM users WHERE username = $1 AND id <> COALESCE($3, -1)),
                EXISTS (SELECT 1 FROM users WHERE LOWER(email) = LOWER($2) AND id <> COALESCE($3, -1))
            "#,
        )
        .bind(username)
        .bind(email)
        .bind(exclude_id)
        .fetch_one(&self.pool)
        .await?;

        Ok((username_taken, email_taken))
    }

    /// Update profile fields
    pub async fn update(&self, id: i64, request: UpdateUserRequest) -> Result<User, MenuError> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users
            SET username = COALESCE($2, username),
                name = COALESCE($3, name),
                email = COALESCE($4, email),
                image = COALESCE($5, image),
                address = COALESCE($6, address),
                location = COALESCE($7, location),
                province = COALESCE($8, province),
                phone = COALESCE($9, phone),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(request.username)
        .bind(request.name)
        .bind(request.email)
        .bind(request.image)
        .bind(request.address)
        .bind(request.location)
        .bind(request.province)
        .bind(request.phone)
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| map_constraint_error(error, "A user with that username or email already exists."))?;

        user.ok_or(MenuError::NotFound { resource: "User", id })
    }

    /// Replace the stored password hash
    pub async fn set_password(&self, id: i64, password_hash: &str) -> Result<(), MenuError> {
        let result = sqlx::query("UPDATE users SET password_hash = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(password_hash)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(MenuError::NotFound { resource: "User", id });
        }
        Ok(())
    }

    /// Delete user; `false` when no such user exists
    pub async fn delete(&self, id: i64) -> Result<bool, MenuError> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// List users visible in `scope`, oldest first
    pub async fn list(&self, scope: UserScope, limit: i64, offset: i64) -> Result<Vec<User>, MenuError> {
        let mut query = QueryBuilder::<Postgres>::new(format!("SELECT {USER_COLUMNS} FROM users WHERE TRUE"));
        push_scope(&mut query, scope);
        query.push(" ORDER BY id ASC LIMIT ");
        query.push_bind(limit);
        query.push(" OFFSET ");
        query.push_bind(offset);

        let users = query.build_query_as::<User>().fetch_all(&self.pool).await?;
        Ok(users)
    }

    /// Count users visible in `scope`
    pub async fn count(&self, scope: UserScope) -> Result<i64, MenuError> {
        let mut query = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM users WHERE TRUE");
        push_scope(&mut query, scope);

        let count: (i64,) = query.build_query_as().fetch_one(&self.pool).await?;
        Ok(count.0)
    }
}

fn push_scope(query: &mut QueryBuilder<'_, Postgres>, scope: UserScope) {
    match scope {
        UserScope::All => {}
        UserScope::Role(role) => {
            query.push(" AND role = ");
            query.push_bind(role.as_str());
        }
        UserScope::RoleOrSelf(role, id) => {
            query.push(" AND (role = ");
            query.push_bind(role.as_str());
            query.push(" OR id = ");
            query.push_bind(id);
            query.push(")");
        }
    }
}
