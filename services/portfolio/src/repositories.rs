//! Repositories for database operations

use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString};
use common::error::DatabaseError;
use sqlx::{PgPool, Row};
use tracing::info;
use uuid::Uuid;

use crate::error::ApiError;
use crate::models::Admin;
use crate::validation;

pub mod image;

pub use image::ImageRepository;

/// Credential store for admin identities
#[derive(Clone)]
pub struct AdminRepository {
    pool: PgPool,
}

impl AdminRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Hash a plaintext password with a fresh random salt
    pub fn hash_password(password: &str) -> Result<String, ApiError> {
        let salt = SaltString::generate(&mut rand::thread_rng());
        let argon2 = Argon2::default();

        let hash = argon2
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| ApiError::internal(anyhow::anyhow!("failed to hash password: {}", e)))?
            .to_string();

        Ok(hash)
    }

    /// Constant-time comparison of a plaintext against a stored hash
    pub fn verify_hash(password: &str, password_hash: &str) -> bool {
        let Ok(parsed) = PasswordHash::new(password_hash) else {
            return false;
        };

        Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok()
    }

    /// Create a new admin identity
    ///
    /// The plaintext is hashed before any write; duplicate usernames fail
    /// with a conflict.
    pub async fn provision(&self, username: &str, password: &str) -> Result<Admin, ApiError> {
        let username = username.trim();

        validation::validate_username(username).map_err(ApiError::Validation)?;
        validation::validate_password(password).map_err(ApiError::Validation)?;

        if self.find_by_username(username).await?.is_some() {
            return Err(ApiError::Conflict(format!(
                "admin '{}' already exists",
                username
            )));
        }

        let password_hash = Self::hash_password(password)?;

        let row = sqlx::query(
            r#"
            INSERT INTO admins (username, password_hash)
            VALUES ($1, $2)
            RETURNING id, username, password_hash, created_at, updated_at
            "#,
        )
        .bind(username)
        .bind(&password_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(DatabaseError::Query)?;

        info!("provisioned admin '{}'", username);

        Ok(map_admin(&row))
    }

    /// Check a username/password pair
    ///
    /// Unknown usernames and wrong passwords fail identically so callers
    /// cannot probe which usernames exist.
    pub async fn verify(&self, username: &str, password: &str) -> Result<Admin, ApiError> {
        let admin = self
            .find_by_username(username.trim())
            .await?
            .ok_or(ApiError::Unauthorized)?;

        if !Self::verify_hash(password, &admin.password_hash) {
            return Err(ApiError::Unauthorized);
        }

        Ok(admin)
    }

    /// Replace an admin's password, re-hashing on write
    pub async fn update_password(&self, id: Uuid, password: &str) -> Result<(), ApiError> {
        validation::validate_password(password).map_err(ApiError::Validation)?;

        let password_hash = Self::hash_password(password)?;

        let result = sqlx::query(
            r#"
            UPDATE admins
            SET password_hash = $2, updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(&password_hash)
        .execute(&self.pool)
        .await
        .map_err(DatabaseError::Query)?;

        if result.rows_affected() == 0 {
            return Err(ApiError::NotFound("Admin"));
        }

        Ok(())
    }

    pub async fn find_by_username(&self, username: &str) -> Result<Option<Admin>, ApiError> {
        let row = sqlx::query(
            r#"
            SELECT id, username, password_hash, created_at, updated_at
            FROM admins
            WHERE username = $1
            "#,
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await
        .map_err(DatabaseError::Query)?;

        Ok(row.as_ref().map(map_admin))
    }
}

fn map_admin(row: &sqlx::postgres::PgRow) -> Admin {
    Admin {
        id: row.get("id"),
        username: row.get("username"),
        password_hash: row.get("password_hash"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_then_verify_round_trip() {
        let hash = AdminRepository::hash_password("shutter-speed-1/250").unwrap();

        assert_ne!(hash, "shutter-speed-1/250");
        assert!(hash.starts_with("$argon2"));
        assert!(AdminRepository::verify_hash("shutter-speed-1/250", &hash));
    }

    #[test]
    fn wrong_password_fails_verification() {
        let hash = AdminRepository::hash_password("shutter-speed-1/250").unwrap();

        assert!(!AdminRepository::verify_hash("shutter-speed-1/251", &hash));
        assert!(!AdminRepository::verify_hash("", &hash));
    }

    #[test]
    fn salts_differ_between_hashes() {
        let first = AdminRepository::hash_password("same password").unwrap();
        let second = AdminRepository::hash_password("same password").unwrap();

        assert_ne!(first, second);
    }

    #[test]
    fn garbage_hash_never_verifies() {
        assert!(!AdminRepository::verify_hash("anything", "not-a-phc-string"));
    }
}
