//! Volunteer identity records and their login credentials.

use shared::Volunteer;
use uuid::Uuid;

use super::{now_timestamp, Database, StoreError, StoreResult};

const VOLUNTEER_COLUMNS: &str = "id, email, name, approved, is_admin, last_seen, created_at";

impl Database {
    /// Insert a pending volunteer together with its password hash.
    pub async fn create_volunteer(
        &self,
        email: &str,
        name: &str,
        password_hash: &str,
    ) -> StoreResult<Volunteer> {
        let now = now_timestamp();
        let volunteer = Volunteer {
            id: Uuid::new_v4().to_string(),
            email: email.to_string(),
            name: name.to_string(),
            approved: false,
            is_admin: false,
            last_seen: Some(now.clone()),
            created_at: now,
        };

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO volunteers (id, email, name, approved, is_admin, last_seen, created_at) VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&volunteer.id)
        .bind(&volunteer.email)
        .bind(&volunteer.name)
        .bind(volunteer.approved)
        .bind(volunteer.is_admin)
        .bind(&volunteer.last_seen)
        .bind(&volunteer.created_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e {
                if db_err.is_unique_violation() {
                    return StoreError::AlreadyExists {
                        entity: "Volunteer",
                        id: email.to_string(),
                    };
                }
            }
            StoreError::Sqlx(e)
        })?;

        sqlx::query("INSERT INTO credentials (volunteer_id, password_hash) VALUES (?, ?)")
            .bind(&volunteer.id)
            .bind(password_hash)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(volunteer)
    }

    pub async fn get_volunteer(&self, id: &str) -> StoreResult<Option<Volunteer>> {
        let volunteer = sqlx::query_as::<_, Volunteer>(&format!(
            "SELECT {VOLUNTEER_COLUMNS} FROM volunteers WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(volunteer)
    }

    pub async fn get_volunteer_by_email(&self, email: &str) -> StoreResult<Option<Volunteer>> {
        let volunteer = sqlx::query_as::<_, Volunteer>(&format!(
            "SELECT {VOLUNTEER_COLUMNS} FROM volunteers WHERE email = ?"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(volunteer)
    }

    pub async fn get_password_hash(&self, volunteer_id: &str) -> StoreResult<Option<String>> {
        let hash = sqlx::query_scalar::<_, String>(
            "SELECT password_hash FROM credentials WHERE volunteer_id = ?",
        )
        .bind(volunteer_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(hash)
    }

    /// Set `approved = true`. Returns false if no such volunteer exists.
    pub async fn approve_volunteer(&self, id: &str) -> StoreResult<bool> {
        let result = sqlx::query("UPDATE volunteers SET approved = 1 WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Mark a volunteer as an approved admin by email.
    pub async fn promote_admin(&self, email: &str) -> StoreResult<Volunteer> {
        let result = sqlx::query("UPDATE volunteers SET approved = 1, is_admin = 1 WHERE email = ?")
            .bind(email)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound {
                entity: "Volunteer",
                id: email.to_string(),
            });
        }
        self.get_volunteer_by_email(email)
            .await?
            .ok_or_else(|| StoreError::NotFound {
                entity: "Volunteer",
                id: email.to_string(),
            })
    }

    /// Hard delete. Credentials go with it, messages keep the dangling id.
    pub async fn delete_volunteer(&self, id: &str) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM volunteers WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn touch_last_seen(&self, id: &str) -> StoreResult<()> {
        sqlx::query("UPDATE volunteers SET last_seen = ? WHERE id = ?")
            .bind(now_timestamp())
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn list_approved_volunteers(&self) -> StoreResult<Vec<Volunteer>> {
        let volunteers = sqlx::query_as::<_, Volunteer>(&format!(
            "SELECT {VOLUNTEER_COLUMNS} FROM volunteers WHERE approved = 1 ORDER BY name ASC"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(volunteers)
    }

    pub async fn list_pending_volunteers(&self) -> StoreResult<Vec<Volunteer>> {
        let volunteers = sqlx::query_as::<_, Volunteer>(&format!(
            "SELECT {VOLUNTEER_COLUMNS} FROM volunteers WHERE approved = 0 ORDER BY created_at DESC"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(volunteers)
    }
}
