//! Admin approval of volunteer registrations.

use crate::{db::Database, error::AppError, gate::Gate};

#[derive(Clone)]
pub struct ApprovalWorkflow {
    db: Database,
    gate: Gate,
}

impl ApprovalWorkflow {
    pub fn new(db: Database, gate: Gate) -> Self {
        Self { db, gate }
    }

    /// Mark `target_id` approved. Approving an approved volunteer is a no-op.
    pub async fn approve(&self, requester_id: &str, target_id: &str) -> Result<(), AppError> {
        self.gate.admin(requester_id).await?;

        if !self.db.approve_volunteer(target_id).await? {
            return Err(AppError::NotFound("Volunteer not found".to_string()));
        }
        tracing::info!("Admin {} approved volunteer {}", requester_id, target_id);
        Ok(())
    }

    /// Delete `target_id` and its credentials. Admins cannot reject themselves.
    pub async fn reject(&self, requester_id: &str, target_id: &str) -> Result<(), AppError> {
        if requester_id == target_id {
            return Err(AppError::Forbidden("Cannot reject yourself".to_string()));
        }
        self.gate.admin(requester_id).await?;

        if !self.db.delete_volunteer(target_id).await? {
            return Err(AppError::NotFound("Volunteer not found".to_string()));
        }
        tracing::info!("Admin {} rejected volunteer {}", requester_id, target_id);
        Ok(())
    }
}
