//! Operations shared by the two kinds of account owner.
//!
//! Businesses and consumers live in separate tables but share the KYC
//! workflow, soft deletion, and the existence checks other entities run
//! before attaching rows to an owner.

use sqlx::PgExecutor;

use crate::{
    db::DbPool,
    error::AppError,
    models::{kyc::ReviewKycRequest, status::KycStatus},
    shared::{NoteId, OwnerId},
};

fn table(owner: &OwnerId) -> &'static str {
    match owner {
        OwnerId::Business(_) => "businesses",
        OwnerId::Consumer(_) => "consumers",
    }
}

fn entity(owner: &OwnerId) -> &'static str {
    match owner {
        OwnerId::Business(_) => "Business",
        OwnerId::Consumer(_) => "Consumer",
    }
}

/// Fail with `NotFound` unless the owner exists and is not deleted.
pub async fn ensure_exists(executor: impl PgExecutor<'_>, owner: &OwnerId) -> Result<(), AppError> {
    let sql = format!(
        "SELECT EXISTS (SELECT 1 FROM {} WHERE id = $1 AND deleted IS NULL)",
        table(owner)
    );

    let exists: bool = sqlx::query_scalar(&sql)
        .bind(owner.as_uuid())
        .fetch_one(executor)
        .await?;

    if exists {
        Ok(())
    } else {
        Err(AppError::NotFound(entity(owner)))
    }
}

/// Soft delete an owner. Deleting twice is `NotFound`.
pub async fn soft_delete(pool: &DbPool, owner: &OwnerId) -> Result<(), AppError> {
    let sql = format!(
        "UPDATE {} SET deleted = NOW(), modified = NOW() WHERE id = $1 AND deleted IS NULL",
        table(owner)
    );

    let affected = sqlx::query(&sql)
        .bind(owner.as_uuid())
        .execute(pool)
        .await?
        .rows_affected();

    if affected == 0 {
        return Err(AppError::NotFound(entity(owner)));
    }

    tracing::info!(owner = %owner, "Soft deleted customer");
    Ok(())
}

/// Lock a live owner row for the rest of `tx` and return its KYC status.
///
/// Every write that depends on the owner's current state goes through this
/// lock, so concurrent writers for one owner run one after another.
pub async fn lock(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    owner: &OwnerId,
) -> Result<KycStatus, AppError> {
    let select = format!(
        "SELECT kyc_status FROM {} WHERE id = $1 AND deleted IS NULL FOR UPDATE",
        table(owner)
    );

    let current: String = sqlx::query_scalar(&select)
        .bind(owner.as_uuid())
        .fetch_optional(&mut **tx)
        .await?
        .ok_or(AppError::NotFound(entity(owner)))?;

    let current = current
        .parse::<KycStatus>()
        .map_err(|err| sqlx::Error::Decode(Box::new(err)))?;

    Ok(current)
}

/// Lock the owner row and move it to `next`.
async fn transition(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    owner: &OwnerId,
    next: KycStatus,
) -> Result<KycStatus, AppError> {
    let current = lock(tx, owner).await?;

    if !current.can_transition_to(next) {
        return Err(AppError::invalid(format!(
            "KYC status cannot move from {current} to {next}"
        )));
    }

    let update = format!(
        "UPDATE {} SET kyc_status = $1, modified = NOW() WHERE id = $2",
        table(owner)
    );
    sqlx::query(&update)
        .bind(next.as_str())
        .bind(owner.as_uuid())
        .execute(&mut **tx)
        .await?;

    Ok(current)
}

/// Customer submits KYC information for review.
pub async fn submit_kyc(pool: &DbPool, owner: &OwnerId) -> Result<(), AppError> {
    let mut tx = pool.begin().await?;
    let previous = transition(&mut tx, owner, KycStatus::Submitted).await?;
    tx.commit().await?;

    tracing::info!(owner = %owner, from = %previous, "KYC submitted");
    Ok(())
}

/// Record a compliance decision and the note explaining it in one
/// transaction.
pub async fn review_kyc(
    pool: &DbPool,
    owner: &OwnerId,
    review: &ReviewKycRequest,
    reviewer: &str,
) -> Result<(), AppError> {
    let mut tx = pool.begin().await?;

    let previous = transition(&mut tx, owner, review.decision).await?;

    sqlx::query(
        "INSERT INTO notes (id, business_id, consumer_id, author, body)
         VALUES ($1, $2, $3, $4, $5)",
    )
    .bind(NoteId::new())
    .bind(owner.business_id())
    .bind(owner.consumer_id())
    .bind(reviewer)
    .bind(review.note_body())
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    tracing::info!(
        owner = %owner,
        from = %previous,
        to = %review.decision,
        reviewer,
        "KYC review recorded"
    );
    Ok(())
}
