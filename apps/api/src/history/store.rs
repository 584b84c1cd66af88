//! Persistence for chat and compare sessions. Every query is scoped to the
//! owning user; another user's item is indistinguishable from a missing one.

use sqlx::types::Json;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::analysis::models::{AnalysisResult, ComparisonResult, RiskLevel};
use crate::documents::Document;
use crate::errors::AppError;
use crate::history::library::with_risk_level;
use crate::history::models::{ChatMessage, ChatSession, CompareSession, HistoryItem, HistoryItemRow};

const ITEM_COLUMNS: &str = "id, user_id, kind, document, document_a, document_b, \
    analysis, comparison, messages, created_at";

fn not_found(id: Uuid) -> AppError {
    AppError::NotFound(format!("Session {id} not found"))
}

fn into_item(row: HistoryItemRow) -> Result<HistoryItem, AppError> {
    HistoryItem::try_from(row).map_err(AppError::Internal)
}

pub async fn insert_chat(
    pool: &PgPool,
    user_id: Uuid,
    document: &Document,
) -> Result<ChatSession, AppError> {
    let row = sqlx::query_as::<_, HistoryItemRow>(&format!(
        "INSERT INTO history_items (id, user_id, kind, document) \
         VALUES ($1, $2, 'chat', $3) RETURNING {ITEM_COLUMNS}"
    ))
    .bind(Uuid::new_v4())
    .bind(user_id)
    .bind(Json(document))
    .fetch_one(pool)
    .await?;

    info!("Created chat session {} for user {user_id}", row.id);
    into_item(row)?
        .into_chat()
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("inserted chat row read back as compare")))
}

pub async fn insert_compare(
    pool: &PgPool,
    user_id: Uuid,
    document_a: &Document,
    document_b: &Document,
    comparison: Option<&ComparisonResult>,
) -> Result<CompareSession, AppError> {
    let row = sqlx::query_as::<_, HistoryItemRow>(&format!(
        "INSERT INTO history_items (id, user_id, kind, document_a, document_b, comparison) \
         VALUES ($1, $2, 'compare', $3, $4, $5) RETURNING {ITEM_COLUMNS}"
    ))
    .bind(Uuid::new_v4())
    .bind(user_id)
    .bind(Json(document_a))
    .bind(Json(document_b))
    .bind(comparison.map(Json))
    .fetch_one(pool)
    .await?;

    info!("Created compare session {} for user {user_id}", row.id);
    match into_item(row)? {
        HistoryItem::Compare(session) => Ok(session),
        HistoryItem::Chat(_) => Err(AppError::Internal(anyhow::anyhow!(
            "inserted compare row read back as chat"
        ))),
    }
}

/// All of a user's sessions, newest first.
pub async fn list_for_user(pool: &PgPool, user_id: Uuid) -> Result<Vec<HistoryItem>, AppError> {
    let rows = sqlx::query_as::<_, HistoryItemRow>(&format!(
        "SELECT {ITEM_COLUMNS} FROM history_items WHERE user_id = $1 \
         ORDER BY created_at DESC, id"
    ))
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(into_item).collect()
}

pub async fn get(pool: &PgPool, user_id: Uuid, id: Uuid) -> Result<HistoryItem, AppError> {
    let row = sqlx::query_as::<_, HistoryItemRow>(&format!(
        "SELECT {ITEM_COLUMNS} FROM history_items WHERE id = $1 AND user_id = $2"
    ))
    .bind(id)
    .bind(user_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| not_found(id))?;

    into_item(row)
}

pub async fn get_chat(pool: &PgPool, user_id: Uuid, id: Uuid) -> Result<ChatSession, AppError> {
    get(pool, user_id, id).await?.into_chat().ok_or_else(|| {
        AppError::UnprocessableEntity(format!("Session {id} is not a chat session"))
    })
}

pub async fn set_analysis(
    pool: &PgPool,
    user_id: Uuid,
    id: Uuid,
    analysis: &AnalysisResult,
) -> Result<(), AppError> {
    let result = sqlx::query(
        "UPDATE history_items SET analysis = $1, updated_at = now() \
         WHERE id = $2 AND user_id = $3 AND kind = 'chat'",
    )
    .bind(Json(analysis))
    .bind(id)
    .bind(user_id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(not_found(id));
    }
    Ok(())
}

/// Appends to the transcript in a single statement so concurrent questions
/// never drop each other's messages.
pub async fn append_messages(
    pool: &PgPool,
    user_id: Uuid,
    id: Uuid,
    messages: &[ChatMessage],
) -> Result<(), AppError> {
    let result = sqlx::query(
        "UPDATE history_items SET messages = messages || $1, updated_at = now() \
         WHERE id = $2 AND user_id = $3 AND kind = 'chat'",
    )
    .bind(Json(messages))
    .bind(id)
    .bind(user_id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(not_found(id));
    }
    Ok(())
}

/// Regrades one risk inside the stored analysis under a row lock.
pub async fn update_risk_level(
    pool: &PgPool,
    user_id: Uuid,
    id: Uuid,
    index: usize,
    level: RiskLevel,
) -> Result<AnalysisResult, AppError> {
    let mut tx = pool.begin().await?;

    let analysis: Option<Option<Json<AnalysisResult>>> = sqlx::query_scalar(
        "SELECT analysis FROM history_items \
         WHERE id = $1 AND user_id = $2 AND kind = 'chat' FOR UPDATE",
    )
    .bind(id)
    .bind(user_id)
    .fetch_optional(&mut *tx)
    .await?;

    let analysis = analysis.ok_or_else(|| not_found(id))?.ok_or_else(|| {
        AppError::UnprocessableEntity(format!("Session {id} has not been analyzed yet"))
    })?;

    let updated = with_risk_level(&analysis.0, index, level)?;

    sqlx::query("UPDATE history_items SET analysis = $1, updated_at = now() WHERE id = $2")
        .bind(Json(&updated))
        .bind(id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    info!("Session {id}: risk {index} set to {level:?}");
    Ok(updated)
}

pub async fn delete(pool: &PgPool, user_id: Uuid, id: Uuid) -> Result<(), AppError> {
    let result = sqlx::query("DELETE FROM history_items WHERE id = $1 AND user_id = $2")
        .bind(id)
        .bind(user_id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(not_found(id));
    }
    info!("Deleted session {id} for user {user_id}");
    Ok(())
}

/// Removes every session of the user, returning how many were deleted.
pub async fn clear(pool: &PgPool, user_id: Uuid) -> Result<u64, AppError> {
    let result = sqlx::query("DELETE FROM history_items WHERE user_id = $1")
        .bind(user_id)
        .execute(pool)
        .await?;

    info!("Cleared {} sessions for user {user_id}", result.rows_affected());
    Ok(result.rows_affected())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::models::sample_analysis;
    use crate::test_support::{insert_user, test_db};

    fn lease() -> Document {
        Document::from_pasted_text("The Lessee shall pay rent monthly.").unwrap()
    }

    #[tokio::test]
    async fn clear_removes_only_the_callers_sessions() {
        let Some(db) = test_db().await else { return };
        let asha = insert_user(&db.pool, "asha@example.com").await;
        let ravi = insert_user(&db.pool, "ravi@example.com").await;

        insert_chat(&db.pool, asha, &lease()).await.unwrap();
        insert_compare(&db.pool, asha, &lease(), &lease(), None)
            .await
            .unwrap();
        insert_chat(&db.pool, ravi, &lease()).await.unwrap();

        assert_eq!(clear(&db.pool, asha).await.unwrap(), 2);
        assert!(list_for_user(&db.pool, asha).await.unwrap().is_empty());
        assert_eq!(list_for_user(&db.pool, ravi).await.unwrap().len(), 1);
        assert_eq!(clear(&db.pool, asha).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn history_is_listed_newest_first() {
        let Some(db) = test_db().await else { return };
        let asha = insert_user(&db.pool, "asha@example.com").await;

        let first = insert_chat(&db.pool, asha, &lease()).await.unwrap();
        let second = insert_compare(&db.pool, asha, &lease(), &lease(), None)
            .await
            .unwrap();

        let ids: Vec<Uuid> = list_for_user(&db.pool, asha)
            .await
            .unwrap()
            .iter()
            .map(HistoryItem::id)
            .collect();
        assert_eq!(ids, vec![second.id, first.id]);
    }

    #[tokio::test]
    async fn other_users_items_are_not_found() {
        let Some(db) = test_db().await else { return };
        let asha = insert_user(&db.pool, "asha@example.com").await;
        let ravi = insert_user(&db.pool, "ravi@example.com").await;
        let session = insert_chat(&db.pool, asha, &lease()).await.unwrap();
        set_analysis(&db.pool, asha, session.id, &sample_analysis())
            .await
            .unwrap();

        assert!(matches!(
            get(&db.pool, ravi, session.id).await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            delete(&db.pool, ravi, session.id).await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            update_risk_level(&db.pool, ravi, session.id, 0, RiskLevel::Low).await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            append_messages(&db.pool, ravi, session.id, &[ChatMessage::user("hi")]).await,
            Err(AppError::NotFound(_))
        ));

        let untouched = get_chat(&db.pool, asha, session.id).await.unwrap();
        assert_eq!(untouched.analysis, Some(sample_analysis()));
        assert!(untouched.messages.is_empty());

        delete(&db.pool, asha, session.id).await.unwrap();
        assert!(matches!(
            get(&db.pool, asha, session.id).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn appended_messages_keep_their_order() {
        let Some(db) = test_db().await else { return };
        let asha = insert_user(&db.pool, "asha@example.com").await;
        let session = insert_chat(&db.pool, asha, &lease()).await.unwrap();

        let first = [ChatMessage::user("When is rent due?"), ChatMessage::ai("Monthly.")];
        let second = [ChatMessage::user("Any deposit?"), ChatMessage::ai("Two months.")];
        append_messages(&db.pool, asha, session.id, &first).await.unwrap();
        append_messages(&db.pool, asha, session.id, &second).await.unwrap();

        let stored = get_chat(&db.pool, asha, session.id).await.unwrap();
        let expected: Vec<ChatMessage> = first.into_iter().chain(second).collect();
        assert_eq!(stored.messages, expected);
    }

    #[tokio::test]
    async fn risk_update_requires_analysis_and_a_valid_index() {
        let Some(db) = test_db().await else { return };
        let asha = insert_user(&db.pool, "asha@example.com").await;
        let session = insert_chat(&db.pool, asha, &lease()).await.unwrap();

        assert!(matches!(
            update_risk_level(&db.pool, asha, session.id, 0, RiskLevel::Low).await,
            Err(AppError::UnprocessableEntity(_))
        ));

        let analysis = sample_analysis();
        set_analysis(&db.pool, asha, session.id, &analysis)
            .await
            .unwrap();
        assert!(matches!(
            update_risk_level(&db.pool, asha, session.id, 9, RiskLevel::Low).await,
            Err(AppError::NotFound(_))
        ));

        let updated = update_risk_level(&db.pool, asha, session.id, 1, RiskLevel::High)
            .await
            .unwrap();
        assert_eq!(updated.risk_analysis[0], analysis.risk_analysis[0]);
        assert_eq!(updated.risk_analysis[1].risk_level, RiskLevel::High);

        let stored = get_chat(&db.pool, asha, session.id).await.unwrap();
        assert_eq!(stored.analysis, Some(updated));
    }

    #[tokio::test]
    async fn compare_sessions_round_trip_and_are_not_chats() {
        let Some(db) = test_db().await else { return };
        let asha = insert_user(&db.pool, "asha@example.com").await;
        let old = Document::from_pasted_text("Rent is 10,000.").unwrap();
        let new = Document::from_pasted_text("Rent is 12,000.").unwrap();
        let comparison = ComparisonResult {
            summary: "Rent rises.".to_string(),
            new_clauses: vec![],
            changed_terms: vec![],
            deleted_clauses: vec![],
        };

        let session = insert_compare(&db.pool, asha, &old, &new, Some(&comparison))
            .await
            .unwrap();
        assert_eq!(session.comparison.as_ref(), Some(&comparison));

        match get(&db.pool, asha, session.id).await.unwrap() {
            HistoryItem::Compare(stored) => {
                assert_eq!(stored.document_a, old);
                assert_eq!(stored.document_b, new);
                assert_eq!(stored.comparison, Some(comparison));
            }
            other => panic!("unexpected item: {other:?}"),
        }
        assert!(matches!(
            get_chat(&db.pool, asha, session.id).await,
            Err(AppError::UnprocessableEntity(_))
        ));
    }
}
