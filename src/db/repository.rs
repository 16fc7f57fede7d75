use chrono::Utc;
use sqlx::SqlitePool;

pub async fn fetch_preference(db: &SqlitePool, key: &str) -> Result<Option<String>, sqlx::Error> {
    sqlx::query_scalar::<_, String>("SELECT value FROM preferences WHERE key = ?1")
        .bind(key)
        .fetch_optional(db)
        .await
}

pub async fn upsert_preference(db: &SqlitePool, key: &str, value: &str) -> Result<(), sqlx::Error> {
    let now = Utc::now().to_rfc3339();

    sqlx::query(
        r#"
        INSERT INTO preferences (key, value, updated_at)
        VALUES (?1, ?2, ?3)
        ON CONFLICT(key) DO UPDATE SET
            value = excluded.value,
            updated_at = excluded.updated_at
        "#,
    )
    .bind(key)
    .bind(value)
    .bind(now)
    .execute(db)
    .await?;

    Ok(())
}

pub async fn delete_preference(db: &SqlitePool, key: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM preferences WHERE key = ?1")
        .bind(key)
        .execute(db)
        .await?;

    Ok(result.rows_affected() > 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn setup_test_db() -> SqlitePool {
        crate::db::connect_in_memory()
            .await
            .expect("Failed to create test db")
    }

    #[tokio::test]
    async fn test_upsert_and_fetch_preference() {
        let pool = setup_test_db().await;

        assert_eq!(fetch_preference(&pool, "last_teacher_id").await.unwrap(), None);

        upsert_preference(&pool, "last_teacher_id", "4").await.expect("Failed to insert");
        upsert_preference(&pool, "last_teacher_id", "9").await.expect("Failed to update");

        let value = fetch_preference(&pool, "last_teacher_id")
            .await
            .expect("Failed to fetch preference");
        assert_eq!(value.as_deref(), Some("9"));
    }

    #[tokio::test]
    async fn test_delete_preference() {
        let pool = setup_test_db().await;

        upsert_preference(&pool, "last_student_id", "12").await.unwrap();
        assert!(delete_preference(&pool, "last_student_id").await.unwrap());
        assert!(!delete_preference(&pool, "last_student_id").await.unwrap());
        assert_eq!(fetch_preference(&pool, "last_student_id").await.unwrap(), None);
    }
}
