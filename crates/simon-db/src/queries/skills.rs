// crates/simon-db/src/queries/skills.rs
// Installed-skill records: dedup tracking for auto-generated skills.

use crate::{now, Database, DbResult};

/// A skill record to persist after installation.
#[derive(Debug, Clone)]
pub struct NewSkillRecord {
    pub name: String,
    pub description: String,
    pub source: String,
    pub source_session_id: Option<String>,
    pub installed_path: Option<String>,
    pub scope: String,
    pub quality_score: Option<f64>,
    pub skill_content_hash: Option<String>,
}

#[derive(Debug, Clone)]
pub struct SkillRecordRow {
    pub id: String,
    pub name: String,
    pub description: String,
    pub source: String,
    pub source_session_id: Option<String>,
    pub installed_path: Option<String>,
    pub scope: String,
    pub quality_score: Option<f64>,
    pub skill_content_hash: Option<String>,
    pub is_active: bool,
    pub created_at: i64,
}

impl<'r> sqlx::FromRow<'r, sqlx::sqlite::SqliteRow> for SkillRecordRow {
    fn from_row(row: &'r sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        use sqlx::Row;
        Ok(Self {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            description: row.try_get("description")?,
            source: row.try_get("source")?,
            source_session_id: row.try_get("source_session_id")?,
            installed_path: row.try_get("installed_path")?,
            scope: row.try_get("scope")?,
            quality_score: row.try_get("quality_score")?,
            skill_content_hash: row.try_get("skill_content_hash")?,
            is_active: row.try_get("is_active")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

impl Database {
    pub async fn insert_skill_record(&self, record: NewSkillRecord) -> DbResult<String> {
        let id = uuid::Uuid::new_v4().to_string();
        sqlx::query(
            r#"
            INSERT INTO generated_skills
                (id, name, description, source, source_session_id, installed_path, scope, quality_score, skill_content_hash, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
        )
        .bind(&id)
        .bind(&record.name)
        .bind(&record.description)
        .bind(&record.source)
        .bind(&record.source_session_id)
        .bind(&record.installed_path)
        .bind(&record.scope)
        .bind(record.quality_score)
        .bind(&record.skill_content_hash)
        .bind(now())
        .execute(self.pool())
        .await?;
        Ok(id)
    }

    /// How many auto-generated skills were recorded since the given time
    /// (start of today, for the daily cap).
    pub async fn count_auto_skills_since(&self, since: i64) -> DbResult<i64> {
        let row: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM generated_skills WHERE source = 'auto' AND created_at >= ?1",
        )
        .bind(since)
        .fetch_one(self.pool())
        .await?;
        Ok(row.0)
    }

    /// Whether an active record with this description hash already exists.
    pub async fn has_active_skill_with_hash(&self, content_hash: &str) -> DbResult<bool> {
        let row: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM generated_skills WHERE skill_content_hash = ?1 AND is_active = 1",
        )
        .bind(content_hash)
        .fetch_one(self.pool())
        .await?;
        Ok(row.0 > 0)
    }

    pub async fn list_skill_records(&self) -> DbResult<Vec<SkillRecordRow>> {
        Ok(sqlx::query_as(
            r#"
            SELECT id, name, description, source, source_session_id, installed_path, scope,
                   quality_score, skill_content_hash, is_active, created_at
            FROM generated_skills
            ORDER BY created_at DESC
            "#,
        )
        .fetch_all(self.pool())
        .await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str, hash: Option<&str>) -> NewSkillRecord {
        NewSkillRecord {
            name: name.to_string(),
            description: format!("{name} description"),
            source: "auto".to_string(),
            source_session_id: Some("ext-1".to_string()),
            installed_path: Some(format!("/skills/{name}/SKILL.md")),
            scope: "personal".to_string(),
            quality_score: Some(0.7),
            skill_content_hash: hash.map(String::from),
        }
    }

    #[tokio::test]
    async fn test_insert_and_list() {
        let db = Database::new_in_memory().await.unwrap();
        db.insert_skill_record(record("deploy-apollo", Some("abc")))
            .await
            .unwrap();

        let records = db.list_skill_records().await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name, "deploy-apollo");
        assert!(records[0].is_active);
        assert_eq!(records[0].quality_score, Some(0.7));
    }

    #[tokio::test]
    async fn test_count_auto_skills_since() {
        let db = Database::new_in_memory().await.unwrap();
        db.insert_skill_record(record("a", None)).await.unwrap();
        db.insert_skill_record(record("b", None)).await.unwrap();

        let since_epoch = db.count_auto_skills_since(0).await.unwrap();
        assert_eq!(since_epoch, 2);
        let future = db.count_auto_skills_since(i64::MAX).await.unwrap();
        assert_eq!(future, 0);
    }

    #[tokio::test]
    async fn test_has_active_skill_with_hash() {
        let db = Database::new_in_memory().await.unwrap();
        db.insert_skill_record(record("a", Some("hash-1")))
            .await
            .unwrap();

        assert!(db.has_active_skill_with_hash("hash-1").await.unwrap());
        assert!(!db.has_active_skill_with_hash("hash-2").await.unwrap());

        sqlx::query("UPDATE generated_skills SET is_active = 0")
            .execute(db.pool())
            .await
            .unwrap();
        assert!(!db.has_active_skill_with_hash("hash-1").await.unwrap());
    }
}
