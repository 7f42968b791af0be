// crates/simon-db/src/queries/domain.rs
// Read-only queries over the wider system's domain tables: projects, people,
// tasks, commitments, sprints. Nothing in simon writes these.

use crate::{Database, DbResult};
use simon_core::types::{PersonRef, ProjectRef};
use sqlx::Row;

/// A project as resolved for session linking / retrieval.
#[derive(Debug, Clone)]
pub struct ProjectSummary {
    pub id: String,
    pub slug: String,
    pub name: String,
}

impl<'r> sqlx::FromRow<'r, sqlx::sqlite::SqliteRow> for ProjectSummary {
    fn from_row(row: &'r sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            slug: row.try_get("slug")?,
            name: row.try_get("name")?,
        })
    }
}

#[derive(Debug, Clone)]
pub struct PersonRow {
    pub id: String,
    pub name: String,
    pub organization: Option<String>,
    pub relationship: Option<String>,
}

impl<'r> sqlx::FromRow<'r, sqlx::sqlite::SqliteRow> for PersonRow {
    fn from_row(row: &'r sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            organization: row.try_get("organization")?,
            relationship: row.try_get("relationship")?,
        })
    }
}

#[derive(Debug, Clone)]
pub struct TaskRow {
    pub id: String,
    pub title: String,
    pub status: String,
    pub priority: String,
    pub due_date: Option<String>,
}

impl<'r> sqlx::FromRow<'r, sqlx::sqlite::SqliteRow> for TaskRow {
    fn from_row(row: &'r sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            title: row.try_get("title")?,
            status: row.try_get("status")?,
            priority: row.try_get("priority")?,
            due_date: row.try_get("due_date")?,
        })
    }
}

#[derive(Debug, Clone)]
pub struct CommitmentRow {
    pub id: String,
    pub direction: String,
    pub description: String,
    pub deadline: Option<String>,
    pub person_name: Option<String>,
}

impl<'r> sqlx::FromRow<'r, sqlx::sqlite::SqliteRow> for CommitmentRow {
    fn from_row(row: &'r sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            direction: row.try_get("direction")?,
            description: row.try_get("description")?,
            deadline: row.try_get("deadline")?,
            person_name: row.try_get("person_name")?,
        })
    }
}

#[derive(Debug, Clone)]
pub struct SprintRow {
    pub id: String,
    pub name: String,
    pub ends_at: Option<i64>,
    pub project_name: Option<String>,
}

impl<'r> sqlx::FromRow<'r, sqlx::sqlite::SqliteRow> for SprintRow {
    fn from_row(row: &'r sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            ends_at: row.try_get("ends_at")?,
            project_name: row.try_get("project_name")?,
        })
    }
}

impl Database {
    /// `(slug, name)` of every active project, for the classifier preload.
    pub async fn list_active_project_refs(&self) -> DbResult<Vec<ProjectRef>> {
        let rows: Vec<(String, String)> =
            sqlx::query_as("SELECT slug, name FROM projects WHERE status = 'active'")
                .fetch_all(self.pool())
                .await?;
        Ok(rows
            .into_iter()
            .map(|(slug, name)| ProjectRef { slug, name })
            .collect())
    }

    /// `(name, email)` of every known person, for the classifier preload.
    pub async fn list_person_refs(&self) -> DbResult<Vec<PersonRef>> {
        let rows: Vec<(String, Option<String>)> =
            sqlx::query_as("SELECT name, email FROM people WHERE name <> ''")
                .fetch_all(self.pool())
                .await?;
        Ok(rows
            .into_iter()
            .map(|(name, email)| PersonRef { name, email })
            .collect())
    }

    /// All projects for the entity-extraction handler (id included).
    pub async fn list_active_projects(&self) -> DbResult<Vec<ProjectSummary>> {
        Ok(
            sqlx::query_as("SELECT id, slug, name FROM projects WHERE status = 'active'")
                .fetch_all(self.pool())
                .await?,
        )
    }

    pub async fn list_people(&self) -> DbResult<Vec<PersonRow>> {
        Ok(sqlx::query_as(
            "SELECT id, name, organization, relationship FROM people WHERE name <> ''",
        )
        .fetch_all(self.pool())
        .await?)
    }

    pub async fn find_active_project_by_slug(
        &self,
        slug: &str,
    ) -> DbResult<Option<ProjectSummary>> {
        Ok(sqlx::query_as(
            "SELECT id, slug, name FROM projects WHERE slug = ?1 AND status = 'active'",
        )
        .bind(slug)
        .fetch_optional(self.pool())
        .await?)
    }

    /// Resolve project ids for a list of slugs.
    pub async fn project_ids_by_slugs(&self, slugs: &[String]) -> DbResult<Vec<String>> {
        let mut ids = Vec::new();
        for slug in slugs {
            let row: Option<(String,)> = sqlx::query_as("SELECT id FROM projects WHERE slug = ?1")
                .bind(slug)
                .fetch_optional(self.pool())
                .await?;
            if let Some((id,)) = row {
                ids.push(id);
            }
        }
        Ok(ids)
    }

    /// Open work for a project, ordered by status then priority.
    pub async fn active_tasks_for_project(
        &self,
        project_id: &str,
        limit: i64,
    ) -> DbResult<Vec<TaskRow>> {
        Ok(sqlx::query_as(
            r#"
            SELECT id, title, status, priority, due_date FROM tasks
            WHERE project_id = ?1 AND status IN ('in_progress', 'waiting', 'backlog')
            ORDER BY status, priority
            LIMIT ?2
            "#,
        )
        .bind(project_id)
        .bind(limit)
        .fetch_all(self.pool())
        .await?)
    }

    /// Open commitments, nearest deadline first; optionally scoped to a project.
    pub async fn open_commitments(
        &self,
        project_id: Option<&str>,
        limit: i64,
    ) -> DbResult<Vec<CommitmentRow>> {
        let sql = r#"
            SELECT c.id, c.direction, c.description, c.deadline, p.name AS person_name
            FROM commitments c LEFT JOIN people p ON c.person_id = p.id
            WHERE c.status = 'open' AND (?1 IS NULL OR c.project_id = ?1)
            ORDER BY c.deadline IS NULL, c.deadline ASC
            LIMIT ?2
            "#;
        Ok(sqlx::query_as(sql)
            .bind(project_id)
            .bind(limit)
            .fetch_all(self.pool())
            .await?)
    }

    /// First person whose name contains the given fragment, case-insensitive.
    pub async fn person_by_name_like(&self, name: &str) -> DbResult<Option<PersonRow>> {
        Ok(sqlx::query_as(
            r#"
            SELECT id, name, organization, relationship FROM people
            WHERE lower(name) LIKE '%' || lower(?1) || '%'
            LIMIT 1
            "#,
        )
        .bind(name)
        .fetch_optional(self.pool())
        .await?)
    }

    /// Sprints that are active and not yet over.
    pub async fn active_sprints(&self, now: i64, limit: i64) -> DbResult<Vec<SprintRow>> {
        Ok(sqlx::query_as(
            r#"
            SELECT sp.id, sp.name, sp.ends_at, p.name AS project_name
            FROM sprints sp LEFT JOIN projects p ON sp.project_id = p.id
            WHERE sp.is_active = 1 AND sp.ends_at > ?1
            LIMIT ?2
            "#,
        )
        .bind(now)
        .bind(limit)
        .fetch_all(self.pool())
        .await?)
    }
}

#[cfg(test)]
mod tests {
    use crate::test_support::*;
    use crate::Database;

    #[tokio::test]
    async fn test_entity_refs_only_active_projects() {
        let db = Database::new_in_memory().await.unwrap();
        seed_project(&db, "p1", "apollo", "Apollo", "active").await;
        seed_project(&db, "p2", "old-thing", "Old Thing", "completed").await;
        seed_person(&db, "h1", "Alice Nguyen", Some("alice@example.com"), None, None).await;

        let projects = db.list_active_project_refs().await.unwrap();
        assert_eq!(projects.len(), 1);
        assert_eq!(projects[0].slug, "apollo");

        let people = db.list_person_refs().await.unwrap();
        assert_eq!(people.len(), 1);
        assert_eq!(people[0].email.as_deref(), Some("alice@example.com"));
    }

    #[tokio::test]
    async fn test_find_active_project_by_slug() {
        let db = Database::new_in_memory().await.unwrap();
        seed_project(&db, "p1", "apollo", "Apollo", "active").await;
        seed_project(&db, "p2", "paused", "Paused", "paused").await;

        assert!(db
            .find_active_project_by_slug("apollo")
            .await
            .unwrap()
            .is_some());
        assert!(db
            .find_active_project_by_slug("paused")
            .await
            .unwrap()
            .is_none());
        assert!(db
            .find_active_project_by_slug("missing")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_active_tasks_ordering_and_limit() {
        let db = Database::new_in_memory().await.unwrap();
        seed_project(&db, "p1", "apollo", "Apollo", "active").await;
        seed_task(&db, "t1", "p1", "waiting task", "waiting", "normal", None).await;
        seed_task(&db, "t2", "p1", "wip task", "in_progress", "high", None).await;
        seed_task(&db, "t3", "p1", "done task", "done", "high", None).await;
        seed_task(&db, "t4", "p1", "backlog task", "backlog", "low", Some("2026-09-01")).await;

        let tasks = db.active_tasks_for_project("p1", 5).await.unwrap();
        assert_eq!(tasks.len(), 3);
        // Ordered by status text: backlog < in_progress < waiting
        assert_eq!(tasks[0].status, "backlog");
        assert_eq!(tasks[2].status, "waiting");
    }

    #[tokio::test]
    async fn test_open_commitments_deadline_order() {
        let db = Database::new_in_memory().await.unwrap();
        seed_person(&db, "h1", "Alice Nguyen", None, None, None).await;
        seed_commitment(&db, "c1", None, Some("h1"), "from_me", "send report", Some("2026-09-01"), "open").await;
        seed_commitment(&db, "c2", None, None, "to_me", "review doc", None, "open").await;
        seed_commitment(&db, "c3", None, None, "from_me", "old one", Some("2026-08-01"), "fulfilled").await;

        let commitments = db.open_commitments(None, 3).await.unwrap();
        assert_eq!(commitments.len(), 2);
        assert_eq!(commitments[0].id, "c1"); // dated before undated
        assert_eq!(commitments[0].person_name.as_deref(), Some("Alice Nguyen"));
    }

    #[tokio::test]
    async fn test_person_by_name_like() {
        let db = Database::new_in_memory().await.unwrap();
        seed_person(&db, "h1", "Alice Nguyen", None, Some("Acme"), Some("colleague")).await;

        let person = db.person_by_name_like("alice").await.unwrap().unwrap();
        assert_eq!(person.name, "Alice Nguyen");
        assert!(db.person_by_name_like("zed").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_active_sprints_excludes_ended_and_inactive() {
        let db = Database::new_in_memory().await.unwrap();
        seed_project(&db, "p1", "apollo", "Apollo", "active").await;
        let now = 1_700_000_000;
        seed_sprint(&db, "s1", "Sprint 9", Some("p1"), now + 86400 * 3, true).await;
        seed_sprint(&db, "s2", "Old Sprint", Some("p1"), now - 100, true).await;
        seed_sprint(&db, "s3", "Parked", Some("p1"), now + 86400, false).await;

        let sprints = db.active_sprints(now, 3).await.unwrap();
        assert_eq!(sprints.len(), 1);
        assert_eq!(sprints[0].name, "Sprint 9");
        assert_eq!(sprints[0].project_name.as_deref(), Some("Apollo"));
    }
}
