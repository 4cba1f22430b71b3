use async_trait::async_trait;
use time::OffsetDateTime;

use crate::{
    application::repos::{RepoError, TeamRepo},
    domain::entities::TeamMemberRecord,
};

use super::{PostgresRepositories, map_sqlx_error};

#[derive(sqlx::FromRow)]
struct TeamMemberRow {
    id: i64,
    name: String,
    job_title: Option<String>,
    bio: Option<String>,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
}

#[async_trait]
impl TeamRepo for PostgresRepositories {
    async fn list_team_members(&self) -> Result<Vec<TeamMemberRecord>, RepoError> {
        let rows = sqlx::query_as::<_, TeamMemberRow>(
            r#"
            SELECT id, name, job_title, bio, created_at, updated_at
            FROM team_members
            ORDER BY id ASC
            "#,
        )
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows
            .into_iter()
            .map(|row| TeamMemberRecord {
                id: row.id,
                name: row.name,
                job_title: row.job_title,
                bio: row.bio,
                created_at: row.created_at,
                updated_at: row.updated_at,
            })
            .collect())
    }
}
