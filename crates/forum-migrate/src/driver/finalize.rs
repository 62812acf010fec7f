//! Entity finalization: reference sweeps and derived counters.

use async_trait::async_trait;
use tracing::info;

use super::handler::Finalizer;
use crate::db::Statement;
use crate::entity::Entity;
use crate::error::{MigrateError, Result};
use crate::orchestrator::MigrationContext;
use crate::remap::RemapSweep;
use crate::schema::SchemaEvolver;

/// Resolves the entity's pending references, or re-aligns its sequence
/// when ids were copied verbatim.
pub struct RemapFinalizer {
    entity: Entity,
}

impl RemapFinalizer {
    pub fn new(entity: Entity) -> Self {
        Self { entity }
    }
}

#[async_trait]
impl Finalizer for RemapFinalizer {
    async fn finalize(&self, ctx: &MigrationContext) -> Result<()> {
        let dest = ctx.dest.as_ref();
        if ctx.mode.preserves_ids() {
            return SchemaEvolver::new(dest)
                .reset_sequence(self.entity.table())
                .await
                .map_err(|e| MigrateError::contract(self.entity.name(), e.to_string()));
        }

        let touched = RemapSweep::new(dest)
            .run(self.entity)
            .await
            .map_err(|e| MigrateError::contract(self.entity.name(), e.to_string()))?;
        if touched > 0 {
            info!("{}: resolved references ({} rows touched)", self.entity, touched);
        }
        Ok(())
    }
}

/// Recomputes derived columns of rows written by this run.
pub struct AgainFinalizer {
    entity: Entity,
}

impl AgainFinalizer {
    pub fn new(entity: Entity) -> Self {
        Self { entity }
    }

    /// The recompute statements. Columns that depend on other recomputed
    /// columns are set by a second statement, since dialects disagree on
    /// whether `SET` sees values assigned earlier in the same statement.
    pub fn statements(&self) -> Vec<Statement> {
        let sql: &[&str] = match self.entity {
            Entity::TopicsAgain => &[
                "UPDATE ::topics SET \
                 first_post_id = COALESCE((SELECT MIN(p.id) FROM ::posts p WHERE p.topic_id = ::topics.id), 0), \
                 last_post_id = COALESCE((SELECT MAX(p.id) FROM ::posts p WHERE p.topic_id = ::topics.id), 0), \
                 num_replies = COALESCE((SELECT COUNT(*) - 1 FROM ::posts p WHERE p.topic_id = ::topics.id HAVING COUNT(*) > 0), 0) \
                 WHERE id_old <> 0 AND moved_to = 0",
                "UPDATE ::topics SET \
                 last_post = COALESCE((SELECT p.posted FROM ::posts p WHERE p.id = ::topics.last_post_id), 0), \
                 last_poster = COALESCE((SELECT p.poster FROM ::posts p WHERE p.id = ::topics.last_post_id), ''), \
                 last_poster_id = COALESCE((SELECT p.poster_id FROM ::posts p WHERE p.id = ::topics.last_post_id), 0), \
                 poster_id = COALESCE((SELECT p.poster_id FROM ::posts p WHERE p.id = ::topics.first_post_id), poster_id) \
                 WHERE id_old <> 0 AND moved_to = 0",
            ],
            Entity::ForumsAgain => &[
                "UPDATE ::forums SET \
                 num_topics = (SELECT COUNT(*) FROM ::topics t WHERE t.forum_id = ::forums.id AND t.moved_to = 0), \
                 num_posts = COALESCE((SELECT SUM(t.num_replies + 1) FROM ::topics t WHERE t.forum_id = ::forums.id AND t.moved_to = 0), 0), \
                 last_post_id = COALESCE((SELECT MAX(t.last_post_id) FROM ::topics t WHERE t.forum_id = ::forums.id AND t.moved_to = 0), 0) \
                 WHERE id_old <> 0",
                "UPDATE ::forums SET \
                 last_post = COALESCE((SELECT p.posted FROM ::posts p WHERE p.id = ::forums.last_post_id), 0), \
                 last_poster = COALESCE((SELECT p.poster FROM ::posts p WHERE p.id = ::forums.last_post_id), ''), \
                 last_poster_id = COALESCE((SELECT p.poster_id FROM ::posts p WHERE p.id = ::forums.last_post_id), 0), \
                 last_topic = COALESCE((SELECT t.subject FROM ::topics t INNER JOIN ::posts p ON p.topic_id = t.id WHERE p.id = ::forums.last_post_id), '') \
                 WHERE id_old <> 0",
            ],
            Entity::PmTopicsAgain => &[
                "UPDATE ::pm_topics SET \
                 first_post_id = COALESCE((SELECT MIN(p.id) FROM ::pm_posts p WHERE p.topic_id = ::pm_topics.id), 0), \
                 last_post_id = COALESCE((SELECT MAX(p.id) FROM ::pm_posts p WHERE p.topic_id = ::pm_topics.id), 0), \
                 num_replies = COALESCE((SELECT COUNT(*) - 1 FROM ::pm_posts p WHERE p.topic_id = ::pm_topics.id HAVING COUNT(*) > 0), 0) \
                 WHERE id_old <> 0",
                "UPDATE ::pm_topics SET \
                 last_post = COALESCE((SELECT p.posted FROM ::pm_posts p WHERE p.id = ::pm_topics.last_post_id), 0) \
                 WHERE id_old <> 0",
            ],
            Entity::UsersAgain => &[
                "UPDATE ::users SET \
                 num_topics = (SELECT COUNT(*) FROM ::topics t WHERE t.poster_id = ::users.id AND t.moved_to = 0), \
                 num_posts = (SELECT COUNT(*) FROM ::posts p WHERE p.poster_id = ::users.id), \
                 last_post = COALESCE((SELECT MAX(p.posted) FROM ::posts p WHERE p.poster_id = ::users.id), last_post), \
                 u_pm_num_all = (SELECT COUNT(*) FROM ::pm_topics m WHERE m.poster_id = ::users.id OR m.target_id = ::users.id), \
                 u_pm_last_post = COALESCE((SELECT MAX(m.posted) FROM ::pm_posts m WHERE m.poster_id = ::users.id), 0) \
                 WHERE id_old <> 0",
            ],
            _ => &[],
        };
        sql.iter().map(|s| Statement::new(*s, Vec::new())).collect()
    }
}

#[async_trait]
impl Finalizer for AgainFinalizer {
    async fn finalize(&self, ctx: &MigrationContext) -> Result<()> {
        let statements = self.statements();
        if statements.is_empty() {
            return Ok(());
        }
        let touched = ctx
            .dest
            .execute_batch(&statements)
            .await
            .map_err(|e| MigrateError::contract(self.entity.name(), e.to_string()))?;
        info!("{}: recomputed derived columns ({} row updates)", self.entity, touched);
        Ok(())
    }
}
