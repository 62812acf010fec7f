//! Identity driver for sources that already run the destination product.
//!
//! Older revisions are migrated like any foreign product; a source at the
//! current revision can be copied with its ids intact.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use super::handler::EntityHandlers;
use super::source::{ConfigSource, Identity, RowTranslator, SqlSource};
use super::{config_value, require_tables, Detection, Driver, Incompatibility};
use crate::core::Row;
use crate::db::Database;
use crate::entity::Entity;
use crate::error::Result;
use crate::orchestrator::MigrationContext;
use crate::remap::IdRemapper;
use crate::schema::{seed, DESTINATION_REVISION};

/// Oldest revision with the table layout this driver reads.
pub const MIN_REVISION: i64 = 40;

const REQUIRED_TABLES: &[&str] = &["users", "groups", "forums", "topics", "posts", "config"];

/// Filter for real accounts: neither the guest nor unverified users.
pub(crate) const USERS_FILTER: &str = "id > 1 AND group_id <> 0";

pub struct ForkBbDriver;

impl ForkBbDriver {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ForkBbDriver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Driver for ForkBbDriver {
    fn name(&self) -> &'static str {
        "forkbb"
    }

    fn supported(&self) -> &'static str {
        "revisions 40..=68"
    }

    async fn detect(&self, source: &dyn Database) -> std::result::Result<Detection, Incompatibility> {
        require_tables(source, REQUIRED_TABLES).await?;
        let raw = config_value(source, "i_fork_revision")
            .await?
            .ok_or(Incompatibility::MissingVersion)?;
        let revision: i64 = raw.trim().parse().map_err(|_| Incompatibility::UnsupportedVersion {
            found: raw.clone(),
            supported: self.supported().to_string(),
        })?;
        if !(MIN_REVISION..=DESTINATION_REVISION).contains(&revision) {
            return Err(Incompatibility::UnsupportedVersion {
                found: raw,
                supported: self.supported().to_string(),
            });
        }
        Ok(Detection {
            driver: self.name().to_string(),
            version: revision.to_string(),
            exact: revision == DESTINATION_REVISION,
        })
    }

    fn handlers(&self, entity: Entity) -> EntityHandlers {
        let identity: Arc<dyn RowTranslator> = Arc::new(Identity);
        let by_id = |table: &'static str, key: &'static [&'static str]| -> EntityHandlers {
            EntityHandlers::standard(entity, Arc::new(SqlSource::by_id(table, key, identity.clone())))
        };
        let ordinal = |table: &'static str, keys: &'static [&'static str]| -> EntityHandlers {
            EntityHandlers::standard(
                entity,
                Arc::new(SqlSource::ordinal(table, keys, identity.clone())),
            )
        };

        match entity {
            Entity::Categories => by_id("categories", &["id"]),
            Entity::Groups => by_id("groups", &["g_id"]),
            Entity::Users => EntityHandlers::standard(
                entity,
                Arc::new(SqlSource::by_id("users", &["id"], identity.clone()).filter(USERS_FILTER)),
            ),
            Entity::Forums => EntityHandlers::standard(
                entity,
                Arc::new(SqlSource::by_id("forums", &["id"], Arc::new(ForumTranslator))),
            ),
            Entity::ForumPerms => ordinal("forum_perms", &["group_id", "forum_id"]),
            Entity::Censoring => by_id("censoring", &["id"]),
            Entity::Config => {
                EntityHandlers::standard(entity, Arc::new(ConfigSource::new(Arc::new(ConfigTranslator))))
            }
            Entity::Smilies => by_id("smilies", &["id"]),
            Entity::Bbcode => by_id("bbcode", &["id"]),
            Entity::Topics => by_id("topics", &["id"]),
            Entity::Posts => by_id("posts", &["id"]),
            Entity::ForumSubscriptions => ordinal("forum_subscriptions", &["user_id", "forum_id"]),
            Entity::TopicSubscriptions => ordinal("topic_subscriptions", &["user_id", "topic_id"]),
            Entity::Bans => by_id("bans", &["id"]),
            Entity::Reports => by_id("reports", &["id"]),
            Entity::Poll => ordinal("poll", &["tid", "question_id", "field_id"]),
            Entity::PollVoted => ordinal("poll_voted", &["tid", "uid"]),
            Entity::PmTopics => by_id("pm_topics", &["id"]),
            Entity::PmPosts => by_id("pm_posts", &["id"]),
            Entity::PmBlock => ordinal("pm_block", &["bl_first_id", "bl_second_id"]),
            Entity::Attachments => by_id("attachments", &["id"]),
            Entity::AttachmentsPos => ordinal("attachments_pos", &["id", "pid"]),
            Entity::AttachmentsPosPm => ordinal("attachments_pos_pm", &["id", "pid"]),
            Entity::Providers => ordinal("providers", &["pr_name"]),
            Entity::ProvidersUsers => ordinal("providers_users", &["pr_name", "pu_uid"]),
            Entity::MarkOfForum => ordinal("mark_of_forum", &["uid", "fid"]),
            Entity::MarkOfTopic => ordinal("mark_of_topic", &["uid", "tid"]),
            Entity::TopicsAgain
            | Entity::ForumsAgain
            | Entity::PmTopicsAgain
            | Entity::UsersAgain => EntityHandlers::not_applicable(entity),
        }
    }
}

/// Rewrites the JSON moderator map (`{"uid":"name"}`) to new user ids.
struct ForumTranslator;

#[async_trait]
impl RowTranslator for ForumTranslator {
    async fn translate(&self, ctx: &MigrationContext, mut raw: Row) -> Result<Option<Row>> {
        let moderators = parse_moderators_json(&raw.text("moderators"));
        raw.set("moderators", moderators_json(ctx, moderators).await?);
        Ok(Some(raw))
    }
}

fn parse_moderators_json(text: &str) -> Vec<(i64, String)> {
    if text.trim().is_empty() {
        return Vec::new();
    }
    match serde_json::from_str::<serde_json::Map<String, serde_json::Value>>(text) {
        Ok(map) => map
            .into_iter()
            .filter_map(|(uid, name)| {
                let uid = uid.parse().ok()?;
                Some((uid, name.as_str().unwrap_or_default().to_string()))
            })
            .collect(),
        Err(e) => {
            debug!("Ignoring unreadable moderator list {:?}: {}", text, e);
            Vec::new()
        }
    }
}

/// Destination moderator map for `(old user id, name)` pairs.
///
/// Ids are resolved through the users already migrated and names through
/// the rename map; moderators whose account was not migrated are dropped.
pub(crate) async fn moderators_json(
    ctx: &MigrationContext,
    moderators: Vec<(i64, String)>,
) -> Result<String> {
    if moderators.is_empty() {
        return Ok(String::new());
    }

    let resolved: HashMap<i64, i64> = if ctx.mode.preserves_ids() {
        moderators.iter().map(|(id, _)| (*id, *id)).collect()
    } else {
        let olds: Vec<i64> = moderators.iter().map(|(id, _)| *id).collect();
        IdRemapper::new(ctx.dest.as_ref())
            .lookup_many(Entity::Users, &olds)
            .await?
    };

    let mut map = serde_json::Map::new();
    for (old, name) in moderators {
        match resolved.get(&old) {
            Some(new) => {
                map.insert(
                    new.to_string(),
                    serde_json::Value::String(ctx.renames.apply(&name).to_string()),
                );
            }
            None => debug!("Dropping moderator {:?} ({}): account not migrated", name, old),
        }
    }
    if map.is_empty() {
        return Ok(String::new());
    }
    Ok(serde_json::to_string(&map)?)
}

/// Keeps the source settings the destination knows, with group ids
/// resolved. Every setting is kept when ids are preserved.
struct ConfigTranslator;

#[async_trait]
impl RowTranslator for ConfigTranslator {
    async fn translate(&self, ctx: &MigrationContext, raw: Row) -> Result<Option<Row>> {
        let name = raw.text("conf_name");
        if name == "i_fork_revision" {
            return Ok(None);
        }
        let preserves_ids = ctx.mode.preserves_ids();
        if !preserves_ids && !seed::config().iter().any(|(key, _)| *key == name) {
            return Ok(None);
        }

        let mut value = raw.text("conf_value");
        if name == "i_default_user_group" && !preserves_ids {
            value = default_group(ctx, &value).await?;
        }
        Ok(Some(
            Row::new().with("conf_name", name).with("conf_value", value),
        ))
    }
}

/// Destination id of the group stored as `old`; members when unresolved.
pub(crate) async fn default_group(ctx: &MigrationContext, old: &str) -> Result<String> {
    let old: i64 = old.trim().parse().unwrap_or(seed::GROUP_MEMBER);
    let new = IdRemapper::new(ctx.dest.as_ref())
        .lookup(Entity::Groups, old)
        .await?
        .unwrap_or(seed::GROUP_MEMBER);
    Ok(new.to_string())
}
