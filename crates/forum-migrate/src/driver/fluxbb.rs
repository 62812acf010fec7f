//! FluxBB 1.5 driver.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::warn;

use super::forkbb::{default_group, moderators_json, USERS_FILTER};
use super::handler::EntityHandlers;
use super::php::{unserialize, PhpValue};
use super::source::{rename, ConfigSource, Identity, MapRow, RowTranslator, SqlSource};
use super::{check_version, config_value, require_tables, Detection, Driver, Incompatibility};
use crate::core::{Row, Value};
use crate::db::Database;
use crate::entity::Entity;
use crate::error::Result;
use crate::orchestrator::MigrationContext;
use crate::schema::seed;

/// Tables every FluxBB installation has.
pub(crate) const REQUIRED_TABLES: &[&str] = &[
    "users",
    "groups",
    "forums",
    "topics",
    "posts",
    "config",
    "categories",
    "bans",
];

/// Settings whose source values do not translate.
const CONFIG_EXCLUDED: &[&str] = &["default_timezone", "default_style"];

pub struct FluxBbDriver;

impl FluxBbDriver {
    pub fn new() -> Self {
        Self
    }
}

impl Default for FluxBbDriver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Driver for FluxBbDriver {
    fn name(&self) -> &'static str {
        "fluxbb"
    }

    fn supported(&self) -> &'static str {
        "~1.5"
    }

    async fn detect(&self, source: &dyn Database) -> std::result::Result<Detection, Incompatibility> {
        require_tables(source, REQUIRED_TABLES).await?;
        let version = check_version(config_value(source, "o_cur_version").await?, self.supported())?;
        Ok(Detection {
            driver: self.name().to_string(),
            version,
            exact: false,
        })
    }

    fn handlers(&self, entity: Entity) -> EntityHandlers {
        let by_id = |table: &'static str, key: &'static [&'static str], translator: Arc<dyn RowTranslator>| {
            EntityHandlers::standard(entity, Arc::new(SqlSource::by_id(table, key, translator)))
        };
        let ordinal = |table: &'static str, keys: &'static [&'static str]| {
            EntityHandlers::standard(
                entity,
                Arc::new(SqlSource::ordinal(table, keys, Arc::new(Identity))),
            )
        };

        match entity {
            Entity::Categories => by_id("categories", &["id"], Arc::new(Identity)),
            Entity::Groups => by_id("groups", &["g_id"], Arc::new(Identity)),
            Entity::Users => EntityHandlers::standard(
                entity,
                Arc::new(
                    SqlSource::by_id("users", &["id"], Arc::new(MapRow(user))).filter(USERS_FILTER),
                ),
            ),
            Entity::Forums => by_id("forums", &["id"], Arc::new(ForumTranslator)),
            Entity::ForumPerms => ordinal("forum_perms", &["group_id", "forum_id"]),
            Entity::Censoring => by_id("censoring", &["id"], Arc::new(Identity)),
            Entity::Config => EntityHandlers::standard(
                entity,
                Arc::new(ConfigSource::new(Arc::new(ConfigTranslator))),
            ),
            Entity::Topics => by_id("topics", &["id"], Arc::new(MapRow(topic))),
            Entity::Posts => by_id("posts", &["id"], Arc::new(MapRow(post))),
            Entity::ForumSubscriptions => ordinal("forum_subscriptions", &["user_id", "forum_id"]),
            Entity::TopicSubscriptions => ordinal("topic_subscriptions", &["user_id", "topic_id"]),
            Entity::Bans => by_id("bans", &["id"], Arc::new(Identity)),
            Entity::Reports => by_id("reports", &["id"], Arc::new(Identity)),
            Entity::Smilies
            | Entity::Bbcode
            | Entity::Poll
            | Entity::PollVoted
            | Entity::PmTopics
            | Entity::PmPosts
            | Entity::PmBlock
            | Entity::Attachments
            | Entity::AttachmentsPos
            | Entity::AttachmentsPosPm
            | Entity::Providers
            | Entity::ProvidersUsers
            | Entity::MarkOfForum
            | Entity::MarkOfTopic
            | Entity::TopicsAgain
            | Entity::ForumsAgain
            | Entity::PmTopicsAgain
            | Entity::UsersAgain => EntityHandlers::not_applicable(entity),
        }
    }
}

/// User row: numeric timezone to a zone name, language name to a code.
pub(crate) fn user(mut row: Row) -> Row {
    let offset = match row.get("timezone") {
        Some(Value::Float(v)) => *v,
        Some(Value::Int(v)) => *v as f64,
        Some(Value::Text(s)) => s.trim().parse().unwrap_or(0.0),
        _ => 0.0,
    };
    row.set("timezone", timezone_name(offset));
    let language = language_code(&row.text("language"));
    row.set("language", language);
    row.remove("style");
    row
}

/// Topic row: counters and post links are rebuilt once posts exist.
pub(crate) fn topic(mut row: Row) -> Row {
    for column in ["first_post_id", "last_post_id", "last_poster_id", "poster_id"] {
        row.set(column, 0);
    }
    row
}

/// Post row: the editor is known by name only.
pub(crate) fn post(mut row: Row) -> Row {
    rename(&mut row, "edited_by", "editor");
    row.set("editor_id", 0);
    row
}

/// Zone name for a fixed hour offset from UTC. Offsets without an
/// `Etc/GMT` zone fall back to UTC.
pub(crate) fn timezone_name(offset: f64) -> String {
    if offset == 0.0 || offset.fract() != 0.0 || !(-12.0..=14.0).contains(&offset) {
        return "UTC".to_string();
    }
    let hours = offset as i64;
    // Etc/GMT zones use the POSIX sign convention.
    if hours > 0 {
        format!("Etc/GMT-{}", hours)
    } else {
        format!("Etc/GMT+{}", -hours)
    }
}

/// Language code for a language pack name; English when unknown.
pub(crate) fn language_code(name: &str) -> &'static str {
    match name.trim().to_ascii_lowercase().as_str() {
        "russian" | "ru" => "ru",
        "german" | "de" => "de",
        "french" | "fr" => "fr",
        "spanish" | "es" => "es",
        "italian" | "it" => "it",
        "dutch" | "nl" => "nl",
        "polish" | "pl" => "pl",
        "ukrainian" | "uk" => "uk",
        _ => "en",
    }
}

/// `(user id, name)` pairs of a serialized `name => id` moderator array.
pub(crate) fn parse_moderators_php(text: &str) -> Vec<(i64, String)> {
    if text.trim().is_empty() {
        return Vec::new();
    }
    match unserialize(text) {
        Some(PhpValue::Array(entries)) => entries
            .into_iter()
            .filter_map(|(name, id)| Some((id.as_i64()?, name.to_text())))
            .collect(),
        _ => {
            warn!("Ignoring unreadable moderator list {:?}", text);
            Vec::new()
        }
    }
}

/// Forum row with the moderator list converted to the destination format.
pub(crate) struct ForumTranslator;

#[async_trait]
impl RowTranslator for ForumTranslator {
    async fn translate(&self, ctx: &MigrationContext, mut raw: Row) -> Result<Option<Row>> {
        let moderators = parse_moderators_php(&raw.text("moderators"));
        raw.set("moderators", moderators_json(ctx, moderators).await?);
        raw.set("last_post_id", 0);
        raw.set("last_poster_id", 0);
        Ok(Some(raw))
    }
}

/// Destination key for a source setting: the key with the same name after
/// the two-character type prefix (`o_smilies` becomes `b_smilies`).
pub(crate) fn overlay_key(source: &str) -> Option<&'static str> {
    let (prefix, suffix) = source.split_at_checked(2)?;
    if !prefix.ends_with('_') || suffix.is_empty() || CONFIG_EXCLUDED.contains(&suffix) {
        return None;
    }
    seed::config()
        .into_iter()
        .map(|(key, _)| key)
        .filter(|key| *key != "i_fork_revision")
        .find(|key| key.get(2..) == Some(suffix))
}

/// Overlays the source settings on the destination defaults.
pub(crate) struct ConfigTranslator;

#[async_trait]
impl RowTranslator for ConfigTranslator {
    async fn translate(&self, ctx: &MigrationContext, raw: Row) -> Result<Option<Row>> {
        let Some(key) = overlay_key(&raw.text("conf_name")) else {
            return Ok(None);
        };
        let mut value = raw.text("conf_value");
        match key {
            "o_default_lang" => value = language_code(&value).to_string(),
            "i_default_user_group" => value = default_group(ctx, &value).await?,
            _ => {}
        }
        Ok(Some(
            Row::new().with("conf_name", key).with("conf_value", value),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timezone_names() {
        assert_eq!(timezone_name(0.0), "UTC");
        assert_eq!(timezone_name(3.0), "Etc/GMT-3");
        assert_eq!(timezone_name(-5.0), "Etc/GMT+5");
        assert_eq!(timezone_name(5.5), "UTC");
        assert_eq!(timezone_name(20.0), "UTC");
    }

    #[test]
    fn test_user_translation() {
        let row = user(
            Row::new()
                .with("timezone", "2")
                .with("language", "English")
                .with("style", "Air")
                .with("username", "bob"),
        );
        assert_eq!(row.text("timezone"), "Etc/GMT-2");
        assert_eq!(row.text("language"), "en");
        assert!(!row.contains("style"));
        assert_eq!(row.text("username"), "bob");
    }

    #[test]
    fn test_post_editor_rename() {
        let row = post(Row::new().with("edited_by", "alice").with("topic_id", 3));
        assert_eq!(row.text("editor"), "alice");
        assert_eq!(row.int("editor_id"), 0);
        assert_eq!(row.int("topic_id"), 3);
    }

    #[test]
    fn test_php_moderators() {
        let parsed = parse_moderators_php(r#"a:2:{s:3:"bob";i:5;s:5:"alice";s:1:"7";}"#);
        assert_eq!(parsed, vec![(5, "bob".to_string()), (7, "alice".to_string())]);
        assert!(parse_moderators_php("").is_empty());
        assert!(parse_moderators_php("a:1:{").is_empty());
    }

    #[test]
    fn test_config_overlay_keys() {
        assert_eq!(overlay_key("o_board_title"), Some("o_board_title"));
        assert_eq!(overlay_key("o_smilies"), Some("b_smilies"));
        assert_eq!(overlay_key("p_sig_length"), Some("i_sig_length"));
        assert_eq!(overlay_key("o_default_user_group"), Some("i_default_user_group"));
        assert_eq!(overlay_key("o_default_timezone"), None);
        assert_eq!(overlay_key("o_default_style"), None);
        assert_eq!(overlay_key("o_cur_version"), None);
        assert_eq!(overlay_key("o_fork_revision"), None);
        assert_eq!(overlay_key("x"), None);
    }
}
