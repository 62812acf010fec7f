//! PunBB 1.4 driver.
//!
//! PunBB shares most of its layout with FluxBB; only the group numbering,
//! password storage and the topic subscription table differ.

use std::sync::Arc;

use async_trait::async_trait;

use super::fluxbb::{self, FluxBbDriver};
use super::handler::EntityHandlers;
use super::source::{Identity, MapRow, SqlSource};
use super::{check_version, config_value, require_tables, Detection, Driver, Incompatibility};
use crate::core::Row;
use crate::db::Database;
use crate::entity::Entity;
use crate::schema::seed;

/// Tables beyond the FluxBB set that identify a PunBB installation.
const EXTRA_TABLES: &[&str] = &["extensions", "subscriptions"];

pub struct PunBbDriver {
    base: FluxBbDriver,
}

impl PunBbDriver {
    pub fn new() -> Self {
        Self {
            base: FluxBbDriver::new(),
        }
    }
}

impl Default for PunBbDriver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Driver for PunBbDriver {
    fn name(&self) -> &'static str {
        "punbb"
    }

    fn supported(&self) -> &'static str {
        "~1.4"
    }

    async fn detect(&self, source: &dyn Database) -> std::result::Result<Detection, Incompatibility> {
        require_tables(source, fluxbb::REQUIRED_TABLES).await?;
        require_tables(source, EXTRA_TABLES).await?;
        let version = check_version(config_value(source, "o_cur_version").await?, self.supported())?;
        Ok(Detection {
            driver: self.name().to_string(),
            version,
            exact: false,
        })
    }

    fn handlers(&self, entity: Entity) -> EntityHandlers {
        match entity {
            Entity::Groups => EntityHandlers::standard(
                entity,
                Arc::new(SqlSource::by_id("groups", &["g_id"], Arc::new(MapRow(group)))),
            ),
            Entity::Users => EntityHandlers::standard(
                entity,
                Arc::new(
                    SqlSource::by_id("users", &["id"], Arc::new(MapRow(user)))
                        .filter(super::forkbb::USERS_FILTER),
                ),
            ),
            Entity::TopicSubscriptions => EntityHandlers::standard(
                entity,
                Arc::new(SqlSource::ordinal(
                    "subscriptions",
                    &["user_id", "topic_id"],
                    Arc::new(Identity),
                )),
            ),
            _ => self.base.handlers(entity),
        }
    }
}

/// Destination group for a PunBB reserved group id.
pub(crate) fn reserved_group(g_id: i64) -> i64 {
    match g_id {
        1 => seed::GROUP_ADMIN,
        2 => seed::GROUP_GUEST,
        3 => seed::GROUP_MEMBER,
        4 => seed::GROUP_MOD,
        other => other,
    }
}

fn group(mut row: Row) -> Row {
    let g_id = reserved_group(row.int("g_id"));
    row.set("g_id", g_id);
    row
}

/// User row with the salted hash kept in one self-describing string.
/// `group_id` stays a source id; it resolves through the migrated groups.
fn user(row: Row) -> Row {
    let mut row = fluxbb::user(row);
    let salt = row.remove("salt").map(|v| v.to_text()).unwrap_or_default();
    let hash = row.text("password");
    if !salt.is_empty() {
        row.set("password", format!("punbb${}${}", salt, hash));
    }
    row
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reserved_group_numbering() {
        assert_eq!(reserved_group(1), seed::GROUP_ADMIN);
        assert_eq!(reserved_group(2), seed::GROUP_GUEST);
        assert_eq!(reserved_group(3), seed::GROUP_MEMBER);
        assert_eq!(reserved_group(4), seed::GROUP_MOD);
        assert_eq!(reserved_group(9), 9);
    }

    #[test]
    fn test_user_password() {
        let row = user(
            Row::new()
                .with("username", "carol")
                .with("password", "abc123")
                .with("salt", "s4lt")
                .with("group_id", 3)
                .with("timezone", "0")
                .with("language", "English"),
        );
        assert_eq!(row.text("password"), "punbb$s4lt$abc123");
        assert!(!row.contains("salt"));
        assert_eq!(row.int("group_id"), 3);
        assert_eq!(row.text("timezone"), "UTC");
    }

    #[test]
    fn test_every_entity_has_handlers() {
        let driver = PunBbDriver::new();
        for entity in Entity::ALL {
            let _ = driver.handlers(entity);
        }
    }
}
