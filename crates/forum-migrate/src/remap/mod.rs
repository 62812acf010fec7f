//! Reference remapping and collision resolution.
//!
//! - [`lookup`]: `id_old` based lookups for values embedded in text
//! - [`sweep`]: deferred foreign-key resolution per entity
//! - [`collision`]: username/email renaming on unique violations
//! - [`rename`]: the persisted original-to-final maps

pub mod collision;
pub mod lookup;
pub mod rename;
pub mod sweep;

pub use collision::{
    next_email, next_username, normalize_email, normalize_username, MAX_SUFFIX_ATTEMPTS,
};
pub use lookup::IdRemapper;
pub use rename::RenameMap;
pub use sweep::RemapSweep;

use crate::core::Row;
use crate::entity::Remap;

/// Mark the remapped columns of a freshly translated row as pending.
///
/// Positive values that are not preserved are negated; the entity's sweep
/// resolves them later.
pub fn mark_pending(row: &mut Row, remaps: &[Remap]) {
    for remap in remaps {
        let value = row.int(remap.column);
        if value > 0 && !remap.preserve.contains(&value) {
            row.set(remap.column, -value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::Entity;

    #[test]
    fn test_mark_pending_keeps_guest_and_zero() {
        let mut row = Row::new()
            .with("topic_id", 12)
            .with("poster_id", 1)
            .with("editor_id", 0);
        mark_pending(&mut row, Entity::Posts.remaps());
        assert_eq!(row.int("topic_id"), -12);
        assert_eq!(row.int("poster_id"), 1);
        assert_eq!(row.int("editor_id"), 0);
    }

    #[test]
    fn test_mark_pending_is_not_reapplied() {
        let mut row = Row::new().with("topic_id", -12);
        mark_pending(&mut row, Entity::Posts.remaps());
        assert_eq!(row.int("topic_id"), -12);
    }
}
