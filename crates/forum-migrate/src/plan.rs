//! Step numbering over the entity catalogue.

use crate::entity::Entity;
use crate::error::{MigrateError, Result};

/// What a step number means.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepKind {
    /// Step 0: schema creation and tracking columns.
    Setup,
    /// Steps 1..K-1: one entity each.
    Entity(Entity),
    /// Step K: tracking columns removed; the run is complete.
    Cleanup,
}

/// Ordered entity list indexed by step number.
#[derive(Debug, Clone)]
pub struct MigrationPlan {
    entities: Vec<Entity>,
}

impl Default for MigrationPlan {
    fn default() -> Self {
        Self::new(Entity::ALL.to_vec())
    }
}

impl MigrationPlan {
    pub fn new(entities: Vec<Entity>) -> Self {
        Self { entities }
    }

    /// The step number of the cleanup state (`K`).
    pub fn cleanup_step(&self) -> i64 {
        self.entities.len() as i64 + 1
    }

    /// Step number of an entity.
    pub fn step_of(&self, entity: Entity) -> Option<i64> {
        self.entities
            .iter()
            .position(|e| *e == entity)
            .map(|i| i as i64 + 1)
    }

    /// Interpret a step number.
    pub fn kind(&self, step: i64) -> Result<StepKind> {
        if step == 0 {
            return Ok(StepKind::Setup);
        }
        if step == self.cleanup_step() {
            return Ok(StepKind::Cleanup);
        }
        usize::try_from(step - 1)
            .ok()
            .and_then(|i| self.entities.get(i))
            .map(|e| StepKind::Entity(*e))
            .ok_or_else(|| MigrateError::State(format!("Step {} is outside the plan", step)))
    }

    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    /// Destination tables carrying `id_old` during the run, without duplicates.
    pub fn tracked_tables(&self) -> Vec<&'static str> {
        let mut tables: Vec<&'static str> = Vec::new();
        for entity in &self.entities {
            if entity.tracks_id_old() && !tables.contains(&entity.table()) {
                tables.push(entity.table());
            }
        }
        tables
    }

    /// Check that every remap points at an entity that is already complete
    /// (or at the entity itself) when the referencing entity finishes.
    pub fn validate(&self) -> Result<()> {
        for (i, entity) in self.entities.iter().enumerate() {
            if self.entities[..i].contains(entity) {
                return Err(MigrateError::Config(format!(
                    "Entity {} appears twice in the plan",
                    entity
                )));
            }
            let own = i as i64 + 1;
            for remap in entity.remaps() {
                match self.step_of(remap.target) {
                    Some(target) if target <= own => {}
                    Some(target) => {
                        return Err(MigrateError::Config(format!(
                            "{}.{} references {} (step {}) which runs after step {}",
                            entity, remap.column, remap.target, target, own
                        )))
                    }
                    None => {
                        return Err(MigrateError::Config(format!(
                            "{}.{} references {} which is not in the plan",
                            entity, remap.column, remap.target
                        )))
                    }
                }
            }
        }
        Ok(())
    }
}
