//! Binary snapshot of a world.
//!
//! The buffer has no header. It is only meaningful to a world with the same
//! registration history (components and schemas, systems, entity capacity)
//! and the same entity cursor as the one that wrote it. Layout, all integers
//! big-endian:
//!
//! 1. membership words, entity-major then generation-minor, for `0..cursor`
//! 2. every component in registration order, every flattened column in
//!    flatten order, rows `0..cursor` at the column's element width
//! 3. every system in registration order: a `u32` count then that many ids

mod codec;

use crate::ecs::{EntityId, World};
use codec::{ByteReader, ByteWriter};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("snapshot truncated: needed {needed} bytes at offset {offset}, buffer is {len} bytes")]
    TruncatedSnapshot {
        needed: usize,
        offset: usize,
        len: usize,
    },

    #[error("snapshot lists entity {entity} but the world has {max} entity slots")]
    EntityOutOfRange { entity: EntityId, max: usize },
}

impl World {
    /// Exact length of the buffer [`World::save`] returns right now.
    pub fn snapshot_size(&self) -> usize {
        let cursor = self.entity_cursor() as usize;
        let masks = cursor * self.generation_count() * 4;
        let fields: usize = self
            .components
            .iter()
            .map(|descriptor| descriptor.store().row_width() * cursor)
            .sum();
        let systems: usize = self.systems.iter().map(|system| 4 + system.len() * 4).sum();
        masks + fields + systems
    }

    /// Encode membership, field data and system subscriptions.
    pub fn save(&self) -> Vec<u8> {
        let cursor = self.entity_cursor();
        let generations = self.generation_count();
        let mut writer = ByteWriter::with_capacity(self.snapshot_size());

        for entity in 0..cursor {
            for generation in 0..generations {
                writer.put_u32(self.masks.word(generation, entity));
            }
        }

        for descriptor in self.components.iter() {
            for field in descriptor.store().flatten() {
                writer.put_column(field.column, cursor as usize);
            }
        }

        for system in self.systems.iter() {
            writer.put_u32(system.len() as u32);
            for &entity in system.entities() {
                writer.put_u32(entity);
            }
        }

        debug!(bytes = writer.len(), entities = cursor, "saved snapshot");
        writer.into_inner()
    }

    /// Overwrite this world's state from a buffer produced by [`World::save`].
    ///
    /// System lists are rebuilt by re-adding each stored id in order. On error
    /// the world may be partially overwritten and should be discarded.
    pub fn load(&mut self, bytes: &[u8]) -> Result<(), SnapshotError> {
        let cursor = self.entity_cursor();
        let generations = self.generation_count();
        let mut reader = ByteReader::new(bytes);

        for entity in 0..cursor {
            for generation in 0..generations {
                let word = reader.get_u32()?;
                if let Some(slot) = self.masks.word_mut(generation, entity) {
                    *slot = word;
                }
            }
        }

        for descriptor in self.components.iter_mut() {
            for column in descriptor.store_mut().flatten_mut() {
                reader.get_column(column, cursor as usize)?;
            }
        }

        let max = self.config().max_entities;
        for system in self.systems.iter_mut() {
            system.clear();
            let count = reader.get_u32()?;
            for _ in 0..count {
                let entity = reader.get_u32()?;
                if entity as usize >= max {
                    return Err(SnapshotError::EntityOutOfRange { entity, max });
                }
                system.add(entity);
            }
        }

        debug!(bytes = reader.offset(), entities = cursor, "loaded snapshot");
        Ok(())
    }
}
