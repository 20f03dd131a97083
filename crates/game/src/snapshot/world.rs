use std::collections::HashMap;

use glam::Vec3;

use crate::net::EntityState;
use crate::services::EntityLifecycle;

use super::entity::{Entity, EntityFlags, EntityId, EntityKind};

#[derive(Debug)]
pub struct World {
    tick: u32,
    time: f64,
    entities: HashMap<EntityId, Entity>,
    next_entity_id: u32,
    removed_entities: Vec<EntityId>,
    pending_removals: Vec<(EntityId, f64)>,
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

impl World {
    pub fn new() -> Self {
        Self {
            tick: 0,
            time: 0.0,
            entities: HashMap::new(),
            next_entity_id: 1,
            removed_entities: Vec::new(),
            pending_removals: Vec::new(),
        }
    }

    pub fn tick(&self) -> u32 {
        self.tick
    }

    pub fn time(&self) -> f64 {
        self.time
    }

    pub fn set_time(&mut self, time: f64) {
        self.time = self.time.max(time);
    }

    pub fn advance_tick(&mut self) {
        self.tick = self.tick.wrapping_add(1);
    }

    pub fn time_ms(&self) -> u64 {
        (self.time * 1000.0) as u64
    }

    pub fn spawn(&mut self, kind: EntityKind) -> EntityId {
        let id = self.allocate_id();
        self.entities.insert(id, Entity::new(id, kind));
        id
    }

    pub fn spawn_at(&mut self, kind: EntityKind, position: Vec3) -> EntityId {
        let id = self.spawn(kind);
        if let Some(entity) = self.entities.get_mut(&id) {
            entity.position = position;
        }
        id
    }

    pub fn insert(&mut self, entity: Entity) -> EntityId {
        let id = entity.id;
        if id.0 >= self.next_entity_id {
            self.next_entity_id = id.0 + 1;
        }
        self.entities.insert(id, entity);
        id
    }

    pub fn despawn(&mut self, id: EntityId) -> Option<Entity> {
        let entity = self.entities.remove(&id);
        if entity.is_some() {
            self.removed_entities.push(id);
            self.pending_removals.retain(|(pending, _)| *pending != id);
        }
        entity
    }

    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(&id)
    }

    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.get_mut(&id)
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.entities.contains_key(&id)
    }

    pub fn entities(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values()
    }

    pub fn entities_mut(&mut self) -> impl Iterator<Item = &mut Entity> {
        self.entities.values_mut()
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    pub fn removed_entities(&self) -> &[EntityId] {
        &self.removed_entities
    }

    /// Despawns every entity whose scheduled removal time has passed.
    pub fn expire_removals(&mut self) -> Vec<Entity> {
        let now = self.time;
        let (due, pending): (Vec<_>, Vec<_>) = self
            .pending_removals
            .drain(..)
            .partition(|(_, at)| *at <= now);
        self.pending_removals = pending;

        due.into_iter()
            .filter_map(|(id, _)| self.despawn(id))
            .collect()
    }

    pub fn full_states(&self) -> Vec<EntityState> {
        self.entities.values().map(Entity::to_network_state).collect()
    }

    pub fn dirty_states(&self) -> Vec<EntityState> {
        self.entities
            .values()
            .filter(|e| e.dirty)
            .map(Entity::to_network_state)
            .collect()
    }

    /// Clears per-entity dirty flags and the removal list once they have been published.
    pub fn clear_replication_state(&mut self) -> Vec<EntityId> {
        for entity in self.entities.values_mut() {
            entity.dirty = false;
        }
        std::mem::take(&mut self.removed_entities)
    }

    fn allocate_id(&mut self) -> EntityId {
        let id = self.next_entity_id;
        self.next_entity_id += 1;
        EntityId(id)
    }
}

impl EntityLifecycle for World {
    fn spawn(&mut self, kind: EntityKind, position: Vec3, velocity: Vec3) -> EntityId {
        let id = self.spawn_at(kind, position);
        if let Some(entity) = self.entities.get_mut(&id) {
            entity.velocity = velocity;
        }
        id
    }

    fn destroy(&mut self, entity: EntityId) -> bool {
        self.despawn(entity).is_some()
    }

    fn schedule_removal(&mut self, entity: EntityId, delay: f64) {
        let Some(target) = self.entities.get_mut(&entity) else {
            return;
        };
        target.flags.insert(EntityFlags::PENDING_REMOVAL);
        let at = self.time + delay.max(0.0);
        match self.pending_removals.iter_mut().find(|(id, _)| *id == entity) {
            Some(slot) => slot.1 = slot.1.min(at),
            None => self.pending_removals.push((entity, at)),
        }
    }
}
