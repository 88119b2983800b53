// Ordered, compacting collection of live tanks keyed by entity id.

use crate::domain::state::Tank;

/// Hard cap on simultaneous tanks in one session. Joins past this are
/// rejected before an entity is created.
pub const MAX_TANKS: usize = 15;

#[derive(Debug, PartialEq, Eq)]
pub enum RegistryError {
    Full,
    DuplicateId,
    UnknownId,
}

/// Slot order is insertion order, but slots are not stable identities:
/// removal compacts the collection, so callers must always re-resolve
/// tanks by id.
pub struct TankRegistry {
    tanks: Vec<Tank>,
}

impl Default for TankRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl TankRegistry {
    pub fn new() -> Self {
        Self {
            tanks: Vec::with_capacity(MAX_TANKS),
        }
    }

    pub fn len(&self) -> usize {
        self.tanks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tanks.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.tanks.len() >= MAX_TANKS
    }

    pub fn add(&mut self, tank: Tank) -> Result<(), RegistryError> {
        if self.is_full() {
            return Err(RegistryError::Full);
        }
        if self.get(tank.id).is_some() {
            return Err(RegistryError::DuplicateId);
        }
        self.tanks.push(tank);
        Ok(())
    }

    /// Removes by id and left-shifts all later entries into the gap.
    pub fn remove(&mut self, id: u8) -> Result<Tank, RegistryError> {
        let index = self
            .tanks
            .iter()
            .position(|t| t.id == id)
            .ok_or(RegistryError::UnknownId)?;
        Ok(self.tanks.remove(index))
    }

    pub fn get(&self, id: u8) -> Option<&Tank> {
        self.tanks.iter().find(|t| t.id == id)
    }

    pub fn get_mut(&mut self, id: u8) -> Option<&mut Tank> {
        self.tanks.iter_mut().find(|t| t.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Tank> + '_ {
        self.tanks.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Tank> + '_ {
        self.tanks.iter_mut()
    }
}
