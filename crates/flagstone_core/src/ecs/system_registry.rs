use crate::ecs::component::ComponentRegistry;
use crate::ecs::system::System;
use crate::ecs::{SystemDescriptor, SystemHandle, SystemRegistrationError};
use std::collections::HashMap;

pub(crate) struct SystemRegistry {
    systems: Vec<System>,
    name_lookup: HashMap<String, SystemHandle>,
    capacity: usize,
}

impl SystemRegistry {
    pub fn new(capacity: usize) -> Self {
        Self {
            systems: Vec::new(),
            name_lookup: HashMap::new(),
            capacity,
        }
    }

    /// Resolve the descriptor's component names and append a new, empty system.
    pub fn register(
        &mut self,
        descriptor: SystemDescriptor,
        components: &ComponentRegistry,
    ) -> Result<&mut System, SystemRegistrationError> {
        let name_key = descriptor.name().to_string();
        if self.name_lookup.contains_key(&name_key) {
            return Err(SystemRegistrationError::DuplicateName { name: name_key });
        }

        let mut required = Vec::with_capacity(descriptor.components().len());
        for component in descriptor.components() {
            let resolved = components.lookup(component).ok_or_else(|| {
                SystemRegistrationError::UnknownComponent {
                    system: name_key.clone(),
                    component: component.clone(),
                }
            })?;
            required.push((resolved.id(), resolved.bit()));
        }

        let index = self.systems.len();
        let handle = SystemHandle::new(index as u32);
        self.name_lookup.insert(name_key.clone(), handle);
        self.systems
            .push(System::new(handle, name_key, required, self.capacity));

        Ok(&mut self.systems[index])
    }

    pub fn handle_of(&self, name: &str) -> Option<SystemHandle> {
        self.name_lookup.get(name).copied()
    }

    pub fn get(&self, handle: SystemHandle) -> Option<&System> {
        self.systems.get(handle.index())
    }

    pub fn by_name(&self, name: &str) -> Option<&System> {
        self.get(self.handle_of(name)?)
    }

    /// Systems in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &System> {
        self.systems.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut System> {
        self.systems.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.systems.len()
    }
}
