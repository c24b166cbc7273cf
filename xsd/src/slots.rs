use super::component::ComponentId;

/// Attachable per-component extension slots.
///
/// A dense side table indexed by [`ComponentId`]; the schema model itself stays free of
/// consumer-specific state. Slots are write-once: a value, once attached, is never replaced.
#[derive(Clone, Debug)]
pub struct ComponentSlots<T> {
    slots: Vec<Option<T>>,
}

impl<T> Default for ComponentSlots<T> {
    fn default() -> Self {
        Self { slots: Vec::new() }
    }
}

impl<T> ComponentSlots<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: ComponentId) -> Option<&T> {
        self.slots.get(id.index()).and_then(Option::as_ref)
    }

    pub fn get_mut(&mut self, id: ComponentId) -> Option<&mut T> {
        self.slots.get_mut(id.index()).and_then(Option::as_mut)
    }

    pub fn contains(&self, id: ComponentId) -> bool {
        self.get(id).is_some()
    }

    /// Attaches `value` to the component. If a value is already attached it is kept, and the
    /// rejected `value` is handed back.
    pub fn attach(&mut self, id: ComponentId, value: T) -> Result<&mut T, T> {
        let index = id.index();
        if self.slots.len() <= index {
            self.slots.resize_with(index + 1, || None);
        }
        let slot = &mut self.slots[index];
        if slot.is_some() {
            return Err(value);
        }
        Ok(slot.insert(value))
    }

    pub fn iter(&self) -> impl Iterator<Item = (ComponentId, &T)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(index, slot)| slot.as_ref().map(|v| (ComponentId::from_index(index), v)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slots_are_write_once() {
        let mut slots = ComponentSlots::new();
        let id = ComponentId::from_index(4);
        assert!(!slots.contains(id));
        assert_eq!(*slots.attach(id, "first").unwrap(), "first");
        assert_eq!(slots.attach(id, "second"), Err("second"));
        assert_eq!(slots.get(id), Some(&"first"));
        assert_eq!(slots.get(ComponentId::from_index(2)), None);
        assert_eq!(slots.iter().count(), 1);
    }
}
