use std::{
    any::{Any, TypeId},
    collections::HashMap,
};

/// Heterogeneous map holding at most one value per type
#[derive(Default)]
pub(crate) struct TypeMap {
    inner: HashMap<TypeId, Box<dyn Any + Send>>,
}

impl TypeMap {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn len(&self) -> usize {
        self.inner.len()
    }

    pub(crate) fn get_mut<V: Any + Send>(&mut self) -> Option<&mut V> {
        self.inner
            .get_mut(&id!(V))
            .and_then(|value| value.downcast_mut())
    }

    pub(crate) fn get_or_insert_with<V: Any + Send>(&mut self, init: impl FnOnce() -> V) -> &mut V {
        let value = self
            .inner
            .entry(id!(V))
            .or_insert_with(|| Box::new(init()) as Box<dyn Any + Send>);
        match value.downcast_mut() {
            Some(value) => value,
            // entries are keyed by the TypeId of their own value
            None => unreachable!(),
        }
    }
}
