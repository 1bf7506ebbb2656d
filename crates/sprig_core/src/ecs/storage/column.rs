use crate::ecs::ComponentRef;
use std::any::Any;

/// Type-erased query column. One slot per matched entity, in the same
/// order as the query's entity list.
pub(crate) trait Column {
    fn len(&self) -> usize;
    /// Move the last slot into `index` and shrink by one.
    fn swap_remove(&mut self, index: usize);
    fn clear(&mut self);
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Column of shared component handles. A slot is `None` when the entity
/// does not own the type, which only happens for optional types.
pub(crate) struct TypedColumn<T> {
    slots: Vec<Option<ComponentRef<T>>>,
}

impl<T> TypedColumn<T> {
    pub(crate) fn new() -> Self {
        Self { slots: Vec::new() }
    }

    pub(crate) fn slots(&self) -> &[Option<ComponentRef<T>>] {
        &self.slots
    }

    /// Write `slot` at `index`, appending when `index == len`.
    pub(crate) fn put(&mut self, index: usize, slot: Option<ComponentRef<T>>) {
        if index == self.slots.len() {
            self.slots.push(slot);
        } else {
            self.slots[index] = slot;
        }
    }
}

impl<T: 'static> Column for TypedColumn<T> {
    fn len(&self) -> usize {
        self.slots.len()
    }

    fn swap_remove(&mut self, index: usize) {
        self.slots.swap_remove(index);
    }

    fn clear(&mut self) {
        self.slots.clear();
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn put_appends_or_overwrites() {
        let mut column = TypedColumn::<u8>::new();
        column.put(0, Some(Rc::new(RefCell::new(1))));
        column.put(1, None);
        column.put(0, Some(Rc::new(RefCell::new(9))));
        assert_eq!(column.len(), 2);
        assert_eq!(*column.slots()[0].as_ref().unwrap().borrow(), 9);
        assert!(column.slots()[1].is_none());
    }

    #[test]
    fn swap_remove_moves_last_slot() {
        let mut column = TypedColumn::<u8>::new();
        for v in 0..3 {
            column.put(v as usize, Some(Rc::new(RefCell::new(v))));
        }
        Column::swap_remove(&mut column, 0);
        let values: Vec<u8> = column.slots().iter().map(|s| *s.as_ref().unwrap().borrow()).collect();
        assert_eq!(values, vec![2, 1]);
    }
}
