use std::any::Any;
use std::cell::RefCell;
use std::rc::Rc;

use super::Table;

/// An opaque host object (§6.3). File handles (`io`) are the one kind the
/// core itself creates; hosts may register their own via the same shape.
pub struct UserData {
    pub data: Box<dyn Any>,
    pub metatable: Option<Rc<RefCell<Table>>>,
    pub type_name: &'static str,
}

impl UserData {
    pub fn new(type_name: &'static str, data: impl Any) -> Self {
        UserData { data: Box::new(data), metatable: None, type_name }
    }

    pub fn downcast_ref<T: 'static>(&self) -> Option<&T> {
        self.data.downcast_ref::<T>()
    }

    pub fn downcast_mut<T: 'static>(&mut self) -> Option<&mut T> {
        self.data.downcast_mut::<T>()
    }
}
