use std::{collections::HashMap, fmt, sync::Arc};

use parking_lot::RwLock;
use support::{encoding::from_utf16, types::FieldDescriptor};

use crate::{error::Throwable, internal};

use self::{
    class::{ArrayElement, ClassKind, ClassRef},
    value::RuntimeValue,
};

pub mod class;
pub mod interner;
pub mod loader;
pub mod value;
pub mod well_known;

pub type ObjectRef = Arc<Object>;

/// A managed object. Identity is pointer identity of the [`ObjectRef`].
pub struct Object {
    class: ClassRef,
    body: ObjectBody,
}

pub enum ObjectBody {
    Instance(RwLock<HashMap<FieldDescriptor, RuntimeValue>>),
    Array(RwLock<Vec<RuntimeValue>>),
    String(BuiltinString),
}

/// An immutable string payload, stored as UTF-16 code units with its hash precomputed.
pub struct BuiltinString {
    pub value: Box<[u16]>,
    pub hash: i32,
}

impl Object {
    pub fn new_instance(class: ClassRef) -> Result<ObjectRef, Throwable> {
        if class.is_array() {
            return Err(internal!(
                "cannot create an instance of array class {}",
                class.name()
            ));
        }

        Ok(Arc::new(Self {
            class,
            body: ObjectBody::Instance(RwLock::new(HashMap::new())),
        }))
    }

    /// A new array with every slot holding the element type's default.
    pub fn new_array(class: ClassRef, length: usize) -> Result<ObjectRef, Throwable> {
        let fill = match class.kind() {
            ClassKind::PrimitiveArray(a) => match a.element {
                ArrayElement::Component(ty) => RuntimeValue::default_for(ty),
                ArrayElement::Down(_) => RuntimeValue::Null,
            },
            ClassKind::ObjectArray(_) => RuntimeValue::Null,
            ClassKind::Instance(_) => {
                return Err(internal!("{} is not an array class", class.name()));
            }
        };

        Ok(Arc::new(Self {
            class,
            body: ObjectBody::Array(RwLock::new(vec![fill; length])),
        }))
    }

    pub(crate) fn new_string(class: ClassRef, value: Box<[u16]>, hash: i32) -> ObjectRef {
        Arc::new(Self {
            class,
            body: ObjectBody::String(BuiltinString { value, hash }),
        })
    }

    pub fn class(&self) -> &ClassRef {
        &self.class
    }

    pub fn body(&self) -> &ObjectBody {
        &self.body
    }

    pub fn same(a: &ObjectRef, b: &ObjectRef) -> bool {
        Arc::ptr_eq(a, b)
    }

    pub fn field(&self, field: &FieldDescriptor) -> Option<RuntimeValue> {
        match &self.body {
            ObjectBody::Instance(fields) => fields.read().get(field).cloned(),
            _ => None,
        }
    }

    pub fn set_field(&self, field: FieldDescriptor, value: RuntimeValue) -> Result<(), Throwable> {
        match &self.body {
            ObjectBody::Instance(fields) => {
                fields.write().insert(field, value);
                Ok(())
            }
            _ => Err(internal!(
                "cannot set field {} on non-instance of {}",
                field,
                self.class.name()
            )),
        }
    }

    pub fn array_length(&self) -> Option<usize> {
        match &self.body {
            ObjectBody::Array(values) => Some(values.read().len()),
            _ => None,
        }
    }

    pub fn element(&self, index: usize) -> Option<RuntimeValue> {
        match &self.body {
            ObjectBody::Array(values) => values.read().get(index).cloned(),
            _ => None,
        }
    }

    pub fn set_element(&self, index: usize, value: RuntimeValue) -> Result<(), Throwable> {
        let ObjectBody::Array(values) = &self.body else {
            return Err(internal!("{} is not an array", self.class.name()));
        };

        let mut values = values.write();
        let len = values.len();
        let slot = values
            .get_mut(index)
            .ok_or_else(|| internal!("index {} out of bounds for length {}", index, len))?;
        *slot = value;
        Ok(())
    }

    pub fn string_units(&self) -> Option<&[u16]> {
        match &self.body {
            ObjectBody::String(s) => Some(&s.value),
            _ => None,
        }
    }

    pub fn string_hash(&self) -> Option<i32> {
        match &self.body {
            ObjectBody::String(s) => Some(s.hash),
            _ => None,
        }
    }

    pub fn as_string(&self) -> Option<String> {
        self.string_units().and_then(|units| from_utf16(units).ok())
    }
}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.body {
            ObjectBody::Instance(_) => write!(f, "{}@{:p}", self.class.name(), self),
            ObjectBody::Array(values) => {
                write!(f, "{}[{}]@{:p}", self.class.name(), values.read().len(), self)
            }
            ObjectBody::String(s) => match from_utf16(&s.value) {
                Ok(s) => write!(f, "{:?}", s),
                Err(_) => write!(f, "<malformed string>"),
            },
        }
    }
}
