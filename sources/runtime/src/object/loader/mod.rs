use std::{
    collections::HashMap,
    sync::{Arc, OnceLock},
};

use parking_lot::RwLock;
use support::descriptor::BaseType;
use tracing::{debug, info};

use crate::{error::Throwable, internal};

use self::{
    classpath::{ClassPath, ClassSource},
    parser::{ClassFileParser, DefaultParser},
    plan::{ArrayPlan, ElementPlan, LoadPlan},
};

use super::{
    class::{
        ArrayClass, ArrayElement, ClassId, ClassKind, ClassObject, ClassRef, InstanceClass,
        LoaderId,
    },
    ObjectRef,
};

pub mod classpath;
pub mod parser;
pub mod plan;

#[derive(Default)]
struct ClassTable {
    classes: Vec<ClassRef>,
    by_name: HashMap<String, ClassId>,
}

/// The boot class loader.
///
/// Owns every class it defines; classes refer to each other by [`ClassId`].
/// Loading the same name twice hands back the class defined the first time.
pub struct ClassLoader {
    id: LoaderId,
    class_path: Box<dyn ClassPath>,
    parser: Box<dyn ClassFileParser>,
    table: RwLock<ClassTable>,
    delegate: OnceLock<ObjectRef>,
}

impl ClassLoader {
    pub fn new(class_path: impl ClassPath + 'static) -> Self {
        Self::with_parser(class_path, DefaultParser)
    }

    pub fn with_parser(
        class_path: impl ClassPath + 'static,
        parser: impl ClassFileParser + 'static,
    ) -> Self {
        Self {
            id: LoaderId::next(),
            class_path: Box::new(class_path),
            parser: Box::new(parser),
            table: RwLock::new(ClassTable::default()),
            delegate: OnceLock::new(),
        }
    }

    pub fn id(&self) -> LoaderId {
        self.id
    }

    /// Loads a class by binary name or array descriptor.
    ///
    /// `Ok(None)` means the class (or an array's component) could not be found.
    pub fn load_class(&self, name: &str) -> Result<Option<ClassRef>, Throwable> {
        if let Some(class) = self.find_loaded(name) {
            debug!("Fast path: {}", name);
            return Ok(Some(class));
        }

        debug!("Slow path: {}", name);
        match plan::resolve(name)? {
            LoadPlan::Instance(name) => self.load_instance(&name),
            LoadPlan::ObjectArray(plan) => self.load_object_array(&plan),
            LoadPlan::PrimitiveArray(plan) => self.load_primitive_array(&plan),
        }
    }

    /// Defines a class straight from class file bytes, bypassing the class path.
    pub fn load_from_bytes(&self, bytes: &[u8]) -> Result<ClassRef, Throwable> {
        let class_file = self
            .parser
            .parse("<stream>", bytes)
            .map_err(|cause| Throwable::ClassFormat {
                name: "<stream>".to_string(),
                cause,
            })?;

        let name = class_file.this_class.clone();
        if self.find_loaded(&name).is_some() {
            return Err(internal!("duplicate class definition: {}", name));
        }

        Ok(self.define(
            name,
            ClassKind::Instance(InstanceClass {
                class_file,
                source: None,
            }),
        ))
    }

    pub fn find_loaded(&self, name: &str) -> Option<ClassRef> {
        let table = self.table.read();
        table
            .by_name
            .get(name)
            .and_then(|id| table.classes.get(id.0 as usize))
            .cloned()
    }

    pub fn class(&self, id: ClassId) -> Option<ClassRef> {
        self.table.read().classes.get(id.0 as usize).cloned()
    }

    /// Every class defined so far, in definition order.
    pub fn classes(&self) -> Vec<ClassRef> {
        self.table.read().classes.clone()
    }

    /// The class one level inside an array class: the down array, or the component class
    /// for a one dimensional object array. `None` for primitive components and instance classes.
    pub fn element_class(&self, class: &ClassObject) -> Option<ClassRef> {
        let id = match class.kind() {
            ClassKind::ObjectArray(ArrayClass { element, .. }) => match element {
                ArrayElement::Component(id) | ArrayElement::Down(id) => *id,
            },
            ClassKind::PrimitiveArray(ArrayClass {
                element: ArrayElement::Down(id),
                ..
            }) => *id,
            _ => return None,
        };

        self.class(id)
    }

    pub fn set_delegate(&self, delegate: ObjectRef) -> Result<(), Throwable> {
        self.delegate
            .set(delegate)
            .map_err(|_| internal!("delegate loader was already set"))
    }

    pub fn delegate(&self) -> Option<&ObjectRef> {
        self.delegate.get()
    }

    fn load_instance(&self, name: &str) -> Result<Option<ClassRef>, Throwable> {
        let Some(found) = self.class_path.search(name) else {
            debug!("{} is not on the class path", name);
            return Ok(None);
        };

        let source = found.source().clone();
        let parsed = self.parser.parse(&source.to_string(), found.bytes());
        found.close_resource();

        let class_file = parsed.map_err(|cause| Throwable::ClassFormat {
            name: name.to_string(),
            cause,
        })?;

        if class_file.this_class != name {
            return Err(Throwable::ClassFormat {
                name: name.to_string(),
                cause: anyhow::anyhow!("wrong name: {}", class_file.this_class),
            });
        }

        info!("Loaded {} from {}", name, source);
        Ok(Some(self.define(
            name.to_string(),
            ClassKind::Instance(InstanceClass {
                class_file,
                source: Some(source),
            }),
        )))
    }

    fn load_object_array(&self, plan: &ArrayPlan<String>) -> Result<Option<ClassRef>, Throwable> {
        if let Some(class) = self.find_loaded(&plan.descriptor) {
            return Ok(Some(class));
        }

        let element = match &plan.element {
            ElementPlan::Component(name) => match self.load_class(name)? {
                Some(component) => ArrayElement::Component(component.id()),
                None => return Ok(None),
            },
            ElementPlan::Down(down) => match self.load_object_array(down)? {
                Some(down) => ArrayElement::Down(down.id()),
                None => return Ok(None),
            },
        };

        Ok(Some(self.define(
            plan.descriptor.clone(),
            ClassKind::ObjectArray(ArrayClass {
                dimension: plan.dimension,
                element,
            }),
        )))
    }

    fn load_primitive_array(
        &self,
        plan: &ArrayPlan<BaseType>,
    ) -> Result<Option<ClassRef>, Throwable> {
        if let Some(class) = self.find_loaded(&plan.descriptor) {
            return Ok(Some(class));
        }

        let element = match &plan.element {
            ElementPlan::Component(ty) => ArrayElement::Component(*ty),
            ElementPlan::Down(down) => match self.load_primitive_array(down)? {
                Some(down) => ArrayElement::Down(down.id()),
                None => return Ok(None),
            },
        };

        Ok(Some(self.define(
            plan.descriptor.clone(),
            ClassKind::PrimitiveArray(ArrayClass {
                dimension: plan.dimension,
                element,
            }),
        )))
    }

    /// Registers a class unless another thread beat us to the name, in which case theirs is returned.
    fn define(&self, name: String, kind: ClassKind) -> ClassRef {
        let mut table = self.table.write();
        if let Some(existing) = table.by_name.get(&name) {
            return Arc::clone(&table.classes[existing.0 as usize]);
        }

        let id = ClassId(table.classes.len() as u32);
        let class = Arc::new(ClassObject::new(id, self.id, name.clone(), kind));
        table.classes.push(Arc::clone(&class));
        table.by_name.insert(name, id);

        class
    }
}
