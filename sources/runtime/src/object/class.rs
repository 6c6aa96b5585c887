use std::{
    collections::HashMap,
    fmt,
    sync::{
        atomic::{AtomicU32, AtomicU8, Ordering},
        Arc, OnceLock,
    },
};

use parking_lot::RwLock;
use parse::{
    classfile::{ClassFile, Method},
    flags::MethodAccessFlags,
};
use support::{
    descriptor::BaseType,
    types::{FieldDescriptor, MethodDescriptor},
};

use super::{loader::classpath::ClassSource, value::RuntimeValue};

pub type ClassRef = Arc<ClassObject>;

/// Identifies the loader that defined a class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LoaderId(u32);

impl LoaderId {
    pub(crate) fn next() -> Self {
        static NEXT: AtomicU32 = AtomicU32::new(0);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

/// Index of a class inside its loader's arena.
/// Only meaningful together with the [`LoaderId`] of that loader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClassId(pub(crate) u32);

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassState {
    NotLoaded = 0,
    Loaded = 1,
    BeingInitialized = 2,
    FullyInitialized = 3,
}

impl ClassState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => ClassState::Loaded,
            2 => ClassState::BeingInitialized,
            3 => ClassState::FullyInitialized,
            _ => ClassState::NotLoaded,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassRole {
    Ordinary,
    CoreLibrary,
    Exception,
}

pub struct InstanceClass {
    pub class_file: ClassFile,
    pub source: Option<ClassSource>,
}

/// What an array class holds one level down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArrayElement<C> {
    /// Dimension 1: the terminal component.
    Component(C),
    /// Dimension > 1: the array class one dimension lower.
    Down(ClassId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArrayClass<C> {
    pub dimension: usize,
    pub element: ArrayElement<C>,
}

pub enum ClassKind {
    Instance(InstanceClass),
    ObjectArray(ArrayClass<ClassId>),
    PrimitiveArray(ArrayClass<BaseType>),
}

impl fmt::Debug for ClassKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClassKind::Instance(_) => write!(f, "Instance"),
            ClassKind::ObjectArray(a) => write!(f, "ObjectArray({:?})", a),
            ClassKind::PrimitiveArray(a) => write!(f, "PrimitiveArray({:?})", a),
        }
    }
}

pub struct ClassObject {
    id: ClassId,
    loader: LoaderId,
    name: String,
    kind: ClassKind,
    state: AtomicU8,
    role: OnceLock<ClassRole>,
    statics: RwLock<HashMap<FieldDescriptor, RuntimeValue>>,
}

impl ClassObject {
    pub(crate) fn new(id: ClassId, loader: LoaderId, name: String, kind: ClassKind) -> Self {
        Self {
            id,
            loader,
            name,
            kind,
            state: AtomicU8::new(ClassState::Loaded as u8),
            role: OnceLock::new(),
            statics: RwLock::new(HashMap::new()),
        }
    }

    pub fn id(&self) -> ClassId {
        self.id
    }

    pub fn loader(&self) -> LoaderId {
        self.loader
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &ClassKind {
        &self.kind
    }

    pub fn is_array(&self) -> bool {
        !matches!(self.kind, ClassKind::Instance(_))
    }

    pub fn dimension(&self) -> Option<usize> {
        match &self.kind {
            ClassKind::Instance(_) => None,
            ClassKind::ObjectArray(a) => Some(a.dimension),
            ClassKind::PrimitiveArray(a) => Some(a.dimension),
        }
    }

    pub fn class_file(&self) -> Option<&ClassFile> {
        match &self.kind {
            ClassKind::Instance(i) => Some(&i.class_file),
            _ => None,
        }
    }

    pub fn source(&self) -> Option<&ClassSource> {
        match &self.kind {
            ClassKind::Instance(i) => i.source.as_ref(),
            _ => None,
        }
    }

    /// Arrays extend Object, as does every class without an explicit super class, save Object itself.
    pub fn super_class_name(&self) -> Option<&str> {
        match &self.kind {
            ClassKind::Instance(i) => i.class_file.super_class.as_deref(),
            _ => Some("java/lang/Object"),
        }
    }

    pub fn state(&self) -> ClassState {
        ClassState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub fn set_state(&self, state: ClassState) {
        self.state.store(state as u8, Ordering::Release);
    }

    /// Moves from `from` to `to`, failing if another thread got there first.
    pub fn transition(&self, from: ClassState, to: ClassState) -> bool {
        self.state
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub fn role(&self) -> ClassRole {
        self.role.get().copied().unwrap_or(ClassRole::Ordinary)
    }

    /// Tags the class. The first tag sticks; returns whether this call set it.
    pub fn tag(&self, role: ClassRole) -> bool {
        self.role.set(role).is_ok()
    }

    pub fn get_static(&self, field: &FieldDescriptor) -> Option<RuntimeValue> {
        self.statics.read().get(field).cloned()
    }

    pub fn set_static(&self, field: FieldDescriptor, value: RuntimeValue) {
        self.statics.write().insert(field, value);
    }

    fn declared_method(&self, key: &MethodDescriptor) -> Option<&Method> {
        let descriptor = key.descriptor().to_string();
        self.class_file()?.locate_method(key.name(), &descriptor)
    }

    /// Any method declared directly by this class.
    pub fn get_this_class_method(self: &Arc<Self>, key: &MethodDescriptor) -> Option<MethodRef> {
        let method = self.declared_method(key)?;
        Some(MethodRef {
            class: Arc::clone(self),
            key: key.clone(),
            flags: method.flags,
        })
    }

    /// A static method declared by this class.
    pub fn get_static_method(self: &Arc<Self>, key: &MethodDescriptor) -> Option<MethodRef> {
        self.get_this_class_method(key)
            .filter(|m| m.flags.contains(MethodAccessFlags::STATIC))
    }

    /// A non-static method declared by this class.
    pub fn get_method(self: &Arc<Self>, key: &MethodDescriptor) -> Option<MethodRef> {
        self.get_this_class_method(key)
            .filter(|m| !m.flags.contains(MethodAccessFlags::STATIC))
    }
}

impl fmt::Debug for ClassObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassObject")
            .field("name", &self.name)
            .field("id", &self.id)
            .field("loader", &self.loader)
            .field("kind", &self.kind)
            .field("state", &self.state())
            .finish()
    }
}

/// A resolved method, ready to be invoked.
#[derive(Clone)]
pub struct MethodRef {
    class: ClassRef,
    key: MethodDescriptor,
    flags: MethodAccessFlags,
}

impl MethodRef {
    pub fn class(&self) -> &ClassRef {
        &self.class
    }

    pub fn key(&self) -> &MethodDescriptor {
        &self.key
    }

    pub fn flags(&self) -> MethodAccessFlags {
        self.flags
    }

    pub fn is_static(&self) -> bool {
        self.flags.contains(MethodAccessFlags::STATIC)
    }
}

impl fmt::Debug for MethodRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.class.name(), self.key)
    }
}

impl fmt::Display for MethodRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.class.name(), self.key)
    }
}
