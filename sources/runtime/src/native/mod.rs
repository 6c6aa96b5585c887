use std::{collections::HashMap, sync::Arc};

use support::types::MethodDescriptor;

use crate::{
    error::Throwable,
    object::{
        class::{ClassRef, MethodRef},
        value::RuntimeValue,
    },
    thread::JavaThread,
    vm::VM,
};

pub mod lang;
pub mod nio;

pub type NativeStaticFunction = Arc<
    dyn Fn(
            // this-class
            ClassRef,
            // args
            Vec<RuntimeValue>,
            &VM,
            &JavaThread,
        ) -> Result<Option<RuntimeValue>, Throwable>
        + Send
        + Sync,
>;

#[derive(Clone)]
pub enum NativeFunction {
    Static(NativeStaticFunction),
}

impl NativeFunction {
    pub fn call(
        &self,
        method: &MethodRef,
        args: Vec<RuntimeValue>,
        vm: &VM,
        thread: &JavaThread,
    ) -> Result<Option<RuntimeValue>, Throwable> {
        match self {
            NativeFunction::Static(f) => f(method.class().clone(), args, vm, thread),
        }
    }
}

/// A set of replacements for methods of one class.
pub trait NativeModule: Send + Sync {
    fn classname(&self) -> &'static str;
    fn init(&mut self) -> Result<(), Throwable>;

    fn methods(&self) -> &HashMap<MethodDescriptor, NativeFunction>;
    fn methods_mut(&mut self) -> &mut HashMap<MethodDescriptor, NativeFunction>;

    fn get_method(&self, method: &MethodDescriptor) -> Option<&NativeFunction> {
        self.methods().get(method)
    }

    // Takes the raw pair because this trait must stay object safe.
    fn set_method(
        &mut self,
        method: (&'static str, &'static str),
        func: NativeFunction,
    ) -> Result<(), Throwable> {
        self.methods_mut().insert(method.try_into()?, func);
        Ok(())
    }
}

/// Method overrides, keyed by class then method.
#[derive(Default)]
pub struct NativeOverrides {
    modules: HashMap<&'static str, Box<dyn NativeModule>>,
}

impl NativeOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn install(&mut self, module: Box<dyn NativeModule>) {
        self.modules.insert(module.classname(), module);
    }

    pub fn get(&self, class_name: &str, method: &MethodDescriptor) -> Option<NativeFunction> {
        self.modules
            .get(class_name)
            .and_then(|m| m.get_method(method))
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.modules.values().map(|m| m.methods().len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// The overrides bootstrap installs.
pub fn builtin_modules() -> Result<Vec<Box<dyn NativeModule>>, Throwable> {
    let mut modules: Vec<Box<dyn NativeModule>> = vec![
        Box::new(nio::StreamEncoder::new()),
        Box::new(lang::LangSystem::new()),
    ];

    for module in modules.iter_mut() {
        module.init()?;
    }

    Ok(modules)
}

#[macro_export]
macro_rules! static_method {
    ($method: expr) => {
        NativeFunction::Static(std::sync::Arc::new($method))
    };
}

#[macro_export]
macro_rules! module_base {
    ($ty: ident) => {
        pub struct $ty {
            methods: HashMap<MethodDescriptor, NativeFunction>,
        }

        impl $ty {
            pub fn new() -> Self {
                Self {
                    methods: HashMap::new(),
                }
            }
        }
    };
}
