use std::sync::{
    atomic::{AtomicU8, Ordering},
    Arc, OnceLock,
};

use parking_lot::RwLock;
use support::types::FieldDescriptor;
use tracing::{debug, info};

use crate::{
    bootstrap::BootState,
    error::{self, Throwable, VMError},
    execution::Execution,
    internal,
    native::NativeOverrides,
    object::{
        class::{ClassRef, ClassState, MethodRef},
        interner::StringInterner,
        loader::ClassLoader,
        value::RuntimeValue,
        well_known::{names, WellKnownClasses},
        Object, ObjectRef,
    },
    thread::{JavaThread, Threads},
};

pub const DEFAULT_DELEGATE_LOADER: &str = "kate/loader/BootstrapDelegate";

#[derive(Debug, Clone)]
pub struct BootOptions {
    /// Class constructed at the end of bootstrap and recorded as the loader's delegate.
    /// Skipped when `None` or when the class is not on the class path.
    pub delegate_loader_class: Option<String>,
}

impl Default for BootOptions {
    fn default() -> Self {
        Self {
            delegate_loader_class: Some(DEFAULT_DELEGATE_LOADER.to_string()),
        }
    }
}

pub struct VM {
    class_loader: ClassLoader,
    engine: Box<dyn Execution>,
    natives: RwLock<NativeOverrides>,
    interner: StringInterner,
    threads: Arc<Threads>,
    pub(crate) well_known: OnceLock<WellKnownClasses>,
    pub(crate) boot_state: AtomicU8,
    pub(crate) default_charset: OnceLock<ObjectRef>,
    options: BootOptions,
}

impl VM {
    pub fn new(class_loader: ClassLoader, engine: impl Execution + 'static) -> Self {
        Self::with_options(class_loader, engine, BootOptions::default())
    }

    pub fn with_options(
        class_loader: ClassLoader,
        engine: impl Execution + 'static,
        options: BootOptions,
    ) -> Self {
        Self {
            class_loader,
            engine: Box::new(engine),
            natives: RwLock::new(NativeOverrides::new()),
            interner: StringInterner::new(),
            threads: Arc::new(Threads::new()),
            well_known: OnceLock::new(),
            boot_state: AtomicU8::new(BootState::NotBooted as u8),
            default_charset: OnceLock::new(),
            options,
        }
    }

    pub fn class_loader(&self) -> &ClassLoader {
        &self.class_loader
    }

    pub fn interner(&self) -> &StringInterner {
        &self.interner
    }

    pub fn threads(&self) -> &Arc<Threads> {
        &self.threads
    }

    pub fn natives(&self) -> &RwLock<NativeOverrides> {
        &self.natives
    }

    pub fn options(&self) -> &BootOptions {
        &self.options
    }

    /// Populated by bootstrap. `None` before then.
    pub fn well_known(&self) -> Option<&WellKnownClasses> {
        self.well_known.get()
    }

    pub fn default_charset(&self) -> Option<&ObjectRef> {
        self.default_charset.get()
    }

    pub fn boot_state(&self) -> BootState {
        BootState::from_u8(self.boot_state.load(Ordering::Acquire))
    }

    pub fn is_booted(&self) -> bool {
        self.boot_state() == BootState::Booted
    }

    pub fn intern(&self, value: &str) -> Result<ObjectRef, Throwable> {
        self.interner.find_or_new(value)
    }

    /// Runs a class's static initialiser, after its super class's.
    ///
    /// Classes already initialised, or being initialised, are left alone.
    /// If the initialiser fails the class drops back to loaded and the error is returned.
    pub fn initialize_class(&self, thread: &JavaThread, class: &ClassRef) -> Result<(), Throwable> {
        match class.state() {
            ClassState::FullyInitialized | ClassState::BeingInitialized => return Ok(()),
            ClassState::NotLoaded => {
                return Err(internal!("cannot initialize {}, it is not loaded", class.name()))
            }
            ClassState::Loaded => {}
        }

        if class.is_array() {
            class.set_state(ClassState::FullyInitialized);
            return Ok(());
        }

        if !class.transition(ClassState::Loaded, ClassState::BeingInitialized) {
            debug!("{} is being initialized elsewhere", class.name());
            return Ok(());
        }

        match self.run_initializers(thread, class) {
            Ok(()) => {
                class.set_state(ClassState::FullyInitialized);
                info!("Initialized {}", class.name());
                Ok(())
            }
            Err(e) => {
                class.set_state(ClassState::Loaded);
                Err(e)
            }
        }
    }

    fn run_initializers(&self, thread: &JavaThread, class: &ClassRef) -> Result<(), Throwable> {
        if let Some(super_name) = class.super_class_name() {
            let super_class = self.class_loader.load_class(super_name)?.ok_or_else(|| {
                internal!("super class {} of {} not found", super_name, class.name())
            })?;

            self.initialize_class(thread, &super_class)?;
        }

        if let Some(clinit) = class.get_static_method(&("<clinit>", "()V").try_into()?) {
            debug!("Running {}", clinit);
            self.invoke(thread, &clinit, vec![])?;
        }

        Ok(())
    }

    /// Calls a method, going through the override table first.
    pub fn invoke(
        &self,
        thread: &JavaThread,
        method: &MethodRef,
        args: Vec<RuntimeValue>,
    ) -> Result<Option<RuntimeValue>, Throwable> {
        let native = self.natives.read().get(method.class().name(), method.key());
        if let Some(native) = native {
            debug!("Dispatching {} to its override", method);
            return native.call(method, args, self, thread);
        }

        self.engine.invoke(self, thread, method, args)
    }

    /// A `String[]` holding interned copies of `values`, in order.
    pub fn new_string_array(&self, values: &[String]) -> Result<ObjectRef, Throwable> {
        let array_class = self
            .class_loader
            .load_class(names::STRING_ARRAY)?
            .ok_or_else(|| internal!("could not load {}", names::STRING_ARRAY))?;

        let array = Object::new_array(array_class, values.len())?;
        for (index, value) in values.iter().enumerate() {
            array.set_element(index, RuntimeValue::Object(self.intern(value)?))?;
        }

        Ok(array)
    }

    /// Try and make the error. This fails before bootstrap has captured the exception classes.
    pub fn try_make_error(&self, ty: VMError) -> Result<Throwable, Throwable> {
        let well_known = self
            .well_known()
            .ok_or_else(|| internal!("cannot raise {} before bootstrap", ty.class_name()))?;

        let class = well_known
            .exception(ty.class_name())
            .cloned()
            .ok_or_else(|| internal!("{} is not a known exception", ty.class_name()))?;

        let message = ty.message();
        let obj = Object::new_instance(class.clone())?;
        let detail: FieldDescriptor = ("detailMessage", "Ljava/lang/String;").try_into()?;
        obj.set_field(detail, RuntimeValue::Object(self.intern(&message)?))?;

        Ok(Throwable::Runtime(error::RuntimeException {
            message,
            ty: class,
            obj: RuntimeValue::Object(obj),
            sources: vec![],
        }))
    }
}
