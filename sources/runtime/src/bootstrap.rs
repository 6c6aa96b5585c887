use std::sync::atomic::Ordering;

use support::{
    descriptor::DescriptorError,
    types::{FieldDescriptor, MethodDescriptor},
};
use tracing::{debug, info};

use crate::{
    error::{Fatal, Throwable},
    native,
    object::{
        class::{ClassRef, ClassRole, ClassState, MethodRef},
        value::RuntimeValue,
        well_known::{names, WellKnownClasses},
        Object, ObjectRef,
    },
    thread::{JavaThread, NORMAL_PRIORITY},
    vm::VM,
};

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootState {
    NotBooted = 0,
    Booting = 1,
    Booted = 2,
    Failed = 3,
}

impl BootState {
    pub(crate) fn from_u8(value: u8) -> Self {
        match value {
            1 => BootState::Booting,
            2 => BootState::Booted,
            3 => BootState::Failed,
            _ => BootState::NotBooted,
        }
    }
}

impl VM {
    /// Brings the core library up on the calling thread.
    ///
    /// Only the first call does anything. Any failure is fatal: later steps assume every
    /// earlier class is loaded and initialised, so there is nothing to fall back to.
    ///
    /// The boot flag belongs to this `VM`, not to the process. A second `VM` boots on its
    /// own, with its own loader and intern pool. Strings can only be interned once this
    /// has bound the pool to `java/lang/String` in its first step.
    pub fn boot(&self, thread: &JavaThread, arguments: &[String]) -> Result<(), Fatal> {
        if let Err(state) = self.boot_state.compare_exchange(
            BootState::NotBooted as u8,
            BootState::Booting as u8,
            Ordering::AcqRel,
            Ordering::Acquire,
        ) {
            if BootState::from_u8(state) == BootState::Failed {
                return Err(Fatal::Internal(anyhow::anyhow!(
                    "an earlier boot attempt failed"
                )));
            }

            debug!("VM already booted, skipping");
            return Ok(());
        }

        if let Err(e) = (Bootstrap { vm: self, thread }).run(arguments) {
            self.boot_state
                .store(BootState::Failed as u8, Ordering::Release);
            return Err(e);
        }

        self.boot_state
            .store(BootState::Booted as u8, Ordering::Release);
        info!("VM booted");
        Ok(())
    }
}

fn method_key(name: &str, descriptor: &str) -> Result<MethodDescriptor, Fatal> {
    (name, descriptor)
        .try_into()
        .map_err(|e: DescriptorError| Fatal::Internal(e.into()))
}

fn field_key(name: &str, descriptor: &str) -> Result<FieldDescriptor, Fatal> {
    (name, descriptor)
        .try_into()
        .map_err(|e: DescriptorError| Fatal::Internal(e.into()))
}

fn load_fault(class: &ClassRef) -> impl FnOnce(Throwable) -> Fatal + '_ {
    move |cause| Fatal::Load {
        class: class.name().to_string(),
        cause,
    }
}

struct Bootstrap<'a> {
    vm: &'a VM,
    thread: &'a JavaThread,
}

impl<'a> Bootstrap<'a> {
    fn run(&self, arguments: &[String]) -> Result<(), Fatal> {
        info!("Step 1: core classes");
        self.initialize_vm_structs()?;

        info!("Step 2: thread classes");
        let thread_class = self.require(names::THREAD)?;
        let thread_group_class = self.require(names::THREAD_GROUP)?;

        info!("Step 3: init thread");
        let init_thread = self.create_init_thread(&thread_class)?;

        info!("Step 4: system thread group");
        let system_group = self.new_object(&thread_group_class)?;
        let default_ctor = self.method(&thread_group_class, "<init>", "()V")?;
        self.call(&default_ctor, vec![RuntimeValue::Object(system_group.clone())])?;

        // The init thread refers to the main group before the group's constructor runs in step 7.
        info!("Step 5: main thread group");
        let main_group = self.new_object(&thread_group_class)?;
        self.set_field(
            &init_thread,
            field_key("group", "Ljava/lang/ThreadGroup;")?,
            RuntimeValue::Object(main_group.clone()),
        )?;

        info!("Step 6: system classes");
        let system_class = self.load(names::SYSTEM)?;
        system_class.tag(ClassRole::CoreLibrary);
        system_class.set_state(ClassState::BeingInitialized);
        self.require(names::INPUT_STREAM)?;
        self.require(names::PRINT_STREAM)?;
        self.require(names::SECURITY_MANAGER)?;

        info!("Step 7: construct main thread group");
        let group_ctor = self.method(
            &thread_group_class,
            "<init>",
            "(Ljava/lang/Void;Ljava/lang/ThreadGroup;Ljava/lang/String;)V",
        )?;
        self.call(
            &group_ctor,
            vec![
                RuntimeValue::Object(main_group.clone()),
                RuntimeValue::Null,
                RuntimeValue::Object(system_group),
                RuntimeValue::Object(self.intern("main")?),
            ],
        )?;

        info!("Step 8: suspend {}", names::SECURITY_DEBUG);
        let debug_class = self.load(names::SECURITY_DEBUG)?;
        debug_class.set_state(ClassState::BeingInitialized);

        info!("Step 9: construct init thread");
        let thread_ctor = self.method(
            &thread_class,
            "<init>",
            "(Ljava/lang/ThreadGroup;Ljava/lang/String;)V",
        )?;
        self.call(
            &thread_ctor,
            vec![
                RuntimeValue::Object(init_thread),
                RuntimeValue::Object(main_group),
                RuntimeValue::Object(self.intern("main")?),
            ],
        )?;

        info!("Step 10: overrides");
        self.apply_overrides()?;

        info!("Step 11: initialize {}", names::SYSTEM);
        let initialize_system = self.static_method(&system_class, "initializeSystemClass", "()V")?;
        self.call(&initialize_system, vec![])?;
        system_class.set_state(ClassState::FullyInitialized);

        info!("Step 12: restore {}", names::SECURITY_DEBUG);
        debug_class.set_state(ClassState::FullyInitialized);

        info!("Step 13: delegate loader");
        self.install_delegate_loader(arguments)?;

        Ok(())
    }

    fn initialize_vm_structs(&self) -> Result<(), Fatal> {
        let java_lang_class = self.require(names::CLASS)?;
        let java_lang_object = self.require(names::OBJECT)?;
        let java_lang_string = self.require(names::STRING)?;

        self.vm
            .interner()
            .bind(java_lang_string.clone())
            .map_err(load_fault(&java_lang_string))?;

        let table = WellKnownClasses {
            java_lang_object,
            java_lang_class,
            java_lang_string,
            java_lang_cloneable: self.require(names::CLONEABLE)?,
            java_io_serializable: self.require(names::SERIALIZABLE)?,
            null_pointer_exception: self.require(names::NULL_POINTER_EXCEPTION)?,
            array_index_out_of_bounds_exception: self
                .require(names::ARRAY_INDEX_OUT_OF_BOUNDS_EXCEPTION)?,
            class_not_found_exception: self.require(names::CLASS_NOT_FOUND_EXCEPTION)?,
            internal_error: self.require(names::INTERNAL_ERROR)?,
            io_exception: self.require(names::IO_EXCEPTION)?,
        };

        for class in table.core() {
            class.tag(ClassRole::CoreLibrary);
        }

        for class in [
            &table.null_pointer_exception,
            &table.array_index_out_of_bounds_exception,
            &table.class_not_found_exception,
            &table.internal_error,
            &table.io_exception,
        ] {
            class.tag(ClassRole::Exception);
        }

        table
            .java_lang_class
            .set_static(field_key("useCaches", "Z")?, RuntimeValue::Int(0));

        if self.vm.well_known.set(table).is_err() {
            return Err(Fatal::Internal(anyhow::anyhow!(
                "well-known classes were already captured"
            )));
        }

        Ok(())
    }

    fn create_init_thread(&self, thread_class: &ClassRef) -> Result<ObjectRef, Fatal> {
        let init_thread = self.new_object(thread_class)?;

        self.set_field(
            &init_thread,
            field_key("eetop", "J")?,
            RuntimeValue::Long(self.thread.native_handle()),
        )?;
        self.set_field(
            &init_thread,
            field_key("priority", "I")?,
            RuntimeValue::Int(NORMAL_PRIORITY),
        )?;

        self.thread
            .attach_peer(init_thread.clone())
            .map_err(load_fault(thread_class))?;

        Ok(init_thread)
    }

    fn apply_overrides(&self) -> Result<(), Fatal> {
        let charset_class = self.require(names::CHARSET)?;
        let utf8_class = self.require(names::UTF_8)?;

        let utf8 = self.new_object(&utf8_class)?;
        charset_class.set_static(
            field_key("defaultCharset", "Ljava/nio/charset/Charset;")?,
            RuntimeValue::Object(utf8.clone()),
        );

        if self.vm.default_charset.set(utf8).is_err() {
            return Err(Fatal::Internal(anyhow::anyhow!(
                "default charset was already installed"
            )));
        }

        let modules = native::builtin_modules().map_err(|e| Fatal::Internal(e.into()))?;
        for module in modules {
            let class = self.load(module.classname())?;
            for key in module.methods().keys() {
                if class.get_this_class_method(key).is_none() {
                    return Err(Fatal::MissingMethod {
                        class: class.name().to_string(),
                        name: key.name().to_string(),
                        descriptor: key.descriptor().to_string(),
                    });
                }

                debug!("Overriding {}.{}", class.name(), key);
            }

            self.vm.natives().write().install(module);
        }

        Ok(())
    }

    fn install_delegate_loader(&self, arguments: &[String]) -> Result<(), Fatal> {
        let Some(name) = self.vm.options().delegate_loader_class.as_deref() else {
            debug!("No delegate loader configured");
            return Ok(());
        };

        let loaded = self
            .vm
            .class_loader()
            .load_class(name)
            .map_err(|cause| Fatal::Load {
                class: name.to_string(),
                cause,
            })?;

        let Some(class) = loaded else {
            debug!("Delegate loader {} is not on the class path", name);
            return Ok(());
        };

        self.initialize(&class)?;
        info!("Found delegate loader {}", name);

        let delegate = self.new_object(&class)?;
        let ctor = self.method(&class, "<init>", "([Ljava/lang/String;)V")?;
        let args = self
            .vm
            .new_string_array(arguments)
            .map_err(load_fault(&class))?;

        self.call(
            &ctor,
            vec![
                RuntimeValue::Object(delegate.clone()),
                RuntimeValue::Object(args),
            ],
        )?;

        self.vm
            .class_loader()
            .set_delegate(delegate)
            .map_err(load_fault(&class))
    }

    fn load(&self, name: &str) -> Result<ClassRef, Fatal> {
        self.vm
            .class_loader()
            .load_class(name)
            .map_err(|cause| Fatal::Load {
                class: name.to_string(),
                cause,
            })?
            .ok_or_else(|| Fatal::ClassNotFound {
                class: name.to_string(),
            })
    }

    fn initialize(&self, class: &ClassRef) -> Result<(), Fatal> {
        self.vm
            .initialize_class(self.thread, class)
            .map_err(|cause| Fatal::Initialization {
                class: class.name().to_string(),
                cause,
            })
    }

    /// Load and initialise, or die trying.
    fn require(&self, name: &str) -> Result<ClassRef, Fatal> {
        let class = self.load(name)?;
        self.initialize(&class)?;
        Ok(class)
    }

    fn new_object(&self, class: &ClassRef) -> Result<ObjectRef, Fatal> {
        Object::new_instance(class.clone()).map_err(load_fault(class))
    }

    fn set_field(
        &self,
        object: &ObjectRef,
        field: FieldDescriptor,
        value: RuntimeValue,
    ) -> Result<(), Fatal> {
        object
            .set_field(field, value)
            .map_err(load_fault(object.class()))
    }

    fn intern(&self, value: &str) -> Result<ObjectRef, Fatal> {
        self.vm
            .intern(value)
            .map_err(|e| Fatal::Internal(anyhow::anyhow!("interning {:?}: {}", value, e)))
    }

    fn missing(class: &ClassRef, name: &str, descriptor: &str) -> Fatal {
        Fatal::MissingMethod {
            class: class.name().to_string(),
            name: name.to_string(),
            descriptor: descriptor.to_string(),
        }
    }

    fn method(&self, class: &ClassRef, name: &str, descriptor: &str) -> Result<MethodRef, Fatal> {
        class
            .get_this_class_method(&method_key(name, descriptor)?)
            .ok_or_else(|| Self::missing(class, name, descriptor))
    }

    fn static_method(
        &self,
        class: &ClassRef,
        name: &str,
        descriptor: &str,
    ) -> Result<MethodRef, Fatal> {
        class
            .get_static_method(&method_key(name, descriptor)?)
            .ok_or_else(|| Self::missing(class, name, descriptor))
    }

    fn call(&self, method: &MethodRef, args: Vec<RuntimeValue>) -> Result<(), Fatal> {
        self.vm
            .invoke(self.thread, method, args)
            .map(|_| ())
            .map_err(|cause| Fatal::Invocation {
                class: method.class().name().to_string(),
                method: method.key().to_string(),
                cause,
            })
    }
}
