use std::sync::Arc;

use support::{descriptor::DescriptorError, types::MethodDescriptor};
use tracing::{debug, info};

use crate::{
    error::Fatal,
    object::{class::ClassRef, value::RuntimeValue},
    thread::JavaThread,
    vm::VM,
};

pub const MAIN_THREAD_NAME: &str = "JavaMainThread";

/// Where the entry class comes from.
#[derive(Debug, Clone)]
pub enum EntryClass {
    Name(String),
    Bytes(Vec<u8>),
}

/// Boots the VM on a dedicated native thread, runs `main(String[])`, then waits for
/// every other launched thread to finish.
pub struct JavaMainThread {
    vm: Arc<VM>,
    entry: EntryClass,
    arguments: Vec<String>,
}

impl JavaMainThread {
    pub fn new(vm: Arc<VM>, main_class: impl Into<String>, arguments: Vec<String>) -> Self {
        Self {
            vm,
            entry: EntryClass::Name(main_class.into()),
            arguments,
        }
    }

    pub fn from_bytes(vm: Arc<VM>, class_bytes: Vec<u8>, arguments: Vec<String>) -> Self {
        Self {
            vm,
            entry: EntryClass::Bytes(class_bytes),
            arguments,
        }
    }

    /// Runs the program to completion. Never returns on failure.
    pub fn launch(self) {
        if let Err(e) = self.start() {
            e.exit()
        }
    }

    /// Runs the program to completion, handing any fatal error back to the caller.
    pub fn start(self) -> Result<(), Fatal> {
        let threads = Arc::clone(self.vm.threads());

        let handle = threads
            .launch(MAIN_THREAD_NAME, move || self.run())
            .map_err(|e| Fatal::Internal(e.into()))?;

        handle
            .join()
            .map_err(|_| Fatal::Internal(anyhow::anyhow!("{} panicked", MAIN_THREAD_NAME)))??;

        debug!("main returned, waiting for {} threads", threads.running_count());
        threads.wait_for_all();
        info!("No threads left running");

        Ok(())
    }

    fn run(&self) -> Result<(), Fatal> {
        let thread = JavaThread::new(MAIN_THREAD_NAME);
        self.vm.boot(&thread, &self.arguments)?;

        let main_class = self.main_class()?;
        let key: MethodDescriptor = ("main", "([Ljava/lang/String;)V")
            .try_into()
            .map_err(|e: DescriptorError| Fatal::Internal(e.into()))?;

        let main = main_class
            .get_static_method(&key)
            .ok_or_else(|| Fatal::MissingMethod {
                class: main_class.name().to_string(),
                name: "main".to_string(),
                descriptor: "([Ljava/lang/String;)V".to_string(),
            })?;

        self.vm
            .initialize_class(&thread, &main_class)
            .map_err(|cause| Fatal::Initialization {
                class: main_class.name().to_string(),
                cause,
            })?;

        let args = self
            .vm
            .new_string_array(&self.arguments)
            .map_err(|cause| Fatal::Load {
                class: "[Ljava/lang/String;".to_string(),
                cause,
            })?;

        info!("Entering {}.main", main_class.name());
        self.vm
            .invoke(&thread, &main, vec![RuntimeValue::Object(args)])
            .map_err(|cause| Fatal::UncaughtException {
                class: main_class.name().to_string(),
                cause,
            })?;

        Ok(())
    }

    fn main_class(&self) -> Result<ClassRef, Fatal> {
        let loader = self.vm.class_loader();
        match &self.entry {
            EntryClass::Name(name) => loader
                .load_class(name)
                .map_err(|cause| Fatal::Load {
                    class: name.clone(),
                    cause,
                })?
                .ok_or_else(|| Fatal::ClassNotFound {
                    class: name.clone(),
                }),
            EntryClass::Bytes(bytes) => loader.load_from_bytes(bytes).map_err(|cause| Fatal::Load {
                class: "<stream>".to_string(),
                cause,
            }),
        }
    }
}
