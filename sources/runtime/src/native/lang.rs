use std::collections::HashMap;

use support::types::MethodDescriptor;
use tracing::warn;

use crate::{
    error::Throwable,
    module_base,
    object::{class::ClassRef, value::RuntimeValue, well_known::names},
    static_method,
    thread::JavaThread,
    vm::VM,
};

use super::{NativeFunction, NativeModule};

fn library_name(args: &[RuntimeValue]) -> String {
    args.first()
        .and_then(|v| v.as_object())
        .and_then(|s| s.as_string())
        .unwrap_or_else(|| "<null>".to_string())
}

module_base!(LangSystem);
impl NativeModule for LangSystem {
    fn classname(&self) -> &'static str {
        names::SYSTEM
    }

    fn methods(&self) -> &HashMap<MethodDescriptor, NativeFunction> {
        &self.methods
    }

    fn methods_mut(&mut self) -> &mut HashMap<MethodDescriptor, NativeFunction> {
        &mut self.methods
    }

    fn init(&mut self) -> Result<(), Throwable> {
        fn load(
            _: ClassRef,
            args: Vec<RuntimeValue>,
            _: &VM,
            _: &JavaThread,
        ) -> Result<Option<RuntimeValue>, Throwable> {
            warn!("System.load({}) is not supported, ignoring", library_name(&args));
            Ok(None)
        }

        self.set_method(("load", "(Ljava/lang/String;)V"), static_method!(load))?;

        fn load_library(
            _: ClassRef,
            args: Vec<RuntimeValue>,
            _: &VM,
            _: &JavaThread,
        ) -> Result<Option<RuntimeValue>, Throwable> {
            warn!(
                "System.loadLibrary({}) is not supported, ignoring",
                library_name(&args)
            );
            Ok(None)
        }

        self.set_method(
            ("loadLibrary", "(Ljava/lang/String;)V"),
            static_method!(load_library),
        )
    }
}
