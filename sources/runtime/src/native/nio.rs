use std::collections::HashMap;

use support::types::MethodDescriptor;
use tracing::debug;

use crate::{
    error::{Throwable, VMError},
    internal, module_base,
    object::{class::ClassRef, value::RuntimeValue, well_known::names, Object},
    static_method,
    thread::JavaThread,
    vm::VM,
};

use super::{NativeFunction, NativeModule};

module_base!(StreamEncoder);
impl NativeModule for StreamEncoder {
    fn classname(&self) -> &'static str {
        names::STREAM_ENCODER
    }

    fn methods(&self) -> &HashMap<MethodDescriptor, NativeFunction> {
        &self.methods
    }

    fn methods_mut(&mut self) -> &mut HashMap<MethodDescriptor, NativeFunction> {
        &mut self.methods
    }

    fn init(&mut self) -> Result<(), Throwable> {
        // Charset lookup by name does not work yet, so the requested charset is ignored
        // and every encoder gets the default one.
        fn for_output_stream_writer(
            encoder_class: ClassRef,
            args: Vec<RuntimeValue>,
            vm: &VM,
            thread: &JavaThread,
        ) -> Result<Option<RuntimeValue>, Throwable> {
            let mut args = args.into_iter();
            let out = args.next().unwrap_or(RuntimeValue::Null);
            let lock = args.next().unwrap_or(RuntimeValue::Null);

            if out.is_null() {
                return Err(vm.try_make_error(VMError::NullPointerException {
                    ctx: "StreamEncoder.forOutputStreamWriter: out".to_string(),
                })?);
            }

            let charset = vm
                .default_charset()
                .cloned()
                .ok_or_else(|| internal!("no default charset installed"))?;

            let constructor = encoder_class
                .get_method(
                    &(
                        "<init>",
                        "(Ljava/io/OutputStream;Ljava/lang/Object;Ljava/nio/charset/Charset;)V",
                    )
                        .try_into()?,
                )
                .ok_or_else(|| internal!("no charset constructor on {}", encoder_class.name()))?;

            vm.initialize_class(thread, &encoder_class)?;
            let encoder = Object::new_instance(encoder_class)?;

            debug!("Constructing stream encoder with the default charset");
            vm.invoke(
                thread,
                &constructor,
                vec![
                    RuntimeValue::Object(encoder.clone()),
                    out,
                    lock,
                    RuntimeValue::Object(charset),
                ],
            )?;

            Ok(Some(RuntimeValue::Object(encoder)))
        }

        self.set_method(
            (
                "forOutputStreamWriter",
                "(Ljava/io/OutputStream;Ljava/lang/Object;Ljava/lang/String;)Lsun/nio/cs/StreamEncoder;",
            ),
            static_method!(for_output_stream_writer),
        )
    }
}
