use crate::{
    error::Throwable,
    object::{class::MethodRef, value::RuntimeValue},
    thread::JavaThread,
    vm::VM,
};

/// Runs method bodies. Bootstrap only ever calls into managed code through this.
///
/// Instance methods receive the receiver as the first argument.
pub trait Execution: Send + Sync {
    fn invoke(
        &self,
        vm: &VM,
        thread: &JavaThread,
        method: &MethodRef,
        args: Vec<RuntimeValue>,
    ) -> Result<Option<RuntimeValue>, Throwable>;
}
