use enum_as_inner::EnumAsInner;
use support::descriptor::BaseType;

use super::ObjectRef;

#[derive(Debug, Clone, EnumAsInner)]
pub enum RuntimeValue {
    Null,
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Object(ObjectRef),
}

impl RuntimeValue {
    /// The zero value for a field or array slot of the given primitive type.
    pub fn default_for(ty: BaseType) -> Self {
        match ty.widened() {
            BaseType::Long => RuntimeValue::Long(0),
            BaseType::Float => RuntimeValue::Float(0.0),
            BaseType::Double => RuntimeValue::Double(0.0),
            _ => RuntimeValue::Int(0),
        }
    }
}

impl From<ObjectRef> for RuntimeValue {
    fn from(value: ObjectRef) -> Self {
        RuntimeValue::Object(value)
    }
}

impl From<Option<ObjectRef>> for RuntimeValue {
    fn from(value: Option<ObjectRef>) -> Self {
        value.map_or(RuntimeValue::Null, RuntimeValue::Object)
    }
}
