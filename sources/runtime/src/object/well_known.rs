use super::class::ClassRef;

pub mod names {
    pub const OBJECT: &str = "java/lang/Object";
    pub const CLASS: &str = "java/lang/Class";
    pub const STRING: &str = "java/lang/String";
    pub const STRING_ARRAY: &str = "[Ljava/lang/String;";
    pub const CLONEABLE: &str = "java/lang/Cloneable";
    pub const SERIALIZABLE: &str = "java/io/Serializable";
    pub const NULL_POINTER_EXCEPTION: &str = "java/lang/NullPointerException";
    pub const ARRAY_INDEX_OUT_OF_BOUNDS_EXCEPTION: &str =
        "java/lang/ArrayIndexOutOfBoundsException";
    pub const CLASS_NOT_FOUND_EXCEPTION: &str = "java/lang/ClassNotFoundException";
    pub const INTERNAL_ERROR: &str = "java/lang/InternalError";
    pub const IO_EXCEPTION: &str = "java/io/IOException";

    pub const THREAD: &str = "java/lang/Thread";
    pub const THREAD_GROUP: &str = "java/lang/ThreadGroup";
    pub const SYSTEM: &str = "java/lang/System";
    pub const INPUT_STREAM: &str = "java/io/InputStream";
    pub const PRINT_STREAM: &str = "java/io/PrintStream";
    pub const SECURITY_MANAGER: &str = "java/lang/SecurityManager";
    pub const SECURITY_DEBUG: &str = "sun/security/util/Debug";
    pub const CHARSET: &str = "java/nio/charset/Charset";
    pub const UTF_8: &str = "sun/nio/cs/UTF_8";
    pub const STREAM_ENCODER: &str = "sun/nio/cs/StreamEncoder";
}

/// Classes the runtime refers to directly, captured once during bootstrap.
#[derive(Debug, Clone)]
pub struct WellKnownClasses {
    pub java_lang_object: ClassRef,
    pub java_lang_class: ClassRef,
    pub java_lang_string: ClassRef,
    pub java_lang_cloneable: ClassRef,
    pub java_io_serializable: ClassRef,
    pub null_pointer_exception: ClassRef,
    pub array_index_out_of_bounds_exception: ClassRef,
    pub class_not_found_exception: ClassRef,
    pub internal_error: ClassRef,
    pub io_exception: ClassRef,
}

impl WellKnownClasses {
    /// Looks up an exception class by binary name.
    pub fn exception(&self, name: &str) -> Option<&ClassRef> {
        [
            &self.null_pointer_exception,
            &self.array_index_out_of_bounds_exception,
            &self.class_not_found_exception,
            &self.internal_error,
            &self.io_exception,
        ]
        .into_iter()
        .find(|c| c.name() == name)
    }

    pub fn core(&self) -> [&ClassRef; 5] {
        [
            &self.java_lang_object,
            &self.java_lang_class,
            &self.java_lang_string,
            &self.java_lang_cloneable,
            &self.java_io_serializable,
        ]
    }
}
