use std::{fmt, process::exit};

use support::descriptor::DescriptorError;
use thiserror::Error;
use tracing::error;

use crate::object::{class::ClassRef, value::RuntimeValue};

/// Exceptions the runtime raises on its own behalf.
pub enum VMError {
    ArrayIndexOutOfBounds { at: i64 },
    NullPointerException { ctx: String },
    ClassNotFound { name: String },
    InternalError { message: String },
    IOException { message: String },
}

impl VMError {
    pub fn class_name(&self) -> &'static str {
        match self {
            VMError::ArrayIndexOutOfBounds { .. } => "java/lang/ArrayIndexOutOfBoundsException",
            VMError::NullPointerException { .. } => "java/lang/NullPointerException",
            VMError::ClassNotFound { .. } => "java/lang/ClassNotFoundException",
            VMError::InternalError { .. } => "java/lang/InternalError",
            VMError::IOException { .. } => "java/io/IOException",
        }
    }

    pub fn message(&self) -> String {
        let ctx = match self {
            VMError::ArrayIndexOutOfBounds { at } => format!("OOB @ {}", at),
            VMError::NullPointerException { ctx } => format!("NPE ({})", ctx),
            VMError::ClassNotFound { name } => name.clone(),
            VMError::InternalError { message } => message.clone(),
            VMError::IOException { message } => message.clone(),
        };

        format!("{}: {}", self.class_name(), ctx)
    }
}

/// Recoverable failures. These may be handled by managed code, or by the caller.
#[derive(Error, Debug)]
pub enum Throwable {
    #[error(transparent)]
    Descriptor(#[from] DescriptorError),

    #[error("class format error in {name}: {cause:#}")]
    ClassFormat { name: String, cause: anyhow::Error },

    #[error(transparent)]
    Runtime(RuntimeException),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

#[macro_export]
macro_rules! internal {
    ($msg:literal $(,)?) => {
        $crate::error::Throwable::Internal(anyhow::anyhow!($msg))
    };
    ($err:expr $(,)?) => {
        $crate::error::Throwable::Internal(anyhow::anyhow!($err))
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::error::Throwable::Internal(anyhow::anyhow!($fmt, $($arg)*))
    };
}

#[derive(Error, Debug, Clone)]
#[error("at {class_name}.{method_name}")]
pub struct Frame {
    pub method_name: String,
    pub class_name: String,
}

#[derive(Error)]
#[error("{message}")]
pub struct RuntimeException {
    pub message: String,
    pub ty: ClassRef,
    pub obj: RuntimeValue,
    pub sources: Vec<Frame>,
}

impl fmt::Debug for RuntimeException {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuntimeException")
            .field("message", &self.message)
            .field("ty", &self.ty.name())
            .field("sources", &self.sources)
            .finish()
    }
}

/// Unrecoverable failures. Startup cannot continue past any of these.
#[derive(Error, Debug)]
pub enum Fatal {
    #[error("class not found: {class}")]
    ClassNotFound { class: String },

    #[error("could not load {class}: {cause}")]
    Load { class: String, cause: Throwable },

    #[error("class init failed: {class}: {cause}")]
    Initialization { class: String, cause: Throwable },

    #[error("method {name}{descriptor} not found in {class}")]
    MissingMethod {
        class: String,
        name: String,
        descriptor: String,
    },

    #[error("{class}.{method} failed: {cause}")]
    Invocation {
        class: String,
        method: String,
        cause: Throwable,
    },

    #[error("uncaught exception in {class}.main: {cause}")]
    UncaughtException { class: String, cause: Throwable },

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl Fatal {
    /// Log the failure and terminate the process.
    pub fn exit(self) -> ! {
        error!("{}", self);
        if let Fatal::UncaughtException {
            cause: Throwable::Runtime(ref rte),
            ..
        } = self
        {
            for frame in rte.sources.iter().rev() {
                error!("  {}", frame);
            }
        }

        exit(1)
    }
}
