#![allow(dead_code)]

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
};

use runtime::{
    error::Throwable,
    execution::Execution,
    object::{
        class::MethodRef,
        loader::{
            classpath::{ClassPath, ClassSearchResult, ClassSource},
            ClassLoader,
        },
        value::RuntimeValue,
    },
    thread::JavaThread,
    vm::{BootOptions, VM},
};
use tracing::Level;
use tracing_subscriber::fmt;

pub mod builder;

use builder::{ClassBuilder, ACC_PRIVATE};

pub fn init_tracing() {
    let format = fmt::format()
        .with_ansi(true)
        .without_time()
        .with_level(true)
        .with_target(false)
        .with_thread_names(true)
        .with_source_location(true)
        .compact();

    let _ = tracing_subscriber::fmt()
        .with_max_level(Level::DEBUG)
        .event_format(format)
        .with_test_writer()
        .try_init();
}

/// Class files held in memory, keyed by binary name.
#[derive(Clone, Default)]
pub struct MemoryClassPath {
    classes: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    searches: Arc<AtomicUsize>,
}

impl MemoryClassPath {
    pub fn new() -> Self {
        Self::default()
    }

    /// The classes bootstrap needs, with just enough members for it to find what it calls.
    pub fn with_jdk() -> Self {
        let path = Self::new();
        for class in jdk_classes() {
            path.add(&class);
        }
        path
    }

    pub fn add(&self, class: &ClassBuilder) -> &Self {
        self.insert(class.name(), class.build())
    }

    pub fn insert(&self, name: &str, bytes: Vec<u8>) -> &Self {
        self.classes
            .lock()
            .expect("class path lock to not be poisoned")
            .insert(name.to_string(), bytes);
        self
    }

    pub fn remove(&self, name: &str) -> &Self {
        self.classes
            .lock()
            .expect("class path lock to not be poisoned")
            .remove(name);
        self
    }

    pub fn searches(&self) -> usize {
        self.searches.load(Ordering::SeqCst)
    }
}

impl ClassPath for MemoryClassPath {
    fn search(&self, binary_name: &str) -> Option<ClassSearchResult> {
        self.searches.fetch_add(1, Ordering::SeqCst);
        let classes = self
            .classes
            .lock()
            .expect("class path lock to not be poisoned");

        classes.get(binary_name).map(|bytes| {
            ClassSearchResult::new(ClassSource::Memory(binary_name.to_string()), bytes.clone())
        })
    }
}

pub fn jdk_classes() -> Vec<ClassBuilder> {
    let plain = |name: &str| ClassBuilder::new(name);

    vec![
        ClassBuilder::new("java/lang/Object")
            .extends(None)
            .constructor("()V"),
        plain("java/lang/Class").field(0x000A, "useCaches", "Z"),
        plain("java/lang/String"),
        plain("java/lang/Cloneable"),
        plain("java/io/Serializable"),
        plain("java/lang/NullPointerException"),
        plain("java/lang/ArrayIndexOutOfBoundsException"),
        plain("java/lang/ClassNotFoundException"),
        plain("java/lang/InternalError"),
        plain("java/io/IOException"),
        plain("java/lang/Thread").constructor("(Ljava/lang/ThreadGroup;Ljava/lang/String;)V"),
        plain("java/lang/ThreadGroup")
            .constructor("()V")
            .method(
                ACC_PRIVATE,
                "<init>",
                "(Ljava/lang/Void;Ljava/lang/ThreadGroup;Ljava/lang/String;)V",
            ),
        plain("java/lang/System")
            .clinit()
            .static_method("initializeSystemClass", "()V")
            .static_method("load", "(Ljava/lang/String;)V")
            .static_method("loadLibrary", "(Ljava/lang/String;)V"),
        plain("java/io/InputStream"),
        plain("java/io/PrintStream").clinit(),
        plain("java/lang/SecurityManager"),
        plain("sun/security/util/Debug").clinit(),
        plain("java/nio/charset/Charset"),
        plain("sun/nio/cs/UTF_8").extends(Some("java/nio/charset/Charset")),
        plain("sun/nio/cs/StreamEncoder")
            .static_method(
                "forOutputStreamWriter",
                "(Ljava/io/OutputStream;Ljava/lang/Object;Ljava/lang/String;)Lsun/nio/cs/StreamEncoder;",
            )
            .constructor("(Ljava/io/OutputStream;Ljava/lang/Object;Ljava/nio/charset/Charset;)V"),
    ]
}

#[derive(Debug, Clone)]
pub struct Invocation {
    pub class: String,
    pub method: String,
    pub args: Vec<RuntimeValue>,
    pub thread: String,
}

pub type Behaviour = Arc<
    dyn Fn(&VM, &JavaThread, &MethodRef, Vec<RuntimeValue>) -> Result<Option<RuntimeValue>, Throwable>
        + Send
        + Sync,
>;

/// An engine that runs nothing. It records every call and replays canned behaviour.
#[derive(Clone, Default)]
pub struct ScriptedEngine {
    calls: Arc<Mutex<Vec<Invocation>>>,
    behaviours: Arc<Mutex<HashMap<String, Behaviour>>>,
}

fn key(class: &str, method: &str) -> String {
    format!("{}.{}", class, method)
}

impl ScriptedEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// `method` is the name followed directly by the descriptor, like `main([Ljava/lang/String;)V`.
    pub fn on<F>(&self, class: &str, method: &str, behaviour: F) -> &Self
    where
        F: Fn(&VM, &JavaThread, &MethodRef, Vec<RuntimeValue>) -> Result<Option<RuntimeValue>, Throwable>
            + Send
            + Sync
            + 'static,
    {
        self.behaviours
            .lock()
            .expect("behaviour lock to not be poisoned")
            .insert(key(class, method), Arc::new(behaviour));
        self
    }

    pub fn calls(&self) -> Vec<Invocation> {
        self.calls
            .lock()
            .expect("call lock to not be poisoned")
            .clone()
    }

    pub fn position(&self, class: &str, method: &str) -> Option<usize> {
        self.calls()
            .iter()
            .position(|c| c.class == class && c.method == method)
    }

    pub fn called(&self, class: &str, method: &str) -> bool {
        self.position(class, method).is_some()
    }

    pub fn count(&self, class: &str, method: &str) -> usize {
        self.calls()
            .iter()
            .filter(|c| c.class == class && c.method == method)
            .count()
    }
}

impl Execution for ScriptedEngine {
    fn invoke(
        &self,
        vm: &VM,
        thread: &JavaThread,
        method: &MethodRef,
        args: Vec<RuntimeValue>,
    ) -> Result<Option<RuntimeValue>, Throwable> {
        let class = method.class().name().to_string();
        let name = method.key().to_string();

        self.calls
            .lock()
            .expect("call lock to not be poisoned")
            .push(Invocation {
                class: class.clone(),
                method: name.clone(),
                args: args.clone(),
                thread: thread.name().to_string(),
            });

        let behaviour = self
            .behaviours
            .lock()
            .expect("behaviour lock to not be poisoned")
            .get(&key(&class, &name))
            .cloned();

        match behaviour {
            Some(behaviour) => behaviour(vm, thread, method, args),
            None => Ok(None),
        }
    }
}

pub fn make_vm(class_path: &MemoryClassPath, engine: &ScriptedEngine) -> Arc<VM> {
    make_vm_with(class_path, engine, BootOptions::default())
}

pub fn make_vm_with(
    class_path: &MemoryClassPath,
    engine: &ScriptedEngine,
    options: BootOptions,
) -> Arc<VM> {
    init_tracing();
    Arc::new(VM::with_options(
        ClassLoader::new(class_path.clone()),
        engine.clone(),
        options,
    ))
}

/// A VM that has already been through bootstrap.
pub fn booted_vm() -> (Arc<VM>, ScriptedEngine, MemoryClassPath) {
    let class_path = MemoryClassPath::with_jdk();
    let engine = ScriptedEngine::new();
    let vm = make_vm(&class_path, &engine);

    vm.boot(&JavaThread::new("test"), &[])
        .expect("bootstrap to succeed");

    (vm, engine, class_path)
}

#[track_caller]
pub fn sassert_eq(lhs: impl Into<String>, rhs: &RuntimeValue) {
    let obj = rhs.as_object().expect("was not an object");
    let value = obj.as_string().expect("was not a string");
    assert_eq!(lhs.into(), value);
}
