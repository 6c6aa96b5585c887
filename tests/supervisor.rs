use std::{
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    thread,
    time::Duration,
};

use runtime::{
    error::{Fatal, Throwable, VMError},
    main_thread::{JavaMainThread, MAIN_THREAD_NAME},
    object::{class::ClassState, Object},
};

mod common;

use common::{builder::ClassBuilder, make_vm, sassert_eq, MemoryClassPath, ScriptedEngine};

const MAIN: &str = "main([Ljava/lang/String;)V";

fn main_class(name: &str) -> ClassBuilder {
    ClassBuilder::new(name).static_method("main", "([Ljava/lang/String;)V")
}

fn args(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

#[test]
fn runs_main_with_its_arguments() {
    let class_path = MemoryClassPath::with_jdk();
    class_path.add(&main_class("app/Main"));
    let engine = ScriptedEngine::new();
    let vm = make_vm(&class_path, &engine);

    JavaMainThread::new(Arc::clone(&vm), "app/Main", args(&["a", "b"]))
        .start()
        .unwrap();

    assert!(vm.is_booted());
    assert_eq!(engine.count("app/Main", MAIN), 1);

    let calls = engine.calls();
    let main = calls.iter().find(|c| c.method == MAIN).unwrap();
    assert_eq!(main.thread, MAIN_THREAD_NAME);
    assert_eq!(main.args.len(), 1);

    let array = main.args[0].as_object().unwrap();
    assert_eq!(array.class().name(), "[Ljava/lang/String;");
    assert_eq!(array.array_length(), Some(2));
    sassert_eq("a", &array.element(0).unwrap());
    sassert_eq("b", &array.element(1).unwrap());

    let first = array.element(0).and_then(|v| v.into_object().ok()).unwrap();
    assert!(Object::same(&first, &vm.intern("a").unwrap()));

    // Bootstrap ran on the same thread, before main.
    assert!(calls.iter().all(|c| c.thread == MAIN_THREAD_NAME));
    let booted = engine
        .position("java/lang/System", "initializeSystemClass()V")
        .unwrap();
    assert!(booted < engine.position("app/Main", MAIN).unwrap());
}

#[test]
fn initialises_the_main_class_first() {
    let class_path = MemoryClassPath::with_jdk();
    class_path.add(&main_class("app/Main").clinit());
    let engine = ScriptedEngine::new();
    let vm = make_vm(&class_path, &engine);

    JavaMainThread::new(Arc::clone(&vm), "app/Main", vec![])
        .start()
        .unwrap();

    let clinit = engine.position("app/Main", "<clinit>()V").unwrap();
    let main = engine.position("app/Main", MAIN).unwrap();
    assert!(clinit < main);

    let class = vm.class_loader().find_loaded("app/Main").unwrap();
    assert_eq!(class.state(), ClassState::FullyInitialized);
}

#[test]
fn runs_main_from_class_bytes() {
    let class_path = MemoryClassPath::with_jdk();
    let engine = ScriptedEngine::new();
    let vm = make_vm(&class_path, &engine);

    let bytes = main_class("app/Streamed").build();
    JavaMainThread::from_bytes(Arc::clone(&vm), bytes, args(&["only"]))
        .start()
        .unwrap();

    assert_eq!(engine.count("app/Streamed", MAIN), 1);
    let class = vm.class_loader().find_loaded("app/Streamed").unwrap();
    assert!(class.source().is_none());
}

#[test]
fn missing_main_class_is_fatal() {
    let class_path = MemoryClassPath::with_jdk();
    let engine = ScriptedEngine::new();
    let vm = make_vm(&class_path, &engine);

    let err = JavaMainThread::new(vm, "app/Missing", vec![])
        .start()
        .unwrap_err();

    assert!(
        matches!(&err, Fatal::ClassNotFound { class } if class == "app/Missing"),
        "{err}"
    );
    assert!(!engine.calls().iter().any(|c| c.method == MAIN));
}

#[test]
fn missing_main_method_is_fatal() {
    let class_path = MemoryClassPath::with_jdk();
    class_path.add(
        &ClassBuilder::new("app/NoMain")
            .static_method("main", "()V")
            .method(0x0001, "main", "([Ljava/lang/String;)V"),
    );
    let engine = ScriptedEngine::new();
    let vm = make_vm(&class_path, &engine);

    let err = JavaMainThread::new(vm, "app/NoMain", vec![])
        .start()
        .unwrap_err();

    assert_eq!(
        err.to_string(),
        "method main([Ljava/lang/String;)V not found in app/NoMain"
    );
    assert!(!engine.called("app/NoMain", MAIN));
}

#[test]
fn boot_failures_stop_the_program() {
    let class_path = MemoryClassPath::with_jdk();
    class_path.remove("java/lang/Class");
    class_path.add(&main_class("app/Main"));
    let engine = ScriptedEngine::new();
    let vm = make_vm(&class_path, &engine);

    let err = JavaMainThread::new(Arc::clone(&vm), "app/Main", vec![])
        .start()
        .unwrap_err();

    assert!(matches!(&err, Fatal::ClassNotFound { class } if class == "java/lang/Class"));
    assert!(!vm.is_booted());
    assert!(vm.class_loader().find_loaded("app/Main").is_none());
}

#[test]
fn exceptions_escaping_main_are_fatal() {
    let class_path = MemoryClassPath::with_jdk();
    class_path.add(&main_class("app/Throws"));
    let engine = ScriptedEngine::new();
    engine.on("app/Throws", MAIN, |vm, _, _, _| {
        Err(vm.try_make_error(VMError::InternalError {
            message: "out of luck".to_string(),
        })?)
    });
    let vm = make_vm(&class_path, &engine);

    let err = JavaMainThread::new(vm, "app/Throws", vec![])
        .start()
        .unwrap_err();

    let Fatal::UncaughtException { class, cause } = &err else {
        panic!("expected an uncaught exception, got {err}");
    };
    assert_eq!(class, "app/Throws");
    assert!(
        matches!(cause, Throwable::Runtime(e) if e.ty.name() == "java/lang/InternalError"),
        "{cause}"
    );
}

#[test]
fn waits_for_threads_started_by_main() {
    const WORKERS: usize = 4;

    let class_path = MemoryClassPath::with_jdk();
    class_path.add(&main_class("app/Spawner"));
    let engine = ScriptedEngine::new();
    let finished = Arc::new(AtomicUsize::new(0));

    let counter = Arc::clone(&finished);
    engine.on("app/Spawner", MAIN, move |vm, _, _, _| {
        for n in 0..WORKERS {
            let counter = Arc::clone(&counter);
            vm.threads()
                .launch(format!("worker-{}", n), move || {
                    thread::sleep(Duration::from_millis(20 * (n as u64 + 1)));
                    counter.fetch_add(1, Ordering::SeqCst);
                })
                .map_err(|e| Throwable::Internal(e.into()))?;
        }

        Ok(None)
    });
    let vm = make_vm(&class_path, &engine);

    JavaMainThread::new(Arc::clone(&vm), "app/Spawner", vec![])
        .start()
        .unwrap();

    assert_eq!(finished.load(Ordering::SeqCst), WORKERS);
    assert_eq!(vm.threads().running_count(), 0);
}
