use std::process::exit;

use anyhow::Result;
use args::{Cli, Command};
use clap::Parser;
use runtime::object::{
    class::{ArrayElement, ClassKind, ClassObject},
    loader::{
        classpath::ClassPathManager,
        plan::{self, ElementPlan, LoadPlan},
        ClassLoader,
    },
};
use tracing::{error, info, Level};
use tracing_subscriber::fmt;

mod args;

fn describe_plan(plan: &LoadPlan) -> String {
    fn element<C>(element: &ElementPlan<C>, show: impl Fn(&C) -> String) -> String {
        match element {
            ElementPlan::Component(c) => show(c),
            ElementPlan::Down(down) => down.descriptor.clone(),
        }
    }

    match plan {
        LoadPlan::Instance(name) => format!("{}: instance", name),
        LoadPlan::ObjectArray(array) => format!(
            "{}: object array, dimension {}, element {}",
            array.descriptor,
            array.dimension,
            element(&array.element, |c| c.clone())
        ),
        LoadPlan::PrimitiveArray(array) => format!(
            "{}: primitive array, dimension {}, element {}",
            array.descriptor,
            array.dimension,
            element(&array.element, |c| c.to_string())
        ),
    }
}

fn describe_class(loader: &ClassLoader, class: &ClassObject) -> String {
    match class.kind() {
        ClassKind::Instance(instance) => format!(
            "{}: instance, from {}, {} methods",
            class.name(),
            instance
                .source
                .as_ref()
                .map(|s| s.to_string())
                .unwrap_or_else(|| "<stream>".to_string()),
            instance.class_file.methods.len()
        ),
        ClassKind::ObjectArray(array) => format!(
            "{}: object array, dimension {}, element {}",
            class.name(),
            array.dimension,
            loader
                .element_class(class)
                .map(|c| c.name().to_string())
                .unwrap_or_else(|| "?".to_string())
        ),
        ClassKind::PrimitiveArray(array) => format!(
            "{}: primitive array, dimension {}, element {}",
            class.name(),
            array.dimension,
            match array.element {
                ArrayElement::Component(ty) => ty.to_string(),
                ArrayElement::Down(_) => loader
                    .element_class(class)
                    .map(|c| c.name().to_string())
                    .unwrap_or_else(|| "?".to_string()),
            }
        ),
    }
}

fn resolve(descriptors: &[String]) -> bool {
    let mut ok = true;
    for descriptor in descriptors {
        match plan::resolve(descriptor) {
            Ok(plan) => println!("{}", describe_plan(&plan)),
            Err(e) => {
                println!("{}: {}", descriptor, e);
                ok = false;
            }
        }
    }

    ok
}

fn load(classpath: &[String], classes: &[String]) -> Result<bool> {
    let mut manager = ClassPathManager::new();
    for cp in classpath {
        manager.add_path(cp)?;
    }

    info!("Loading from {} class path entries", manager.len());
    let loader = ClassLoader::new(manager);

    let mut ok = true;
    for name in classes {
        match loader.load_class(name) {
            Ok(Some(class)) => println!("{}", describe_class(&loader, &class)),
            Ok(None) => {
                println!("{}: not found", name);
                ok = false;
            }
            Err(e) => {
                println!("{}: {}", name, e);
                ok = false;
            }
        }
    }

    Ok(ok)
}

fn main() {
    let args = Cli::parse();

    let mut format = fmt::format()
        .with_ansi(true)
        .without_time()
        .with_level(true)
        .with_target(false)
        .with_thread_names(false)
        .with_source_location(true)
        .compact();

    if args.plain {
        format = format.with_ansi(false).with_source_location(false);
    }

    tracing_subscriber::fmt()
        .with_max_level(Level::INFO)
        .event_format(format)
        .with_writer(std::io::stderr)
        .init();

    let result = match &args.command {
        Command::Resolve { descriptors } => Ok(resolve(descriptors)),
        Command::Load { classpath, classes } => load(classpath, classes),
    };

    match result {
        Ok(true) => {}
        Ok(false) => exit(1),
        Err(e) => {
            error!("{:#}", e);
            exit(1);
        }
    }
}
