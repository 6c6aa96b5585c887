#![allow(clippy::new_without_default)]

pub mod bootstrap;
pub mod error;
pub mod execution;
pub mod main_thread;
pub mod native;
pub mod object;
pub mod thread;
pub mod vm;
