use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(long, global = true)]
    /// Emit plain logs without colours or source locations
    pub plain: bool,
}

#[derive(Subcommand)]
pub enum Command {
    /// Show how class names and array descriptors would be loaded
    Resolve {
        /// The names or descriptors to resolve
        #[arg(required = true)]
        descriptors: Vec<String>,
    },

    /// Load classes through the boot class loader and describe them
    Load {
        #[arg(long("cp"))]
        /// A list of paths to add to the classpath. Paths ending in .jar or .zip are read as archives
        classpath: Vec<String>,

        /// The classes to load
        #[arg(required = true)]
        classes: Vec<String>,
    },
}
