use anyhow::{Context, Result};
use parse::{classfile::ClassFile, parser::Parser};

/// Turns class file bytes into a [`ClassFile`].
pub trait ClassFileParser: Send + Sync {
    /// `origin` names where the bytes came from, for error messages.
    fn parse(&self, origin: &str, bytes: &[u8]) -> Result<ClassFile>;
}

pub struct DefaultParser;

impl ClassFileParser for DefaultParser {
    fn parse(&self, origin: &str, bytes: &[u8]) -> Result<ClassFile> {
        Parser::new(bytes)
            .parse()
            .with_context(|| format!("parsing class file from {}", origin))
    }
}
