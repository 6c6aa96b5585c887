use std::{collections::HashMap, sync::OnceLock};

use parking_lot::Mutex;
use support::encoding::{java_hash, to_utf16};
use tracing::debug;

use crate::{error::Throwable, internal};

use super::{class::ClassRef, Object, ObjectRef};

/// Canonical string instances, keyed by their Java hash.
///
/// Strings that collide on hash share a bucket and are told apart by content.
///
/// Each `VM` owns one pool, so two VMs in a process never share string instances. A new
/// pool cannot make strings until bootstrap binds it to the loaded `java/lang/String`
/// class. Until then `find_or_new` fails.
pub struct StringInterner {
    string_class: OnceLock<ClassRef>,
    strings: Mutex<HashMap<i32, Vec<ObjectRef>>>,
}

impl StringInterner {
    pub fn new() -> Self {
        Self {
            string_class: OnceLock::new(),
            strings: Mutex::new(HashMap::new()),
        }
    }

    /// Sets the class new strings are created with. Must happen before the first intern.
    pub fn bind(&self, string_class: ClassRef) -> Result<(), Throwable> {
        self.string_class
            .set(string_class)
            .map_err(|_| internal!("string interner was already bound"))
    }

    pub fn is_bound(&self) -> bool {
        self.string_class.get().is_some()
    }

    /// Returns the canonical instance with this content, creating it on first use.
    pub fn find_or_new(&self, value: &str) -> Result<ObjectRef, Throwable> {
        let string_class = self
            .string_class
            .get()
            .ok_or_else(|| internal!("cannot intern {:?}, java/lang/String is not loaded", value))?;

        let units = to_utf16(value);
        let hash = java_hash(&units);

        let mut strings = self.strings.lock();
        let bucket = strings.entry(hash).or_default();

        if let Some(existing) = bucket
            .iter()
            .find(|s| s.string_units() == Some(units.as_slice()))
        {
            return Ok(existing.clone());
        }

        if !bucket.is_empty() {
            debug!("Hash collision on {} for {:?}", hash, value);
        }

        let string = Object::new_string(string_class.clone(), units.into_boxed_slice(), hash);
        bucket.push(string.clone());
        Ok(string)
    }

    pub fn len(&self) -> usize {
        self.strings.lock().values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
