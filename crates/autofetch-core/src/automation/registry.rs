//! Name → class id → factory lookup.

use crate::dispatch::{Dispatch, HResult};
use crate::http_request::{HttpRequestObject, HTTP_REQUEST_CLASS_ID, HTTP_REQUEST_PROG_ID};
use std::collections::HashMap;
use std::fmt;

/// 128-bit class identifier, displayed in registry (braced GUID) form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClassId(pub u128);

impl fmt::Display for ClassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let v = self.0;
        write!(
            f,
            "{{{:08x}-{:04x}-{:04x}-{:04x}-{:012x}}}",
            (v >> 96) as u32,
            (v >> 80) as u16,
            (v >> 64) as u16,
            (v >> 48) as u16,
            v & 0xFFFF_FFFF_FFFF
        )
    }
}

/// Creates a fresh object of one class.
pub type ClassFactory = Box<dyn Fn() -> Result<Box<dyn Dispatch>, HResult>>;

/// Registered classes, keyed by well-known name (case-insensitive) and by class id.
#[derive(Default)]
pub struct ClassRegistry {
    prog_ids: HashMap<String, ClassId>,
    factories: HashMap<ClassId, ClassFactory>,
}

impl ClassRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in HTTP request class.
    pub fn with_builtin_classes() -> Self {
        let mut registry = Self::new();
        registry.register(HTTP_REQUEST_PROG_ID, HTTP_REQUEST_CLASS_ID, || {
            Ok(Box::new(HttpRequestObject::new()) as Box<dyn Dispatch>)
        });
        registry
    }

    /// Register `prog_id` as an alias for `class_id` and install its factory.
    /// Re-registering replaces the previous entry.
    pub fn register<F>(&mut self, prog_id: &str, class_id: ClassId, factory: F)
    where
        F: Fn() -> Result<Box<dyn Dispatch>, HResult> + 'static,
    {
        self.prog_ids.insert(prog_id.to_ascii_lowercase(), class_id);
        self.factories.insert(class_id, Box::new(factory));
    }

    /// Look up the class id registered under `prog_id`.
    pub fn class_id_from_prog_id(&self, prog_id: &str) -> Result<ClassId, HResult> {
        if prog_id.trim().is_empty() {
            return Err(HResult::CO_E_CLASSSTRING);
        }
        self.prog_ids
            .get(&prog_id.to_ascii_lowercase())
            .copied()
            .ok_or(HResult::CO_E_CLASSSTRING)
    }

    /// Instantiate an object of `class_id`.
    pub fn create_instance(&self, class_id: ClassId) -> Result<Box<dyn Dispatch>, HResult> {
        let factory = self
            .factories
            .get(&class_id)
            .ok_or(HResult::REGDB_E_CLASSNOTREG)?;
        factory()
    }
}

impl fmt::Debug for ClassRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassRegistry")
            .field("prog_ids", &self.prog_ids)
            .finish_non_exhaustive()
    }
}
