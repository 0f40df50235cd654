//! In-memory startup namespace that counts opens and closes.

use autofetch_core::autostart::{StartupKey, StartupNamespace};
use std::cell::RefCell;
use std::collections::HashMap;
use std::io;
use std::rc::Rc;

#[derive(Debug, Default)]
pub struct NamespaceState {
    pub opened: u32,
    pub closed: u32,
    pub values: HashMap<String, String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailMode {
    #[default]
    None,
    Open,
    Write,
}

#[derive(Debug, Default)]
pub struct MemoryNamespace {
    pub state: Rc<RefCell<NamespaceState>>,
    pub fail: FailMode,
}

impl MemoryNamespace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(fail: FailMode) -> Self {
        MemoryNamespace {
            state: Rc::default(),
            fail,
        }
    }

    pub fn value(&self, name: &str) -> Option<String> {
        self.state.borrow().values.get(name).cloned()
    }
}

pub struct MemoryKey {
    state: Rc<RefCell<NamespaceState>>,
    fail_write: bool,
}

impl StartupKey for MemoryKey {
    fn set_value(&mut self, name: &str, value: &str) -> io::Result<()> {
        if self.fail_write {
            return Err(io::Error::new(io::ErrorKind::PermissionDenied, "value write denied"));
        }
        self.state
            .borrow_mut()
            .values
            .insert(name.to_string(), value.to_string());
        Ok(())
    }
}

impl Drop for MemoryKey {
    fn drop(&mut self) {
        self.state.borrow_mut().closed += 1;
    }
}

impl StartupNamespace for MemoryNamespace {
    type Key = MemoryKey;

    fn open_for_write(&self) -> io::Result<MemoryKey> {
        if self.fail == FailMode::Open {
            return Err(io::Error::new(io::ErrorKind::PermissionDenied, "namespace open denied"));
        }
        self.state.borrow_mut().opened += 1;
        Ok(MemoryKey {
            state: Rc::clone(&self.state),
            fail_write: self.fail == FailMode::Write,
        })
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}
