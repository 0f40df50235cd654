//! Recording stand-in for the HTTP request class.
//!
//! Logs every invocation with its raw positional block, counts creations and
//! releases, and answers `Status` / `ResponseBody` from a fixed script.

use autofetch_core::automation::{ClassId, ClassRegistry};
use autofetch_core::dispatch::{DispId, DispParams, Dispatch, Fault, HResult, InvokeKind};
use autofetch_core::download::OPERATION_ORDER;
use autofetch_core::variant::Variant;
use std::cell::RefCell;
use std::rc::Rc;

pub const MOCK_PROG_ID: &str = "Mock.Request.1";
pub const MOCK_CLASS_ID: ClassId = ClassId(0xfeed);

#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub name: String,
    pub args: Vec<Variant>,
    pub kind: InvokeKind,
}

#[derive(Debug, Default)]
pub struct Tracker {
    pub calls: Vec<RecordedCall>,
    pub created: u32,
    pub released: u32,
}

impl Tracker {
    pub fn names(&self) -> Vec<String> {
        self.calls.iter().map(|c| c.name.clone()).collect()
    }

    pub fn call(&self, name: &str) -> Option<&RecordedCall> {
        self.calls.iter().find(|c| c.name == name)
    }
}

/// What the mock answers.
#[derive(Debug, Clone)]
pub struct Script {
    pub status: Variant,
    pub body: Variant,
    /// Operation that fails with `E_FAIL`.
    pub fail: Option<&'static str>,
}

impl Script {
    pub fn ok(status: i32, body: Vec<u8>) -> Self {
        Script {
            status: Variant::I4(status),
            body: Variant::from_bytes(body).unwrap(),
            fail: None,
        }
    }
}

pub struct MockRequest {
    tracker: Rc<RefCell<Tracker>>,
    script: Script,
}

impl Dispatch for MockRequest {
    fn id_of_name(&self, name: &str) -> Result<DispId, HResult> {
        OPERATION_ORDER
            .iter()
            .position(|n| *n == name)
            .map(|i| DispId(100 + i as i32))
            .ok_or(HResult::DISP_E_UNKNOWNNAME)
    }

    fn invoke(
        &mut self,
        id: DispId,
        kind: InvokeKind,
        params: &DispParams<'_>,
        result: &mut Variant,
    ) -> Result<(), Fault> {
        let name = OPERATION_ORDER[(id.0 - 100) as usize];
        self.tracker.borrow_mut().calls.push(RecordedCall {
            name: name.to_string(),
            args: params.raw().to_vec(),
            kind,
        });
        if self.script.fail == Some(name) {
            return Err(Fault::with_description(HResult::E_FAIL, "scripted failure"));
        }
        match name {
            "Status" => *result = self.script.status.clone(),
            "ResponseBody" => *result = self.script.body.clone(),
            _ => {}
        }
        Ok(())
    }

    fn release(&mut self) {
        self.tracker.borrow_mut().released += 1;
    }
}

/// Registry whose only class is the scripted mock.
pub fn registry(tracker: &Rc<RefCell<Tracker>>, script: Script) -> ClassRegistry {
    let tracker = Rc::clone(tracker);
    let mut reg = ClassRegistry::new();
    reg.register(MOCK_PROG_ID, MOCK_CLASS_ID, move || {
        tracker.borrow_mut().created += 1;
        Ok(Box::new(MockRequest {
            tracker: Rc::clone(&tracker),
            script: script.clone(),
        }) as Box<dyn Dispatch>)
    });
    reg
}

/// Registry whose class is registered but cannot be instantiated.
pub fn unconstructible_registry() -> ClassRegistry {
    let mut reg = ClassRegistry::new();
    reg.register(MOCK_PROG_ID, MOCK_CLASS_ID, || Err(HResult::E_NOINTERFACE));
    reg
}
