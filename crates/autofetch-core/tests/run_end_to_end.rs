//! Integration test: full runs against a scripted request object and an
//! in-memory startup namespace.

mod common;

use autofetch_core::automation::{AutomationContext, CreateError};
use autofetch_core::config::AutofetchConfig;
use autofetch_core::dispatch::InvokeKind;
use autofetch_core::download::{DownloadState, OPERATION_ORDER};
use autofetch_core::run::{self, RunError};
use autofetch_core::storage::{self, PersistError};
use autofetch_core::variant::{SafeArray, VarType, Variant};
use common::memory_namespace::{FailMode, MemoryNamespace};
use common::mock_object::{self, Script, Tracker, MOCK_PROG_ID};
use std::cell::RefCell;
use std::ffi::OsString;
use std::path::Path;
use std::rc::Rc;
use tempfile::tempdir;

const URL: &str = "https://example.test/x";

fn config() -> AutofetchConfig {
    AutofetchConfig {
        prog_id: MOCK_PROG_ID.to_string(),
        base_dir_env: "AUTOFETCH_TEST_BASE".to_string(),
        ..AutofetchConfig::default()
    }
}

fn lookup_for(base: &Path) -> impl Fn(&str) -> Option<OsString> + '_ {
    move |var| (var == "AUTOFETCH_TEST_BASE").then(|| base.as_os_str().to_owned())
}

#[test]
fn mock_200_with_four_bytes_writes_file_and_entry() {
    let base = tempdir().unwrap();
    let tracker = Rc::new(RefCell::new(Tracker::default()));
    let ctx = AutomationContext::initialize(mock_object::registry(
        &tracker,
        Script::ok(200, vec![1, 2, 3, 4]),
    ))
    .unwrap();
    let ns = MemoryNamespace::new();
    let cfg = config();

    let report = run::execute(&ctx, &cfg, URL, lookup_for(base.path()), &ns).expect("run");

    let path = base.path().join("checkme.png");
    assert_eq!(report.path, path);
    assert_eq!(report.bytes_written, 4);
    assert_eq!(report.status, Some(200));
    assert_eq!(report.download_state, DownloadState::Completed);
    assert!(report.invoke_failures.is_empty());
    assert_eq!(std::fs::read(&path).unwrap(), vec![1, 2, 3, 4]);
    assert_eq!(std::fs::metadata(&path).unwrap().len(), 4);
    assert_eq!(
        report.sha256.as_deref(),
        Some("9f64a747e1b97f131fabb6b447296c9b6f0201e79fb3c5356e6c77e89b6a806a")
    );

    let state = ns.state.borrow();
    assert_eq!(state.values.len(), 1);
    let value = state.values.get("OpenImage").expect("startup entry");
    assert!(value.ends_with(&format!("\"{}\"", path.display())));
    assert_eq!(report.autostart.as_ref().unwrap(), value);
    assert_eq!((state.opened, state.closed), (1, 1));

    let t = tracker.borrow();
    assert_eq!((t.created, t.released), (1, 1));
}

#[test]
fn operations_issued_in_fixed_order_with_reversed_arguments() {
    let base = tempdir().unwrap();
    let tracker = Rc::new(RefCell::new(Tracker::default()));
    let ctx =
        AutomationContext::initialize(mock_object::registry(&tracker, Script::ok(200, vec![0])))
            .unwrap();
    run::execute(&ctx, &config(), URL, lookup_for(base.path()), &MemoryNamespace::new()).unwrap();

    let t = tracker.borrow();
    assert_eq!(t.names(), OPERATION_ORDER.to_vec());
    assert!(t
        .calls
        .iter()
        .all(|c| c.kind == InvokeKind::MethodOrPropertyGet));
    assert_eq!(
        t.call("Open").unwrap().args,
        vec![Variant::Bool(false), Variant::from(URL), Variant::from("GET")]
    );
    assert_eq!(
        t.call("SetOption").unwrap().args,
        vec![Variant::I4(13056), Variant::I4(4)]
    );
    for name in ["Send", "Status", "ResponseBody"] {
        assert!(t.call(name).unwrap().args.is_empty(), "{name} takes no arguments");
    }
}

#[test]
fn set_option_pair_independent_of_url() {
    for url in ["https://a.test/", "http://b.test/deep/path?q=1"] {
        let base = tempdir().unwrap();
        let tracker = Rc::new(RefCell::new(Tracker::default()));
        let ctx = AutomationContext::initialize(mock_object::registry(
            &tracker,
            Script::ok(200, vec![9]),
        ))
        .unwrap();
        run::execute(&ctx, &config(), url, lookup_for(base.path()), &MemoryNamespace::new())
            .unwrap();
        assert_eq!(
            tracker.borrow().call("SetOption").unwrap().args,
            vec![Variant::I4(13056), Variant::I4(4)]
        );
    }
}

#[test]
fn bounds_decide_written_size() {
    let base = tempdir().unwrap();
    let tracker = Rc::new(RefCell::new(Tracker::default()));
    let arr = SafeArray::with_bounds(vec![5, 6, 7, 8, 9, 10, 11], 3, 7).unwrap();
    let script = Script {
        status: Variant::I4(200),
        body: Variant::ByteArray(Some(arr)),
        fail: None,
    };
    let ctx = AutomationContext::initialize(mock_object::registry(&tracker, script)).unwrap();
    let report =
        run::execute(&ctx, &config(), URL, lookup_for(base.path()), &MemoryNamespace::new())
            .unwrap();
    assert_eq!(report.bytes_written, 5);
    assert_eq!(std::fs::metadata(&report.path).unwrap().len(), 5);
}

#[test]
fn non_array_body_creates_no_file_or_entry() {
    let base = tempdir().unwrap();
    let tracker = Rc::new(RefCell::new(Tracker::default()));
    let script = Script {
        status: Variant::I4(200),
        body: Variant::from("<html>not an image</html>"),
        fail: None,
    };
    let ctx = AutomationContext::initialize(mock_object::registry(&tracker, script)).unwrap();
    let ns = MemoryNamespace::new();

    let err = run::execute(&ctx, &config(), URL, lookup_for(base.path()), &ns).unwrap_err();
    assert!(matches!(
        err,
        RunError::Persist(PersistError::NotBinaryPayload(VarType::Bstr))
    ));
    assert_eq!(err.exit_code(), 1);
    assert!(!base.path().join("checkme.png").exists());
    assert!(!base.path().join("checkme.png.part").exists());
    assert_eq!(ns.state.borrow().opened, 0);
    assert_eq!(tracker.borrow().released, 1);
}

#[test]
fn status_tag_mismatch_is_not_fatal() {
    let base = tempdir().unwrap();
    let tracker = Rc::new(RefCell::new(Tracker::default()));
    let script = Script {
        status: Variant::from("200"),
        body: Variant::from_bytes(vec![1]).unwrap(),
        fail: None,
    };
    let ctx = AutomationContext::initialize(mock_object::registry(&tracker, script)).unwrap();
    let report =
        run::execute(&ctx, &config(), URL, lookup_for(base.path()), &MemoryNamespace::new())
            .unwrap();
    assert_eq!(report.status, None);
    assert_eq!(report.download_state, DownloadState::Completed);
}

#[test]
fn failed_send_still_releases_and_reports_payload_error() {
    let base = tempdir().unwrap();
    let tracker = Rc::new(RefCell::new(Tracker::default()));
    let script = Script {
        status: Variant::Empty,
        body: Variant::Empty,
        fail: Some("Send"),
    };
    let ctx = AutomationContext::initialize(mock_object::registry(&tracker, script)).unwrap();
    let err = run::execute(&ctx, &config(), URL, lookup_for(base.path()), &MemoryNamespace::new())
        .unwrap_err();
    assert!(matches!(
        err,
        RunError::Persist(PersistError::NotBinaryPayload(VarType::Empty))
    ));
    let t = tracker.borrow();
    assert_eq!(t.names(), OPERATION_ORDER.to_vec());
    assert_eq!((t.created, t.released), (1, 1));
}

#[test]
fn reported_write_without_file_is_hard_error() {
    let base = tempdir().unwrap();
    let tracker = Rc::new(RefCell::new(Tracker::default()));
    let ctx = AutomationContext::initialize(mock_object::registry(
        &tracker,
        Script::ok(200, vec![1, 2, 3, 4]),
    ))
    .unwrap();
    let ns = MemoryNamespace::new();

    // Claims success without touching the filesystem.
    let err = run::execute_with_writer(
        &ctx,
        &config(),
        URL,
        lookup_for(base.path()),
        &ns,
        |_, _| Ok(4),
    )
    .unwrap_err();
    assert!(matches!(err, RunError::Missing(ref p) if p == &base.path().join("checkme.png")));
    assert_eq!(ns.state.borrow().opened, 0);
}

#[test]
fn real_writer_through_execute_with_writer() {
    let base = tempdir().unwrap();
    let tracker = Rc::new(RefCell::new(Tracker::default()));
    let ctx = AutomationContext::initialize(mock_object::registry(
        &tracker,
        Script::ok(200, vec![4, 3]),
    ))
    .unwrap();
    let report = run::execute_with_writer(
        &ctx,
        &config(),
        URL,
        lookup_for(base.path()),
        &MemoryNamespace::new(),
        storage::persist,
    )
    .unwrap();
    assert_eq!(report.bytes_written, 2);
}

#[test]
fn unconstructible_object_fails_without_side_effects() {
    let base = tempdir().unwrap();
    let ctx = AutomationContext::initialize(mock_object::unconstructible_registry()).unwrap();
    let ns = MemoryNamespace::new();
    let err = run::execute(&ctx, &config(), URL, lookup_for(base.path()), &ns).unwrap_err();
    assert!(matches!(
        err,
        RunError::Automation(CreateError::Instantiation { .. })
    ));
    assert_eq!(err.exit_code(), 1);
    assert!(!base.path().join("checkme.png").exists());
    assert_eq!(ns.state.borrow().opened, 0);
}

#[test]
fn unknown_class_name_fails_at_lookup() {
    let base = tempdir().unwrap();
    let tracker = Rc::new(RefCell::new(Tracker::default()));
    let ctx =
        AutomationContext::initialize(mock_object::registry(&tracker, Script::ok(200, vec![1])))
            .unwrap();
    let mut cfg = config();
    cfg.prog_id = "No.Such.Class".to_string();
    let err = run::execute(&ctx, &cfg, URL, lookup_for(base.path()), &MemoryNamespace::new())
        .unwrap_err();
    assert!(matches!(
        err,
        RunError::Automation(CreateError::ClassNotRegistered { .. })
    ));
    assert_eq!(tracker.borrow().created, 0);
}

#[test]
fn missing_base_dir_aborts_before_any_object_is_created() {
    let tracker = Rc::new(RefCell::new(Tracker::default()));
    let ctx =
        AutomationContext::initialize(mock_object::registry(&tracker, Script::ok(200, vec![1])))
            .unwrap();
    let err = run::execute(&ctx, &config(), URL, |_| None, &MemoryNamespace::new()).unwrap_err();
    assert!(matches!(err, RunError::Environment(_)));
    assert_eq!(err.exit_code(), 1);
    assert_eq!(tracker.borrow().created, 0);
}

#[cfg(unix)]
#[test]
fn non_utf8_base_dir_is_rejected_before_anything_is_written() {
    use autofetch_core::output_path::OutputPathError;
    use std::os::unix::ffi::OsStrExt;

    let root = tempdir().unwrap();
    let base = root.path().join(std::ffi::OsStr::from_bytes(b"caf\xff"));
    std::fs::create_dir(&base).unwrap();
    let tracker = Rc::new(RefCell::new(Tracker::default()));
    let ctx =
        AutomationContext::initialize(mock_object::registry(&tracker, Script::ok(200, vec![1])))
            .unwrap();
    let ns = MemoryNamespace::new();

    let err = run::execute(&ctx, &config(), URL, lookup_for(&base), &ns).unwrap_err();
    assert!(matches!(
        err,
        RunError::Environment(OutputPathError::NotUnicode { .. })
    ));
    assert_eq!(err.exit_code(), 1);
    assert!(!base.join("checkme.png").exists());
    assert_eq!(tracker.borrow().created, 0);
    assert!(ns.state.borrow().values.is_empty());
}

#[test]
fn namespace_open_failure_is_fatal_but_keeps_file_and_releases_handle() {
    let base = tempdir().unwrap();
    let tracker = Rc::new(RefCell::new(Tracker::default()));
    let ctx = AutomationContext::initialize(mock_object::registry(
        &tracker,
        Script::ok(200, vec![1, 2]),
    ))
    .unwrap();
    let ns = MemoryNamespace::failing(FailMode::Open);
    let err = run::execute(&ctx, &config(), URL, lookup_for(base.path()), &ns).unwrap_err();
    assert!(matches!(err, RunError::Autostart(_)));
    assert_eq!(err.exit_code(), 1);
    assert!(base.path().join("checkme.png").exists());
    let t = tracker.borrow();
    assert_eq!((t.created, t.released), (1, 1));
    let s = ns.state.borrow();
    assert_eq!((s.opened, s.closed), (0, 0));
}

#[test]
fn value_write_failure_is_reported_not_fatal() {
    let base = tempdir().unwrap();
    let tracker = Rc::new(RefCell::new(Tracker::default()));
    let ctx = AutomationContext::initialize(mock_object::registry(
        &tracker,
        Script::ok(200, vec![1, 2]),
    ))
    .unwrap();
    let ns = MemoryNamespace::failing(FailMode::Write);
    let report = run::execute(&ctx, &config(), URL, lookup_for(base.path()), &ns).unwrap();
    assert!(report.autostart.is_err());
    let s = ns.state.borrow();
    assert_eq!((s.opened, s.closed), (1, 1));
    assert!(s.values.is_empty());
}

#[test]
fn same_path_written_and_registered() {
    let base = tempdir().unwrap();
    let tracker = Rc::new(RefCell::new(Tracker::default()));
    let ctx =
        AutomationContext::initialize(mock_object::registry(&tracker, Script::ok(200, vec![1])))
            .unwrap();
    let ns = MemoryNamespace::new();
    let mut cfg = config();
    cfg.launcher = "feh".to_string();
    cfg.startup_entry = "ShowPicture".to_string();
    let report = run::execute(&ctx, &cfg, URL, lookup_for(base.path()), &ns).unwrap();
    assert_eq!(
        ns.value("ShowPicture").unwrap(),
        format!("feh \"{}\"", report.path.display())
    );
}
