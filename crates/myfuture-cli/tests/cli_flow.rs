use std::ffi::OsString;
use std::fs;
use std::path::Path;

use serde_json::Value;
use tempfile::tempdir;

fn run(data: &Path, rc: &Path, args: &[&str]) -> anyhow::Result<()> {
    let mut argv: Vec<OsString> = vec![
        "myfuture".into(),
        "--data".into(),
        data.as_os_str().to_owned(),
        "--rcfile".into(),
        rc.as_os_str().to_owned(),
        "rc.color=off".into(),
    ];
    argv.extend(args.iter().map(OsString::from));
    myfuture_cli::run(argv)
}

fn stored_tasks(data: &Path) -> Vec<Value> {
    let raw = fs::read_to_string(data.join("storage.json")).expect("storage file");
    let slots: Value = serde_json::from_str(&raw).expect("container json");
    let tasks = slots["tasks"].as_str().expect("tasks slot");
    match serde_json::from_str(tasks).expect("tasks json") {
        Value::Array(items) => items,
        other => panic!("tasks slot is not an array: {other}"),
    }
}

#[test]
fn add_status_clear_round_trip_through_storage() {
    let temp = tempdir().expect("tempdir");
    let data = temp.path().join("data");
    let rc = temp.path().join("test.rc");
    fs::write(&rc, "notifications = off\n").expect("write rc");

    run(&data, &rc, &["add", "Buy", "milk", "--due", "2030-01-01T09:30:00Z"]).expect("add");
    let tasks = stored_tasks(&data);
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0]["title"], "Buy milk");
    assert_eq!(tasks[0]["status"], "todo");
    assert_eq!(tasks[0]["completed"], false);
    assert_eq!(tasks[0]["comments"], "");
    assert_eq!(tasks[0]["dueDate"], "2030-01-01T09:30:00.000Z");

    let id = tasks[0]["id"].as_str().expect("id").to_string();
    run(&data, &rc, &["status", &id, "completed"]).expect("status");
    run(&data, &rc, &["add", "Call the bank"]).expect("second add");
    run(&data, &rc, &["comment", &id, "semi-skimmed"]).expect("comment");

    let tasks = stored_tasks(&data);
    assert_eq!(tasks[0]["title"], "Call the bank");
    assert_eq!(tasks[0]["dueDate"], Value::Null);
    assert_eq!(tasks[1]["completed"], true);
    assert_eq!(tasks[1]["comments"], "semi-skimmed");

    run(&data, &rc, &["list", "--filter", "completed"]).expect("list");
    run(&data, &rc, &["clear-completed"]).expect("clear");
    let tasks = stored_tasks(&data);
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0]["title"], "Call the bank");
}

#[test]
fn unknown_ids_and_corrupt_storage_are_errors() {
    let temp = tempdir().expect("tempdir");
    let data = temp.path().join("data");
    let rc = temp.path().join("test.rc");
    fs::write(&rc, "").expect("write rc");

    let err = run(&data, &rc, &["rm", "12345"]).unwrap_err();
    assert!(format!("{err:#}").contains("no task matches '12345'"));

    fs::write(data.join("storage.json"), "not json").expect("corrupt");
    let err = run(&data, &rc, &["counts"]).unwrap_err();
    assert!(format!("{err:#}").contains("failed to open storage"));
    assert_eq!(
        fs::read_to_string(data.join("storage.json")).expect("read"),
        "not json"
    );
}

#[test]
fn malformed_task_snapshot_reads_as_empty() {
    let temp = tempdir().expect("tempdir");
    let data = temp.path().join("data");
    let rc = temp.path().join("test.rc");
    fs::write(&rc, "").expect("write rc");
    fs::create_dir_all(&data).expect("mkdir");
    fs::write(data.join("storage.json"), r#"{"tasks":"[{broken"}"#).expect("seed");

    run(&data, &rc, &["add", "Fresh start"]).expect("add");
    let tasks = stored_tasks(&data);
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0]["title"], "Fresh start");
}
