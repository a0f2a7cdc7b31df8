use serde_json::Value;
use std::fs;
use tempfile::tempdir;

#[test]
fn status_reports_paths_and_config_as_json() {
    let tmp = tempdir().expect("tempdir");
    fs::create_dir_all(tmp.path().join("public/archives")).expect("mkdir archives");
    fs::write(
        tmp.path().join("outbox.toml"),
        "[threads]\nshow_replies_to_others = true\n",
    )
    .expect("write config");

    let output = assert_cmd::cargo::cargo_bin_cmd!("outbox-weaver")
        .current_dir(tmp.path())
        .env("OUTBOX_HOME", tmp.path())
        .args(["--json", "status"])
        .output()
        .expect("run status");
    assert!(output.status.success());

    let report: Value = serde_json::from_slice(&output.stdout).expect("json report");
    assert_eq!(report["command"], "status");
    assert_eq!(report["ok"], true);
    let details: Vec<&str> = report["details"]
        .as_array()
        .expect("details")
        .iter()
        .filter_map(Value::as_str)
        .collect();
    assert!(details.contains(&"threads.show_replies_to_others=true"));
    assert!(details.contains(&"outbox not built yet"));
    assert!(details.contains(&"env_override=OUTBOX_HOME"));
}

#[test]
fn status_flags_invalid_config() {
    let tmp = tempdir().expect("tempdir");
    fs::create_dir_all(tmp.path().join("public/archives")).expect("mkdir archives");
    let config = tmp.path().join("bad.toml");
    fs::write(&config, "[outbox]\nid = \"\"\n").expect("write config");

    assert_cmd::cargo::cargo_bin_cmd!("outbox-weaver")
        .current_dir(tmp.path())
        .env("OUTBOX_HOME", tmp.path())
        .env("OUTBOX_CONFIG_PATH", &config)
        .arg("status")
        .assert()
        .failure()
        .stdout(predicates::str::contains("config invalid"));
}
