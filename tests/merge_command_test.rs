use predicates::str::contains;
use serde_json::Value;
use std::fs;
use tempfile::tempdir;

fn read_outbox(path: &std::path::Path) -> Value {
    let raw = fs::read_to_string(path).expect("read outbox");
    serde_json::from_str(&raw).expect("parse outbox")
}

#[test]
fn merge_combines_sources_keeping_first_seen_duplicates() {
    let tmp = tempdir().expect("tempdir");
    let archives = tmp.path().join("public/archives");
    fs::create_dir_all(archives.join("2024")).expect("mkdir archives");
    fs::write(
        archives.join("a.json"),
        r#"[{"id":"1","published":"2024-01-01","content":"first copy"}]"#,
    )
    .expect("write a");
    fs::write(
        archives.join("b.json"),
        r#"[{"id":"1","published":"2024-01-02","content":"second copy"},{"id":"2","published":"2024-01-03"}]"#,
    )
    .expect("write b");
    fs::write(
        archives.join("2024/bookmarks.json"),
        r#"{"type":"OrderedCollection","orderedItems":["https://a.example/1","https://b.example/2"]}"#,
    )
    .expect("write bookmarks");
    fs::write(archives.join("broken.json"), "{ nope").expect("write broken");

    assert_cmd::cargo::cargo_bin_cmd!("outbox-weaver")
        .current_dir(tmp.path())
        .env("OUTBOX_HOME", tmp.path())
        .arg("merge")
        .assert()
        .success()
        .stdout(contains("total_items=2"))
        .stdout(contains("duplicates=1"))
        .stdout(contains("skipped=broken.json"))
        .stdout(contains("skipped=2024/bookmarks.json"));

    let outbox = read_outbox(&tmp.path().join("public/outbox.json"));
    assert_eq!(outbox["@context"], "https://www.w3.org/ns/activitystreams");
    assert_eq!(outbox["type"], "OrderedCollection");
    assert_eq!(outbox["id"], "outbox.json");
    assert_eq!(outbox["totalItems"], 2);
    assert_eq!(outbox["orderedItems"][0]["id"], "2");
    assert_eq!(outbox["orderedItems"][1]["id"], "1");
    assert_eq!(outbox["orderedItems"][1]["published"], "2024-01-01");
    assert_eq!(outbox["orderedItems"][1]["content"], "first copy");
}

#[test]
fn merge_twice_leaves_outbox_unchanged() {
    let tmp = tempdir().expect("tempdir");
    let archives = tmp.path().join("public/archives");
    fs::create_dir_all(&archives).expect("mkdir archives");
    fs::write(
        archives.join("outbox.json"),
        r#"{"orderedItems":[{"type":"Create","id":"a1","object":{"id":"n1","type":"Note","published":"2024-05-01T00:00:00Z"}}]}"#,
    )
    .expect("write export");

    for expected in ["outbox written", "outbox unchanged"] {
        assert_cmd::cargo::cargo_bin_cmd!("outbox-weaver")
            .current_dir(tmp.path())
            .env("OUTBOX_HOME", tmp.path())
            .arg("merge")
            .assert()
            .success()
            .stdout(contains(expected));
    }
}

#[test]
fn merge_without_archives_dir_writes_empty_outbox() {
    let tmp = tempdir().expect("tempdir");
    let output = tmp.path().join("site/outbox.json");

    assert_cmd::cargo::cargo_bin_cmd!("outbox-weaver")
        .current_dir(tmp.path())
        .env("OUTBOX_HOME", tmp.path())
        .env("OUTBOX_ID", "https://social.example/users/ana/outbox")
        .arg("merge")
        .args(["--output", output.to_str().expect("utf8 path")])
        .assert()
        .success()
        .stdout(contains("files_found=0"));

    let outbox = read_outbox(&output);
    assert_eq!(outbox["totalItems"], 0);
    assert_eq!(outbox["id"], "https://social.example/users/ana/outbox");
    assert_eq!(outbox["orderedItems"], Value::Array(Vec::new()));
}

#[test]
fn merge_dry_run_does_not_write() {
    let tmp = tempdir().expect("tempdir");
    let archives = tmp.path().join("public/archives");
    fs::create_dir_all(&archives).expect("mkdir archives");
    fs::write(archives.join("posts.json"), r#"{"posts":[{"id":"p1"}]}"#).expect("write");

    assert_cmd::cargo::cargo_bin_cmd!("outbox-weaver")
        .current_dir(tmp.path())
        .env("OUTBOX_HOME", tmp.path())
        .args(["merge", "--dry-run"])
        .assert()
        .success()
        .stdout(contains("total_items=1"))
        .stdout(contains("dry-run"));

    assert!(!tmp.path().join("public/outbox.json").exists());
}
