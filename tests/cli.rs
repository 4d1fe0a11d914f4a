use assert_cmd::Command;
use predicates::str::contains;
use serde_json::{json, Value};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn cmd() -> Command {
    Command::cargo_bin("closeness").unwrap()
}

fn write(dir: &Path, name: &str, value: Value) {
    fs::write(dir.join(format!("{name}.json")), value.to_string()).unwrap();
}

fn fixture() -> TempDir {
    let tmp = TempDir::new().unwrap();
    write(
        tmp.path(),
        "test_user1",
        json!({
            "profile": {
                "username": "test_user1",
                "full_name": "Test User One",
                "biography": "안녕하세요 서울대학교 컴퓨터공학과 재학생입니다",
                "followers": 1000,
                "followees": 500,
                "business_account": false
            },
            "followers": ["common_user1", "common_user2", "follower1", "follower2"],
            "following": ["common_follow1", "common_follow2", "follow1", "follow2"],
            "posts": [{
                "shortcode": "ABC123",
                "hashtags": ["서울대", "컴공", "프로그래밍"],
                "mentions": ["test_user2"],
                "location": "서울대학교"
            }]
        }),
    );
    write(
        tmp.path(),
        "test_user2",
        json!({
            "profile": {
                "username": "test_user2",
                "full_name": "Test User Two",
                "biography": "서울대학교 컴퓨터공학과 학생입니다"
            },
            "followers": ["common_user1", "common_user2", "follower3", "follower4"],
            "following": ["common_follow1", "common_follow2", "follow3", "follow4"],
            "posts": [{
                "hashtags": ["서울대", "컴공", "과제"],
                "mentions": ["test_user1"],
                "location": "서울대학교"
            }]
        }),
    );
    write(
        tmp.path(),
        "loner",
        json!({"profile": {"username": "loner"}, "followers": null, "posts": null}),
    );
    tmp
}

#[test]
fn analyze_prints_text_report() {
    let tmp = fixture();
    cmd()
        .arg("--data-dir")
        .arg(tmp.path())
        .args(["analyze", "test_user1", "test_user2"])
        .assert()
        .success()
        .stdout(contains("Mutual followers: 2"))
        .stdout(contains("mutual_following: 0.300"));
}

#[test]
fn analyze_json_has_report_fields() {
    let tmp = fixture();
    let output = cmd()
        .arg("--data-dir")
        .arg(tmp.path())
        .args(["--json", "analyze", "test_user1", "test_user2"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let value: Value = serde_json::from_slice(&output.stdout).unwrap();
    let analysis = &value["analysis"];
    let total = analysis["total_score"].as_f64().unwrap();
    assert!((0.0..=3.0).contains(&total));
    assert_eq!(analysis["detailed_scores"]["mutual_followers"], json!(0.4));
    assert_eq!(analysis["detailed_scores"]["interaction_indicators"], json!(2.0));
    assert_eq!(analysis["mutual_connections"]["mutual_followers_count"], json!(2));
    assert_eq!(value["user1"]["followers_count"], json!(1000));
    assert!(value["timestamp"].is_string());
}

#[test]
fn analyze_rejects_same_user() {
    let tmp = fixture();
    cmd()
        .arg("--data-dir")
        .arg(tmp.path())
        .args(["analyze", "test_user1", "test_user1"])
        .assert()
        .failure()
        .stderr(contains("themselves"));
}

#[test]
fn analyze_reports_unknown_user() {
    let tmp = fixture();
    cmd()
        .arg("--data-dir")
        .arg(tmp.path())
        .args(["analyze", "test_user1", "nobody"])
        .assert()
        .failure()
        .stderr(contains("nobody"));
}

#[test]
fn compare_empty_profiles_has_no_connection() {
    let tmp = fixture();
    let empty = tmp.path().join("empty.json");
    fs::write(&empty, r#"{"profile": {}, "followers": [], "following": [], "posts": []}"#).unwrap();

    cmd()
        .arg("compare")
        .arg(&empty)
        .arg(&empty)
        .assert()
        .success()
        .stdout(contains("Total score: 0.000/3.0 (almost no connection)"));
}

#[test]
fn compare_without_profile_prints_error_outcome() {
    let tmp = fixture();
    let broken = tmp.path().join("broken.json");
    fs::write(&broken, r#"{"followers": ["a"]}"#).unwrap();

    let output = cmd()
        .arg("--json")
        .arg("compare")
        .arg(&broken)
        .arg(tmp.path().join("loner.json"))
        .output()
        .unwrap();
    assert!(!output.status.success());

    let value: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert!(value["error"].as_str().unwrap().contains("profile"));
    assert!(value.get("total_score").is_none());
}

#[test]
fn user_shows_samples() {
    let tmp = fixture();
    cmd()
        .arg("--data-dir")
        .arg(tmp.path())
        .args(["user", "test_user1"])
        .assert()
        .success()
        .stdout(contains("@test_user1"))
        .stdout(contains("common_user1"));
}

#[test]
fn rank_orders_directory_candidates() {
    let tmp = fixture();
    let output = cmd()
        .arg("--data-dir")
        .arg(tmp.path())
        .args(["--json", "rank", "test_user1", "--workers", "2"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let value: Value = serde_json::from_slice(&output.stdout).unwrap();
    let rows = value.as_array().unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["username"], json!("test_user2"));
    assert_eq!(rows[1]["username"], json!("loner"));
}

#[test]
fn rank_skips_unreadable_directory_snapshots() {
    let tmp = fixture();
    write(tmp.path(), "broken", json!({"followers": ["common_user1"]}));
    fs::write(tmp.path().join("garbled.json"), "{not json").unwrap();

    let output = cmd()
        .arg("--data-dir")
        .arg(tmp.path())
        .args(["--json", "rank", "test_user1"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let value: Value = serde_json::from_slice(&output.stdout).unwrap();
    let names: Vec<&str> = value
        .as_array()
        .unwrap()
        .iter()
        .map(|row| row["username"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["test_user2", "loner"]);
}

#[test]
fn analyze_rejects_names_outside_data_dir() {
    let tmp = fixture();
    let data = tmp.path().join("data");
    fs::create_dir(&data).unwrap();

    cmd()
        .arg("--data-dir")
        .arg(&data)
        .args(["analyze", "../test_user1", "../test_user2"])
        .assert()
        .failure()
        .stderr(contains("Invalid username"));
}

#[test]
fn cache_serves_snapshots_after_source_is_gone() {
    let tmp = fixture();
    let db = tmp.path().join("cache.db");

    cmd()
        .arg("--data-dir")
        .arg(tmp.path())
        .arg("--cache")
        .arg(&db)
        .args(["analyze", "test_user1", "test_user2"])
        .assert()
        .success();

    fs::remove_file(tmp.path().join("test_user2.json")).unwrap();

    cmd()
        .arg("--data-dir")
        .arg(tmp.path())
        .arg("--cache")
        .arg(&db)
        .args(["analyze", "test_user1", "test_user2"])
        .assert()
        .success()
        .stdout(contains("Mutual followers: 2"));

    cmd()
        .arg("--cache")
        .arg(&db)
        .arg("clear-cache")
        .assert()
        .success()
        .stdout(contains("Removed 2 cached snapshots"));
}

#[test]
fn rank_rejects_zero_workers() {
    cmd()
        .args(["rank", "someone", "--workers", "0"])
        .assert()
        .failure()
        .stderr(contains("--workers must be greater than 0"));
}
