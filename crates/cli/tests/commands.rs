use assert_cmd::Command;

fn shelf(config_dir: &std::path::Path, store: &std::path::Path) -> Command {
    let mut cmd = Command::cargo_bin("shelf").unwrap();
    cmd.arg("--config-dir")
        .arg(config_dir)
        .env("SHELF_STORE__PATH", store)
        .env("RUST_LOG", "off");
    cmd
}

#[test]
fn init_store_then_check_store() {
    let temp_dir = tempfile::tempdir().unwrap();
    let store = temp_dir.path().join("data/books.json");

    let output = shelf(temp_dir.path(), &store)
        .arg("init-store")
        .output()
        .unwrap();
    assert!(output.status.success());
    assert!(store.exists());

    let output = shelf(temp_dir.path(), &store)
        .arg("check-store")
        .output()
        .unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("0 books, 0 comments"), "{stdout}");
}

#[test]
fn check_store_counts_comments() {
    let temp_dir = tempfile::tempdir().unwrap();
    let store = temp_dir.path().join("books.json");
    std::fs::write(
        &store,
        r#"[
            {"asin": "a1", "title": "Dune", "comments": [
                {"_id": "c1", "username": "reader", "comment": "great", "_createdDate": "2024-01-01T00:00:00Z"}
            ]},
            {"asin": "a2", "title": "Emma"}
        ]"#,
    )
    .unwrap();

    let output = shelf(temp_dir.path(), &store)
        .arg("check-store")
        .output()
        .unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("2 books, 1 comments"), "{stdout}");
}

#[test]
fn check_store_fails_on_missing_file() {
    let temp_dir = tempfile::tempdir().unwrap();
    let store = temp_dir.path().join("absent.json");

    shelf(temp_dir.path(), &store)
        .arg("check-store")
        .assert()
        .failure();
}

#[test]
fn routes_lists_book_endpoints() {
    let temp_dir = tempfile::tempdir().unwrap();
    let store = temp_dir.path().join("books.json");

    let output = shelf(temp_dir.path(), &store)
        .arg("routes")
        .output()
        .unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("/healthz"));
    assert!(stdout.contains("DELETE  /books/{asin}/comments/{commentId}"), "{stdout}");
    assert!(stdout.contains("POST    /books/search"), "{stdout}");
}
