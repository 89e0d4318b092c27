use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// A scratch home with its own trash under `data/Trash`.
struct Sandbox {
    dir: TempDir,
}

impl Sandbox {
    fn new() -> Self {
        Self {
            dir: tempfile::tempdir().unwrap(),
        }
    }

    fn root(&self) -> PathBuf {
        self.dir.path().canonicalize().unwrap()
    }

    fn trash(&self) -> PathBuf {
        self.root().join("data").join("Trash")
    }

    fn file(&self, relative: &str, content: &str) -> PathBuf {
        let path = self.root().join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, content).unwrap();
        path
    }

    fn trs(&self) -> Command {
        let mut cmd = Command::cargo_bin("trs").unwrap();
        cmd.current_dir(self.root())
            .env("XDG_DATA_HOME", self.root().join("data"))
            .env("HOME", self.root())
            .env_remove("TRS_LOG");
        cmd
    }
}

fn entries(dir: &Path) -> Vec<String> {
    let mut names = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().into_string().unwrap())
        .collect::<Vec<_>>();
    names.sort();
    names
}

#[test]
fn trash_list_restore_round_trip() {
    let sb = Sandbox::new();
    let path = sb.file("notes/a.txt", "hello");

    sb.trs()
        .args(["move", "notes/a.txt"])
        .assert()
        .success()
        .stdout(predicate::str::contains("as a.txt"));
    assert!(!path.exists());

    let info = fs::read_to_string(sb.trash().join("info/a.txt.trashinfo")).unwrap();
    assert!(info.starts_with("[Trash Info]\n"));
    assert!(info.contains(&format!("Path={}\n", path.display())));
    assert!(info.contains("DeletionDate="));

    sb.trs()
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("a.txt"))
        .stdout(predicate::str::contains(path.to_str().unwrap()));

    sb.trs()
        .args(["restore", "a.txt"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Restored a.txt"));
    assert_eq!(fs::read_to_string(&path).unwrap(), "hello");

    sb.trs()
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("Trash is empty."));
}

#[test]
fn same_name_from_another_directory_is_numbered() {
    let sb = Sandbox::new();
    sb.file("one/a.txt", "1");
    sb.file("two/a.txt", "2");

    sb.trs().arg("one/a.txt").assert().success();
    sb.trs()
        .arg("two/a.txt")
        .assert()
        .success()
        .stdout(predicate::str::contains("as a (2).txt"));

    assert_eq!(entries(&sb.trash().join("files")), vec!["a (2).txt", "a.txt"]);
    assert_eq!(
        entries(&sb.trash().join("info")),
        vec!["a (2).txt.trashinfo", "a.txt.trashinfo"]
    );
}

#[test]
fn existing_path_named_like_a_subcommand_is_trashed() {
    let sb = Sandbox::new();
    let path = sb.file("list", "not a command");

    sb.trs().arg("list").assert().success();
    assert!(!path.exists());
    assert!(sb.trash().join("files/list").is_file());
}

#[test]
fn per_item_errors_do_not_fail_the_run() {
    let sb = Sandbox::new();
    sb.file("dir/inner.txt", "x");
    let good = sb.file("good.txt", "x");

    sb.trs()
        .args(["missing.txt", "dir", "good.txt"])
        .assert()
        .success()
        .stderr(predicate::str::contains("no such file or directory"))
        .stderr(predicate::str::contains("is a directory"));
    assert!(!good.exists());
    assert!(sb.root().join("dir").is_dir());

    sb.trs()
        .args(["-f", "missing.txt"])
        .assert()
        .success()
        .stderr(predicate::str::is_empty());

    sb.trs().args(["-r", "dir"]).assert().success();
    assert!(sb.trash().join("files/dir/inner.txt").is_file());
}

#[test]
fn restore_refuses_to_overwrite() {
    let sb = Sandbox::new();
    let path = sb.file("a.txt", "old");
    sb.trs().arg("a.txt").assert().success();
    fs::write(&path, "new").unwrap();

    sb.trs()
        .args(["restore", "a.txt", "nothing"])
        .assert()
        .success()
        .stderr(predicate::str::contains("destination already exists"))
        .stderr(predicate::str::contains("'nothing' is not in the trash"));
    assert_eq!(fs::read_to_string(&path).unwrap(), "new");
    assert!(sb.trash().join("files/a.txt").exists());
}

#[test]
fn restore_refuses_missing_directory() {
    let sb = Sandbox::new();
    sb.file("gone/a.txt", "x");
    sb.trs().arg("gone/a.txt").assert().success();
    fs::remove_dir(sb.root().join("gone")).unwrap();

    sb.trs()
        .args(["restore", "a.txt"])
        .assert()
        .success()
        .stderr(predicate::str::contains("original directory does not exist"));
    assert!(!sb.root().join("gone").exists());
    assert!(sb.trash().join("info/a.txt.trashinfo").exists());
}

#[test]
fn empty_asks_first() {
    let sb = Sandbox::new();
    sb.file("a.txt", "x");
    sb.trs().arg("a.txt").assert().success();

    sb.trs()
        .arg("empty")
        .write_stdin("n\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Aborted."));
    assert_eq!(entries(&sb.trash().join("files")), vec!["a.txt"]);

    sb.trs().arg("empty").write_stdin("y\n").assert().success();
    assert!(entries(&sb.trash().join("files")).is_empty());
    assert!(entries(&sb.trash().join("info")).is_empty());
}

#[test]
fn forced_empty_clears_everything() {
    let sb = Sandbox::new();
    sb.file("a.txt", "x");
    sb.file("dir/b.txt", "y");
    sb.trs().args(["-r", "a.txt", "dir"]).assert().success();

    sb.trs()
        .args(["empty", "--force"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Trash emptied"));

    sb.trs()
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("Trash is empty."));
    sb.trs()
        .args(["empty", "-f"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Trash is already empty."));
}

#[test]
fn damaged_metadata_lists_as_unknown() {
    let sb = Sandbox::new();
    sb.file("data/Trash/info/broken.trashinfo", "garbage");

    sb.trs()
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("broken"))
        .stdout(predicate::str::contains("unknown"));
}

#[test]
fn bad_arguments_fail_before_touching_anything() {
    let sb = Sandbox::new();
    let path = sb.file("a.txt", "x");

    sb.trs().args(["move", "--bogus", "a.txt"]).assert().code(2);
    sb.trs().arg("restore").assert().code(2);
    assert!(path.exists());
}
