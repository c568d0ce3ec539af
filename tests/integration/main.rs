//! Integration tests for Dud

mod cli_tests {
    use assert_cmd::Command;
    use predicates::prelude::*;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    fn dud() -> Command {
        Command::cargo_bin("dud").unwrap()
    }

    fn init_workspace() -> TempDir {
        let dir = TempDir::new().unwrap();
        dud()
            .arg("init")
            .current_dir(dir.path())
            .assert()
            .success();
        dir
    }

    fn write_stage(root: &Path, name: &str, contents: &str) {
        fs::write(root.join(name), contents).unwrap();
    }

    fn add_stage(root: &Path, name: &str) {
        dud()
            .args(["stage", "add", name])
            .current_dir(root)
            .assert()
            .success();
    }

    const ECHO_STAGE: &str = "command = \"echo hi > out.txt\"\n\n[outputs]\n\"out.txt\" = \"\"\n";

    #[test]
    fn help_displays() {
        dud()
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("data pipeline"));
    }

    #[test]
    fn version_displays() {
        dud()
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("dud"));
    }

    #[test]
    fn init_creates_layout() {
        let dir = init_workspace();
        assert!(dir.path().join(".dud/cache").is_dir());
        assert!(dir.path().join(".dud/config.toml").is_file());
        assert!(dir.path().join(".dud/index").is_file());
    }

    #[test]
    fn init_twice_fails_without_force() {
        let dir = init_workspace();
        dud()
            .arg("init")
            .current_dir(dir.path())
            .assert()
            .failure()
            .stderr(predicate::str::contains("already initialized"));
    }

    #[test]
    fn run_outside_workspace_fails() {
        let dir = TempDir::new().unwrap();
        dud()
            .arg("run")
            .current_dir(dir.path())
            .assert()
            .failure()
            .stderr(predicate::str::contains("No dud workspace"));
    }

    #[test]
    fn run_unknown_stage_fails() {
        let dir = init_workspace();
        dud()
            .args(["run", "ghost.toml"])
            .current_dir(dir.path())
            .assert()
            .failure()
            .stderr(predicate::str::contains("not in the index"));
    }

    #[test]
    fn run_with_empty_index_is_a_noop() {
        let dir = init_workspace();
        dud()
            .arg("run")
            .current_dir(dir.path())
            .assert()
            .success()
            .stdout(predicate::str::contains("No stages in the index"));
    }

    #[test]
    fn stage_add_rejects_unparseable_files() {
        let dir = init_workspace();
        write_stage(dir.path(), "bad.toml", "command = [nope");
        dud()
            .args(["stage", "add", "bad.toml"])
            .current_dir(dir.path())
            .assert()
            .failure()
            .stderr(predicate::str::contains("Invalid stage file"));
    }

    #[test]
    fn stage_add_rejects_conflicting_outputs() {
        let dir = init_workspace();
        write_stage(dir.path(), "a.toml", ECHO_STAGE);
        write_stage(dir.path(), "b.toml", ECHO_STAGE);
        add_stage(dir.path(), "a.toml");
        dud()
            .args(["stage", "add", "b.toml"])
            .current_dir(dir.path())
            .assert()
            .failure()
            .stderr(predicate::str::contains("declared by both"));
    }

    #[test]
    fn cold_run_executes_and_commits() {
        let dir = init_workspace();
        write_stage(dir.path(), "echo.toml", ECHO_STAGE);
        add_stage(dir.path(), "echo.toml");

        dud()
            .arg("run")
            .current_dir(dir.path())
            .assert()
            .success()
            .stdout(predicate::str::contains("1 executed"));

        assert_eq!(
            fs::read_to_string(dir.path().join("out.txt")).unwrap(),
            "hi\n"
        );
        assert!(dir.path().join(".dud/io-cache/io-hash-table").is_file());

        // the stage file was rewritten with the committed checksums
        let stage = fs::read_to_string(dir.path().join("echo.toml")).unwrap();
        assert!(!stage.contains("checksum = \"\"\n"));
    }

    #[test]
    fn warm_run_restores_deleted_output() {
        let dir = init_workspace();
        write_stage(dir.path(), "echo.toml", ECHO_STAGE);
        add_stage(dir.path(), "echo.toml");

        dud().arg("run").current_dir(dir.path()).assert().success();
        fs::remove_file(dir.path().join("out.txt")).unwrap();

        dud()
            .arg("run")
            .current_dir(dir.path())
            .assert()
            .success()
            .stdout(predicate::str::contains("0 executed"));
        assert_eq!(
            fs::read_to_string(dir.path().join("out.txt")).unwrap(),
            "hi\n"
        );
    }

    #[test]
    fn pipeline_runs_upstream_first() {
        let dir = init_workspace();
        fs::write(dir.path().join("src.txt"), "v1\n").unwrap();
        write_stage(
            dir.path(),
            "mid.toml",
            "command = \"cat src.txt > mid.txt\"\n\n[inputs]\n\"src.txt\" = \"\"\n\n[outputs]\n\"mid.txt\" = \"\"\n",
        );
        write_stage(
            dir.path(),
            "final.toml",
            "command = \"cat mid.txt > final.txt\"\n\n[inputs]\n\"mid.txt\" = \"\"\n\n[outputs]\n\"final.txt\" = \"\"\n",
        );
        add_stage(dir.path(), "mid.toml");
        add_stage(dir.path(), "final.toml");

        dud()
            .args(["run", "final.toml"])
            .current_dir(dir.path())
            .assert()
            .success()
            .stdout(predicate::str::contains("2 executed"));
        assert_eq!(
            fs::read_to_string(dir.path().join("final.txt")).unwrap(),
            "v1\n"
        );

        // editing the source re-executes both stages
        fs::write(dir.path().join("src.txt"), "v2\n").unwrap();
        dud()
            .args(["run", "final.toml"])
            .current_dir(dir.path())
            .assert()
            .success()
            .stdout(predicate::str::contains("2 executed"));
        assert_eq!(
            fs::read_to_string(dir.path().join("final.txt")).unwrap(),
            "v2\n"
        );
    }

    #[test]
    fn cycle_fails() {
        let dir = init_workspace();
        write_stage(
            dir.path(),
            "a.toml",
            "command = \"true\"\n\n[inputs]\n\"b\" = \"\"\n\n[outputs]\n\"a\" = \"\"\n",
        );
        write_stage(
            dir.path(),
            "b.toml",
            "command = \"true\"\n\n[inputs]\n\"a\" = \"\"\n\n[outputs]\n\"b\" = \"\"\n",
        );
        add_stage(dir.path(), "a.toml");
        add_stage(dir.path(), "b.toml");

        dud()
            .arg("run")
            .current_dir(dir.path())
            .assert()
            .failure()
            .stderr(predicate::str::contains("cycle detected"));
    }

    #[test]
    fn import_artifacts_into_output_dir() {
        let dir = init_workspace();
        write_stage(dir.path(), "echo.toml", ECHO_STAGE);
        add_stage(dir.path(), "echo.toml");
        dud().arg("run").current_dir(dir.path()).assert().success();

        dud()
            .args(["import-artifacts", "echo.toml", "-O", "exported"])
            .current_dir(dir.path())
            .assert()
            .success()
            .stdout(predicate::str::contains("Imported 1 of 1"));
        assert_eq!(
            fs::read_to_string(dir.path().join("exported/out.txt")).unwrap(),
            "hi\n"
        );
    }

    /// Every object stored in a cache directory, across the fan-out
    fn find_objects(cache_dir: &Path) -> Vec<std::path::PathBuf> {
        let mut objects = Vec::new();
        for entry in fs::read_dir(cache_dir).unwrap() {
            let fan_out = entry.unwrap().path();
            if fan_out.is_dir() {
                for object in fs::read_dir(&fan_out).unwrap() {
                    objects.push(object.unwrap().path());
                }
            }
        }
        objects
    }

    #[test]
    fn import_artifacts_fetches_from_remote_then_links_locally() {
        let dir = init_workspace();
        write_stage(dir.path(), "echo.toml", ECHO_STAGE);
        add_stage(dir.path(), "echo.toml");
        dud().arg("run").current_dir(dir.path()).assert().success();

        // move the committed object into a remote store, preserving fan-out
        let cache_dir = dir.path().join(".dud/cache");
        let objects = find_objects(&cache_dir);
        assert_eq!(objects.len(), 1);
        let object = &objects[0];
        let rel = object.strip_prefix(&cache_dir).unwrap();
        let remote_dir = dir.path().join("remote-objects");
        fs::create_dir_all(remote_dir.join(rel.parent().unwrap())).unwrap();
        fs::copy(object, remote_dir.join(rel)).unwrap();
        fs::remove_file(object).unwrap();

        let config_path = dir.path().join(".dud/config.toml");
        fs::write(
            &config_path,
            format!(
                "cache = \".dud/cache\"\nremote = \"{}\"\n",
                remote_dir.display()
            ),
        )
        .unwrap();

        dud()
            .args(["import-artifacts", "echo.toml", "-O", "exported"])
            .current_dir(dir.path())
            .assert()
            .success()
            .stdout(predicate::str::contains("fetching from remote"))
            .stdout(predicate::str::contains("Imported 1 of 1"));
        assert_eq!(
            fs::read_to_string(dir.path().join("exported/out.txt")).unwrap(),
            "hi\n"
        );
        // the fetch populated the local cache
        assert!(object.is_file());

        // with the remote unset, the now-local object alone suffices
        fs::write(&config_path, "cache = \".dud/cache\"\n").unwrap();
        fs::remove_file(dir.path().join("exported/out.txt")).unwrap();
        fs::remove_dir_all(&remote_dir).unwrap();

        dud()
            .args(["import-artifacts", "echo.toml", "-O", "exported"])
            .current_dir(dir.path())
            .assert()
            .success()
            .stdout(predicate::str::contains("fetching from remote").not())
            .stdout(predicate::str::contains("Imported 1 of 1"));
        assert_eq!(
            fs::read_to_string(dir.path().join("exported/out.txt")).unwrap(),
            "hi\n"
        );
    }

    #[test]
    fn import_artifacts_skips_uncommitted_outputs() {
        let dir = init_workspace();
        write_stage(dir.path(), "echo.toml", ECHO_STAGE);

        dud()
            .args(["import-artifacts", "echo.toml"])
            .current_dir(dir.path())
            .assert()
            .success()
            .stdout(predicate::str::contains("Imported 0 of 1"))
            .stderr(predicate::str::contains("no committed checksum"));
    }
}
