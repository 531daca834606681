//! Integration tests for backzip-core.
//!
//! These tests build real backups on the filesystem and inspect the
//! resulting outer and nested archives.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use backzip_core::BackupConfig;
use backzip_core::BackupError;
use backzip_core::BackupJob;
use backzip_core::DirectoryReport;
use backzip_core::JobOptions;
use backzip_core::NameCollision;
use backzip_core::NoopProgress;
use backzip_core::ProgressCallback;
use backzip_core::SourceDir;
use backzip_core::composer::build_backup_archive;
use backzip_core::create_backup;
use backzip_core::naming::CONFIG_ENTRY_NAME;
use backzip_core::policy::should_include;
use backzip_core::upload::DirectoryUploader;
use backzip_core::upload::hand_off;
use chrono::NaiveDate;
use chrono::NaiveDateTime;
use std::fs;
use std::io::Cursor;
use std::io::Read;
use std::path::Path;
use std::path::PathBuf;
use tempfile::TempDir;
use walkdir::WalkDir;
use zip::ZipArchive;

fn read_zip_entries(bytes: &[u8]) -> Vec<(String, Vec<u8>)> {
    let mut archive = ZipArchive::new(Cursor::new(bytes)).expect("valid zip");
    (0..archive.len())
        .map(|i| {
            let mut file = archive.by_index(i).unwrap();
            let mut content = Vec::new();
            file.read_to_end(&mut content).unwrap();
            (file.name().to_string(), content)
        })
        .collect()
}

fn outer_entries(path: &Path) -> Vec<(String, Vec<u8>)> {
    read_zip_entries(&fs::read(path).unwrap())
}

fn names(entries: &[(String, Vec<u8>)]) -> Vec<&str> {
    entries.iter().map(|(n, _)| n.as_str()).collect()
}

fn fixed_clock() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 2, 29)
        .and_then(|d| d.and_hms_opt(23, 59, 59))
        .unwrap()
}

/// Creates `A/keep.txt`, `A/skip.log`, `A/B/inner.txt` under `base`.
fn scenario_tree(base: &Path) -> PathBuf {
    let root = base.join("A");
    fs::create_dir_all(root.join("B")).unwrap();
    fs::write(root.join("keep.txt"), "keep").unwrap();
    fs::write(root.join("skip.log"), "skip").unwrap();
    fs::write(root.join("B/inner.txt"), "inner").unwrap();
    root
}

#[test]
fn test_scenario_excluded_log_file() {
    let temp = TempDir::new().unwrap();
    let root = scenario_tree(temp.path());
    let output = temp.path().join("out/backup.zip");

    let job = BackupJob::new(
        &output,
        vec![SourceDir::new(&root).with_exclude(vec!["*.log".to_string()])],
        b"{\"conf\":true}".to_vec(),
    );
    let report = build_backup_archive(&job, &mut NoopProgress).unwrap();

    let outer = outer_entries(&output);
    assert_eq!(names(&outer), vec![CONFIG_ENTRY_NAME, "A.zip"]);
    assert_eq!(outer[0].1, b"{\"conf\":true}");

    let nested = read_zip_entries(&outer[1].1);
    let mut nested_names = names(&nested);
    nested_names.sort_unstable();
    assert_eq!(nested_names, vec!["B/inner.txt", "keep.txt"]);

    assert_eq!(report.directories.len(), 1);
    assert_eq!(report.directories[0].stats.files_excluded, 1);
    assert_eq!(report.archive_size, fs::metadata(&output).unwrap().len());
}

#[test]
fn test_file_included_iff_policy_allows() {
    let temp = TempDir::new().unwrap();
    let root = temp.path().join("mixed");
    fs::create_dir_all(root.join("cache/deep")).unwrap();
    fs::create_dir_all(root.join("src")).unwrap();
    for file in [
        "a.txt",
        "b.log",
        "tmp_1",
        ".env",
        "cache/x.bin",
        "cache/deep/y.bin",
        "src/main.rs",
        "src/old.log",
    ] {
        fs::write(root.join(file), file).unwrap();
    }

    let rule = SourceDir::new(&root)
        .with_exclude(vec![
            "*.log".to_string(),
            "tmp*".to_string(),
            "cache/*.bin".to_string(),
        ])
        .with_include_hidden(false);

    let output = temp.path().join("b.zip");
    let job = BackupJob::new(&output, vec![rule.clone()], Vec::new());
    build_backup_archive(&job, &mut NoopProgress).unwrap();

    let outer = outer_entries(&output);
    let nested = read_zip_entries(&outer[1].1);
    let mut archived: Vec<String> = nested.into_iter().map(|(n, _)| n).collect();
    archived.sort();

    let mut expected: Vec<String> = WalkDir::new(&root)
        .into_iter()
        .map(Result::unwrap)
        .filter(|e| e.file_type().is_file())
        .filter(|e| should_include(&rule, e.path()))
        .map(|e| {
            e.path()
                .strip_prefix(&root)
                .unwrap()
                .to_str()
                .unwrap()
                .replace('\\', "/")
        })
        .collect();
    expected.sort();

    assert_eq!(archived, expected);
    assert_eq!(archived, vec!["a.txt", "cache/deep/y.bin", "src/main.rs"]);
}

#[test]
fn test_entry_count_and_order() {
    let temp = TempDir::new().unwrap();
    let mut dirs = Vec::new();
    for (name, files) in [("zeta", 3), ("alpha", 0), ("mid", 1)] {
        let dir = temp.path().join("src").join(name);
        fs::create_dir_all(&dir).unwrap();
        for i in 0..files {
            fs::write(dir.join(format!("f{i}.txt")), format!("{name}{i}")).unwrap();
        }
        dirs.push(SourceDir::new(dir));
    }

    let output = temp.path().join("b.zip");
    let job = BackupJob::new(&output, dirs, b"conf".to_vec());
    let report = build_backup_archive(&job, &mut NoopProgress).unwrap();

    let outer = outer_entries(&output);
    assert_eq!(outer.len(), 4);
    assert_eq!(
        names(&outer),
        vec![CONFIG_ENTRY_NAME, "zeta.zip", "alpha.zip", "mid.zip"]
    );
    assert_eq!(report.entry_count(), 4);

    for (_, bytes) in &outer[1..] {
        ZipArchive::new(Cursor::new(bytes.as_slice())).expect("nested entry is a zip");
    }
    assert_eq!(read_zip_entries(&outer[1].1).len(), 3);
}

#[test]
fn test_empty_directory_still_gets_entry() {
    let temp = TempDir::new().unwrap();
    let empty = temp.path().join("empty");
    fs::create_dir(&empty).unwrap();

    let output = temp.path().join("b.zip");
    let job = BackupJob::new(&output, vec![SourceDir::new(&empty)], Vec::new());
    build_backup_archive(&job, &mut NoopProgress).unwrap();

    let outer = outer_entries(&output);
    assert_eq!(names(&outer), vec![CONFIG_ENTRY_NAME, "empty.zip"]);
    assert!(read_zip_entries(&outer[1].1).is_empty());
}

#[test]
fn test_name_collision_overwrite() {
    let temp = TempDir::new().unwrap();
    let first = temp.path().join("one/logs");
    let second = temp.path().join("two/logs");
    fs::create_dir_all(&first).unwrap();
    fs::create_dir_all(&second).unwrap();
    fs::write(first.join("first.txt"), "1").unwrap();
    fs::write(second.join("second.txt"), "2").unwrap();

    let output = temp.path().join("b.zip");
    let job = BackupJob::new(
        &output,
        vec![SourceDir::new(&first), SourceDir::new(&second)],
        Vec::new(),
    );
    let report = build_backup_archive(&job, &mut NoopProgress).unwrap();

    let outer = outer_entries(&output);
    assert_eq!(names(&outer), vec![CONFIG_ENTRY_NAME, "logs.zip"]);
    assert_eq!(names(&read_zip_entries(&outer[1].1)), vec!["second.txt"]);

    assert!(report.directories[0].overwritten);
    assert!(!report.directories[1].overwritten);
    assert!(report.has_warnings());
}

#[test]
fn test_name_collision_error_writes_nothing() {
    let temp = TempDir::new().unwrap();
    let first = temp.path().join("one/logs");
    let second = temp.path().join("two/logs");
    fs::create_dir_all(&first).unwrap();
    fs::create_dir_all(&second).unwrap();

    let output = temp.path().join("b.zip");
    let job = BackupJob::new(
        &output,
        vec![SourceDir::new(&first), SourceDir::new(&second)],
        Vec::new(),
    )
    .with_options(JobOptions {
        name_collision: NameCollision::Error,
        ..JobOptions::default()
    });

    let err = build_backup_archive(&job, &mut NoopProgress).unwrap_err();
    assert!(matches!(err, BackupError::DuplicateEntryName { .. }));
    assert!(!output.exists());
}

#[test]
fn test_name_collision_rename() {
    let temp = TempDir::new().unwrap();
    let first = temp.path().join("one/logs");
    let second = temp.path().join("two/logs");
    fs::create_dir_all(&first).unwrap();
    fs::create_dir_all(&second).unwrap();
    fs::write(first.join("first.txt"), "1").unwrap();
    fs::write(second.join("second.txt"), "2").unwrap();

    let output = temp.path().join("b.zip");
    let job = BackupJob::new(
        &output,
        vec![SourceDir::new(&first), SourceDir::new(&second)],
        Vec::new(),
    )
    .with_options(JobOptions {
        name_collision: NameCollision::Rename,
        ..JobOptions::default()
    });
    build_backup_archive(&job, &mut NoopProgress).unwrap();

    let outer = outer_entries(&output);
    assert_eq!(
        names(&outer),
        vec![CONFIG_ENTRY_NAME, "logs.zip", "logs-2.zip"]
    );
    assert_eq!(names(&read_zip_entries(&outer[1].1)), vec!["first.txt"]);
    assert_eq!(names(&read_zip_entries(&outer[2].1)), vec!["second.txt"]);
}

#[test]
fn test_missing_source_aborts_job() {
    let temp = TempDir::new().unwrap();
    let good = temp.path().join("good");
    fs::create_dir(&good).unwrap();

    let output = temp.path().join("b.zip");
    let job = BackupJob::new(
        &output,
        vec![
            SourceDir::new(&good),
            SourceDir::new(temp.path().join("missing")),
        ],
        Vec::new(),
    );

    let err = build_backup_archive(&job, &mut NoopProgress).unwrap_err();
    assert!(matches!(err, BackupError::SourceNotFound { .. }));
}

#[cfg(unix)]
#[test]
fn test_read_failure_mid_walk_aborts_job() {
    use std::os::unix::fs::PermissionsExt;

    let temp = TempDir::new().unwrap();
    let root = temp.path().join("data");
    fs::create_dir(&root).unwrap();
    fs::write(root.join("a.txt"), "a").unwrap();
    let locked = root.join("b.txt");
    fs::write(&locked, "b").unwrap();
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

    // Privileged users can read the file anyway.
    if fs::read(&locked).is_ok() {
        return;
    }

    let output = temp.path().join("b.zip");
    let job = BackupJob::new(&output, vec![SourceDir::new(&root)], Vec::new());
    let err = build_backup_archive(&job, &mut NoopProgress).unwrap_err();

    assert!(matches!(err, BackupError::PathIo { action: "open", .. }));
    assert_eq!(err.path(), Some(locked.as_path()));

    fs::set_permissions(&locked, fs::Permissions::from_mode(0o644)).unwrap();
}

#[cfg(unix)]
#[test]
fn test_vanished_file_aborts_job_when_following_links() {
    let temp = TempDir::new().unwrap();
    let root = temp.path().join("data");
    fs::create_dir(&root).unwrap();
    fs::write(root.join("a.txt"), "a").unwrap();
    std::os::unix::fs::symlink(root.join("vanished.txt"), root.join("b.txt")).unwrap();

    let output = temp.path().join("b.zip");
    let job = BackupJob::new(&output, vec![SourceDir::new(&root)], Vec::new()).with_options(
        JobOptions {
            symlinks: backzip_core::SymlinkPolicy::Follow,
            ..JobOptions::default()
        },
    );

    let err = build_backup_archive(&job, &mut NoopProgress).unwrap_err();
    assert!(err.is_filesystem());
}

#[test]
fn test_parallel_matches_sequential() {
    let temp = TempDir::new().unwrap();
    let mut dirs = Vec::new();
    for name in ["d1", "d2", "d3", "d4"] {
        let dir = temp.path().join(name);
        fs::create_dir_all(dir.join("sub")).unwrap();
        fs::write(dir.join("top.txt"), name).unwrap();
        fs::write(dir.join("sub/inner.txt"), name.repeat(100)).unwrap();
        dirs.push(SourceDir::new(dir));
    }

    let sequential = temp.path().join("seq.zip");
    let parallel = temp.path().join("par.zip");
    build_backup_archive(
        &BackupJob::new(&sequential, dirs.clone(), b"c".to_vec()),
        &mut NoopProgress,
    )
    .unwrap();
    build_backup_archive(
        &BackupJob::new(&parallel, dirs, b"c".to_vec()).with_options(JobOptions {
            parallel: true,
            ..JobOptions::default()
        }),
        &mut NoopProgress,
    )
    .unwrap();

    assert_eq!(fs::read(sequential).unwrap(), fs::read(parallel).unwrap());
}

#[test]
fn test_parallel_error_aborts_job() {
    let temp = TempDir::new().unwrap();
    let good = temp.path().join("good");
    fs::create_dir(&good).unwrap();

    let job = BackupJob::new(
        temp.path().join("b.zip"),
        vec![
            SourceDir::new(temp.path().join("missing")),
            SourceDir::new(&good),
        ],
        Vec::new(),
    )
    .with_options(JobOptions {
        parallel: true,
        ..JobOptions::default()
    });

    let err = build_backup_archive(&job, &mut NoopProgress).unwrap_err();
    assert!(matches!(err, BackupError::SourceNotFound { .. }));
}

#[test]
fn test_parallel_error_is_earliest_failing_directory() {
    let temp = TempDir::new().unwrap();
    let mut dirs = Vec::new();
    for i in 0..6 {
        let dir = temp.path().join(format!("good{i}"));
        fs::create_dir(&dir).unwrap();
        for f in 0..20 {
            fs::write(dir.join(format!("f{f}.txt")), "x".repeat(4096)).unwrap();
        }
        dirs.push(SourceDir::new(dir));
    }
    let first_missing = temp.path().join("missing-first");
    let not_a_dir = temp.path().join("plain-file");
    fs::write(&not_a_dir, "x").unwrap();
    dirs.push(SourceDir::new(&first_missing));
    dirs.push(SourceDir::new(&not_a_dir));
    dirs.push(SourceDir::new(temp.path().join("missing-last")));

    for round in 0..10 {
        let job = BackupJob::new(
            temp.path().join(format!("b{round}.zip")),
            dirs.clone(),
            Vec::new(),
        )
        .with_options(JobOptions {
            parallel: true,
            ..JobOptions::default()
        });

        let err = build_backup_archive(&job, &mut NoopProgress).unwrap_err();
        assert!(matches!(err, BackupError::SourceNotFound { .. }), "{err}");
        assert_eq!(err.path(), Some(first_missing.as_path()));
    }
}

#[cfg(unix)]
#[test]
fn test_symlink_loop_aborts_job_when_following_links() {
    let temp = TempDir::new().unwrap();
    let root = temp.path().join("data");
    fs::create_dir_all(root.join("sub")).unwrap();
    fs::write(root.join("a.txt"), "a").unwrap();
    std::os::unix::fs::symlink(&root, root.join("sub/back")).unwrap();

    let output = temp.path().join("b.zip");
    let job = BackupJob::new(&output, vec![SourceDir::new(&root)], Vec::new()).with_options(
        JobOptions {
            symlinks: backzip_core::SymlinkPolicy::Follow,
            ..JobOptions::default()
        },
    );

    let err = build_backup_archive(&job, &mut NoopProgress).unwrap_err();
    assert!(matches!(err, BackupError::SymlinkLoop { .. }), "{err}");
    assert!(err.is_filesystem());
}

#[cfg(target_os = "linux")]
#[test]
fn test_unreadable_content_aborts_job() {
    // Offset 0 of the process image is never mapped, so reading fails with
    // EIO regardless of privileges.
    let mem = Path::new("/proc/self/mem");
    if fs::read(mem).is_ok() {
        return;
    }

    let temp = TempDir::new().unwrap();
    let root = temp.path().join("data");
    fs::create_dir(&root).unwrap();
    fs::write(root.join("a.txt"), "a").unwrap();
    std::os::unix::fs::symlink(mem, root.join("b.bin")).unwrap();

    let output = temp.path().join("b.zip");
    let job = BackupJob::new(&output, vec![SourceDir::new(&root)], Vec::new()).with_options(
        JobOptions {
            symlinks: backzip_core::SymlinkPolicy::Follow,
            ..JobOptions::default()
        },
    );

    let err = build_backup_archive(&job, &mut NoopProgress).unwrap_err();
    assert!(matches!(err, BackupError::PathIo { action: "read", .. }), "{err}");
    assert_eq!(err.path(), Some(root.join("b.bin").as_path()));
}

#[test]
fn test_rerun_with_fixed_clock_is_identical() {
    let temp = TempDir::new().unwrap();
    let root = scenario_tree(temp.path());

    let config = BackupConfig::default()
        .with_local_folder(temp.path().join("out"))
        .with_dir(SourceDir::new(&root));

    let first = create_backup(&config, fixed_clock()).unwrap();
    let first_bytes = fs::read(&first.output).unwrap();
    let second = create_backup(&config, fixed_clock()).unwrap();
    let second_bytes = fs::read(&second.output).unwrap();

    assert_eq!(first.output, second.output);
    assert_eq!(first_bytes, second_bytes);
    assert!(
        first
            .output
            .ends_with("backup_2024-02-29T23-59-59.zip")
    );
}

#[test]
fn test_config_snapshot_embedded() {
    let temp = TempDir::new().unwrap();
    let root = scenario_tree(temp.path());

    let config = BackupConfig::default()
        .with_local_folder(temp.path())
        .with_dir(SourceDir::new(&root).with_exclude(vec!["*.log".to_string()]));
    let report = create_backup(&config, fixed_clock()).unwrap();

    let outer = outer_entries(&report.output);
    assert_eq!(outer[0].0, CONFIG_ENTRY_NAME);
    let embedded = BackupConfig::from_json(std::str::from_utf8(&outer[0].1).unwrap()).unwrap();
    assert_eq!(embedded, config);
}

#[test]
fn test_creates_missing_output_parents() {
    let temp = TempDir::new().unwrap();
    let root = scenario_tree(temp.path());
    let output = temp.path().join("a/b/c/backup.zip");

    let job = BackupJob::new(&output, vec![SourceDir::new(&root)], Vec::new());
    build_backup_archive(&job, &mut NoopProgress).unwrap();
    assert!(output.exists());
}

#[test]
fn test_progress_callbacks_in_order() {
    #[derive(Default)]
    struct Recorder {
        events: Vec<String>,
    }

    impl ProgressCallback for Recorder {
        fn on_directory_start(&mut self, source: &Path, total: usize, current: usize) {
            let name = source.file_name().unwrap().to_string_lossy();
            self.events.push(format!("start {name} {current}/{total}"));
        }

        fn on_directory_complete(&mut self, report: &DirectoryReport) {
            self.events.push(format!("done {}", report.entry_name));
        }

        fn on_complete(&mut self) {
            self.events.push("complete".to_string());
        }
    }

    let temp = TempDir::new().unwrap();
    let one = temp.path().join("one");
    let two = temp.path().join("two");
    fs::create_dir(&one).unwrap();
    fs::create_dir(&two).unwrap();

    for parallel in [false, true] {
        let job = BackupJob::new(
            temp.path().join(format!("b-{parallel}.zip")),
            vec![SourceDir::new(&one), SourceDir::new(&two)],
            Vec::new(),
        )
        .with_options(JobOptions {
            parallel,
            ..JobOptions::default()
        });

        let mut recorder = Recorder::default();
        build_backup_archive(&job, &mut recorder).unwrap();
        assert_eq!(
            recorder.events,
            vec![
                "start one 1/2",
                "done one.zip",
                "start two 2/2",
                "done two.zip",
                "complete"
            ]
        );
    }
}

#[test]
fn test_backup_then_hand_off() {
    let temp = TempDir::new().unwrap();
    let root = scenario_tree(temp.path());

    let config = BackupConfig::default()
        .with_local_folder(temp.path().join("out"))
        .with_dir(SourceDir::new(&root));
    let report = create_backup(&config, fixed_clock()).unwrap();

    let store = temp.path().join("store");
    let handle = hand_off(&report.output, "nightly", &DirectoryUploader::new(&store)).unwrap();

    let stored = store.join("nightly/backup_2024-02-29T23-59-59.zip");
    assert_eq!(handle.0, stored.display().to_string());
    assert_eq!(fs::read(stored).unwrap(), fs::read(&report.output).unwrap());
}
