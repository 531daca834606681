//! Example: Backing up directories with backzip-core
//!
//! Run with: `cargo run --example backup_dirs`

use backzip_core::BackupConfig;
use backzip_core::NameCollision;
use backzip_core::SourceDir;
use backzip_core::create_backup;
use backzip_core::upload::DirectoryUploader;
use backzip_core::upload::hand_off;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let work = std::env::temp_dir().join("backzip-example");
    let docs = work.join("docs");
    let logs = work.join("service/logs");
    std::fs::create_dir_all(docs.join("drafts"))?;
    std::fs::create_dir_all(&logs)?;
    std::fs::write(docs.join("readme.txt"), "Hello, backzip!")?;
    std::fs::write(docs.join("drafts/notes.txt"), "draft")?;
    std::fs::write(docs.join("build.log"), "noise")?;
    std::fs::write(logs.join("service.log"), "started")?;

    println!("Example 1: Local backup with an exclude rule");
    let config = BackupConfig::default()
        .with_local_folder(work.join("out"))
        .with_dir(SourceDir::new(&docs).with_exclude(vec!["*.log".to_string()]))
        .with_dir(SourceDir::new(&logs));
    let report = create_backup(&config, chrono::Local::now().naive_local())?;
    println!(
        "  {} entries, {} files archived, {} excluded",
        report.entry_count(),
        report.files_added(),
        report.files_excluded()
    );

    println!("\nExample 2: Renaming colliding entries and handing off");
    let config = config
        .with_dir(SourceDir::new(work.join("docs")))
        .with_name_collision(NameCollision::Rename)
        .with_parallel(true);
    let report = create_backup(&config, chrono::Local::now().naive_local())?;
    for dir in &report.directories {
        println!("  {} -> {}", dir.source.display(), dir.entry_name);
    }

    let handle = hand_off(
        &report.output,
        "example",
        &DirectoryUploader::new(work.join("store")),
    )?;
    println!("  Stored as {handle}");

    std::fs::remove_dir_all(&work)?;
    println!("\nExamples completed successfully!");
    Ok(())
}
