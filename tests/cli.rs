//! End-to-end tests for the `academician` binary that need no API key.

use std::path::Path;

use anyhow::Result;
use predicates::str::contains;
use serde_json::Value as JsonValue;
use tempfile::TempDir;

fn academician(home: &Path) -> Result<assert_cmd::Command> {
    let mut cmd = assert_cmd::Command::cargo_bin("academician")?;
    cmd.current_dir(home)
        .env_remove("OPENAI_API_KEY")
        .env_remove("ACADEMICIAN_API_KEY")
        .env_remove("DATABASE_PATH")
        .env_remove("OUTPUT_DIR")
        .env_remove("GOOGLE_API_KEY")
        .env_remove("GOOGLE_CSE_ID")
        .env_remove("DEFAULT_WORD_COUNT")
        .env_remove("DEFAULT_CITATION_STYLE")
        .env("RUST_LOG", "off");
    Ok(cmd)
}

#[test]
fn version_prints_package_version() -> Result<()> {
    let home = TempDir::new()?;
    academician(home.path())?
        .arg("version")
        .assert()
        .success()
        .stdout(contains(format!("academician {}", env!("CARGO_PKG_VERSION"))));
    Ok(())
}

#[test]
fn config_without_api_key() -> Result<()> {
    let home = TempDir::new()?;
    academician(home.path())?
        .arg("config")
        .assert()
        .success()
        .stdout(contains("Citation style:  APA"))
        .stdout(contains("Not configured"));

    let output = academician(home.path())?
        .args(["config", "--output-format", "json"])
        .output()?;
    assert!(output.status.success());
    let parsed: JsonValue = serde_json::from_str(&String::from_utf8(output.stdout)?)?;
    assert_eq!(parsed["paper"]["word_count"], 18_000);
    assert!(parsed["llm"].is_null());
    assert_eq!(parsed["google_search"], false);
    Ok(())
}

#[test]
fn generate_requires_api_key_before_touching_storage() -> Result<()> {
    let home = TempDir::new()?;
    let db = home.path().join("papers.db");
    academician(home.path())?
        .args(["--db-path"])
        .arg(&db)
        .args(["generate", "soil carbon"])
        .assert()
        .failure()
        .stderr(contains("API key not configured"));
    assert!(!db.exists());
    Ok(())
}

#[test]
fn generate_rejects_unknown_format() -> Result<()> {
    let home = TempDir::new()?;
    academician(home.path())?
        .args(["generate", "soil carbon", "--format", "rtf"])
        .assert()
        .failure()
        .stderr(contains("unknown export format 'rtf'"));
    Ok(())
}

#[test]
fn sessions_empty_state() -> Result<()> {
    let home = TempDir::new()?;
    academician(home.path())?
        .args(["sessions", "--limit", "5"])
        .assert()
        .success()
        .stdout(contains("No sessions found."));
    Ok(())
}

#[test]
fn init_prompts_writes_templates() -> Result<()> {
    let home = TempDir::new()?;
    let dir = home.path().join("prompts");
    academician(home.path())?
        .args(["init-prompts", "--dir"])
        .arg(&dir)
        .assert()
        .success()
        .stdout(contains("Wrote 6 prompt template(s)"));
    assert_eq!(std::fs::read_dir(&dir)?.count(), 6);
    Ok(())
}
