//! E2E test fixture: an isolated notes directory, config and index database
//! per scenario, with step logging for readable failure output.

use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::Value;
use tempfile::TempDir;

use notesift::search::{Embedder, HashEmbedder};
use notesift::{Config, Database, SearchEngine, TextIndex};

/// Embedding dimensions used by every scenario; small keeps the runs fast.
pub const DIMS: usize = 64;

/// Output of one `notesift` invocation.
#[derive(Debug)]
pub struct CommandOutput {
    pub success: bool,
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
    pub elapsed: Duration,
}

impl CommandOutput {
    /// Parse stdout as the JSON envelope.
    pub fn json(&self) -> Value {
        serde_json::from_str(&self.stdout).unwrap_or_else(|err| {
            panic!(
                "[E2E] stdout is not JSON ({err})\nStdout: {}\nStderr: {}",
                truncate(&self.stdout, 500),
                truncate(&self.stderr, 500)
            )
        })
    }
}

pub struct E2EFixture {
    pub scenario_name: String,
    pub temp_dir: TempDir,
    pub root: PathBuf,
    pub notes_dir: PathBuf,
    pub db_path: PathBuf,
    pub config_path: PathBuf,
    step_count: usize,
    start_time: Instant,
}

impl E2EFixture {
    pub fn new(scenario_name: &str) -> Self {
        let start_time = Instant::now();
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let root = temp_dir.path().to_path_buf();
        let notes_dir = root.join("notes");
        let db_path = root.join("data/index.db");
        let config_path = root.join("config.toml");

        std::fs::create_dir_all(&notes_dir).expect("Failed to create notes dir");
        std::fs::write(
            &config_path,
            format!("[embedding]\nbackend = \"hash\"\ndims = {DIMS}\n"),
        )
        .expect("Failed to write config");

        println!();
        println!("{}", "=".repeat(70));
        println!("[E2E] Scenario: {scenario_name}");
        println!("[E2E] Root: {}", root.display());
        println!("{}", "=".repeat(70));

        Self {
            scenario_name: scenario_name.to_string(),
            temp_dir,
            root,
            notes_dir,
            db_path,
            config_path,
            step_count: 0,
            start_time,
        }
    }

    /// Log a test step with a visual banner.
    pub fn log_step(&mut self, description: &str) {
        self.step_count += 1;
        let elapsed = self.start_time.elapsed();

        println!();
        println!("┌{}", "─".repeat(68));
        println!("│ STEP {}: {}", self.step_count, description);
        println!("│ Time: {:?}", elapsed);
        println!("└{}", "─".repeat(68));
    }

    /// Write a markdown note under the notes directory.
    pub fn write_note(&self, relative: &str, content: &str) -> PathBuf {
        let file = self.notes_dir.join(relative);
        if let Some(parent) = file.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create note dir");
        }
        std::fs::write(&file, content).expect("Failed to write note");
        println!("[NOTE] {} ({} bytes)", relative, content.len());
        file
    }

    /// Run the binary against this fixture's config and database.
    pub fn run(&mut self, args: &[&str]) -> CommandOutput {
        let start = Instant::now();
        println!();
        println!("[CMD] notesift {}", args.join(" "));

        let output = Command::new(env!("CARGO_BIN_EXE_notesift"))
            .arg("--config")
            .arg(&self.config_path)
            .arg("--db")
            .arg(&self.db_path)
            .args(args)
            .env("HOME", &self.root)
            .env_remove("NOTESIFT_CONFIG")
            .env("NO_COLOR", "1")
            .current_dir(&self.root)
            .output()
            .expect("Failed to execute notesift");

        let result = CommandOutput {
            success: output.status.success(),
            exit_code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            elapsed: start.elapsed(),
        };

        println!("[CMD] exit={} time={:?}", result.exit_code, result.elapsed);
        if !result.stdout.is_empty() {
            println!("[STDOUT]\n{}", truncate(&result.stdout, 1000));
        }
        if !result.stderr.is_empty() {
            println!("[STDERR]\n{}", truncate(&result.stderr, 1000));
        }
        result
    }

    /// Open a library engine over the fixture database.
    pub fn open_engine(&self, embedder: Option<Arc<dyn Embedder>>) -> SearchEngine {
        let db = Database::open(&self.db_path).expect("Failed to open index database");
        let index: Arc<dyn TextIndex> = Arc::new(db);
        SearchEngine::open(index, embedder, &Config::default()).expect("Failed to open engine")
    }

    pub fn hash_embedder() -> Arc<dyn Embedder> {
        Arc::new(HashEmbedder::new(DIMS))
    }

    pub fn assert_success(&self, output: &CommandOutput, operation: &str) {
        assert!(
            output.success,
            "[E2E] {} failed with exit code {}: {}",
            operation, output.exit_code, output.stderr
        );
        println!("[ASSERT] {} - SUCCESS", operation);
    }

    pub fn assert_failure(&self, output: &CommandOutput, operation: &str) {
        assert!(
            !output.success,
            "[E2E] {} unexpectedly succeeded\nStdout: {}",
            operation,
            truncate(&output.stdout, 500)
        );
        println!("[ASSERT] {} - FAILED AS EXPECTED", operation);
    }

    pub fn assert_output_contains(&self, output: &CommandOutput, expected: &str) {
        let found = output.stdout.contains(expected) || output.stderr.contains(expected);
        assert!(
            found,
            "[E2E] Output does not contain '{}'\nStdout: {}\nStderr: {}",
            expected,
            truncate(&output.stdout, 500),
            truncate(&output.stderr, 500)
        );
        println!("[ASSERT] Output contains '{}' - PASSED", expected);
    }

    pub fn notes_path(&self) -> &Path {
        &self.notes_dir
    }

    pub fn generate_report(&self) {
        println!();
        println!("{}", "=".repeat(70));
        println!(
            "[E2E] {} complete: {} steps in {:?}",
            self.scenario_name,
            self.step_count,
            self.start_time.elapsed()
        );
        println!("{}", "=".repeat(70));
    }
}

fn truncate(text: &str, max: usize) -> String {
    if text.len() <= max {
        return text.to_string();
    }
    let mut end = max;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}... [truncated]", &text[..end])
}
