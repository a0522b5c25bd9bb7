use assert_cmd::Command;
use std::path::PathBuf;
use tempfile::TempDir;

/// Runs the `almanac` binary against a throwaway database.
///
/// The working directory is the temp dir, so a stray `almanac.toml` from the
/// developer's checkout is never picked up.
pub struct CliTestHarness {
    temp_dir: TempDir,
    db_path: PathBuf,
}

impl CliTestHarness {
    pub fn new() -> Self {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp directory");
        let db_path = temp_dir.path().join("test.db");

        Self { temp_dir, db_path }
    }

    pub fn command(&self) -> Command {
        let mut cmd = Command::cargo_bin("almanac").expect("Failed to find almanac binary");
        cmd.current_dir(self.temp_dir.path());
        cmd.env("ALMANAC_DATABASE_PATH", &self.db_path);
        cmd.env_remove("ALMANAC_LOG");
        cmd.env_remove("ALMANAC_DEFAULT_USER");
        cmd
    }

    pub fn run_success(&self, args: &[&str]) -> assert_cmd::assert::Assert {
        self.command().args(args).assert().success()
    }

    pub fn run_failure(&self, args: &[&str]) -> assert_cmd::assert::Assert {
        self.command().args(args).assert().failure()
    }

    /// Runs a successful command and returns its stdout.
    pub fn stdout_of(&self, args: &[&str]) -> String {
        let output = self.run_success(args).get_output().stdout.clone();
        String::from_utf8(output).expect("stdout is not UTF-8")
    }

    /// Creates an event and returns its id as printed by `event add`.
    pub fn add_event(&self, args: &[&str]) -> String {
        let mut full = vec!["event", "add"];
        full.extend_from_slice(args);
        let stdout = self.stdout_of(&full);
        extract_uuid(&stdout).expect("event add printed no id")
    }
}

/// Finds the first UUID in `text`, ignoring any ANSI color codes around it.
pub fn extract_uuid(text: &str) -> Option<String> {
    text.split(|c: char| !(c.is_ascii_hexdigit() || c == '-'))
        .find(|token| token.len() == 36 && token.matches('-').count() == 4)
        .map(str::to_string)
}

pub mod fixtures {
    /// Weekly on Mondays at 09:00 through 2024-01-29: five January occurrences.
    pub fn weekly_standup() -> Vec<&'static str> {
        vec![
            "Standup",
            "--start",
            "2024-01-01 09:00",
            "--duration",
            "30",
            "--every",
            "weekly",
            "--until",
            "2024-01-29 09:00",
        ]
    }

    pub fn january() -> Vec<&'static str> {
        vec!["agenda", "--from", "2024-01-01", "--to", "2024-01-31"]
    }
}
