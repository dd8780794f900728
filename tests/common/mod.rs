//! Shared test infrastructure for integration tests.

use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

/// A state directory plus a render root, driven through the built binary.
pub struct AgentFixture {
    pub dir: TempDir,
}

impl Default for AgentFixture {
    fn default() -> Self {
        Self::new()
    }
}

impl AgentFixture {
    /// Initialize a state dir whose commands all succeed without touching the machine.
    pub fn new() -> Self {
        let fixture = Self {
            dir: tempfile::tempdir().expect("tempdir"),
        };
        let output = fixture.run(&["init"]);
        assert_success(&output);

        let config_path = fixture.state_dir().join("config.json");
        let mut config: Value =
            serde_json::from_str(&std::fs::read_to_string(&config_path).expect("read config"))
                .expect("parse config");
        config["install_command"] = json!("true");
        config["reload_command"] = json!("true");
        config["service_command"] = json!("true");
        config["root"] = json!(fixture.render_root());
        config["package_path"] = json!(fixture.dir.path().join("opt/chronograf.deb"));
        std::fs::write(
            &config_path,
            serde_json::to_string_pretty(&config).expect("serialize config"),
        )
        .expect("write config");
        fixture
    }

    pub fn state_dir(&self) -> PathBuf {
        self.dir.path().join("state")
    }

    pub fn render_root(&self) -> PathBuf {
        self.dir.path().join("root")
    }

    /// Mark the package as installed so dispatch never downloads.
    pub fn seed_installed(&self) {
        std::fs::write(
            self.state_dir().join("state.json"),
            r#"{"schema_version": 1, "flags": ["installed"], "connections": {}}"#,
        )
        .expect("seed state");
    }

    pub fn write_relations(&self, name: &str, relations: &Value) -> PathBuf {
        let path = self.dir.path().join(name);
        std::fs::write(&path, serde_json::to_vec(relations).expect("serialize"))
            .expect("write relations");
        path
    }

    /// Run a subcommand with `--state-dir` appended.
    pub fn run(&self, args: &[&str]) -> Output {
        let state_dir = self.state_dir();
        Command::new(env!("CARGO_BIN_EXE_chronograf-agent"))
            .args(args)
            .arg("--state-dir")
            .arg(&state_dir)
            .env("CHRONOGRAF_AGENT_LOG", "warn")
            .output()
            .expect("run chronograf-agent")
    }

    pub fn dispatch(&self, relations: Option<&Path>) -> Output {
        let mut args = vec!["dispatch"];
        let relations_str;
        if let Some(path) = relations {
            relations_str = path.to_str().expect("utf-8 path").to_string();
            args.push("--relations");
            args.push(&relations_str);
        }
        self.run(&args)
    }
}

pub fn assert_success(output: &Output) {
    assert!(
        output.status.success(),
        "status {}\nstdout:\n{}\nstderr:\n{}",
        output.status,
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    );
}

pub fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}
