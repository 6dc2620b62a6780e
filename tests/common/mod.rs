//! Shared fixtures for the `opcheck` integration tests.
//!
//! Each fixture is a throwaway project directory with a `scripts/` folder,
//! and commands built from it run the real binary inside that directory.

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use tempfile::TempDir;

pub const LOG_FILE: &str = "opcheck.log";

pub struct Project {
    dir: TempDir,
}

impl Project {
    pub fn new() -> Self {
        let dir = TempDir::new().expect("temp dir");
        fs::create_dir(dir.path().join("scripts")).expect("scripts dir");
        Self { dir }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Writes `scripts/<name>` as a `/bin/sh` script.
    pub fn script(&self, name: &str, body: &str) -> PathBuf {
        let path = self.path().join("scripts").join(name);
        fs::write(&path, format!("#!/bin/sh\n{}\n", body)).expect("write script");
        path
    }

    pub fn write(&self, relative: &str, contents: &str) -> PathBuf {
        let path = self.path().join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("parent dir");
        }
        fs::write(&path, contents).expect("write file");
        path
    }

    pub fn log(&self) -> String {
        fs::read_to_string(self.path().join(LOG_FILE)).unwrap_or_default()
    }

    /// The binary, run inside the project with tracing off and a piped,
    /// empty stdin.
    pub fn opcheck(&self) -> Command {
        let mut cmd = Command::cargo_bin("opcheck").expect("opcheck binary");
        cmd.current_dir(self.path())
            .env("OPCHECK_LOG", "off")
            .env_remove("NO_COLOR")
            .write_stdin("");
        cmd
    }
}
