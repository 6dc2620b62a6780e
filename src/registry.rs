//! Operation registry and selector.
//!
//! Builds the ordered run plan. In default mode the plan is every built-in
//! operation in registration order; in explicit mode it is exactly the
//! identifiers given, in the order given. Identifiers that do not resolve to
//! a readable script with an invocation marker are skipped, never fatal.

use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;
use walkdir::WalkDir;

use crate::config::{HarnessConfig, OperationDecl};
use crate::errors::SkipReason;
use crate::operation::{CommandSpec, Operation, OperationSource};

/// How many leading lines of a script are searched for a description.
pub const DESCRIPTION_SCAN_LINES: usize = 160;
const MAX_SCRIPT_READ: u64 = 64 * 1024;

static DESCRIPTION_DECL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^\s*(?:[A-Za-z0-9]+_)*DESCRIPTION\s*[:=]\s*(?:"([^"]*)"|'([^']*)')"#)
        .expect("static pattern")
});

/// The run plan produced by the selector.
#[derive(Debug, Default)]
pub struct Selection {
    pub operations: Vec<Operation>,
    /// Identifiers that were dropped, with the reason, in input order.
    pub skipped: Vec<(String, SkipReason)>,
    /// True when the caller named the operations explicitly.
    pub explicit: bool,
}

impl Selection {
    /// Explicit mode defaults to quiet, default mode to prompting; an
    /// explicit flag from the caller wins either way.
    pub fn quiet(&self, flag: Option<bool>) -> bool {
        flag.unwrap_or(self.explicit)
    }
}

pub struct Registry<'c> {
    config: &'c HarnessConfig,
}

impl<'c> Registry<'c> {
    pub fn new(config: &'c HarnessConfig) -> Self {
        Self { config }
    }

    /// Builds the plan from explicit identifiers, or from the built-ins when
    /// `ids` is empty.
    pub fn select(&self, ids: &[String]) -> Selection {
        let selection = if ids.is_empty() {
            self.builtins()
        } else {
            let mut selection = Selection {
                explicit: true,
                ..Selection::default()
            };
            for id in ids {
                match self.resolve_script(id) {
                    Ok(op) => selection.operations.push(op),
                    Err(reason) => selection.skipped.push((id.clone(), reason)),
                }
            }
            selection
        };
        for (id, reason) in &selection.skipped {
            // Users see the reporter's skip line; this is for diagnostics only.
            tracing::debug!(operation = %id, %reason, "skipping operation");
        }
        tracing::debug!(
            selected = selection.operations.len(),
            skipped = selection.skipped.len(),
            explicit = selection.explicit,
            "run plan built"
        );
        selection
    }

    /// Every registered built-in, in registration order.
    pub fn builtins(&self) -> Selection {
        let mut selection = Selection::default();
        if self.config.operations.is_empty() {
            for path in discover_scripts(&self.config.scripts_dir) {
                match inspect_script(&path) {
                    Ok(op) => selection.operations.push(op),
                    Err(reason) => tracing::debug!(%reason, "ignoring non-script file"),
                }
            }
            return selection;
        }

        for decl in &self.config.operations {
            match decl {
                OperationDecl::Script {
                    script,
                    description,
                } => match self.resolve_path(script) {
                    Ok(mut op) => {
                        if let Some(description) = description {
                            op.description = description.clone();
                        }
                        selection.operations.push(op);
                    }
                    Err(reason) => selection.skipped.push((decl.name(), reason)),
                },
                OperationDecl::Command {
                    name,
                    description,
                    program,
                    args,
                    workdir,
                } => {
                    let mut spec = CommandSpec::new(program).args(args);
                    if let Some(dir) = workdir {
                        spec = spec.current_dir(dir);
                    }
                    selection
                        .operations
                        .push(Operation::builtin(name.clone(), description.clone(), spec));
                }
            }
        }
        selection
    }

    /// Resolves one identifier to a script operation.
    pub fn resolve_script(&self, id: &str) -> Result<Operation, SkipReason> {
        self.resolve_path(Path::new(id))
    }

    fn resolve_path(&self, id: &Path) -> Result<Operation, SkipReason> {
        inspect_script(&self.locate(id))
    }

    /// Relative identifiers are looked up in the scripts directory first,
    /// then relative to the current directory.
    fn locate(&self, id: &Path) -> PathBuf {
        if id.is_absolute() {
            return id.to_path_buf();
        }
        let candidate = self.config.scripts_dir.join(id);
        if candidate.exists() {
            candidate
        } else {
            id.to_path_buf()
        }
    }
}

/// Regular, non-hidden files directly under `dir`, sorted by file name.
pub fn discover_scripts(dir: &Path) -> Vec<PathBuf> {
    WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| !e.file_name().to_string_lossy().starts_with('.'))
        .map(|e| e.into_path())
        .collect()
}

/// Checks that `path` is a readable script with an invocation marker and
/// builds its operation.
pub fn inspect_script(path: &Path) -> Result<Operation, SkipReason> {
    let meta = fs::metadata(path).map_err(|source| match source.kind() {
        io::ErrorKind::NotFound => SkipReason::NotFound(path.to_path_buf()),
        _ => SkipReason::Unreadable {
            path: path.to_path_buf(),
            source,
        },
    })?;
    if !meta.is_file() {
        return Err(SkipReason::NotAFile(path.to_path_buf()));
    }

    let mut head = Vec::new();
    File::open(path)
        .and_then(|f| f.take(MAX_SCRIPT_READ).read_to_end(&mut head))
        .map_err(|source| SkipReason::Unreadable {
            path: path.to_path_buf(),
            source,
        })?;
    let text = String::from_utf8_lossy(&head);

    let first_line = text.lines().next().unwrap_or_default();
    let (interpreter, interpreter_args) = parse_invocation_marker(first_line)
        .ok_or_else(|| SkipReason::NoInvocationMarker(path.to_path_buf()))?;

    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    let description = extract_description(&text).unwrap_or_else(|| name.clone());
    let command = CommandSpec::new(interpreter)
        .args(interpreter_args)
        .arg(path);

    Ok(Operation {
        name,
        description,
        command,
        source: OperationSource::Script(path.to_path_buf()),
    })
}

/// `#!/usr/bin/env python3` -> `("/usr/bin/env", ["python3"])`.
pub fn parse_invocation_marker(line: &str) -> Option<(String, Vec<String>)> {
    let rest = line.strip_prefix("#!")?;
    let mut parts = rest.split_whitespace();
    let interpreter = parts.next()?.to_string();
    Some((interpreter, parts.map(str::to_string).collect()))
}

/// First `[PREFIX_]DESCRIPTION = "..."` declaration in the script head.
pub fn extract_description(text: &str) -> Option<String> {
    text.lines()
        .take(DESCRIPTION_SCAN_LINES)
        .find_map(|line| {
            let caps = DESCRIPTION_DECL.captures(line)?;
            let value = caps.get(1).or_else(|| caps.get(2))?.as_str().trim();
            (!value.is_empty()).then(|| value.to_string())
        })
}
