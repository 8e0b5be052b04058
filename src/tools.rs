/*
 * Quill - Sandboxed Autonomous Coding Agent
 * File Path: src/tools.rs
 * Responsibility: The four sandboxed tool operations and their typed arguments.
 */

use crate::config::RuntimeConfig;
use crate::error::ToolError;
use crate::sandbox::Sandbox;
use serde::Deserialize;
use std::fs;
use std::io::{BufReader, Read};
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

pub const SCRIPT_EXTENSION: &str = "py";

#[derive(Debug, Deserialize)]
pub struct ListDirectoryArgs {
    #[serde(default = "default_directory")]
    pub directory: String,
}

fn default_directory() -> String {
    ".".to_string()
}

#[derive(Debug, Deserialize)]
pub struct ReadFileArgs {
    pub file_path: String,
}

#[derive(Debug, Deserialize)]
pub struct WriteFileArgs {
    pub file_path: String,
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct RunScriptArgs {
    pub file_path: String,
    #[serde(default)]
    pub args: Vec<String>,
}

/// One line per entry with its byte size and directory flag, sorted by name
/// so output is deterministic across runs.
pub fn list_directory(sandbox: &Sandbox, args: &ListDirectoryArgs) -> Result<String, ToolError> {
    let dir = sandbox.resolve(&args.directory)?;
    if !dir.is_dir() {
        return Err(ToolError::NotADirectory(args.directory.clone()));
    }

    let mut entries = Vec::new();
    for entry in fs::read_dir(&dir)? {
        entries.push(entry?);
    }
    entries.sort_by_key(|entry| entry.file_name());

    let mut lines = Vec::with_capacity(entries.len());
    for entry in entries {
        let metadata = entry.metadata()?;
        lines.push(format!(
            "- {}: file_size={}, is_dir={}",
            entry.file_name().to_string_lossy(),
            metadata.len(),
            if metadata.is_dir() { "True" } else { "False" }
        ));
    }
    Ok(lines.join("\n"))
}

/// Returns at most `read_char_cap` characters of the file. The cap counts
/// characters, not bytes; truncation is flagged only when a cap+1-th
/// character exists, and the probe character is never included in the
/// output. If the probe hits, a truncation marker naming the file and the
/// cap is appended.
pub fn read_file(
    sandbox: &Sandbox,
    runtime: &RuntimeConfig,
    args: &ReadFileArgs,
) -> Result<String, ToolError> {
    let path = sandbox.resolve(&args.file_path)?;
    if !path.is_file() {
        return Err(ToolError::NotAFile(args.file_path.clone()));
    }

    let cap = runtime.read_char_cap;
    let mut reader = BufReader::new(fs::File::open(&path)?);
    // UTF-8 encodes a scalar value in at most four bytes, so this window
    // always holds cap characters plus the one probe character.
    let mut raw = Vec::new();
    (&mut reader)
        .take((cap as u64 + 1) * 4)
        .read_to_end(&mut raw)?;

    let decoded = String::from_utf8_lossy(&raw);
    let mut content: String = decoded.chars().take(cap).collect();
    let truncated = decoded.chars().nth(cap).is_some();

    if truncated {
        content.push_str(&format!(
            "[...File \"{}\" truncated at {} characters]",
            args.file_path, cap
        ));
    }
    Ok(content)
}

/// Overwrites (or creates) the target unconditionally, creating parent
/// directories as needed.
pub fn write_file(sandbox: &Sandbox, args: &WriteFileArgs) -> Result<String, ToolError> {
    let path = sandbox.resolve(&args.file_path)?;
    if path.is_dir() {
        return Err(ToolError::IsADirectory(args.file_path.clone()));
    }

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&path, &args.content)?;

    Ok(format!(
        "Successfully wrote to \"{}\" ({} characters written)",
        args.file_path,
        args.content.chars().count()
    ))
}

/// Spawns the configured interpreter on a script inside the sandbox, with the
/// sandbox root as working directory and a hard wall-clock timeout. Both
/// output streams are captured; timeout kills the child and surfaces as a
/// distinct error rather than an empty result.
pub async fn run_script(
    sandbox: &Sandbox,
    runtime: &RuntimeConfig,
    args: &RunScriptArgs,
) -> Result<String, ToolError> {
    let path = sandbox.resolve(&args.file_path)?;
    if !path.is_file() {
        return Err(ToolError::MissingScript(args.file_path.clone()));
    }
    if !has_script_extension(&path) {
        return Err(ToolError::WrongExtension(args.file_path.clone()));
    }

    let mut command = Command::new(&runtime.interpreter);
    command
        .arg(&path)
        .args(&args.args)
        .current_dir(sandbox.root())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let limit = Duration::from_secs(runtime.script_timeout_secs);
    let output = match tokio::time::timeout(limit, command.output()).await {
        Ok(result) => result?,
        // Dropping the half-run future kills the child via kill_on_drop.
        Err(_) => {
            return Err(ToolError::Timeout {
                path: args.file_path.clone(),
                seconds: runtime.script_timeout_secs,
            });
        }
    };

    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);

    let mut message = String::new();
    match output.status.code() {
        Some(0) => {}
        Some(code) => message.push_str(&format!("Process exited with code {}", code)),
        None => message.push_str("Process terminated by signal"),
    }
    if stdout.is_empty() && stderr.is_empty() {
        message.push_str("No output produced");
    } else {
        message.push_str(&format!("STDOUT: {}", stdout));
        message.push_str(&format!("STDERR: {}", stderr));
    }
    Ok(message)
}

fn has_script_extension(path: &Path) -> bool {
    path.extension().and_then(|ext| ext.to_str()) == Some(SCRIPT_EXTENSION)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn runtime() -> RuntimeConfig {
        RuntimeConfig::default()
    }

    /// Execution tests use `sh` as the interpreter so they stay hermetic; the
    /// extension gate only looks at the file name.
    fn sh_runtime() -> RuntimeConfig {
        RuntimeConfig {
            interpreter: "sh".to_string(),
            ..RuntimeConfig::default()
        }
    }

    #[test]
    fn test_list_directory_reports_size_and_kind() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.txt"), "hello").unwrap();
        fs::create_dir(dir.path().join("b")).unwrap();
        let sandbox = Sandbox::new(dir.path()).unwrap();

        let listing = list_directory(
            &sandbox,
            &ListDirectoryArgs {
                directory: ".".to_string(),
            },
        )
        .unwrap();

        let lines: Vec<&str> = listing.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], "- a.txt: file_size=5, is_dir=False");
        assert!(lines[1].starts_with("- b: file_size="));
        assert!(lines[1].ends_with("is_dir=True"));
    }

    #[test]
    fn test_list_directory_rejects_files_and_escapes() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.txt"), "hello").unwrap();
        let sandbox = Sandbox::new(dir.path()).unwrap();

        let err = list_directory(
            &sandbox,
            &ListDirectoryArgs {
                directory: "a.txt".to_string(),
            },
        )
        .unwrap_err();
        assert!(matches!(err, ToolError::NotADirectory(_)));

        let err = list_directory(
            &sandbox,
            &ListDirectoryArgs {
                directory: "../".to_string(),
            },
        )
        .unwrap_err();
        assert!(matches!(err, ToolError::OutsideSandbox(_)));
    }

    #[cfg(unix)]
    #[test]
    fn test_list_directory_surfaces_unreadable_directories() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempdir().unwrap();
        let locked = dir.path().join("locked");
        fs::create_dir(&locked).unwrap();
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

        // Privileged users bypass mode bits; nothing to observe in that case.
        if fs::read_dir(&locked).is_err() {
            let sandbox = Sandbox::new(dir.path()).unwrap();
            let err = list_directory(
                &sandbox,
                &ListDirectoryArgs {
                    directory: "locked".to_string(),
                },
            )
            .unwrap_err();
            assert!(matches!(err, ToolError::Io(_)));
        }

        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
    }

    #[test]
    fn test_read_file_returns_full_content_under_cap() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("lorem.txt"), "lorem ipsum dolor sit amet").unwrap();
        let sandbox = Sandbox::new(dir.path()).unwrap();

        let content = read_file(
            &sandbox,
            &runtime(),
            &ReadFileArgs {
                file_path: "lorem.txt".to_string(),
            },
        )
        .unwrap();
        assert_eq!(content, "lorem ipsum dolor sit amet");
    }

    #[test]
    fn test_read_file_truncates_at_cap_with_marker() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("lorem.txt"), "x".repeat(25)).unwrap();
        let sandbox = Sandbox::new(dir.path()).unwrap();
        let runtime = RuntimeConfig {
            read_char_cap: 10,
            ..RuntimeConfig::default()
        };

        let content = read_file(
            &sandbox,
            &runtime,
            &ReadFileArgs {
                file_path: "lorem.txt".to_string(),
            },
        )
        .unwrap();

        let marker = "[...File \"lorem.txt\" truncated at 10 characters]";
        assert!(content.ends_with(marker));
        assert_eq!(content.len(), 10 + marker.len());
    }

    #[test]
    fn test_read_file_cap_counts_characters_not_bytes() {
        let dir = tempdir().unwrap();
        // 8 characters, 24 bytes: under a 10-character cap, over 10 bytes.
        fs::write(dir.path().join("cjk.txt"), "好".repeat(8)).unwrap();
        let sandbox = Sandbox::new(dir.path()).unwrap();
        let runtime = RuntimeConfig {
            read_char_cap: 10,
            ..RuntimeConfig::default()
        };

        let content = read_file(
            &sandbox,
            &runtime,
            &ReadFileArgs {
                file_path: "cjk.txt".to_string(),
            },
        )
        .unwrap();
        assert_eq!(content, "好".repeat(8));

        fs::write(dir.path().join("long.txt"), "好".repeat(12)).unwrap();
        let content = read_file(
            &sandbox,
            &runtime,
            &ReadFileArgs {
                file_path: "long.txt".to_string(),
            },
        )
        .unwrap();
        let marker = "[...File \"long.txt\" truncated at 10 characters]";
        assert_eq!(content, format!("{}{}", "好".repeat(10), marker));
    }

    #[test]
    fn test_read_file_exactly_at_cap_is_not_marked_truncated() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("exact.txt"), "x".repeat(10)).unwrap();
        let sandbox = Sandbox::new(dir.path()).unwrap();
        let runtime = RuntimeConfig {
            read_char_cap: 10,
            ..RuntimeConfig::default()
        };

        let content = read_file(
            &sandbox,
            &runtime,
            &ReadFileArgs {
                file_path: "exact.txt".to_string(),
            },
        )
        .unwrap();
        assert_eq!(content, "x".repeat(10));
    }

    #[test]
    fn test_read_file_rejects_missing_and_directory_targets() {
        let dir = tempdir().unwrap();
        fs::create_dir(dir.path().join("pkg")).unwrap();
        let sandbox = Sandbox::new(dir.path()).unwrap();

        for target in ["pkg/does_not_exist.py", "pkg"] {
            let err = read_file(
                &sandbox,
                &runtime(),
                &ReadFileArgs {
                    file_path: target.to_string(),
                },
            )
            .unwrap_err();
            assert!(matches!(err, ToolError::NotAFile(_)), "target {target:?}");
        }
    }

    #[test]
    fn test_write_file_round_trips_and_creates_parents() {
        let dir = tempdir().unwrap();
        let sandbox = Sandbox::new(dir.path()).unwrap();

        let message = write_file(
            &sandbox,
            &WriteFileArgs {
                file_path: "pkg/morelorem.txt".to_string(),
                content: "lorem ipsum dolor sit amet".to_string(),
            },
        )
        .unwrap();
        assert_eq!(
            message,
            "Successfully wrote to \"pkg/morelorem.txt\" (26 characters written)"
        );

        let read_back = read_file(
            &sandbox,
            &runtime(),
            &ReadFileArgs {
                file_path: "pkg/morelorem.txt".to_string(),
            },
        )
        .unwrap();
        assert_eq!(read_back, "lorem ipsum dolor sit amet");
    }

    #[test]
    fn test_write_file_rejects_directories_and_escapes() {
        let dir = tempdir().unwrap();
        fs::create_dir(dir.path().join("pkg")).unwrap();
        let sandbox = Sandbox::new(dir.path()).unwrap();

        let err = write_file(
            &sandbox,
            &WriteFileArgs {
                file_path: "pkg".to_string(),
                content: "oops".to_string(),
            },
        )
        .unwrap_err();
        assert!(matches!(err, ToolError::IsADirectory(_)));

        let err = write_file(
            &sandbox,
            &WriteFileArgs {
                file_path: "/tmp/temp.txt".to_string(),
                content: "this should not be allowed".to_string(),
            },
        )
        .unwrap_err();
        assert!(matches!(err, ToolError::OutsideSandbox(_)));
        assert!(!Path::new("/tmp/temp.txt").exists());
    }

    #[tokio::test]
    async fn test_run_script_rejects_wrong_extension_without_spawning() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("lorem.txt"), "not code").unwrap();
        let sandbox = Sandbox::new(dir.path()).unwrap();

        // Interpreter does not exist; the extension gate must fire first.
        let runtime = RuntimeConfig {
            interpreter: "definitely-not-an-interpreter".to_string(),
            ..RuntimeConfig::default()
        };
        let err = run_script(
            &sandbox,
            &runtime,
            &RunScriptArgs {
                file_path: "lorem.txt".to_string(),
                args: vec![],
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ToolError::WrongExtension(_)));
    }

    #[tokio::test]
    async fn test_run_script_rejects_missing_and_escaping_paths() {
        let dir = tempdir().unwrap();
        let sandbox = Sandbox::new(dir.path()).unwrap();

        let err = run_script(
            &sandbox,
            &sh_runtime(),
            &RunScriptArgs {
                file_path: "nonexistent.py".to_string(),
                args: vec![],
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ToolError::MissingScript(_)));

        let err = run_script(
            &sandbox,
            &sh_runtime(),
            &RunScriptArgs {
                file_path: "../main.py".to_string(),
                args: vec![],
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ToolError::OutsideSandbox(_)));
    }

    #[tokio::test]
    async fn test_run_script_labels_both_streams_and_passes_args() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join("run.py"),
            "echo \"result: $1\"\necho oops >&2\n",
        )
        .unwrap();
        let sandbox = Sandbox::new(dir.path()).unwrap();

        let message = run_script(
            &sandbox,
            &sh_runtime(),
            &RunScriptArgs {
                file_path: "run.py".to_string(),
                args: vec!["3 + 5".to_string()],
            },
        )
        .await
        .unwrap();

        assert!(message.contains("STDOUT: result: 3 + 5"));
        assert!(message.contains("STDERR: oops"));
        assert!(!message.starts_with("Process exited"));
    }

    #[tokio::test]
    async fn test_run_script_reports_exit_code_and_silence() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("fail.py"), "exit 3\n").unwrap();
        fs::write(dir.path().join("quiet.py"), "true\n").unwrap();
        let sandbox = Sandbox::new(dir.path()).unwrap();

        let message = run_script(
            &sandbox,
            &sh_runtime(),
            &RunScriptArgs {
                file_path: "fail.py".to_string(),
                args: vec![],
            },
        )
        .await
        .unwrap();
        assert!(message.starts_with("Process exited with code 3"));
        assert!(message.contains("No output produced"));

        let message = run_script(
            &sandbox,
            &sh_runtime(),
            &RunScriptArgs {
                file_path: "quiet.py".to_string(),
                args: vec![],
            },
        )
        .await
        .unwrap();
        assert_eq!(message, "No output produced");
    }

    #[tokio::test]
    async fn test_run_script_timeout_is_distinct_from_silence() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("slow.py"), "sleep 5\n").unwrap();
        let sandbox = Sandbox::new(dir.path()).unwrap();
        let runtime = RuntimeConfig {
            interpreter: "sh".to_string(),
            script_timeout_secs: 1,
            ..RuntimeConfig::default()
        };

        let err = run_script(
            &sandbox,
            &runtime,
            &RunScriptArgs {
                file_path: "slow.py".to_string(),
                args: vec![],
            },
        )
        .await
        .unwrap_err();

        assert!(matches!(err, ToolError::Timeout { .. }));
        assert_ne!(err.to_string(), "No output produced");
        assert!(err.to_string().contains("timed out after 1 seconds"));
    }
}
