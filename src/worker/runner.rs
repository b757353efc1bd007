//! Child-process wrapper around the external downloader command.

use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tracing::{error, info, warn};

use crate::config::DownloaderConfig;
use crate::queue::CurrentLog;
use crate::task::{Task, TaskStatus};

use super::Downloader;

/// Runs the downloader tool (`gamdl` by default) for one task.
///
/// Builds an invocation with the source URL, language, output directory, a
/// per-task scratch directory, and the cookies file, spawns it with combined
/// stdout/stderr capture, and maps the exit code to a terminal status.
pub struct GamdlRunner {
    config: DownloaderConfig,
}

impl GamdlRunner {
    pub fn new(config: DownloaderConfig) -> Self {
        Self { config }
    }

    /// Scratch directory for one task, named deterministically from its id so
    /// runs of different tasks never collide.
    fn scratch_dir(&self, task: &Task) -> PathBuf {
        self.config.temp_dir.join(format!("tunedl_{}", task.id))
    }

    fn command_for(&self, task: &Task) -> Command {
        let mut command = Command::new(&self.config.command);
        command
            .arg(&task.url)
            .arg("-l")
            .arg(&task.language)
            .arg("-o")
            .arg(&self.config.output_dir)
            .arg("--temp-path")
            .arg(self.scratch_dir(task))
            .arg("-c")
            .arg(&self.config.cookies_path);
        if task.overwrite {
            command.arg("--overwrite");
        }
        command
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        command
    }

    async fn spawn_and_stream(&self, task: &Task, log: &CurrentLog) -> std::io::Result<i32> {
        let mut command = self.command_for(task);
        info!(id = %task.id, command = %self.config.command, "Spawning downloader");

        let mut child = command.spawn()?;

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let mut out_lines = stdout.map(|out| BufReader::new(out).lines());
        let mut err_lines = stderr.map(|err| BufReader::new(err).lines());
        let mut out_open = out_lines.is_some();
        let mut err_open = err_lines.is_some();

        // Both streams feed the same slot; whichever produced a line last is
        // what status queries see.
        while out_open || err_open {
            tokio::select! {
                line = next_line(&mut out_lines), if out_open => match line? {
                    Some(line) => record_line(task, &line, log),
                    None => out_open = false,
                },
                line = next_line(&mut err_lines), if err_open => match line? {
                    Some(line) => record_line(task, &line, log),
                    None => err_open = false,
                },
            }
        }

        let status = child.wait().await?;
        Ok(status.code().unwrap_or(-1))
    }
}

async fn next_line(
    lines: &mut Option<tokio::io::Lines<BufReader<impl tokio::io::AsyncRead + Unpin>>>,
) -> std::io::Result<Option<String>> {
    match lines {
        Some(lines) => lines.next_line().await,
        None => Ok(None),
    }
}

fn record_line(task: &Task, line: &str, log: &CurrentLog) {
    let line = line.trim();
    log.set(line);
    if !line.is_empty() {
        info!(id = %task.id, "{line}");
    }
}

#[async_trait]
impl Downloader for GamdlRunner {
    async fn run(&self, task: &Task, log: &CurrentLog) -> TaskStatus {
        let outcome = match self.spawn_and_stream(task, log).await {
            Ok(0) => TaskStatus::Completed,
            Ok(code) => {
                warn!(id = %task.id, code, "Downloader exited with non-zero status");
                TaskStatus::Failed
            }
            Err(err) => {
                error!(id = %task.id, %err, "Downloader could not be run");
                log.set(err.to_string());
                TaskStatus::Failed
            }
        };
        // Guaranteed cleanup: stale output must never leak into the next
        // execution's status view.
        log.clear();
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::url::parse_source_url;
    use std::path::Path;

    fn test_config(command: &str) -> DownloaderConfig {
        DownloaderConfig {
            command: command.to_string(),
            output_dir: PathBuf::from("/tmp/tunedl-test-out"),
            temp_dir: PathBuf::from("/tmp"),
            cookies_path: PathBuf::from("/tmp/cookies.txt"),
            languages: vec!["en-US".to_string()],
            ..DownloaderConfig::default()
        }
    }

    fn test_task() -> Task {
        let url = "https://music.apple.com/us/album/test/123";
        Task::new(parse_source_url(url).unwrap(), url, "en-US")
    }

    #[test]
    fn scratch_dir_is_per_task() {
        let runner = GamdlRunner::new(test_config("gamdl"));
        let task = test_task();
        assert_eq!(runner.scratch_dir(&task), Path::new("/tmp/tunedl_123"));
    }

    #[tokio::test]
    async fn zero_exit_maps_to_completed() {
        // `true` ignores the downloader-shaped arguments and exits 0.
        let runner = GamdlRunner::new(test_config("true"));
        let log = CurrentLog::new();
        let outcome = runner.run(&test_task(), &log).await;
        assert_eq!(outcome, TaskStatus::Completed);
        assert_eq!(log.get(), None);
    }

    #[tokio::test]
    async fn nonzero_exit_maps_to_failed() {
        let runner = GamdlRunner::new(test_config("false"));
        let log = CurrentLog::new();
        let outcome = runner.run(&test_task(), &log).await;
        assert_eq!(outcome, TaskStatus::Failed);
        assert_eq!(log.get(), None);
    }

    #[tokio::test]
    async fn missing_binary_maps_to_failed() {
        let runner = GamdlRunner::new(test_config("/nonexistent/downloader"));
        let log = CurrentLog::new();
        let outcome = runner.run(&test_task(), &log).await;
        assert_eq!(outcome, TaskStatus::Failed);
        // Cleared even on spawn failure.
        assert_eq!(log.get(), None);
    }

    #[tokio::test]
    async fn overwrite_flag_is_passed_through() {
        let runner = GamdlRunner::new(test_config("gamdl"));
        let mut task = test_task();
        task.overwrite = true;
        let command = runner.command_for(&task);
        let args: Vec<_> = command.as_std().get_args().collect();
        assert!(args.contains(&std::ffi::OsStr::new("--overwrite")));

        task.overwrite = false;
        let command = runner.command_for(&task);
        let args: Vec<_> = command.as_std().get_args().collect();
        assert!(!args.contains(&std::ffi::OsStr::new("--overwrite")));
    }
}
