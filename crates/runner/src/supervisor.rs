//! Single-instance supervision of the test command.

use std::path::PathBuf;
use std::process::Stdio;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use course_core::model::RunRequest;
use tokio::process::Command;
use tokio::time::{self, Instant};
use tracing::{debug, info, warn};

use crate::error::SupervisorError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupervisorConfig {
    /// Command run for every request; file and exercise filters are appended.
    pub base_command: String,
    pub shell: PathBuf,
    /// The child is killed once it has run this long.
    pub process_timeout: Duration,
    /// The running flag is cleared after this long no matter what.
    pub force_reset: Duration,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            base_command: "npm test -- --run".into(),
            shell: PathBuf::from("/bin/bash"),
            process_timeout: Duration::from_secs(60),
            force_reset: Duration::from_secs(65),
        }
    }
}

impl SupervisorConfig {
    /// Defaults with the base command taken from `COURSE_TEST_COMMAND`.
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(command) = std::env::var("COURSE_TEST_COMMAND") {
            if !command.trim().is_empty() {
                config.base_command = command.trim().to_string();
            }
        }
        config
    }
}

/// Build the shell command for `request`.
///
/// The test file is reduced to its name without directories or the
/// `.test.tsx` suffix, so runners match it as a path filter.
///
/// # Errors
///
/// Returns `SupervisorError::InvalidRequest` when the file name or exercise
/// number contains characters that would need shell quoting.
pub fn build_command(base: &str, request: &RunRequest) -> Result<String, SupervisorError> {
    let mut command = base.to_string();
    let Some(test_file) = request.test_file.as_deref().filter(|file| !file.is_empty()) else {
        return Ok(command);
    };

    let name = test_file.rsplit('/').next().unwrap_or(test_file);
    let stem = match name.replacen(".test.tsx", "", 1) {
        stem if stem.is_empty() => name.to_string(),
        stem => stem,
    };
    if !stem
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
    {
        return Err(SupervisorError::InvalidRequest(format!(
            "unsupported test file name: {test_file}"
        )));
    }
    command.push(' ');
    command.push_str(&stem);

    if let Some(number) = request.exercise_number.as_deref().filter(|n| !n.is_empty()) {
        if !number.chars().all(|c| c.is_ascii_digit()) {
            return Err(SupervisorError::InvalidRequest(format!(
                "exercise number must be numeric: {number}"
            )));
        }
        command.push_str(&format!(" -t 'Exercise {number}'"));
    }
    Ok(command)
}

#[derive(Debug, Default)]
struct RunFlag {
    running: bool,
    generation: u64,
}

fn lock(flag: &Mutex<RunFlag>) -> MutexGuard<'_, RunFlag> {
    flag.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Clear the flag if it still belongs to `generation`.
fn release(flag: &Mutex<RunFlag>, generation: u64) -> bool {
    let mut flag = lock(flag);
    if flag.running && flag.generation == generation {
        flag.running = false;
        return true;
    }
    false
}

/// Runs at most one test command at a time.
#[derive(Debug, Clone)]
pub struct TestSupervisor {
    config: Arc<SupervisorConfig>,
    flag: Arc<Mutex<RunFlag>>,
}

impl TestSupervisor {
    #[must_use]
    pub fn new(config: SupervisorConfig) -> Self {
        Self {
            config: Arc::new(config),
            flag: Arc::new(Mutex::new(RunFlag::default())),
        }
    }

    #[must_use]
    pub fn config(&self) -> &SupervisorConfig {
        &self.config
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        lock(&self.flag).running
    }

    /// Start the command for `request` in the background.
    ///
    /// Returns as soon as the child is spawned. Must be called from within a
    /// tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns `SupervisorError::AlreadyRunning` while a run is in progress,
    /// `InvalidRequest` for requests that cannot be turned into a command, and
    /// `Spawn` if the shell cannot be started.
    pub fn try_start(&self, request: &RunRequest) -> Result<(), SupervisorError> {
        let command = build_command(&self.config.base_command, request)?;

        let generation = {
            let mut flag = lock(&self.flag);
            if flag.running {
                return Err(SupervisorError::AlreadyRunning);
            }
            flag.running = true;
            flag.generation += 1;
            flag.generation
        };

        let child = Command::new(&self.config.shell)
            .arg("-c")
            .arg(&command)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn();
        let child = match child {
            Ok(child) => child,
            Err(err) => {
                release(&self.flag, generation);
                return Err(SupervisorError::Spawn(err));
            }
        };
        info!(%command, generation, "test run started");

        let process_timeout = self.config.process_timeout;
        let flag = Arc::clone(&self.flag);
        let waiter = tokio::spawn(async move {
            let started = Instant::now();
            match time::timeout(process_timeout, child.wait_with_output()).await {
                Ok(Ok(output)) => {
                    info!(
                        generation,
                        elapsed = ?started.elapsed(),
                        exit_code = output.status.code(),
                        "test run completed"
                    );
                    let stderr = String::from_utf8_lossy(&output.stderr);
                    if !stderr.trim().is_empty() {
                        debug!(generation, stderr = %stderr.trim(), "test command stderr");
                    }
                }
                Ok(Err(err)) => warn!(error = %err, generation, "waiting on test command failed"),
                Err(_) => warn!(
                    generation,
                    timeout_secs = process_timeout.as_secs(),
                    "test run timed out; process killed"
                ),
            }
            release(&flag, generation);
        });

        let force_reset = self.config.force_reset;
        let flag = Arc::clone(&self.flag);
        let waiter = waiter.abort_handle();
        tokio::spawn(async move {
            time::sleep(force_reset).await;
            if release(&flag, generation) {
                warn!(
                    generation,
                    after_secs = force_reset.as_secs(),
                    "force-resetting running flag"
                );
                waiter.abort();
            }
        });

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quick(command: &str, process_timeout: Duration, force_reset: Duration) -> TestSupervisor {
        TestSupervisor::new(SupervisorConfig {
            base_command: command.into(),
            process_timeout,
            force_reset,
            ..SupervisorConfig::default()
        })
    }

    async fn wait_until_idle(supervisor: &TestSupervisor, limit: Duration) -> bool {
        let deadline = Instant::now() + limit;
        while Instant::now() < deadline {
            if !supervisor.is_running() {
                return true;
            }
            time::sleep(Duration::from_millis(20)).await;
        }
        !supervisor.is_running()
    }

    #[test]
    fn bare_request_runs_everything() {
        let command = build_command("npm test -- --run", &RunRequest::all()).unwrap();
        assert_eq!(command, "npm test -- --run");
    }

    #[test]
    fn file_is_reduced_to_its_stem() {
        let request = RunRequest::for_file("src/__tests__/03-Session1-Lists.test.tsx", None);
        assert_eq!(
            build_command("npm test -- --run", &request).unwrap(),
            "npm test -- --run 03-Session1-Lists"
        );
    }

    #[test]
    fn exercise_number_adds_name_filter() {
        let request = RunRequest::for_file("03-Session1-Lists.test.tsx", Some("4".into()));
        assert_eq!(
            build_command("npm test -- --run", &request).unwrap(),
            "npm test -- --run 03-Session1-Lists -t 'Exercise 4'"
        );
    }

    #[test]
    fn exercise_number_without_file_is_ignored() {
        let request = RunRequest {
            test_file: None,
            exercise_number: Some("2".into()),
        };
        assert_eq!(build_command("npm test", &request).unwrap(), "npm test");
    }

    #[test]
    fn shell_metacharacters_are_rejected() {
        let request = RunRequest::for_file("x; rm -rf ~", None);
        assert!(matches!(
            build_command("npm test", &request),
            Err(SupervisorError::InvalidRequest(_))
        ));

        let request = RunRequest::for_file("01-Session1-JSX.test.tsx", Some("1'".into()));
        assert!(matches!(
            build_command("npm test", &request),
            Err(SupervisorError::InvalidRequest(_))
        ));
    }

    #[tokio::test]
    async fn second_start_is_rejected_while_running() {
        let supervisor = quick("sleep 5", Duration::from_secs(10), Duration::from_secs(15));
        supervisor.try_start(&RunRequest::all()).unwrap();
        assert!(supervisor.is_running());
        assert!(matches!(
            supervisor.try_start(&RunRequest::all()),
            Err(SupervisorError::AlreadyRunning)
        ));
    }

    #[tokio::test]
    async fn flag_clears_when_command_exits() {
        let supervisor = quick("true", Duration::from_secs(10), Duration::from_secs(15));
        supervisor.try_start(&RunRequest::all()).unwrap();
        assert!(wait_until_idle(&supervisor, Duration::from_secs(5)).await);

        supervisor.try_start(&RunRequest::all()).unwrap();
    }

    #[tokio::test]
    async fn failing_command_still_clears_flag() {
        let supervisor = quick("exit 3", Duration::from_secs(10), Duration::from_secs(15));
        supervisor.try_start(&RunRequest::all()).unwrap();
        assert!(wait_until_idle(&supervisor, Duration::from_secs(5)).await);
    }

    #[tokio::test]
    async fn hung_command_is_killed_at_timeout() {
        let supervisor = quick("sleep 30", Duration::from_millis(200), Duration::from_secs(15));
        supervisor.try_start(&RunRequest::all()).unwrap();
        assert!(wait_until_idle(&supervisor, Duration::from_secs(5)).await);
    }

    #[tokio::test]
    async fn force_reset_bounds_the_running_flag() {
        let supervisor = quick("sleep 30", Duration::from_secs(20), Duration::from_millis(200));
        supervisor.try_start(&RunRequest::all()).unwrap();
        assert!(wait_until_idle(&supervisor, Duration::from_secs(5)).await);
    }

    #[tokio::test]
    async fn missing_shell_is_a_spawn_error_and_releases_flag() {
        let supervisor = TestSupervisor::new(SupervisorConfig {
            shell: PathBuf::from("/nonexistent/shell"),
            ..SupervisorConfig::default()
        });
        assert!(matches!(
            supervisor.try_start(&RunRequest::all()),
            Err(SupervisorError::Spawn(_))
        ));
        assert!(!supervisor.is_running());
    }
}
