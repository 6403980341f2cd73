//! External command execution
//!
//! Runs helper programs to completion on the calling thread. With a
//! timeout configured the child is polled and killed once the deadline
//! passes; without one the call blocks for as long as the child runs.

use common::ActionError;
use std::io::Read;
use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

const WAIT_POLL: Duration = Duration::from_millis(50);

/// Program plus argument list with `{placeholder}` substitution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandTemplate {
    parts: Vec<String>,
}

impl CommandTemplate {
    pub fn new(parts: Vec<String>) -> Self {
        Self { parts }
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// Replace `{key}` with `value` in every part
    pub fn render(&self, key: &str, value: &str) -> Vec<String> {
        let placeholder = format!("{{{}}}", key);
        self.parts
            .iter()
            .map(|p| p.replace(&placeholder, value))
            .collect()
    }

    pub fn parts(&self) -> &[String] {
        &self.parts
    }
}

/// Runs commands with an optional deadline
#[derive(Debug, Clone, Copy, Default)]
pub struct CommandRunner {
    timeout: Option<Duration>,
}

impl CommandRunner {
    pub fn new(timeout: Option<Duration>) -> Self {
        Self { timeout }
    }

    /// Run `parts[0]` with the remaining parts as arguments
    pub fn run_parts(&self, parts: &[String]) -> Result<(), ActionError> {
        let (program, args) = parts
            .split_first()
            .ok_or_else(|| ActionError::NotConfigured("empty command".to_string()))?;
        self.run(Path::new(program), args)
    }

    /// Run `program` and fail on spawn error, non-zero exit or timeout
    pub fn run(&self, program: &Path, args: &[String]) -> Result<(), ActionError> {
        let name = program.display().to_string();
        debug!("Running {} {:?}", name, args);

        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| ActionError::Spawn {
                program: name.clone(),
                source,
            })?;

        // Drained concurrently; a full pipe would stall the child
        let stderr_reader = child.stderr.take().map(|mut pipe| {
            std::thread::spawn(move || {
                let mut stderr = String::new();
                let _ = pipe.read_to_string(&mut stderr);
                stderr
            })
        });

        let status = match self.timeout {
            Some(timeout) => wait_with_deadline(&mut child, &name, timeout)?,
            None => child.wait()?,
        };

        if status.success() {
            debug!("{} finished successfully", name);
            return Ok(());
        }

        let stderr = stderr_reader
            .and_then(|reader| reader.join().ok())
            .unwrap_or_default()
            .trim()
            .to_string();
        Err(ActionError::ExitStatus {
            program: name,
            code: status.code(),
            stderr,
        })
    }
}

fn wait_with_deadline(
    child: &mut Child,
    name: &str,
    timeout: Duration,
) -> Result<std::process::ExitStatus, ActionError> {
    let deadline = Instant::now() + timeout;

    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(status);
        }

        if Instant::now() >= deadline {
            warn!("{} exceeded {:?}, killing it", name, timeout);
            if let Err(e) = child.kill() {
                warn!("Failed to kill {}: {}", name, e);
            }
            // Reap to avoid leaving a zombie behind
            let _ = child.wait();
            return Err(ActionError::Timeout {
                program: name.to_string(),
                after: timeout,
            });
        }

        std::thread::sleep(WAIT_POLL);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_substitutes_placeholder() {
        let template = CommandTemplate::new(vec![
            "pnputil".to_string(),
            "/restart-device".to_string(),
            "{device}".to_string(),
        ]);
        assert_eq!(
            template.render("device", "USB\\VID_17EF&PID_3082\\1"),
            vec!["pnputil", "/restart-device", "USB\\VID_17EF&PID_3082\\1"]
        );
    }

    #[test]
    fn test_render_leaves_other_parts_alone() {
        let template = CommandTemplate::new(vec!["tool".to_string(), "--{other}".to_string()]);
        assert_eq!(template.render("device", "x"), vec!["tool", "--{other}"]);
    }

    #[test]
    fn test_empty_command_is_not_configured() {
        let result = CommandRunner::default().run_parts(&[]);
        assert!(matches!(result, Err(ActionError::NotConfigured(_))));
    }

    #[test]
    fn test_missing_program_is_spawn_error() {
        let result = CommandRunner::default().run(Path::new("/nonexistent/dock-monitor-helper"), &[]);
        assert!(matches!(result, Err(ActionError::Spawn { .. })));
    }

    #[cfg(unix)]
    #[test]
    fn test_exit_status_and_stderr_are_reported() {
        let parts = vec![
            "sh".to_string(),
            "-c".to_string(),
            "echo boom >&2; exit 3".to_string(),
        ];
        match CommandRunner::default().run_parts(&parts) {
            Err(ActionError::ExitStatus { code, stderr, .. }) => {
                assert_eq!(code, Some(3));
                assert_eq!(stderr, "boom");
            }
            other => panic!("expected exit status error, got {:?}", other),
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_success() {
        let parts = vec!["true".to_string()];
        assert!(CommandRunner::new(Some(Duration::from_secs(5))).run_parts(&parts).is_ok());
    }

    #[cfg(unix)]
    #[test]
    fn test_timeout_kills_child() {
        let parts = vec!["sleep".to_string(), "5".to_string()];
        let started = Instant::now();
        let result = CommandRunner::new(Some(Duration::from_millis(200))).run_parts(&parts);

        assert!(matches!(result, Err(ActionError::Timeout { .. })));
        assert!(started.elapsed() < Duration::from_secs(4));
    }
}
