//! Running `mm*` commands.

use std::io::Read;
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, anyhow, bail};
use bstr::ByteSlice;
use tracing::debug;

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Runs commands and captures their output.
pub trait Runner {
    /// Runs `program` with `args` and returns its standard output.
    ///
    /// # Errors
    ///
    /// Returns an error if the command cannot be run, does not succeed, or
    /// its output is not UTF-8.
    fn run(&self, program: &str, args: &[&str]) -> Result<String>;
}

/// Runs commands as child processes with a timeout.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub struct Exec {
    timeout: Duration,
}

impl Exec {
    /// Returns a runner that kills commands running longer than `timeout`.
    #[must_use]
    pub const fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Runner for Exec {
    fn run(&self, program: &str, args: &[&str]) -> Result<String> {
        let mut cmd = Command::new(program);
        cmd.args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit());

        debug!(?cmd, "running");

        let mut child = cmd
            .spawn()
            .with_context(|| format!("error running: {cmd:?}"))?;

        let mut stdout = child
            .stdout
            .take()
            .ok_or_else(|| anyhow!("no stdout: {cmd:?}"))?;

        // drain concurrently, a full pipe would block the child forever
        let reader = thread::spawn(move || {
            let mut buf = Vec::new();
            stdout.read_to_end(&mut buf).map(|_| buf)
        });

        let deadline = Instant::now() + self.timeout;

        let status = loop {
            if let Some(status) = child
                .try_wait()
                .with_context(|| format!("waiting for: {cmd:?}"))?
            {
                break status;
            }

            if Instant::now() >= deadline {
                child.kill().ok();
                child.wait().ok();
                bail!("timed out after {:?}: {cmd:?}", self.timeout);
            }

            thread::sleep(POLL_INTERVAL);
        };

        let stdout = reader
            .join()
            .map_err(|_| anyhow!("reading output panicked: {cmd:?}"))?
            .with_context(|| format!("reading output of: {cmd:?}"))?;

        if !status.success() {
            bail!("{cmd:?} failed: {status}");
        }

        let stdout = stdout
            .to_str()
            .with_context(|| format!("parsing {cmd:?} command output to UTF8"))?;

        Ok(stdout.to_owned())
    }
}

// ----------------------------------------------------------------------------
// tests
// ----------------------------------------------------------------------------

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    const TIMEOUT: Duration = Duration::from_secs(10);

    #[test]
    fn captures_stdout() {
        let output = Exec::new(TIMEOUT)
            .run("printf", &["mmlsfs::0:1:::gpfs1\n"])
            .unwrap();

        assert_eq!(output, "mmlsfs::0:1:::gpfs1\n");
    }

    #[test]
    fn failure_status() {
        assert!(Exec::new(TIMEOUT).run("false", &[]).is_err());
    }

    #[test]
    fn missing_program() {
        let error = Exec::new(TIMEOUT)
            .run("mmbeat-no-such-program", &[])
            .unwrap_err();

        assert!(error.to_string().starts_with("error running"));
    }

    #[test]
    fn timeout() {
        let started = Instant::now();

        let error = Exec::new(Duration::from_millis(200))
            .run("sleep", &["5"])
            .unwrap_err();

        assert!(error.to_string().starts_with("timed out"));
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn invalid_utf8() {
        assert!(Exec::new(TIMEOUT).run("printf", &["\\377"]).is_err());
    }
}
