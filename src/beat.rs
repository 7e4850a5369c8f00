//! Periodic polling.

use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Result, anyhow};
use tracing::{debug, error, info, warn};

use crate::aggregate;
use crate::config::Config;
use crate::exec::Runner;
use crate::parse::{Command, Decoded};
use crate::publish::Publisher;

/// Granularity of checking for shutdown while waiting for the next tick.
const WAKE_INTERVAL: Duration = Duration::from_millis(200);

/// Outcome of one poll cycle.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Default)]
pub struct Cycle {
    /// Published events.
    pub published: usize,

    /// Rows that failed to decode.
    pub failures: usize,

    /// Command invocations that failed to run.
    pub errors: usize,
}

/// Polls the `mm*` commands and publishes their records.
pub struct Beat<R: Runner, Output: Write> {
    config: Config,
    runner: R,
    publisher: Publisher<Output>,
    counter: u64,
}

impl<R: Runner, Output: Write> Beat<R, Output> {
    /// Returns a new beat.
    pub const fn new(
        config: Config,
        runner: R,
        publisher: Publisher<Output>,
    ) -> Self {
        Self {
            config,
            runner,
            publisher,
            counter: 0,
        }
    }

    /// Polls every [`Config::period`] until `running` turns `false`.
    ///
    /// A failing poll cycle is logged and does not stop polling.
    pub fn run(&mut self, running: &AtomicBool) {
        let period = self.config.period();

        info!(?period, devices = ?self.config.devices, "mmbeat is running");

        while running.load(Ordering::SeqCst) {
            let started = Instant::now();

            if let Err(error) = self.poll() {
                error!(error = %format!("{error:#}"), "poll cycle failed");
            }

            let next = started + period;

            while running.load(Ordering::SeqCst) {
                let now = Instant::now();

                if now >= next {
                    break;
                }

                thread::sleep(WAKE_INTERVAL.min(next - now));
            }
        }

        info!("mmbeat stopped");
    }

    /// Runs one poll cycle.
    ///
    /// Commands failing to run and rows failing to decode are logged. All
    /// records that did decode are published.
    ///
    /// # Errors
    ///
    /// Returns an error if the devices cannot be determined or publishing
    /// fails.
    pub fn poll(&mut self) -> Result<Cycle> {
        self.counter += 1;

        let devices = self.devices()?;

        let mut cycle = Cycle::default();
        let mut per_device = vec![];

        for command in self.config.polls.commands() {
            for device in &devices {
                match self.invoke(command, Some(device.as_str())) {
                    Ok(output) => per_device.push(aggregate::decode_for_device(
                        command, device, &output,
                    )),
                    Err(error) => {
                        cycle.errors += 1;
                        error!(
                            %command,
                            %device,
                            error = %format!("{error:#}"),
                            "command failed"
                        );
                    }
                }
            }
        }

        let decoded = aggregate::merge(per_device);
        cycle.failures = report(&decoded);

        cycle.published =
            self.publisher.publish(&decoded.records, self.counter)?;

        info!(
            counter = self.counter,
            published = cycle.published,
            failures = cycle.failures,
            errors = cycle.errors,
            "events sent"
        );

        Ok(cycle)
    }

    /// Returns the configured devices, enumerating them if configured so.
    fn devices(&self) -> Result<Vec<String>> {
        if !self.config.all_devices() {
            return Ok(self.config.devices.clone());
        }

        let output = self.invoke(Command::LsFs, None)?;
        let decoded = aggregate::decode_devices(&output);
        report(&decoded);

        let devices = aggregate::device_names(&decoded.records);

        if devices.is_empty() {
            return Err(anyhow!("no devices found"));
        }

        debug!(?devices, "enumerated devices");

        Ok(devices)
    }

    fn invoke(&self, command: Command, device: Option<&str>) -> Result<String> {
        let program = self.config.commands.program(command);

        match (command, device) {
            (Command::LsFs, _) => self.runner.run(program, &crate::fs::ARGS),
            (Command::RepQuota, Some(device)) => {
                self.runner.run(program, &["-Y", device])
            }
            (Command::Df | Command::LsFileset, Some(device)) => {
                self.runner.run(program, &[device, "-Y"])
            }
            (_, None) => Err(anyhow!("{command} needs a device")),
        }
    }
}

/// Logs decode failures, returns their number.
fn report(decoded: &Decoded) -> usize {
    for failure in &decoded.failures {
        warn!(
            device = failure.device.as_deref().unwrap_or("-"),
            line = failure.number,
            raw = %failure.line,
            error = %failure.source,
            "skipping malformed row"
        );
    }

    decoded.failures.len()
}

// ----------------------------------------------------------------------------
// tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::collections::HashMap;

    use serde_json::Value;

    use super::*;

    /// Replays canned output keyed by the full command line.
    #[derive(Default)]
    struct Replay {
        outputs: HashMap<String, String>,
        calls: RefCell<Vec<String>>,
    }

    impl Replay {
        fn with(mut self, cmdline: &str, output: &str) -> Self {
            self.outputs.insert(cmdline.into(), output.into());
            self
        }
    }

    impl Runner for Replay {
        fn run(&self, program: &str, args: &[&str]) -> Result<String> {
            let cmdline = std::iter::once(program)
                .chain(args.iter().copied())
                .collect::<Vec<_>>()
                .join(" ");

            self.calls.borrow_mut().push(cmdline.clone());

            self.outputs
                .get(&cmdline)
                .cloned()
                .ok_or_else(|| anyhow!("no such command: {cmdline}"))
        }
    }

    const DEVICES: &str = "\
mmlsfs::HEADER:version:reserved:reserved:deviceName:fieldName:data:remarks:
mmlsfs::0:1:::gpfs1:blockSize:4194304::
mmlsfs::0:1:::gpfs2:blockSize:4194304::
mmlsfs::0:1:::gpfs1:inodeSize:4096::
";

    const DF: &str = "\
mmdf:inode:HEADER:version:reserved:reserved:usedInodes:freeInodes:allocatedInodes:maxInodes:
mmdf:inode:0:1:::100:50:150:200:
mmdf:inode:0:1:::1x:50:150:200:
";

    fn config() -> Config {
        let mut config = Config::default();
        config.polls.quota = false;
        config.polls.fileset = false;
        config
    }

    fn events(output: &[u8]) -> Vec<Value> {
        std::str::from_utf8(output)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }

    #[test]
    fn poll_enumerates_devices() {
        let runner = Replay::default()
            .with("mmlsfs all -Y", DEVICES)
            .with("mmdf gpfs1 -Y", DF)
            .with("mmdf gpfs2 -Y", DF);

        let mut beat = Beat::new(config(), runner, Publisher::new(vec![]));

        let cycle = beat.poll().unwrap();

        assert_eq!(
            cycle,
            Cycle {
                published: 2,
                failures: 2,
                errors: 0,
            }
        );

        assert_eq!(
            *beat.runner.calls.borrow(),
            vec!["mmlsfs all -Y", "mmdf gpfs1 -Y", "mmdf gpfs2 -Y"]
        );

        let events = events(&beat.publisher.into_inner());
        assert_eq!(events[0]["df"]["device"], "gpfs1");
        assert_eq!(events[1]["df"]["device"], "gpfs2");
        assert_eq!(events[1]["counter"], 1);
    }

    #[test]
    fn failing_device_does_not_stop_others() {
        let runner = Replay::default().with("mmdf gpfs2 -Y", DF);

        let mut config = config();
        config.devices = vec!["gpfs1".into(), "gpfs2".into()];

        let mut beat = Beat::new(config, runner, Publisher::new(vec![]));

        let cycle = beat.poll().unwrap();

        assert_eq!(cycle.errors, 1);
        assert_eq!(cycle.published, 1);

        let events = events(&beat.publisher.into_inner());
        assert_eq!(events[0]["df"]["device"], "gpfs2");
    }

    #[test]
    fn quota_command_line() {
        let quota = include_str!("quota-example.in");
        let runner = Replay::default().with("mmrepquota -Y gpfs1", quota);

        let mut config = Config::default();
        config.devices = vec!["gpfs1".into()];
        config.polls.df = false;
        config.polls.fileset = false;

        let mut beat = Beat::new(config, runner, Publisher::new(vec![]));

        assert_eq!(beat.poll().unwrap().published, 3);
        assert_eq!(beat.poll().unwrap().published, 3);

        let events = events(&beat.publisher.into_inner());
        assert_eq!(events.len(), 6);
        assert_eq!(events[5]["counter"], 2);
    }

    #[test]
    fn no_devices() {
        let runner = Replay::default().with("mmlsfs all -Y", "");

        let mut beat = Beat::new(config(), runner, Publisher::new(vec![]));

        assert!(beat.poll().is_err());
    }

    #[test]
    fn stopped_beat_does_not_poll() {
        let running = AtomicBool::new(false);
        let mut beat =
            Beat::new(config(), Replay::default(), Publisher::new(vec![]));

        beat.run(&running);

        assert!(beat.runner.calls.borrow().is_empty());
    }
}
