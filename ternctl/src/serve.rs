//! `ternctl serve`: the consumer side of a segment.
//!
//! One `SlotCondition` per slot plus a shutdown guard share a single wait
//! set. Ctrl-C triggers the guard, so the loop never has to poll a flag.

use clap::Args;
use std::path::{Path, PathBuf};
use std::ptr;
use std::time::Duration;
use tern_common::consts::DEFAULT_CONFIG_PATH;
use tern_common::prelude::*;
use tern_waitset::{Condition, GuardCondition, SharedSegment, SlotCondition, WaitSet};
use tracing::{debug, info, trace, warn};

static SHUTDOWN: GuardCondition<'static> = GuardCondition::new();

/// Options of the `serve` subcommand. Flags override the config file.
#[derive(Args, Debug, Default)]
pub struct ServeArgs {
    /// TOML configuration file (default: /etc/tern/serve.toml when no --segment is given)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Segment name
    #[arg(long)]
    pub segment: Option<String>,

    /// Number of trigger slots
    #[arg(long)]
    pub slots: Option<usize>,

    /// Period of each timed wait in milliseconds
    #[arg(long)]
    pub timeout_ms: Option<u64>,

    /// Exit after this many wake-ups
    #[arg(long)]
    pub max_events: Option<u64>,
}

impl ServeArgs {
    /// Merge the config file with the command-line overrides.
    ///
    /// Without `--config`, `--segment` alone is enough; with neither, the
    /// default config path is loaded.
    pub fn resolve(&self) -> Result<ServeConfig, ConfigError> {
        let mut config = match (&self.config, &self.segment) {
            (Some(path), _) => ServeConfig::load(path)?,
            (None, Some(segment)) => ServeConfig {
                shared: SharedConfig {
                    log_level: LogLevel::default(),
                    service_name: "ternctl".to_string(),
                },
                segment: segment.clone(),
                slots: 1,
                timeout_ms: DEFAULT_TIMEOUT_MS,
                max_events: None,
            },
            (None, None) => ServeConfig::load(Path::new(DEFAULT_CONFIG_PATH))?,
        };

        if let Some(segment) = &self.segment {
            config.segment = segment.clone();
        }
        if let Some(slots) = self.slots {
            config.slots = slots;
        }
        if let Some(timeout_ms) = self.timeout_ms {
            config.timeout_ms = timeout_ms;
        }
        if self.max_events.is_some() {
            config.max_events = self.max_events;
        }

        config.validate()?;
        Ok(config)
    }
}

/// Space-separated slot list, `-` when empty.
pub fn format_slots(slots: impl IntoIterator<Item = usize>) -> String {
    let list: Vec<String> = slots.into_iter().map(|slot| slot.to_string()).collect();
    if list.is_empty() {
        "-".to_string()
    } else {
        list.join(" ")
    }
}

/// Serve the configured segment until `max_events` wake-ups or Ctrl-C.
pub fn run(config: &ServeConfig) -> Result<(), Box<dyn std::error::Error>> {
    // The shutdown guard is static, so everything it is attached with must be too.
    let segment: &'static SharedSegment =
        Box::leak(Box::new(SharedSegment::create(&config.segment, config.slots)?));
    let slots: &'static [SlotCondition<'static>] = (0..segment.slot_count())
        .map(|slot| segment.slot_condition(slot))
        .collect::<Result<Vec<_>, _>>()?
        .leak();

    let mut wait_set: WaitSet<'static> = WaitSet::new(segment.condition_variable());
    for slot in slots {
        wait_set.attach_condition(slot);
    }
    wait_set.attach_condition(&SHUTDOWN);

    ctrlc::set_handler(|| {
        info!("Received shutdown signal");
        SHUTDOWN.trigger();
    })?;

    info!(
        service = %config.shared.service_name,
        segment = %config.segment,
        slots = config.slots,
        path = %segment.path().display(),
        "serving"
    );

    let period = Duration::from_millis(config.timeout_ms);
    let mut events = 0u64;
    loop {
        let ready = wait_set.timed_wait(period);
        if ready.is_empty() {
            trace!("idle");
            continue;
        }
        if SHUTDOWN.has_trigger() {
            info!("shutting down");
            break;
        }

        let fired: Vec<usize> = slots
            .iter()
            .filter(|slot| {
                ready
                    .iter()
                    .any(|condition| ptr::addr_eq(ptr::from_ref(*condition), ptr::from_ref(*slot)))
            })
            .filter(|slot| slot.take())
            .map(SlotCondition::slot)
            .collect();
        if fired.is_empty() {
            debug!("wake-up without a pending slot");
            continue;
        }

        println!("ready: {}", format_slots(fired));
        events += 1;
        if config.max_events.is_some_and(|max| events >= max) {
            info!(events, "event limit reached");
            break;
        }
    }

    wait_set.clear();
    if let Err(e) = segment.unlink() {
        warn!(error = %e, "failed to unlink segment");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn format_slots_lists_indices() {
        assert_eq!(format_slots([0, 2, 5]), "0 2 5");
        assert_eq!(format_slots(std::iter::empty()), "-");
    }

    #[test]
    fn resolve_missing_config_file_fails() {
        let args = ServeArgs {
            config: Some(PathBuf::from("/nonexistent/tern/serve.toml")),
            ..Default::default()
        };
        assert!(matches!(args.resolve(), Err(ConfigError::FileNotFound)));
    }

    #[test]
    fn resolve_from_flags_uses_defaults() {
        let args = ServeArgs {
            segment: Some("sensors".to_string()),
            ..Default::default()
        };
        let config = args.resolve().unwrap();
        assert_eq!(config.segment, "sensors");
        assert_eq!(config.slots, 1);
        assert_eq!(config.timeout_ms, DEFAULT_TIMEOUT_MS);
        assert_eq!(config.max_events, None);
    }

    #[test]
    fn flags_override_config_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
segment = "from_file"
slots = 2
timeout_ms = 100
max_events = 10

[shared]
log_level = "debug"
service_name = "serve-test"
"#
        )
        .unwrap();

        let args = ServeArgs {
            config: Some(file.path().to_path_buf()),
            slots: Some(8),
            max_events: Some(1),
            ..Default::default()
        };
        let config = args.resolve().unwrap();
        assert_eq!(config.segment, "from_file");
        assert_eq!(config.slots, 8);
        assert_eq!(config.timeout_ms, 100);
        assert_eq!(config.max_events, Some(1));
        assert_eq!(config.shared.log_level, LogLevel::Debug);
    }

    #[test]
    fn invalid_overrides_are_rejected() {
        let args = ServeArgs {
            segment: Some("sensors".to_string()),
            slots: Some(0),
            ..Default::default()
        };
        assert!(args.resolve().is_err());
    }
}
