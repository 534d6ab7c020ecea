//! Device automation
//!
//! Handlers only produce deep links. Opening a link on an actual target is
//! the job of a `Device`: a simulator driven through `xcrun simctl`, a
//! physical device driven through `xcrun devicectl`, or a dry run that only
//! reports what would have been opened.

pub mod devicectl;
pub mod runner;
pub mod simctl;

pub use devicectl::PhysicalDevice;
pub use runner::{CommandOutput, CommandRunner, SystemRunner};
pub use simctl::Simulator;

use crate::core::config::RunnerConfig;
use crate::core::error::Result;

/// A target that can open a deep link
pub trait Device {
    fn name(&self) -> &'static str;

    /// Human-readable target description for logs
    fn describe(&self) -> String;

    fn open_url(&self, url: &str) -> Result<()>;
}

/// Prints the link instead of launching it
#[derive(Debug, Default)]
pub struct DryRun;

impl Device for DryRun {
    fn name(&self) -> &'static str {
        "dry-run"
    }

    fn describe(&self) -> String {
        "dry run (nothing is launched)".into()
    }

    fn open_url(&self, url: &str) -> Result<()> {
        tracing::info!("Dry run, not opening {}", url);
        Ok(())
    }
}

/// Pick the device the configuration asks for
pub fn from_config(config: &RunnerConfig) -> Box<dyn Device> {
    if config.dry_run {
        Box::new(DryRun)
    } else if let Some(udid) = &config.physical_device {
        Box::new(PhysicalDevice::new(udid.clone(), SystemRunner))
    } else {
        Box::new(Simulator::new(config.device.clone(), SystemRunner))
    }
}
