//! Physical device control through `xcrun devicectl`
//!
//! `devicectl` has no direct "open URL" verb, so the link is handed to
//! Safari as a launch payload and iOS routes it to the owning app.

use crate::core::error::{Result, RunnerError};
use crate::device::runner::CommandRunner;
use crate::device::Device;

const XCRUN: &str = "xcrun";
const PAYLOAD_HOST: &str = "com.apple.mobilesafari";

pub struct PhysicalDevice<R: CommandRunner> {
    udid: String,
    runner: R,
}

impl<R: CommandRunner> PhysicalDevice<R> {
    pub fn new(udid: impl Into<String>, runner: R) -> Self {
        Self {
            udid: udid.into(),
            runner,
        }
    }

    pub fn udid(&self) -> &str {
        &self.udid
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    fn launch_args<'a>(&'a self, url: &'a str) -> Vec<&'a str> {
        vec![
            "devicectl",
            "device",
            "process",
            "launch",
            "--device",
            self.udid.as_str(),
            "--payload-url",
            url,
            PAYLOAD_HOST,
        ]
    }
}

impl<R: CommandRunner> Device for PhysicalDevice<R> {
    fn name(&self) -> &'static str {
        "physical"
    }

    fn describe(&self) -> String {
        format!("device {}", self.udid)
    }

    fn open_url(&self, url: &str) -> Result<()> {
        if !self.runner.is_available(XCRUN) {
            return Err(RunnerError::Device(
                "xcrun not found; the Xcode command line tools are required".into(),
            ));
        }
        if self.udid.trim().is_empty() {
            return Err(RunnerError::Device("Physical device UDID is empty".into()));
        }

        tracing::info!("Opening {} on device {}", url, self.udid);
        let args = self.launch_args(url);
        self.runner.run(XCRUN, &args)?.check(XCRUN, &args)?;
        Ok(())
    }
}
