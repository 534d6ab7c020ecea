//! iOS simulator control through `xcrun simctl`
//!
//! If nothing is booted, the newest available iPhone simulator is booted
//! first. Candidates are tried from best to worst until one comes up.

use crate::core::error::{Result, RunnerError};
use crate::device::runner::CommandRunner;
use crate::device::Device;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::sync::OnceLock;

const XCRUN: &str = "xcrun";

/// One simulator entry from `simctl list devices -j`
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimDevice {
    pub name: String,
    pub udid: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub is_available: bool,
    #[serde(skip)]
    pub runtime: String,
}

impl SimDevice {
    pub fn is_booted(&self) -> bool {
        self.state == "Booted"
    }
}

#[derive(Debug, Deserialize)]
struct DeviceList {
    #[serde(default)]
    devices: BTreeMap<String, Vec<SimDevice>>,
}

/// Parse `simctl list devices -j` output, tagging each device with its runtime
pub fn parse_device_list(json: &str) -> Result<Vec<SimDevice>> {
    let list: DeviceList = serde_json::from_str(json)?;
    Ok(list
        .devices
        .into_iter()
        .flat_map(|(runtime, devices)| {
            devices.into_iter().map(move |mut d| {
                d.runtime = runtime.clone();
                d
            })
        })
        .collect())
}

/// Sort key for iPhone names, higher is newer/better
///
/// `iPhone 16 Pro Max` > `iPhone 16 Pro` > `iPhone 16 Plus` > `iPhone 16` >
/// `iPhone 15 Pro`. Unnumbered models such as the SE sort last.
pub fn iphone_rank(name: &str) -> (u32, i32) {
    static NUMBER: OnceLock<regex::Regex> = OnceLock::new();
    let number = NUMBER.get_or_init(|| regex::Regex::new(r"iPhone\s+(\d+)").expect("valid regex"));

    let Some(n) = number
        .captures(name)
        .and_then(|c| c[1].parse::<u32>().ok())
    else {
        return (0, -1);
    };

    let lowered = name.to_lowercase();
    let tier = [("pro max", 3), ("promax", 3), ("pro", 2), ("plus", 1)]
        .iter()
        .find(|(key, _)| lowered.contains(key))
        .map(|(_, t)| *t)
        .unwrap_or(0);
    (n, tier)
}

/// Available iPhones, best first
pub fn rank_iphones(devices: &[SimDevice]) -> Vec<SimDevice> {
    let mut phones: Vec<SimDevice> = devices
        .iter()
        .filter(|d| d.name.starts_with("iPhone") && d.is_available)
        .cloned()
        .collect();
    phones.sort_by(|a, b| iphone_rank(&b.name).cmp(&iphone_rank(&a.name)));
    phones
}

/// Simulator target; `udid: None` means "whatever is booted"
pub struct Simulator<R: CommandRunner> {
    udid: Option<String>,
    runner: R,
}

impl<R: CommandRunner> Simulator<R> {
    pub fn new(udid: Option<String>, runner: R) -> Self {
        Self { udid, runner }
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    fn simctl(&self, args: &[&str]) -> Result<String> {
        let mut full = vec!["simctl"];
        full.extend_from_slice(args);
        let output = self.runner.run(XCRUN, &full)?.check(XCRUN, &full)?;
        Ok(output.stdout)
    }

    /// All simulators known to simctl
    pub fn list_devices(&self) -> Result<Vec<SimDevice>> {
        parse_device_list(&self.simctl(&["list", "devices", "-j"])?)
    }

    /// Available simulators only
    pub fn list_available(&self) -> Result<Vec<SimDevice>> {
        parse_device_list(&self.simctl(&["list", "devices", "available", "-j"])?)
    }

    /// UDID of the first booted simulator, if any
    pub fn booted_udid(&self) -> Result<Option<String>> {
        Ok(self
            .list_devices()?
            .into_iter()
            .find(SimDevice::is_booted)
            .map(|d| d.udid))
    }

    fn boot(&self, device: &SimDevice) -> Result<()> {
        tracing::info!("Booting {} ({})", device.name, device.udid);
        self.simctl(&["boot", &device.udid])?;
        self.runner.run("open", &["-a", "Simulator"])?.check("open", &["-a", "Simulator"])?;
        self.simctl(&["bootstatus", &device.udid, "-b"])?;
        Ok(())
    }

    /// Make sure the target simulator is running and return its UDID
    pub fn ensure_booted(&self) -> Result<String> {
        if !self.runner.is_available(XCRUN) {
            return Err(RunnerError::Device(
                "xcrun not found; the Xcode command line tools are required".into(),
            ));
        }

        if let Some(udid) = &self.udid {
            let devices = self.list_devices()?;
            let device = devices
                .iter()
                .find(|d| &d.udid == udid)
                .ok_or_else(|| RunnerError::Device(format!("No simulator with UDID {}", udid)))?;
            if !device.is_booted() {
                self.boot(device)?;
            }
            return Ok(udid.clone());
        }

        if let Some(udid) = self.booted_udid()? {
            tracing::debug!("Using booted simulator {}", udid);
            return Ok(udid);
        }

        let candidates = rank_iphones(&self.list_available()?);
        if candidates.is_empty() {
            return Err(RunnerError::Device("No available iPhone simulators found".into()));
        }

        let mut last_err = None;
        for device in &candidates {
            match self.boot(device) {
                Ok(()) => return Ok(device.udid.clone()),
                Err(e) => {
                    tracing::warn!("Could not boot {}: {}", device.name, e);
                    last_err = Some(e);
                }
            }
        }

        Err(RunnerError::Device(format!(
            "Failed to boot any iPhone simulator{}",
            last_err.map(|e| format!(" (last error: {})", e)).unwrap_or_default()
        )))
    }
}

impl<R: CommandRunner> Device for Simulator<R> {
    fn name(&self) -> &'static str {
        "simulator"
    }

    fn describe(&self) -> String {
        match &self.udid {
            Some(udid) => format!("simulator {}", udid),
            None => "booted simulator".into(),
        }
    }

    fn open_url(&self, url: &str) -> Result<()> {
        let udid = self.ensure_booted()?;
        tracing::info!("Opening {} on simulator {}", url, udid);
        self.simctl(&["openurl", &udid, url])?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::runner::fake::FakeRunner;
    use crate::device::runner::CommandOutput;

    const LIST: &str = r#"{
      "devices": {
        "com.apple.CoreSimulator.SimRuntime.iOS-17-5": [
          {"name": "iPhone 15", "udid": "U15", "state": "Shutdown", "isAvailable": true},
          {"name": "iPhone SE (3rd generation)", "udid": "USE", "state": "Shutdown", "isAvailable": true}
        ],
        "com.apple.CoreSimulator.SimRuntime.iOS-18-0": [
          {"name": "iPhone 16 Pro Max", "udid": "U16PM", "state": "Shutdown", "isAvailable": true},
          {"name": "iPhone 16", "udid": "U16", "state": "Shutdown", "isAvailable": true},
          {"name": "iPhone 16 Plus", "udid": "U16PL", "state": "Shutdown", "isAvailable": false},
          {"name": "iPad Pro (11-inch)", "udid": "UPAD", "state": "Shutdown", "isAvailable": true}
        ]
      }
    }"#;

    fn booted_list(udid: &str) -> String {
        format!(
            r#"{{"devices": {{"iOS-18-0": [{{"name": "iPhone 16", "udid": "{}", "state": "Booted", "isAvailable": true}}]}}}}"#,
            udid
        )
    }

    #[test]
    fn test_iphone_rank_order() {
        let names = [
            "iPhone 16 Pro Max",
            "iPhone 16 Pro",
            "iPhone 16 Plus",
            "iPhone 16",
            "iPhone 15 Pro",
            "iPhone SE (3rd generation)",
        ];
        for pair in names.windows(2) {
            assert!(iphone_rank(pair[0]) > iphone_rank(pair[1]), "{} vs {}", pair[0], pair[1]);
        }
        assert_eq!(iphone_rank("iPhone SE (3rd generation)"), (0, -1));
    }

    #[test]
    fn test_parse_and_rank() {
        let devices = parse_device_list(LIST).unwrap();
        assert_eq!(devices.len(), 6);
        let ipad = devices.iter().find(|d| d.udid == "UPAD").unwrap();
        assert_eq!(ipad.runtime, "com.apple.CoreSimulator.SimRuntime.iOS-18-0");

        let ranked: Vec<_> = rank_iphones(&devices).into_iter().map(|d| d.udid).collect();
        assert_eq!(ranked, vec!["U16PM", "U16", "U15", "USE"]);
    }

    #[test]
    fn test_open_url_on_booted_simulator() {
        let runner = FakeRunner::with_outputs(vec![CommandOutput::ok(booted_list("B1"))]);
        let sim = Simulator::new(None, runner);
        sim.open_url("tel:Alice").unwrap();

        assert_eq!(
            sim.runner().calls(),
            vec!["xcrun simctl list devices -j", "xcrun simctl openurl B1 tel:Alice"]
        );
    }

    #[test]
    fn test_boots_best_iphone_when_none_booted() {
        let runner = FakeRunner::with_outputs(vec![
            CommandOutput::ok(r#"{"devices": {}}"#),
            CommandOutput::ok(LIST),
            CommandOutput::failed(149, "boot failed"),
            CommandOutput::ok(""),
            CommandOutput::ok(""),
            CommandOutput::ok(""),
            CommandOutput::ok(""),
        ]);
        let sim = Simulator::new(None, runner);
        sim.open_url("mobilenotes://").unwrap();

        assert_eq!(
            sim.runner().calls(),
            vec![
                "xcrun simctl list devices -j",
                "xcrun simctl list devices available -j",
                "xcrun simctl boot U16PM",
                "xcrun simctl boot U16",
                "open -a Simulator",
                "xcrun simctl bootstatus U16 -b",
                "xcrun simctl openurl U16 mobilenotes://",
            ]
        );
    }

    #[test]
    fn test_no_iphones_is_device_error() {
        let runner = FakeRunner::with_outputs(vec![
            CommandOutput::ok(r#"{"devices": {}}"#),
            CommandOutput::ok(r#"{"devices": {}}"#),
        ]);
        let sim = Simulator::new(None, runner);
        assert!(matches!(sim.open_url("shoebox://"), Err(RunnerError::Device(_))));
    }

    #[test]
    fn test_unknown_udid_is_device_error() {
        let runner = FakeRunner::with_outputs(vec![CommandOutput::ok(LIST)]);
        let sim = Simulator::new(Some("NOPE".into()), runner);
        let err = sim.open_url("shoebox://").unwrap_err();
        assert!(err.to_string().contains("NOPE"));
    }

    #[test]
    fn test_openurl_failure_is_device_error() {
        let runner = FakeRunner::with_outputs(vec![
            CommandOutput::ok(booted_list("B1")),
            CommandOutput::failed(1, "The operation couldn't be completed"),
        ]);
        let sim = Simulator::new(None, runner);
        assert!(matches!(sim.open_url("spotify:search:x"), Err(RunnerError::Device(_))));
    }

    #[test]
    fn test_missing_xcrun() {
        let runner = FakeRunner {
            missing: vec!["xcrun".into()],
            ..Default::default()
        };
        let sim = Simulator::new(None, runner);
        let err = sim.open_url("music://").unwrap_err();
        assert!(err.to_string().contains("xcrun not found"));
        assert!(sim.runner().calls().is_empty());
    }
}
