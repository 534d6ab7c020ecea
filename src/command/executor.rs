//! Action dispatch - turns a resolved Action into a deep link on a device

use crate::actions::deeplink::handler_for;
use crate::core::error::{Result, RunnerError};
use crate::core::types::{Action, AppId, Params};
use crate::device::Device;
use serde::Serialize;

/// Dispatches actions to exactly one handler and opens the result
pub struct ActionDispatcher<'a> {
    device: &'a dyn Device,
}

/// What was opened, for reporting
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DispatchOutcome {
    pub app: AppId,
    pub url: String,
    pub device: String,
}

impl<'a> ActionDispatcher<'a> {
    pub fn new(device: &'a dyn Device) -> Self {
        Self { device }
    }

    /// Build the deep link without opening it
    pub fn build_link(action: &Action) -> Result<String> {
        handler_for(action.app)(&action.params)
    }

    /// Execute an action on the device
    pub fn dispatch(&self, action: &Action) -> Result<DispatchOutcome> {
        let url = Self::build_link(action)?;
        tracing::debug!("{} -> {}", action.app, url);
        self.device.open_url(&url)?;

        Ok(DispatchOutcome {
            app: action.app,
            url,
            device: self.device.describe(),
        })
    }

    /// Dispatch by app name, for callers that have not gone through the parser
    pub fn dispatch_named(&self, app_name: &str, params: Params) -> Result<DispatchOutcome> {
        let app = AppId::from_name(app_name)
            .ok_or_else(|| RunnerError::UnsupportedApp(app_name.to_string()))?;
        self.dispatch(&Action { app, params })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingDevice {
        opened: Mutex<Vec<String>>,
        fail: bool,
    }

    impl Device for RecordingDevice {
        fn name(&self) -> &'static str {
            "recording"
        }

        fn describe(&self) -> String {
            "recorder".into()
        }

        fn open_url(&self, url: &str) -> Result<()> {
            if self.fail {
                return Err(RunnerError::Device("boot failed".into()));
            }
            self.opened.lock().unwrap().push(url.to_string());
            Ok(())
        }
    }

    #[test]
    fn test_dispatch_opens_exactly_one_link() {
        let device = RecordingDevice::default();
        let dispatcher = ActionDispatcher::new(&device);
        let action = Action::new(AppId::Phone).with_param("contact", "Alice");

        let outcome = dispatcher.dispatch(&action).unwrap();
        assert_eq!(outcome.url, "tel:Alice");
        assert_eq!(outcome.app, AppId::Phone);
        assert_eq!(outcome.device, "recorder");
        assert_eq!(*device.opened.lock().unwrap(), vec!["tel:Alice"]);
    }

    #[test]
    fn test_dispatch_is_deterministic() {
        let device = RecordingDevice::default();
        let dispatcher = ActionDispatcher::new(&device);
        let action = Action::new(AppId::Maps)
            .with_param("source", "San Francisco")
            .with_param("destination", "Los Angeles")
            .with_param("transport", "d");

        let first = dispatcher.dispatch(&action).unwrap();
        let second = dispatcher.dispatch(&action).unwrap();
        assert_eq!(first, second);
        assert_eq!(
            first.url,
            "maps://?saddr=San%20Francisco&daddr=Los%20Angeles&dirflg=d"
        );
    }

    #[test]
    fn test_dispatch_named_unknown_app() {
        let device = RecordingDevice::default();
        let dispatcher = ActionDispatcher::new(&device);
        let err = dispatcher.dispatch_named("Snapchat", Params::new()).unwrap_err();
        assert!(matches!(err, RunnerError::UnsupportedApp(ref name) if name == "Snapchat"));
        assert!(device.opened.lock().unwrap().is_empty());
    }

    #[test]
    fn test_dispatch_named_alias() {
        let device = RecordingDevice::default();
        let dispatcher = ActionDispatcher::new(&device);
        let outcome = dispatcher.dispatch_named("wallet", Params::new()).unwrap();
        assert_eq!(outcome.url, "shoebox://");
    }

    #[test]
    fn test_missing_param_never_reaches_device() {
        let device = RecordingDevice::default();
        let dispatcher = ActionDispatcher::new(&device);
        let err = dispatcher.dispatch(&Action::new(AppId::Spotify)).unwrap_err();
        assert!(matches!(err, RunnerError::Classification(_)));
        assert!(device.opened.lock().unwrap().is_empty());
    }

    #[test]
    fn test_device_failure_propagates() {
        let device = RecordingDevice {
            fail: true,
            ..Default::default()
        };
        let dispatcher = ActionDispatcher::new(&device);
        let err = dispatcher.dispatch(&Action::new(AppId::Notes)).unwrap_err();
        assert_eq!(err.exit_code(), 5);
    }
}
