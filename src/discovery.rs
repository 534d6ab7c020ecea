//! Deep link discovery on the booted simulator
//!
//! Lists installed app bundles and reports the URL schemes each one
//! registers plus the universal-link domains in its entitlements.

use crate::core::error::{Result, RunnerError};
use crate::device::runner::CommandRunner;
use crate::device::simctl::parse_device_list;
use serde_json::Value;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

pub const CSV_HEADER: &str = "bundle_id,app_name,url_schemes,universal_link_domains";

const CODESIGN: &str = "/usr/bin/codesign";
const PLUTIL: &str = "plutil";
const ASSOCIATED_DOMAINS: &str = "com.apple.developer.associated-domains";

/// One installed app and the links it answers to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppRecord {
    pub bundle_id: String,
    pub app_name: String,
    pub url_schemes: Vec<String>,
    pub universal_link_domains: Vec<String>,
}

impl AppRecord {
    pub fn to_csv_row(&self) -> String {
        [
            csv_escape(&self.bundle_id),
            csv_escape(&self.app_name),
            csv_escape(&self.url_schemes.join(";")),
            csv_escape(&self.universal_link_domains.join(";")),
        ]
        .join(",")
    }
}

/// Quote a CSV field if it contains a comma, quote or newline
pub fn csv_escape(field: &str) -> String {
    if field.contains([',', '"', '\n']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

/// `CFBundleURLSchemes` across all `CFBundleURLTypes`, sorted and deduplicated
pub fn extract_schemes(info: &Value) -> Vec<String> {
    let schemes: BTreeSet<String> = info
        .get("CFBundleURLTypes")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(|t| t.get("CFBundleURLSchemes").and_then(Value::as_array))
        .flatten()
        .filter_map(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();
    schemes.into_iter().collect()
}

/// `applinks:` domains from the associated-domains entitlement, query suffix removed
pub fn extract_link_domains(entitlements: &Value) -> Vec<String> {
    let domains: BTreeSet<String> = entitlements
        .get(ASSOCIATED_DOMAINS)
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(Value::as_str)
        .filter_map(|entry| entry.strip_prefix("applinks:"))
        .map(|d| d.split('?').next().unwrap_or(d).to_string())
        .collect();
    domains.into_iter().collect()
}

/// Bundle paths named in `simctl listapps` output (already converted to JSON)
pub fn app_paths_from_listing(listing: &Value) -> Vec<PathBuf> {
    let apps = listing.get("apps").unwrap_or(listing);
    let Some(map) = apps.as_object() else {
        return Vec::new();
    };

    let paths: BTreeSet<PathBuf> = map
        .values()
        .filter_map(|info| {
            ["Path", "path", "app_path", "bundlePath"]
                .iter()
                .find_map(|k| info.get(*k).and_then(Value::as_str))
        })
        .filter(|p| p.ends_with(".app"))
        .map(PathBuf::from)
        .collect();
    paths.into_iter().collect()
}

/// Cut the plist document out of codesign's chatter
fn plist_fragment(blob: &str) -> Option<&str> {
    let start = blob.find("<?xml").or_else(|| blob.find("<plist"))?;
    let end = blob.rfind("</plist>")? + "</plist>".len();
    (end > start).then(|| &blob[start..end])
}

fn display_name(info: &Value, app_path: &Path) -> String {
    ["CFBundleDisplayName", "CFBundleName"]
        .iter()
        .find_map(|k| info.get(*k).and_then(Value::as_str).filter(|s| !s.is_empty()))
        .map(str::to_string)
        .unwrap_or_else(|| {
            app_path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default()
        })
}

pub struct Discovery<R: CommandRunner> {
    runner: R,
    home: PathBuf,
}

impl<R: CommandRunner> Discovery<R> {
    pub fn new(runner: R, home: impl Into<PathBuf>) -> Self {
        Self {
            runner,
            home: home.into(),
        }
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    pub fn booted_udid(&self) -> Result<Option<String>> {
        let args = ["simctl", "list", "devices", "booted", "--json"];
        let output = self.runner.run("xcrun", &args)?.check("xcrun", &args)?;
        Ok(parse_device_list(&output.stdout)?
            .into_iter()
            .find(|d| d.is_booted())
            .map(|d| d.udid))
    }

    /// Convert any plist (XML, binary or old-style) to JSON through plutil
    fn plist_to_json(&self, data: &[u8]) -> Option<Value> {
        let args = ["-convert", "json", "-o", "-", "-"];
        let output = self.runner.run_with_input(PLUTIL, &args, data).ok()?;
        if !output.success {
            return None;
        }
        serde_json::from_str(&output.stdout).ok()
    }

    fn listed_apps(&self, udid: &str) -> Option<Vec<PathBuf>> {
        let output = self.runner.run("xcrun", &["simctl", "listapps", udid]).ok()?;
        if !output.success || output.stdout.trim().is_empty() {
            return None;
        }
        let listing = self.plist_to_json(output.stdout.as_bytes())?;
        let paths: Vec<PathBuf> = app_paths_from_listing(&listing)
            .into_iter()
            .filter(|p| p.exists())
            .collect();
        (!paths.is_empty()).then_some(paths)
    }

    /// Fallback when listapps is unavailable: walk the simulator's bundle container
    pub fn scan_bundles(&self, udid: &str) -> Vec<PathBuf> {
        let base = self
            .home
            .join("Library/Developer/CoreSimulator/Devices")
            .join(udid)
            .join("data/Containers/Bundle/Application");

        let mut found = BTreeSet::new();
        let Ok(containers) = std::fs::read_dir(&base) else {
            return Vec::new();
        };
        for container in containers.flatten().map(|e| e.path()).filter(|p| p.is_dir()) {
            collect_apps(&container, &mut found);
            if let Ok(nested) = std::fs::read_dir(&container) {
                for dir in nested.flatten().map(|e| e.path()).filter(|p| p.is_dir()) {
                    collect_apps(&dir, &mut found);
                }
            }
        }
        found.into_iter().collect()
    }

    fn read_info(&self, app_path: &Path) -> Option<Value> {
        let data = std::fs::read(app_path.join("Info.plist")).ok()?;
        self.plist_to_json(&data)
    }

    fn entitlements(&self, app_path: &Path) -> Value {
        let path = app_path.to_string_lossy();
        let args = ["-d", "--entitlements", ":-", &*path];
        let Ok(output) = self.runner.run(CODESIGN, &args) else {
            return Value::Null;
        };
        // codesign writes the blob to stderr on some versions, stdout on others
        let blob = if output.stderr.contains("<plist") {
            &output.stderr
        } else {
            &output.stdout
        };
        plist_fragment(blob)
            .and_then(|xml| self.plist_to_json(xml.as_bytes()))
            .unwrap_or(Value::Null)
    }

    pub fn describe_app(&self, app_path: &Path) -> Option<AppRecord> {
        let info = self.read_info(app_path)?;
        let entitlements = self.entitlements(app_path);
        Some(AppRecord {
            bundle_id: info
                .get("CFBundleIdentifier")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            app_name: display_name(&info, app_path),
            url_schemes: extract_schemes(&info),
            universal_link_domains: extract_link_domains(&entitlements),
        })
    }

    /// Every app on the booted simulator that has a readable Info.plist
    pub fn discover(&self) -> Result<Vec<AppRecord>> {
        let udid = self.booted_udid()?.ok_or_else(|| {
            RunnerError::Device("No booted simulator found. Boot one in Xcode and retry.".into())
        })?;
        tracing::info!("Scanning apps on simulator {}", udid);

        let paths = match self.listed_apps(&udid) {
            Some(paths) => paths,
            None => {
                tracing::debug!("simctl listapps unavailable, scanning bundle directory");
                self.scan_bundles(&udid)
            }
        };
        tracing::debug!("Found {} app bundles", paths.len());

        Ok(paths.iter().filter_map(|p| self.describe_app(p)).collect())
    }
}

fn collect_apps(dir: &Path, found: &mut BTreeSet<PathBuf>) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };
    for path in entries.flatten().map(|e| e.path()) {
        if path.extension().is_some_and(|ext| ext == "app") {
            found.insert(path);
        }
    }
}
