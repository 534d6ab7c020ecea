//! Core type definitions used throughout the codebase

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Supported application identifier
///
/// The registry is closed: every app the runner can drive has exactly one
/// variant here and exactly one handler in the dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AppId {
    Maps,
    #[serde(rename = "Google Maps")]
    GoogleMaps,
    FaceTime,
    Mail,
    Settings,
    Calendar,
    Spotify,
    Things,
    WhatsApp,
    Uber,
    Phone,
    Messages,
    Shortcuts,
    Notes,
    Reminders,
    Photos,
    Books,
    Podcasts,
    Music,
    Wallet,
    #[serde(rename = "Find My")]
    FindMy,
    #[serde(rename = "App Store")]
    AppStore,
}

impl AppId {
    pub const ALL: [AppId; 22] = [
        AppId::Maps,
        AppId::GoogleMaps,
        AppId::FaceTime,
        AppId::Mail,
        AppId::Settings,
        AppId::Calendar,
        AppId::Spotify,
        AppId::Things,
        AppId::WhatsApp,
        AppId::Uber,
        AppId::Phone,
        AppId::Messages,
        AppId::Shortcuts,
        AppId::Notes,
        AppId::Reminders,
        AppId::Photos,
        AppId::Books,
        AppId::Podcasts,
        AppId::Music,
        AppId::Wallet,
        AppId::FindMy,
        AppId::AppStore,
    ];

    /// Canonical display name, also used on the wire
    pub fn name(&self) -> &'static str {
        match self {
            AppId::Maps => "Maps",
            AppId::GoogleMaps => "Google Maps",
            AppId::FaceTime => "FaceTime",
            AppId::Mail => "Mail",
            AppId::Settings => "Settings",
            AppId::Calendar => "Calendar",
            AppId::Spotify => "Spotify",
            AppId::Things => "Things",
            AppId::WhatsApp => "WhatsApp",
            AppId::Uber => "Uber",
            AppId::Phone => "Phone",
            AppId::Messages => "Messages",
            AppId::Shortcuts => "Shortcuts",
            AppId::Notes => "Notes",
            AppId::Reminders => "Reminders",
            AppId::Photos => "Photos",
            AppId::Books => "Books",
            AppId::Podcasts => "Podcasts",
            AppId::Music => "Music",
            AppId::Wallet => "Wallet",
            AppId::FindMy => "Find My",
            AppId::AppStore => "App Store",
        }
    }

    /// Look up an app by name, ignoring case, spaces, dashes and underscores.
    ///
    /// Accepts a few common aliases the model tends to produce
    /// ("apple maps", "imessage", "mailto", "tel").
    pub fn from_name(name: &str) -> Option<AppId> {
        let key: String = name
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .map(|c| c.to_ascii_lowercase())
            .collect();

        let app = match key.as_str() {
            "maps" | "applemaps" => AppId::Maps,
            "googlemaps" | "streetview" | "googlemapsstreetview" => AppId::GoogleMaps,
            "facetime" => AppId::FaceTime,
            "mail" | "email" | "mailto" => AppId::Mail,
            "settings" | "preferences" => AppId::Settings,
            "calendar" | "calshow" => AppId::Calendar,
            "spotify" => AppId::Spotify,
            "things" | "things3" => AppId::Things,
            "whatsapp" => AppId::WhatsApp,
            "uber" => AppId::Uber,
            "phone" | "tel" | "call" => AppId::Phone,
            "messages" | "imessage" | "sms" => AppId::Messages,
            "shortcuts" => AppId::Shortcuts,
            "notes" => AppId::Notes,
            "reminders" => AppId::Reminders,
            "photos" => AppId::Photos,
            "books" | "ibooks" | "applebooks" => AppId::Books,
            "podcasts" | "applepodcasts" => AppId::Podcasts,
            "music" | "applemusic" => AppId::Music,
            "wallet" | "applewallet" => AppId::Wallet,
            "findmy" => AppId::FindMy,
            "appstore" => AppId::AppStore,
            _ => return None,
        };
        Some(app)
    }
}

impl fmt::Display for AppId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Parameter name to value, ordered so output is stable
pub type Params = BTreeMap<String, String>;

/// Resolved action: which app to drive and with what
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Action {
    pub app: AppId,
    pub params: Params,
}

impl Action {
    pub fn new(app: AppId) -> Self {
        Self {
            app,
            params: Params::new(),
        }
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }
}
