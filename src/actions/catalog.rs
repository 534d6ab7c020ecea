//! Per-app parameter schemas
//!
//! The catalog serves two purposes: it tells the model which apps exist and
//! what each one accepts, and it is the schema the model's answer is checked
//! against before anything is dispatched.

use crate::core::types::AppId;
use serde_json::{json, Map, Value};

/// One parameter an app accepts
#[derive(Debug, Clone, Copy)]
pub struct ParamSpec {
    pub name: &'static str,
    pub description: &'static str,
    pub required: bool,
    /// Allowed values; empty means free text
    pub values: &'static [&'static str],
}

impl ParamSpec {
    const fn required(name: &'static str, description: &'static str) -> Self {
        Self { name, description, required: true, values: &[] }
    }

    const fn optional(name: &'static str, description: &'static str) -> Self {
        Self { name, description, required: false, values: &[] }
    }

    const fn one_of(name: &'static str, description: &'static str, values: &'static [&'static str]) -> Self {
        Self { name, description, required: false, values }
    }
}

/// Schema and description for one app
#[derive(Debug, Clone, Copy)]
pub struct AppSpec {
    pub app: AppId,
    pub description: &'static str,
    pub params: &'static [ParamSpec],
}

impl AppSpec {
    pub fn param(&self, name: &str) -> Option<&ParamSpec> {
        self.params.iter().find(|p| p.name == name)
    }

    pub fn required_params(&self) -> impl Iterator<Item = &ParamSpec> {
        self.params.iter().filter(|p| p.required)
    }

    /// JSON-schema style description handed to the model
    pub fn to_tool_json(&self) -> Value {
        let mut properties = Map::new();
        for p in self.params {
            let mut prop = json!({ "type": "string", "description": p.description });
            if !p.values.is_empty() {
                prop["enum"] = json!(p.values);
            }
            properties.insert(p.name.to_string(), prop);
        }
        let required: Vec<&str> = self.required_params().map(|p| p.name).collect();

        json!({
            "name": self.app.name(),
            "description": self.description,
            "parameters": {
                "type": "object",
                "properties": properties,
                "required": required,
                "additionalProperties": false,
            }
        })
    }
}

const MAPS: &[ParamSpec] = &[
    ParamSpec::optional("source", "Start address or place; omit for current location"),
    ParamSpec::required("destination", "Destination address or place"),
    ParamSpec::one_of(
        "transport",
        "d = driving, w = walking, r = public transit, c = cycling",
        &["d", "w", "r", "c"],
    ),
];

const GOOGLE_MAPS: &[ParamSpec] = &[
    ParamSpec::optional("query", "Place to search for"),
    ParamSpec::optional("center_lat", "Latitude to center Street View on"),
    ParamSpec::optional("center_lng", "Longitude to center Street View on"),
];

const FACETIME: &[ParamSpec] = &[ParamSpec::required(
    "contact",
    "Phone number, Apple ID e-mail or contact name",
)];

const MAIL: &[ParamSpec] = &[
    ParamSpec::required("recipient", "E-mail address"),
    ParamSpec::optional("cc", "Carbon copy address"),
    ParamSpec::optional("bcc", "Blind carbon copy address"),
    ParamSpec::optional("subject", "Subject line"),
    ParamSpec::optional("body", "Message body"),
];

const SETTINGS: &[ParamSpec] = &[
    ParamSpec::one_of(
        "root",
        "Settings pane",
        &[
            "WIFI",
            "Bluetooth",
            "MOBILE_DATA_SETTINGS_ID",
            "NOTIFICATIONS_ID",
            "General",
            "DISPLAY",
            "Sounds",
            "Privacy",
            "BATTERY_USAGE",
        ],
    ),
    ParamSpec::optional("path", "Sub-page inside the pane"),
];

const CALENDAR: &[ParamSpec] = &[ParamSpec::optional("date", "Day to show, YYYY-MM-DD")];

const SPOTIFY: &[ParamSpec] = &[ParamSpec::required(
    "query",
    "Artist, album, song or playlist to search for",
)];

const THINGS: &[ParamSpec] = &[
    ParamSpec::required("title", "To-do title"),
    ParamSpec::optional("notes", "To-do notes"),
    ParamSpec::optional("when", "today, tomorrow, evening, anytime, someday or YYYY-MM-DD"),
    ParamSpec::optional("deadline", "YYYY-MM-DD"),
    ParamSpec::optional("tags", "Comma-separated tags"),
    ParamSpec::optional("list", "Project or area name"),
];

const WHATSAPP: &[ParamSpec] = &[
    ParamSpec::required("phone", "Phone number in international format"),
    ParamSpec::optional("text", "Prefilled message"),
];

const UBER: &[ParamSpec] = &[
    ParamSpec::required("pickup_lat", "Pickup latitude"),
    ParamSpec::required("pickup_lng", "Pickup longitude"),
    ParamSpec::optional("pickup_nickname", "Pickup label"),
    ParamSpec::optional("dropoff_lat", "Drop-off latitude"),
    ParamSpec::optional("dropoff_lng", "Drop-off longitude"),
    ParamSpec::optional("dropoff_nickname", "Drop-off label"),
    ParamSpec::optional("product_id", "Uber product id"),
];

const PHONE: &[ParamSpec] = &[ParamSpec::required(
    "contact",
    "Phone number or contact name to call",
)];

const MESSAGES: &[ParamSpec] = &[
    ParamSpec::required("phone", "Phone number or contact to message"),
    ParamSpec::optional("message", "Prefilled message text"),
];

const SHORTCUTS: &[ParamSpec] = &[ParamSpec::optional("name", "Shortcut to run")];

const PODCASTS: &[ParamSpec] = &[ParamSpec::optional("feed", "Podcast feed URL without scheme")];

const MUSIC: &[ParamSpec] = &[ParamSpec::optional("query", "Song, album or artist to search for")];

const FIND_MY: &[ParamSpec] = &[ParamSpec::one_of(
    "tab",
    "Tab to open",
    &["items", "people", "devices"],
)];

const APP_STORE: &[ParamSpec] = &[
    ParamSpec::optional("url", "Full itms-apps:// or apps.apple.com URL"),
    ParamSpec::optional("query", "App to search for"),
];

const NONE: &[ParamSpec] = &[];

/// Schema for an app
pub fn spec_for(app: AppId) -> AppSpec {
    let (description, params) = match app {
        AppId::Maps => ("Apple Maps directions between two places", MAPS),
        AppId::GoogleMaps => ("Google Maps Street View or place search", GOOGLE_MAPS),
        AppId::FaceTime => ("Start a FaceTime call", FACETIME),
        AppId::Mail => ("Compose an e-mail", MAIL),
        AppId::Settings => ("Open a Settings pane", SETTINGS),
        AppId::Calendar => ("Show a day in Calendar", CALENDAR),
        AppId::Spotify => ("Search or play music on Spotify", SPOTIFY),
        AppId::Things => ("Add a to-do to Things 3", THINGS),
        AppId::WhatsApp => ("Open a WhatsApp chat", WHATSAPP),
        AppId::Uber => ("Request an Uber ride", UBER),
        AppId::Phone => ("Place a phone call", PHONE),
        AppId::Messages => ("Send an SMS / iMessage", MESSAGES),
        AppId::Shortcuts => ("Open Shortcuts or run a shortcut", SHORTCUTS),
        AppId::Notes => ("Open Notes", NONE),
        AppId::Reminders => ("Open Reminders", NONE),
        AppId::Photos => ("Open Photos", NONE),
        AppId::Books => ("Open Apple Books", NONE),
        AppId::Podcasts => ("Open Apple Podcasts or a podcast feed", PODCASTS),
        AppId::Music => ("Open Apple Music or search it", MUSIC),
        AppId::Wallet => ("Open Wallet", NONE),
        AppId::FindMy => ("Open Find My", FIND_MY),
        AppId::AppStore => ("Open the App Store or search it", APP_STORE),
    };
    AppSpec { app, description, params }
}

/// Every app's schema in registry order
pub fn all_specs() -> Vec<AppSpec> {
    AppId::ALL.iter().map(|&app| spec_for(app)).collect()
}

/// Tool list sent to the model
pub fn tools_json() -> Value {
    Value::Array(all_specs().iter().map(AppSpec::to_tool_json).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_app_has_spec() {
        let specs = all_specs();
        assert_eq!(specs.len(), AppId::ALL.len());
        for (spec, app) in specs.iter().zip(AppId::ALL) {
            assert_eq!(spec.app, app);
            assert!(!spec.description.is_empty());
        }
    }

    #[test]
    fn test_phone_requires_contact() {
        let spec = spec_for(AppId::Phone);
        let required: Vec<_> = spec.required_params().map(|p| p.name).collect();
        assert_eq!(required, vec!["contact"]);
    }

    #[test]
    fn test_tool_json_shape() {
        let tool = spec_for(AppId::Maps).to_tool_json();
        assert_eq!(tool["name"], "Maps");
        assert_eq!(tool["parameters"]["required"], json!(["destination"]));
        assert_eq!(
            tool["parameters"]["properties"]["transport"]["enum"],
            json!(["d", "w", "r", "c"])
        );
        assert_eq!(tool["parameters"]["additionalProperties"], json!(false));
    }

    #[test]
    fn test_param_names_unique_per_app() {
        for spec in all_specs() {
            let mut names: Vec<_> = spec.params.iter().map(|p| p.name).collect();
            names.sort();
            names.dedup();
            assert_eq!(names.len(), spec.params.len(), "{}", spec.app);
        }
    }
}
