//! Deterministic pre-parsing of the instruction
//!
//! Before the model is asked anything, the instruction is scanned for the
//! things plain pattern matching gets right: "from X to Y" routes, transport
//! modes, phone numbers, e-mail addresses, ISO dates, coordinates and explicit
//! `key: value` hints. The results travel to the model as `detected_slots`
//! and are merged underneath the model's own arguments.

use crate::core::types::{AppId, Params};
use regex::Regex;
use serde_json::{json, Value};
use std::sync::OnceLock;

/// Transport phrases and the Maps `dirflg` code they map to, checked in order
pub const TRANSPORT_SYNONYMS: [(&str, &str); 16] = [
    ("driving", "d"),
    ("drive", "d"),
    ("by car", "d"),
    ("car", "d"),
    ("walking", "w"),
    ("walk", "w"),
    ("on foot", "w"),
    ("public transit", "r"),
    ("transit", "r"),
    ("bus", "r"),
    ("train", "r"),
    ("metro", "r"),
    ("subway", "r"),
    ("cycling", "c"),
    ("biking", "c"),
    ("bike", "c"),
];

/// Keywords that point at an app. More specific apps come first.
const APP_HINTS: &[(AppId, &[&str])] = &[
    (AppId::GoogleMaps, &["google maps", "street view", "streetview"]),
    (AppId::FaceTime, &["facetime", "video call"]),
    (AppId::WhatsApp, &["whatsapp"]),
    (AppId::Uber, &["uber"]),
    (AppId::Spotify, &["spotify"]),
    (AppId::AppStore, &["app store", "appstore"]),
    (AppId::FindMy, &["find my", "findmy"]),
    (AppId::Maps, &["apple maps", "maps", "directions", "navigate"]),
    (AppId::Things, &["things 3", "things app", "todo", "to-do", "task"]),
    (AppId::Mail, &["email", "e-mail", "mailto"]),
    (AppId::Settings, &["settings", "wifi", "wi-fi", "bluetooth", "cellular"]),
    (AppId::Calendar, &["calendar", "calshow"]),
    (AppId::Shortcuts, &["shortcut", "shortcuts"]),
    (AppId::Reminders, &["reminder", "reminders"]),
    (AppId::Notes, &["notes", "note"]),
    (AppId::Photos, &["photos", "pictures", "photo library"]),
    (AppId::Podcasts, &["podcast", "podcasts"]),
    (AppId::Books, &["books", "ibooks", "audiobook"]),
    (AppId::Music, &["apple music", "music"]),
    (AppId::Wallet, &["wallet", "apple pay"]),
    (AppId::Messages, &["imessage", "sms", "text message", "message", "text"]),
    (AppId::Phone, &["phone call", "call", "dial", "ring"]),
];

struct Patterns {
    from_to: Regex,
    to_from: Regex,
    x_to_y: Regex,
    phone: Regex,
    email: Regex,
    iso_date: Regex,
    lat_lng: Regex,
    decimal: Regex,
    mail_to: Regex,
    subject: Regex,
    body: Regex,
    spotify: Regex,
    things: Regex,
    text: Regex,
    message: Regex,
    pickup: Regex,
    dropoff: Regex,
    transport: Vec<(Regex, &'static str)>,
    hints: Vec<(AppId, Regex)>,
}

fn phrase_regex(phrases: &[&str]) -> Regex {
    let alternatives: Vec<String> = phrases.iter().map(|p| regex::escape(p)).collect();
    Regex::new(&format!(r"(?i)\b(?:{})\b", alternatives.join("|"))).expect("valid phrase regex")
}

fn patterns() -> &'static Patterns {
    static PATTERNS: OnceLock<Patterns> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        let re = |p: &str| Regex::new(p).expect("valid slot regex");
        Patterns {
            from_to: re(r"(?i)\bfrom\s+(?P<src>.+?)\s+(?:to|->)\s+(?P<dst>.+)$"),
            to_from: re(r"(?i)\bto\s+(?P<dst>.+?)\s+(?:from|<-)\s+(?P<src>.+)$"),
            x_to_y: re(r"(?i)\b(?P<src>[^,]+?)\s+(?:to|->)\s+(?P<dst>[^,]+)$"),
            phone: re(r"(\+?\d[\d\s\-().]{6,}\d)"),
            email: re(r"([A-Za-z0-9._%+\-]+@[A-Za-z0-9.\-]+\.[A-Za-z]{2,})"),
            iso_date: re(r"\b(20\d{2}-\d{2}-\d{2})\b"),
            lat_lng: re(r"\b(-?\d{1,3}\.\d+)\s*,\s*(-?\d{1,3}\.\d+)\b"),
            decimal: re(r"^-?\d+\.\d+$"),
            mail_to: re(r"(?i)(?:email|e-mail|mailto)\s+(?:to\s+)?(?P<to>[^\s,;]+@[^\s,;]+)"),
            subject: re(r"(?i)subject\s*[:=]\s*(?P<sub>.+?)(?:\s+body\s*[:=]|$)"),
            body: re(r"(?i)body\s*[:=]\s*(?P<body>.+)$"),
            spotify: re(r"(?i)spotify\s+(?:search\s+)?(?:for\s+)?(?P<q>.+)$"),
            things: re(r"(?i)\b(?:things|todo|to-do|task)\s+(?:add\s+)?(?P<title>[^|]+)"),
            text: re(r"(?i)\btext\s*[:=]\s*(?P<txt>.+)$"),
            message: re(r"(?i)\bmessage\s*[:=]\s*(?P<msg>.+)$"),
            pickup: re(r"(?i)pickup\s*[:=]\s*(?P<lat>-?\d{1,3}\.\d+)\s*,\s*(?P<lng>-?\d{1,3}\.\d+)"),
            dropoff: re(r"(?i)dropoff\s*[:=]\s*(?P<lat>-?\d{1,3}\.\d+)\s*,\s*(?P<lng>-?\d{1,3}\.\d+)"),
            transport: TRANSPORT_SYNONYMS
                .iter()
                .map(|(phrase, code)| (phrase_regex(&[*phrase]), *code))
                .collect(),
            hints: APP_HINTS
                .iter()
                .map(|(app, words)| (*app, phrase_regex(words)))
                .collect(),
        }
    })
}

/// Trim whitespace, quotes and trailing punctuation from a captured slot
fn clean(s: &str) -> String {
    s.trim()
        .trim_matches(|c: char| c == '\'' || c == '"')
        .trim()
        .trim_end_matches(|c: char| " .,!?:;".contains(c))
        .to_string()
}

/// Map a transport phrase to its Maps code
///
/// Accepts the code itself, an exact synonym, or text containing a synonym.
pub fn transport_code(text: &str) -> Option<&'static str> {
    let low = text.trim().to_lowercase();
    if let Some(code) = ["d", "w", "r", "c"].into_iter().find(|c| *c == low) {
        return Some(code);
    }
    patterns()
        .transport
        .iter()
        .find(|(re, _)| re.is_match(&low))
        .map(|(_, code)| *code)
}

/// Keyword-based guess at the target app
pub fn detect_preferred_app(instruction: &str) -> Option<AppId> {
    patterns()
        .hints
        .iter()
        .find(|(_, re)| re.is_match(instruction))
        .map(|(app, _)| *app)
}

/// Route and transport slots from an explicit "from X to Y" / "to Y from X"
pub fn extract_slots(instruction: &str) -> Params {
    let text = instruction.trim();
    let p = patterns();
    let mut slots = Params::new();

    if let Some(code) = transport_code(text) {
        slots.insert("transport".into(), code.into());
    }

    for re in [&p.from_to, &p.to_from] {
        if let Some(caps) = re.captures(text) {
            slots.insert("source".into(), clean(&caps["src"]));
            slots.insert("destination".into(), clean(&caps["dst"]));
            break;
        }
    }
    slots
}

/// Loose guesses shown to the model but never used as parameter values
///
/// A bare "X to Y" becomes a candidate route; anything without a route is
/// offered whole as a candidate `query`.
pub fn extract_hints(instruction: &str) -> Params {
    let text = instruction.trim();
    let p = patterns();
    let mut hints = Params::new();

    if p.from_to.is_match(text) || p.to_from.is_match(text) {
        return hints;
    }
    if let Some(caps) = p.x_to_y.captures(text) {
        hints.insert("source".into(), clean(&caps["src"]));
        hints.insert("destination".into(), clean(&caps["dst"]));
    } else {
        hints.insert("query".into(), clean(text));
    }
    hints
}

/// First phone-like run that is not part of a date or a coordinate
fn find_phone(instruction: &str) -> Option<String> {
    let p = patterns();
    let taken: Vec<(usize, usize)> = p
        .iso_date
        .find_iter(instruction)
        .chain(p.lat_lng.find_iter(instruction))
        .map(|m| (m.start(), m.end()))
        .collect();

    p.phone
        .find_iter(instruction)
        .filter(|m| !taken.iter().any(|(start, end)| m.start() < *end && *start < m.end()))
        .map(|m| m.as_str().trim().to_string())
        .find(|candidate| !p.decimal.is_match(candidate))
}

/// App-specific slots: contacts, mail fields, dates, coordinates, titles
pub fn extract_extra_slots(instruction: &str) -> Params {
    let p = patterns();
    let low = instruction.to_lowercase();
    let mut slots = Params::new();
    let mut put = |key: &str, value: &str| {
        let value = clean(value);
        if !value.is_empty() {
            slots.insert(key.to_string(), value);
        }
    };

    let phone = find_phone(instruction);
    let email = p.email.captures(instruction).map(|c| c[1].to_string());

    if let Some(contact) = phone.as_deref().or(email.as_deref()) {
        put("contact", contact);
    }
    if let Some(number) = phone.as_deref() {
        put("phone", number);
    }

    if let Some(caps) = p.mail_to.captures(instruction) {
        put("recipient", &caps["to"]);
    } else if let Some(address) = email.as_deref() {
        put("recipient", address);
    }
    if let Some(caps) = p.subject.captures(instruction) {
        put("subject", &caps["sub"]);
    }
    if let Some(caps) = p.body.captures(instruction) {
        put("body", &caps["body"]);
    }

    if low.contains("settings") || low.contains("wifi") || low.contains("bluetooth") || low.contains("cellular") {
        if low.contains("wifi") || low.contains("wi-fi") {
            put("root", "WIFI");
        } else if low.contains("bluetooth") {
            put("root", "Bluetooth");
        } else if low.contains("cellular") {
            put("root", "MOBILE_DATA_SETTINGS_ID");
        }
    }

    if let Some(caps) = p.iso_date.captures(&low) {
        put("date", &caps[1]);
    }

    if let Some(caps) = p.pickup.captures(instruction) {
        put("pickup_lat", &caps["lat"]);
        put("pickup_lng", &caps["lng"]);
    }
    if let Some(caps) = p.dropoff.captures(instruction) {
        put("dropoff_lat", &caps["lat"]);
        put("dropoff_lng", &caps["lng"]);
    }
    if !low.contains("pickup") {
        if let Some(caps) = p.lat_lng.captures(instruction) {
            put("center_lat", &caps[1]);
            put("center_lng", &caps[2]);
        }
    }

    if let Some(caps) = p.spotify.captures(instruction) {
        put("query", &caps["q"]);
    }

    if let Some(caps) = p.things.captures(instruction) {
        put("title", &caps["title"]);
    }

    if let Some(caps) = p.text.captures(instruction) {
        put("text", &caps["txt"]);
        put("message", &caps["txt"]);
    }
    if let Some(caps) = p.message.captures(instruction) {
        put("message", &caps["msg"]);
    }

    slots
}

/// Everything known about the instruction before the model is consulted
#[derive(Debug, Clone)]
pub struct InstructionContext {
    /// The instruction as typed
    pub instruction: String,
    /// Route and transport taken from explicit phrasing
    pub detected: Params,
    /// Candidate route or query for the prompt only
    pub hints: Params,
    /// App-specific extras
    pub extra: Params,
    /// Keyword guess at the target app
    pub preferred_app: Option<AppId>,
}

impl InstructionContext {
    pub fn from_instruction(instruction: &str) -> Self {
        Self {
            instruction: instruction.trim().to_string(),
            detected: extract_slots(instruction),
            hints: extract_hints(instruction),
            extra: extract_extra_slots(instruction),
            preferred_app: detect_preferred_app(instruction),
        }
    }

    /// Detected slots with extras layered on top
    pub fn merged_slots(&self) -> Params {
        let mut merged = self.detected.clone();
        merged.extend(self.extra.clone());
        merged
    }

    /// Slot map as sent to the model, including hints and the app guess
    pub fn to_prompt_json(&self) -> Value {
        let mut prompt = self.hints.clone();
        prompt.extend(self.merged_slots());
        let mut slots = json!(prompt);
        if let Some(app) = self.preferred_app {
            slots["_preferred_app"] = json!(app.name());
        }
        slots
    }

    /// One-line summary for logs
    pub fn summary(&self) -> String {
        let hint = self
            .preferred_app
            .map(|a| a.name().to_string())
            .unwrap_or_else(|| "none".into());
        let slots: Vec<String> = self
            .merged_slots()
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect();
        format!("hint: {}; slots: {}", hint, slots.join(", "))
    }
}
