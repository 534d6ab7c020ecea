//! Deep link builders, one per supported app
//!
//! Each handler turns resolved parameters into the URL that opens the app.
//! Handlers are pure: identical parameters always give the identical link.

use crate::core::error::{Result, RunnerError};
use crate::core::types::{AppId, Params};
use chrono::{NaiveDate, TimeZone};

/// Builds the deep link for one app
pub type Handler = fn(&Params) -> Result<String>;

/// Seconds between the Unix epoch and Apple's reference date (2001-01-01 UTC)
const APPLE_EPOCH_OFFSET: i64 = 978_307_200;

/// Registry lookup: exactly one handler per app
pub fn handler_for(app: AppId) -> Handler {
    match app {
        AppId::Maps => apple_maps,
        AppId::GoogleMaps => google_maps,
        AppId::FaceTime => facetime,
        AppId::Mail => mail,
        AppId::Settings => settings,
        AppId::Calendar => calendar,
        AppId::Spotify => spotify,
        AppId::Things => things,
        AppId::WhatsApp => whatsapp,
        AppId::Uber => uber,
        AppId::Phone => phone,
        AppId::Messages => messages,
        AppId::Shortcuts => shortcuts,
        AppId::Notes => notes,
        AppId::Reminders => reminders,
        AppId::Photos => photos,
        AppId::Books => books,
        AppId::Podcasts => podcasts,
        AppId::Music => music,
        AppId::Wallet => wallet,
        AppId::FindMy => find_my,
        AppId::AppStore => app_store,
    }
}

fn required<'a>(params: &'a Params, key: &str) -> Result<&'a str> {
    optional(params, key)
        .ok_or_else(|| RunnerError::Classification(format!("Missing required parameter '{}'", key)))
}

fn optional<'a>(params: &'a Params, key: &str) -> Option<&'a str> {
    params
        .get(key)
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
}

/// Percent-encode for a URL path: unreserved characters and `/` stay as-is
pub fn encode_path(value: &str) -> String {
    encode(value, "/", false)
}

/// Form-encode a query value; spaces become `+`, characters in `safe` stay as-is
pub fn encode_form(value: &str, safe: &str) -> String {
    encode(value, safe, true)
}

fn encode(value: &str, safe: &str, plus_for_space: bool) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        if ch.is_ascii_alphanumeric() || "-._~".contains(ch) || safe.contains(ch) {
            out.push(ch);
        } else if ch == ' ' && plus_for_space {
            out.push('+');
        } else {
            let mut buf = [0u8; 4];
            for byte in ch.encode_utf8(&mut buf).bytes() {
                out.push_str(&format!("%{:02X}", byte));
            }
        }
    }
    out
}

fn query_string(pairs: &[(&str, &str)], safe: &str) -> String {
    pairs
        .iter()
        .map(|(k, v)| format!("{}={}", encode_form(k, safe), encode_form(v, safe)))
        .collect::<Vec<_>>()
        .join("&")
}

fn apple_maps(params: &Params) -> Result<String> {
    let destination = required(params, "destination")?;
    let transport = optional(params, "transport").unwrap_or("d");

    let mut link = String::from("maps://?");
    if let Some(source) = optional(params, "source") {
        link.push_str(&format!("saddr={}&", encode_path(source)));
    }
    link.push_str(&format!(
        "daddr={}&dirflg={}",
        encode_path(destination),
        encode_path(transport)
    ));
    Ok(link)
}

fn google_maps(params: &Params) -> Result<String> {
    let mut pairs: Vec<(&str, String)> = Vec::new();
    if let Some(q) = optional(params, "query") {
        pairs.push(("q", q.to_string()));
    }
    if let (Some(lat), Some(lng)) = (optional(params, "center_lat"), optional(params, "center_lng")) {
        pairs.push(("center", format!("{},{}", lat, lng)));
    }
    pairs.push(("mapmode", "streetview".to_string()));

    let borrowed: Vec<(&str, &str)> = pairs.iter().map(|(k, v)| (*k, v.as_str())).collect();
    Ok(format!("comgooglemaps://?{}", query_string(&borrowed, ",:")))
}

fn facetime(params: &Params) -> Result<String> {
    Ok(format!("facetime://{}", encode_path(required(params, "contact")?)))
}

fn mail(params: &Params) -> Result<String> {
    let recipient = required(params, "recipient")?;
    let pairs: Vec<(&str, &str)> = ["cc", "bcc", "subject", "body"]
        .iter()
        .filter_map(|&k| optional(params, k).map(|v| (k, v)))
        .collect();

    if pairs.is_empty() {
        Ok(format!("mailto:{}", encode_path(recipient)))
    } else {
        Ok(format!(
            "mailto:{}?{}",
            encode_path(recipient),
            query_string(&pairs, ":/(),")
        ))
    }
}

fn settings(params: &Params) -> Result<String> {
    let root = optional(params, "root").unwrap_or("WIFI");
    match optional(params, "path") {
        Some(path) => Ok(format!(
            "App-Prefs:root={}&path={}",
            encode_path(root),
            encode_path(path)
        )),
        None => Ok(format!("App-Prefs:root={}", encode_path(root))),
    }
}

fn calendar(params: &Params) -> Result<String> {
    Ok(calendar_link(optional(params, "date"), &chrono::Local))
}

/// Calendar link for local noon of `date` in `tz`.
///
/// Noon keeps DST shifts from rolling the view onto a neighbouring day.
/// Falls back to just opening the app when the date is absent or invalid.
pub fn calendar_link<Tz: TimeZone>(date: Option<&str>, tz: &Tz) -> String {
    let seconds = date
        .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok())
        .and_then(|d| d.and_hms_opt(12, 0, 0))
        .and_then(|noon| tz.from_local_datetime(&noon).earliest())
        .map(|dt| dt.timestamp() - APPLE_EPOCH_OFFSET);

    match seconds {
        Some(s) => format!("calshow:{}", s),
        None => "calshow://".into(),
    }
}

fn spotify(params: &Params) -> Result<String> {
    Ok(format!("spotify:search:{}", encode_path(required(params, "query")?)))
}

fn things(params: &Params) -> Result<String> {
    let mut pairs = vec![("title", required(params, "title")?)];
    for key in ["notes", "when", "deadline", "tags", "list"] {
        if let Some(v) = optional(params, key) {
            pairs.push((key, v));
        }
    }
    Ok(format!("things:///add?{}", query_string(&pairs, ":,/")))
}

fn whatsapp(params: &Params) -> Result<String> {
    let mut pairs = vec![("phone", required(params, "phone")?)];
    if let Some(text) = optional(params, "text") {
        pairs.push(("text", text));
    }
    Ok(format!("whatsapp://send?{}", query_string(&pairs, "+,")))
}

fn uber(params: &Params) -> Result<String> {
    let mut pairs = vec![
        ("action", "setPickup"),
        ("pickup[latitude]", required(params, "pickup_lat")?),
        ("pickup[longitude]", required(params, "pickup_lng")?),
    ];
    if let Some(nick) = optional(params, "pickup_nickname") {
        pairs.push(("pickup[nickname]", nick));
    }
    if let (Some(lat), Some(lng)) = (optional(params, "dropoff_lat"), optional(params, "dropoff_lng")) {
        pairs.push(("dropoff[latitude]", lat));
        pairs.push(("dropoff[longitude]", lng));
    }
    if let Some(nick) = optional(params, "dropoff_nickname") {
        pairs.push(("dropoff[nickname]", nick));
    }
    if let Some(product) = optional(params, "product_id") {
        pairs.push(("product_id", product));
    }
    Ok(format!("uber://?{}", query_string(&pairs, "[]:,")))
}

fn phone(params: &Params) -> Result<String> {
    Ok(format!("tel:{}", encode_path(required(params, "contact")?)))
}

fn messages(params: &Params) -> Result<String> {
    let phone = encode_path(required(params, "phone")?);
    match optional(params, "message") {
        Some(body) => Ok(format!("sms:{}&body={}", phone, encode_path(body))),
        None => Ok(format!("sms:{}", phone)),
    }
}

fn shortcuts(params: &Params) -> Result<String> {
    match optional(params, "name") {
        Some(name) => Ok(format!("shortcuts://run-shortcut?name={}", encode_path(name))),
        None => Ok("shortcuts://".into()),
    }
}

fn notes(_: &Params) -> Result<String> {
    Ok("mobilenotes://".into())
}

fn reminders(_: &Params) -> Result<String> {
    Ok("x-apple-reminderkit://".into())
}

fn photos(_: &Params) -> Result<String> {
    Ok("photos-redirect://".into())
}

fn books(_: &Params) -> Result<String> {
    Ok("ibooks://".into())
}

fn wallet(_: &Params) -> Result<String> {
    Ok("shoebox://".into())
}

fn podcasts(params: &Params) -> Result<String> {
    match optional(params, "feed") {
        Some(feed) => Ok(format!("podcast://{}", encode_path(feed))),
        None => Ok("podcast://".into()),
    }
}

fn music(params: &Params) -> Result<String> {
    match optional(params, "query") {
        Some(q) => Ok(format!("music://search?term={}", encode_form(q, ""))),
        None => Ok("music://".into()),
    }
}

fn find_my(params: &Params) -> Result<String> {
    match optional(params, "tab") {
        Some(tab) => Ok(format!("findmy://{}", encode_path(tab))),
        None => Ok("findmy://".into()),
    }
}

fn app_store(params: &Params) -> Result<String> {
    const PASSTHROUGH: [&str; 3] = ["itms-apps://", "itms://", "https://apps.apple.com"];

    if let Some(url) = optional(params, "url") {
        if PASSTHROUGH.iter().any(|p| url.starts_with(p)) {
            return Ok(url.to_string());
        }
        tracing::warn!("Ignoring non App Store url '{}'", url);
    }
    match optional(params, "query") {
        Some(q) => Ok(format!(
            "itms-apps://search.itunes.apple.com/WebObjects/MZSearch.woa/wa/search?media=software&term={}",
            encode_form(q, "")
        )),
        None => Ok("itms-apps://".into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn params(pairs: &[(&str, &str)]) -> Params {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn link(app: AppId, pairs: &[(&str, &str)]) -> String {
        handler_for(app)(&params(pairs)).unwrap()
    }

    #[test]
    fn test_encode_path_keeps_unreserved() {
        assert_eq!(encode_path("San Francisco"), "San%20Francisco");
        assert_eq!(encode_path("a/b-c_d.e~f"), "a/b-c_d.e~f");
        assert_eq!(encode_path("+14085551234"), "%2B14085551234");
        assert_eq!(encode_path("café"), "caf%C3%A9");
    }

    #[test]
    fn test_encode_form_uses_plus_and_safe_set() {
        assert_eq!(encode_form("hello world", ""), "hello+world");
        assert_eq!(encode_form("a,b&c", ","), "a,b%26c");
    }

    #[test]
    fn test_phone_call() {
        assert_eq!(link(AppId::Phone, &[("contact", "Alice")]), "tel:Alice");
    }

    #[test]
    fn test_maps_directions() {
        let url = link(
            AppId::Maps,
            &[
                ("source", "San Francisco"),
                ("destination", "Los Angeles"),
                ("transport", "d"),
            ],
        );
        assert_eq!(url, "maps://?saddr=San%20Francisco&daddr=Los%20Angeles&dirflg=d");
    }

    #[test]
    fn test_maps_without_source_defaults_to_driving() {
        let url = link(AppId::Maps, &[("destination", "Golden Gate Bridge")]);
        assert_eq!(url, "maps://?daddr=Golden%20Gate%20Bridge&dirflg=d");
    }

    #[test]
    fn test_missing_required_is_classification_error() {
        let err = handler_for(AppId::Spotify)(&Params::new()).unwrap_err();
        assert!(matches!(err, RunnerError::Classification(_)));
    }

    #[test]
    fn test_mail_with_fields_in_fixed_order() {
        let url = link(
            AppId::Mail,
            &[
                ("recipient", "bob@example.com"),
                ("subject", "Lunch"),
                ("body", "Noon at the usual place"),
            ],
        );
        assert_eq!(
            url,
            "mailto:bob%40example.com?subject=Lunch&body=Noon+at+the+usual+place"
        );
        assert_eq!(link(AppId::Mail, &[("recipient", "a@b.co")]), "mailto:a%40b.co");
    }

    #[test]
    fn test_settings_defaults_to_wifi() {
        assert_eq!(link(AppId::Settings, &[]), "App-Prefs:root=WIFI");
        assert_eq!(
            link(AppId::Settings, &[("root", "Bluetooth"), ("path", "Devices")]),
            "App-Prefs:root=Bluetooth&path=Devices"
        );
    }

    #[test]
    fn test_calendar_link_uses_apple_epoch() {
        // 2001-01-02 12:00 UTC is 36 hours after the reference date
        assert_eq!(calendar_link(Some("2001-01-02"), &Utc), "calshow:129600");
        assert_eq!(calendar_link(Some("not a date"), &Utc), "calshow://");
        assert_eq!(calendar_link(None, &Utc), "calshow://");
    }

    #[test]
    fn test_spotify_search() {
        assert_eq!(
            link(AppId::Spotify, &[("query", "The Beatles")]),
            "spotify:search:The%20Beatles"
        );
    }

    #[test]
    fn test_things_add() {
        let url = link(AppId::Things, &[("title", "Buy milk"), ("when", "today")]);
        assert_eq!(url, "things:///add?title=Buy+milk&when=today");
    }

    #[test]
    fn test_whatsapp_keeps_plus() {
        let url = link(AppId::WhatsApp, &[("phone", "+14085551234"), ("text", "hi there")]);
        assert_eq!(url, "whatsapp://send?phone=+14085551234&text=hi+there");
    }

    #[test]
    fn test_uber_pickup_and_dropoff() {
        let url = link(
            AppId::Uber,
            &[
                ("pickup_lat", "37.77"),
                ("pickup_lng", "-122.41"),
                ("dropoff_lat", "37.80"),
                ("dropoff_lng", "-122.27"),
            ],
        );
        assert_eq!(
            url,
            "uber://?action=setPickup&pickup[latitude]=37.77&pickup[longitude]=-122.41\
             &dropoff[latitude]=37.80&dropoff[longitude]=-122.27"
        );
    }

    #[test]
    fn test_uber_ignores_half_dropoff() {
        let url = link(
            AppId::Uber,
            &[("pickup_lat", "1.0"), ("pickup_lng", "2.0"), ("dropoff_lat", "3.0")],
        );
        assert!(!url.contains("dropoff"));
    }

    #[test]
    fn test_messages_with_body() {
        assert_eq!(
            link(AppId::Messages, &[("phone", "5551234"), ("message", "on my way")]),
            "sms:5551234&body=on%20my%20way"
        );
        assert_eq!(link(AppId::Messages, &[("phone", "5551234")]), "sms:5551234");
    }

    #[test]
    fn test_parameterless_apps() {
        assert_eq!(link(AppId::Notes, &[]), "mobilenotes://");
        assert_eq!(link(AppId::Reminders, &[]), "x-apple-reminderkit://");
        assert_eq!(link(AppId::Photos, &[]), "photos-redirect://");
        assert_eq!(link(AppId::Books, &[]), "ibooks://");
        assert_eq!(link(AppId::Wallet, &[]), "shoebox://");
        assert_eq!(link(AppId::Shortcuts, &[]), "shortcuts://");
        assert_eq!(link(AppId::Podcasts, &[]), "podcast://");
        assert_eq!(link(AppId::Music, &[]), "music://");
        assert_eq!(link(AppId::FindMy, &[]), "findmy://");
    }

    #[test]
    fn test_find_my_tab_and_shortcut_name() {
        assert_eq!(link(AppId::FindMy, &[("tab", "devices")]), "findmy://devices");
        assert_eq!(
            link(AppId::Shortcuts, &[("name", "Morning Routine")]),
            "shortcuts://run-shortcut?name=Morning%20Routine"
        );
    }

    #[test]
    fn test_app_store_passthrough_and_search() {
        let direct = "itms-apps://itunes.apple.com/app/id123456789";
        assert_eq!(link(AppId::AppStore, &[("url", direct)]), direct);
        assert_eq!(
            link(AppId::AppStore, &[("url", "javascript:alert(1)"), ("query", "chess")]),
            "itms-apps://search.itunes.apple.com/WebObjects/MZSearch.woa/wa/search?media=software&term=chess"
        );
    }

    #[test]
    fn test_google_maps_streetview() {
        let url = link(
            AppId::GoogleMaps,
            &[("center_lat", "46.414382"), ("center_lng", "10.013988")],
        );
        assert_eq!(url, "comgooglemaps://?center=46.414382,10.013988&mapmode=streetview");
    }
}
