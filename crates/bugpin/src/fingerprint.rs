//! Browser, OS and device identity derived from the user-agent string,
//! plus the per-agent session identifier.
//!
//! Detection is table-driven and order-sensitive: rules are evaluated
//! top to bottom and the first match wins. Several user-agent tokens
//! overlap (Edge and Opera UAs contain `Chrome/`, every WebKit UA
//! contains `Safari/`, iPad UAs contain `like Mac OS X`), so the rule
//! order below is load-bearing.

use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

use crate::host::Host;

const UNKNOWN: &str = "Unknown";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceClass {
    Desktop,
    Tablet,
    Mobile,
}

/// A derived, read-only description of the current environment.
/// Recomputed on demand; never cached across calls.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnvironmentSnapshot {
    pub url: String,
    pub title: String,
    pub user_agent: String,
    pub browser_name: String,
    pub browser_version: String,
    pub os_name: String,
    pub os_version: String,
    pub device: DeviceClass,
    pub screen_width: u32,
    pub screen_height: u32,
    pub viewport_width: u32,
    pub viewport_height: u32,
    pub locale: String,
    pub timezone: String,
    pub cookies_enabled: bool,
    pub do_not_track: bool,
}

impl EnvironmentSnapshot {
    pub fn capture(host: &dyn Host) -> Self {
        let nav = host.navigation();
        let ua = host.user_agent();
        let screen = host.screen();
        let (browser_name, browser_version) = detect_browser(&ua);
        let (os_name, os_version) = detect_os(&ua);
        Self {
            url: nav.url,
            title: nav.title,
            browser_name,
            browser_version,
            os_name,
            os_version,
            device: detect_device(&ua),
            user_agent: ua,
            screen_width: screen.screen_width,
            screen_height: screen.screen_height,
            viewport_width: screen.viewport_width,
            viewport_height: screen.viewport_height,
            locale: host.locale(),
            timezone: host.timezone(),
            cookies_enabled: host.cookies_enabled(),
            do_not_track: host.do_not_track(),
        }
    }
}

struct BrowserRule {
    name: &'static str,
    /// Token whose presence selects this rule.
    token: &'static str,
    /// Token the version number follows.
    version_token: &'static str,
}

// Edge, Opera and Samsung Internet UAs all contain `Chrome/`, and every
// WebKit UA contains `Safari/`, so Chrome must come after the three
// Chromium skins and Safari must come last.
const BROWSER_RULES: &[BrowserRule] = &[
    BrowserRule { name: "Edge", token: "Edg/", version_token: "Edg/" },
    BrowserRule { name: "Opera", token: "OPR/", version_token: "OPR/" },
    BrowserRule {
        name: "Samsung Internet",
        token: "SamsungBrowser/",
        version_token: "SamsungBrowser/",
    },
    BrowserRule { name: "Firefox", token: "Firefox/", version_token: "Firefox/" },
    BrowserRule { name: "Internet Explorer", token: "Trident/", version_token: "rv:" },
    BrowserRule { name: "Chrome", token: "Chrome/", version_token: "Chrome/" },
    BrowserRule { name: "Safari", token: "Safari/", version_token: "Version/" },
];

/// First-match-wins browser detection. Unmatched input yields
/// `("Unknown", "Unknown")`.
pub fn detect_browser(ua: &str) -> (String, String) {
    for rule in BROWSER_RULES {
        if ua.contains(rule.token) {
            let version = version_after(ua, rule.version_token, '.');
            return (rule.name.to_string(), version);
        }
    }
    (UNKNOWN.to_string(), UNKNOWN.to_string())
}

struct OsRule {
    name: &'static str,
    token: &'static str,
    version_token: &'static str,
    /// Separator used inside the version number in the UA string.
    raw_separator: char,
}

// iPad UAs contain `like Mac OS X`, Android UAs contain `Linux`, so iOS
// precedes macOS and Android precedes Linux.
const OS_RULES: &[OsRule] = &[
    OsRule { name: "Windows", token: "Windows NT ", version_token: "Windows NT ", raw_separator: '.' },
    OsRule { name: "iOS", token: "iPhone OS ", version_token: "iPhone OS ", raw_separator: '_' },
    OsRule { name: "iOS", token: "CPU OS ", version_token: "CPU OS ", raw_separator: '_' },
    OsRule { name: "Android", token: "Android ", version_token: "Android ", raw_separator: '.' },
    OsRule { name: "macOS", token: "Mac OS X ", version_token: "Mac OS X ", raw_separator: '_' },
    OsRule { name: "Linux", token: "Linux", version_token: "", raw_separator: '.' },
];

/// First-match-wins OS detection with Windows marketing-name mapping.
pub fn detect_os(ua: &str) -> (String, String) {
    for rule in OS_RULES {
        if ua.contains(rule.token) {
            let version = if rule.version_token.is_empty() {
                UNKNOWN.to_string()
            } else {
                version_after(ua, rule.version_token, rule.raw_separator)
            };
            let version = if rule.name == "Windows" {
                windows_marketing_version(&version)
            } else {
                version
            };
            return (rule.name.to_string(), version);
        }
    }
    (UNKNOWN.to_string(), UNKNOWN.to_string())
}

/// Device classification. Tablet tokens are checked before mobile
/// tokens: tablets usually also match the mobile substrings.
pub fn detect_device(ua: &str) -> DeviceClass {
    let is_android = ua.contains("Android");
    if ua.contains("iPad") || ua.contains("Tablet") || (is_android && !ua.contains("Mobile")) {
        return DeviceClass::Tablet;
    }
    if ua.contains("Mobi") || ua.contains("iPhone") || is_android {
        return DeviceClass::Mobile;
    }
    DeviceClass::Desktop
}

fn version_after(ua: &str, token: &str, raw_separator: char) -> String {
    let Some(pos) = ua.find(token) else {
        return UNKNOWN.to_string();
    };
    let rest = &ua[pos + token.len()..];
    let raw: String = rest
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == raw_separator)
        .collect();
    if raw.is_empty() {
        UNKNOWN.to_string()
    } else {
        raw.replace(raw_separator, ".")
    }
}

fn windows_marketing_version(nt: &str) -> String {
    match nt {
        "10.0" => "10".to_string(),
        "6.3" => "8.1".to_string(),
        "6.2" => "8".to_string(),
        "6.1" => "7".to_string(),
        other => other.to_string(),
    }
}

/// Session identifier, generated once per agent lifetime and stable for
/// its duration.
#[derive(Debug, Default)]
pub struct SessionId {
    id: OnceLock<String>,
}

impl SessionId {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> &str {
        self.id
            .get_or_init(|| uuid::Uuid::new_v4().to_string())
    }
}
