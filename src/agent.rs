//! Heuristic user-agent classification.
//!
//! Signature matching against known client-string patterns. Unknown agents
//! classify to empty strings and false flags; classification never fails.

use once_cell::sync::Lazy;
use regex::Regex;

/// Derived client fields for one raw user-agent string.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AgentInfo {
    pub browser: String,
    pub browser_version: String,
    pub platform: String,
    pub os: String,
    pub engine: String,
    pub engine_version: String,
    pub mobile: bool,
    pub bot: bool,
}

static NAMED_BOT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(Googlebot|bingbot|YandexBot|Baiduspider|DuckDuckBot|Slurp|Twitterbot|Applebot|AhrefsBot|SemrushBot|facebookexternalhit)(?:[/ ]v?([\d.]+))?",
    )
    .unwrap()
});

static GENERIC_BOT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)bot|crawl|spider|slurp|archiver|fetcher|monitor(?:ing)?\b").unwrap()
});

static BROWSERS: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    // Order matters: Chrome claims to be Safari, Edge and Opera claim to be
    // Chrome, so the more specific tokens are matched first.
    vec![
        (Regex::new(r"Edge?/([\d.]+)").unwrap(), "Edge"),
        (Regex::new(r"(?:OPR|Opera)/([\d.]+)").unwrap(), "Opera"),
        (Regex::new(r"(?:Chrome|CriOS)/([\d.]+)").unwrap(), "Chrome"),
        (Regex::new(r"(?:Firefox|FxiOS)/([\d.]+)").unwrap(), "Firefox"),
        (Regex::new(r"Version/([\d.]+).*Safari/").unwrap(), "Safari"),
        (Regex::new(r"MSIE ([\d.]+)").unwrap(), "Internet Explorer"),
        (
            Regex::new(r"Trident/[\d.]+.*rv:([\d.]+)").unwrap(),
            "Internet Explorer",
        ),
    ]
});

static ENGINES: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    vec![
        (Regex::new(r"Trident/([\d.]+)").unwrap(), "Trident"),
        (Regex::new(r"AppleWebKit/([\d.]+)").unwrap(), "AppleWebKit"),
        (Regex::new(r"rv:([\d.]+).*Gecko/").unwrap(), "Gecko"),
        (Regex::new(r"Presto/([\d.]+)").unwrap(), "Presto"),
    ]
});

static OS_WINDOWS: Lazy<Regex> = Lazy::new(|| Regex::new(r"Windows NT ([\d.]+)").unwrap());
static OS_MAC: Lazy<Regex> = Lazy::new(|| Regex::new(r"Mac OS X ([\d_.]+)").unwrap());
static OS_ANDROID: Lazy<Regex> = Lazy::new(|| Regex::new(r"Android ([\d.]+)").unwrap());
static OS_IOS: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?:iPhone|CPU) OS ([\d_]+)").unwrap());

static MOBILE_HINT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"Mobile|Android|iPhone|iPad|iPod|Windows Phone|BlackBerry|Opera Mini").unwrap()
});

/// Classify one raw user-agent string.
pub fn classify(ua: &str) -> AgentInfo {
    let mut info = AgentInfo::default();
    if ua.is_empty() || ua == "-" {
        return info;
    }

    if let Some(caps) = NAMED_BOT.captures(ua) {
        info.bot = true;
        info.browser = caps.get(1).map(|m| m.as_str().to_string()).unwrap_or_default();
        info.browser_version = caps.get(2).map(|m| m.as_str().to_string()).unwrap_or_default();
        return info;
    }
    if GENERIC_BOT.is_match(ua) {
        info.bot = true;
        info.browser = "Bot".to_string();
        return info;
    }

    for (re, name) in BROWSERS.iter() {
        if let Some(caps) = re.captures(ua) {
            info.browser = (*name).to_string();
            info.browser_version = caps.get(1).map(|m| m.as_str().to_string()).unwrap_or_default();
            break;
        }
    }

    for (re, name) in ENGINES.iter() {
        if let Some(caps) = re.captures(ua) {
            info.engine = (*name).to_string();
            info.engine_version =
                caps.get(1).map(|m| m.as_str().to_string()).unwrap_or_default();
            break;
        }
    }

    info.platform = platform_of(ua);
    info.os = os_of(ua);
    info.mobile = MOBILE_HINT.is_match(ua);
    info
}

fn platform_of(ua: &str) -> String {
    for name in ["iPhone", "iPad", "iPod", "Android", "Windows", "Macintosh", "X11", "Linux"] {
        if ua.contains(name) {
            return name.to_string();
        }
    }
    String::new()
}

fn os_of(ua: &str) -> String {
    if let Some(caps) = OS_WINDOWS.captures(ua) {
        let name = match &caps[1] {
            "10.0" => "Windows 10",
            "6.3" => "Windows 8.1",
            "6.2" => "Windows 8",
            "6.1" => "Windows 7",
            "6.0" => "Windows Vista",
            "5.1" => "Windows XP",
            other => return format!("Windows NT {other}"),
        };
        return name.to_string();
    }
    if let Some(caps) = OS_IOS.captures(ua) {
        return format!("iOS {}", caps[1].replace('_', "."));
    }
    if let Some(caps) = OS_ANDROID.captures(ua) {
        return format!("Android {}", &caps[1]);
    }
    if let Some(caps) = OS_MAC.captures(ua) {
        return format!("Mac OS X {}", caps[1].replace('_', "."));
    }
    if ua.contains("Linux") {
        return "Linux".to_string();
    }
    String::new()
}
