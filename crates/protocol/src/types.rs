//! Core types exchanged with driver backends.

use serde::{Deserialize, Serialize};

/// Browser engine targeted by a session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BrowserKind {
    /// Chromium-based browser (Chrome)
    #[default]
    Chrome,
    /// Mozilla Firefox
    Firefox,
    /// Chromium-based Microsoft Edge
    Edge,
}

impl BrowserKind {
    /// Parses a configured browser name.
    ///
    /// Returns `None` for anything outside the supported set, leaving
    /// the caller to decide how an unsupported browser is reported.
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "chrome" | "chromium" => Some(BrowserKind::Chrome),
            "firefox" => Some(BrowserKind::Firefox),
            "edge" => Some(BrowserKind::Edge),
            _ => None,
        }
    }
}

impl std::fmt::Display for BrowserKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BrowserKind::Chrome => write!(f, "chrome"),
            BrowserKind::Firefox => write!(f, "firefox"),
            BrowserKind::Edge => write!(f, "edge"),
        }
    }
}

/// Where a session runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionMode {
    /// Local driver process on this machine.
    #[default]
    Local,
    /// Remote grid endpoint.
    Remote,
}

impl std::fmt::Display for SessionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionMode::Local => write!(f, "local"),
            SessionMode::Remote => write!(f, "remote"),
        }
    }
}

/// Timeout values applied to a freshly opened session.
///
/// All values are in seconds, matching how acceptance-test
/// configuration files conventionally express them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Timeouts {
    /// Implicit element-lookup wait.
    pub implicit_wait_secs: u64,
    /// Explicit condition wait ceiling.
    pub explicit_wait_secs: u64,
    /// Page-load timeout.
    pub page_load_secs: u64,
    /// Script execution timeout.
    pub script_secs: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            implicit_wait_secs: 10,
            explicit_wait_secs: 20,
            page_load_secs: 30,
            script_secs: 15,
        }
    }
}

/// Fully resolved request for opening a driver session.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenRequest {
    /// Browser engine to launch or connect to.
    pub browser: BrowserKind,
    /// Whether the browser runs headless.
    pub headless: bool,
    /// Local launch vs. remote grid attach.
    pub mode: SessionMode,
    /// Grid endpoint for remote sessions.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grid_url: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_accepts_supported_browsers() {
        assert_eq!(BrowserKind::parse("chrome"), Some(BrowserKind::Chrome));
        assert_eq!(BrowserKind::parse("Chromium"), Some(BrowserKind::Chrome));
        assert_eq!(BrowserKind::parse(" firefox "), Some(BrowserKind::Firefox));
        assert_eq!(BrowserKind::parse("EDGE"), Some(BrowserKind::Edge));
    }

    #[test]
    fn parse_rejects_unsupported_browsers() {
        assert_eq!(BrowserKind::parse("safari"), None);
        assert_eq!(BrowserKind::parse(""), None);
        assert_eq!(BrowserKind::parse("opera"), None);
    }

    #[test]
    fn display_round_trips_through_parse() {
        for kind in [BrowserKind::Chrome, BrowserKind::Firefox, BrowserKind::Edge] {
            assert_eq!(BrowserKind::parse(&kind.to_string()), Some(kind));
        }
    }
}
