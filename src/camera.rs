//! Camera rows and their probe state.

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// RTSP login. The password is wiped when the value is dropped.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
pub struct Credentials {
    pub user: Option<String>,
    pub password: Option<String>,
}

impl Credentials {
    pub fn new(user: Option<&str>, password: Option<&str>) -> Self {
        Self {
            user: user.map(str::to_string),
            password: password.map(str::to_string),
        }
    }

    pub fn anonymous() -> Self {
        Self::default()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .finish()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CameraStatus {
    New,
    Success,
    Failed,
}

impl CameraStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CameraStatus::New => "NEW",
            CameraStatus::Success => "SUCCESS",
            CameraStatus::Failed => "FAILED",
        }
    }
}

impl fmt::Display for CameraStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CameraStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "NEW" => Ok(CameraStatus::New),
            "SUCCESS" => Ok(CameraStatus::Success),
            "FAILED" => Ok(CameraStatus::Failed),
            other => Err(anyhow!("unknown camera status '{}'", other)),
        }
    }
}

/// Stream path selection for a camera.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PathSetting {
    /// Let the probe pick from the vendor's known paths.
    #[default]
    Auto,
    Fixed(String),
}

impl PathSetting {
    /// Blank input means `Auto`.
    pub fn from_input(input: &str) -> Self {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            PathSetting::Auto
        } else {
            PathSetting::Fixed(trimmed.to_string())
        }
    }

    pub fn fixed(&self) -> Option<&str> {
        match self {
            PathSetting::Auto => None,
            PathSetting::Fixed(path) => Some(path),
        }
    }
}

impl fmt::Display for PathSetting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathSetting::Auto => f.write_str("AUTO"),
            PathSetting::Fixed(path) => f.write_str(path),
        }
    }
}

/// One row of the camera table.
#[derive(Clone, Debug, PartialEq)]
pub struct Camera {
    pub id: u32,
    pub ip: String,
    pub port: u16,
    pub credentials: Credentials,
    pub vendor: String,
    pub path: PathSetting,
    pub status: CameraStatus,
    pub latency_ms: Option<f64>,
    pub url: String,
    /// Operator hint from the last RTSP error response.
    pub note: Option<String>,
}

impl Camera {
    pub fn is_previewable(&self) -> bool {
        self.status == CameraStatus::Success && !self.url.is_empty()
    }

    pub fn latency_display(&self) -> String {
        self.latency_ms
            .map(|ms| format!("{:.0} ms", ms))
            .unwrap_or_default()
    }

    /// The displayed columns: id, ip, vendor, path, status, latency, url.
    pub fn display_values(&self) -> [String; 7] {
        [
            self.id.to_string(),
            self.ip.clone(),
            self.vendor.clone(),
            self.path.to_string(),
            self.status.to_string(),
            self.latency_display(),
            self.url.clone(),
        ]
    }

    /// Text the free-form filter searches.
    pub(crate) fn search_text(&self) -> String {
        format!(
            "{} {} {} {} {}",
            self.ip, self.vendor, self.path, self.status, self.url
        )
        .to_lowercase()
    }
}

/// Last working stream settings for an ip, remembered across sessions.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DiscoveryEntry {
    pub vendor: String,
    pub path: String,
    pub credentials: Credentials,
    pub port: u16,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_parses_case_insensitively() -> Result<()> {
        assert_eq!("success".parse::<CameraStatus>()?, CameraStatus::Success);
        assert_eq!("FAILED".parse::<CameraStatus>()?, CameraStatus::Failed);
        assert!("maybe".parse::<CameraStatus>().is_err());
        Ok(())
    }

    #[test]
    fn blank_path_is_auto() {
        assert_eq!(PathSetting::from_input("   "), PathSetting::Auto);
        assert_eq!(
            PathSetting::from_input(" Streaming/Channels/101 "),
            PathSetting::Fixed("Streaming/Channels/101".into())
        );
        assert_eq!(PathSetting::Auto.to_string(), "AUTO");
    }

    #[test]
    fn debug_output_masks_password() {
        let creds = Credentials::new(Some("admin"), Some("hunter2"));
        let shown = format!("{:?}", creds);
        assert!(shown.contains("admin"));
        assert!(!shown.contains("hunter2"));
    }

    #[test]
    fn latency_renders_whole_milliseconds() {
        let camera = Camera {
            id: 1,
            ip: "10.0.0.2".into(),
            port: 554,
            credentials: Credentials::anonymous(),
            vendor: "axis".into(),
            path: PathSetting::Auto,
            status: CameraStatus::Success,
            latency_ms: Some(412.6),
            url: "rtsp://10.0.0.2:554/axis-media/media.amp".into(),
            note: None,
        };
        assert_eq!(camera.latency_display(), "413 ms");
        assert!(camera.is_previewable());
    }
}
