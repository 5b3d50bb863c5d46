//! Camera vendor fingerprints.
//!
//! Each profile lists the tokens that identify the vendor in RTSP response headers,
//! the stream paths and ports its firmware commonly exposes, and the factory
//! credential pairs it ships with.

use std::collections::HashMap;

/// Key of the fallback profile.
pub const GENERIC: &str = "generic";

/// Vendor key shown before a camera has been probed.
pub const UNKNOWN: &str = "unknown";

/// Headers consulted for vendor detection.
const FINGERPRINT_HEADERS: [&str; 3] = ["server", "www-authenticate", "proxy-authenticate"];

#[derive(Debug)]
pub struct VendorProfile {
    pub name: &'static str,
    pub tokens: &'static [&'static str],
    pub paths: &'static [&'static str],
    pub ports: &'static [u16],
    pub defaults: &'static [(&'static str, &'static str)],
}

/// Profiles in detection order. `generic` is last and never matches by token.
pub static VENDORS: &[VendorProfile] = &[
    VendorProfile {
        name: "hikvision",
        tokens: &["hikvision"],
        paths: &[
            "Streaming/Channels/101",
            "Streaming/Channels/102",
            "h264Preview_01_main",
            "h264Preview_01_sub",
        ],
        ports: &[554, 10554],
        defaults: &[("admin", "12345"), ("admin", "admin"), ("admin", "")],
    },
    VendorProfile {
        name: "dahua",
        tokens: &["dahua", "general"],
        paths: &[
            "cam/realmonitor?channel=1&subtype=0",
            "cam/realmonitor?channel=1&subtype=1",
        ],
        ports: &[554],
        defaults: &[("admin", "admin"), ("admin", "")],
    },
    VendorProfile {
        name: "axis",
        tokens: &["axis"],
        paths: &["axis-media/media.amp", "axis-media/media.amp?videocodec=h264"],
        ports: &[554],
        defaults: &[("root", "pass"), ("root", "root"), ("root", "")],
    },
    VendorProfile {
        name: "reolink",
        tokens: &["reolink"],
        paths: &[
            "Preview_01_main",
            "Preview_01_sub",
            "h264Preview_01_main",
            "h264Preview_01_sub",
        ],
        ports: &[554],
        defaults: &[("admin", "")],
    },
    VendorProfile {
        name: "uniview",
        tokens: &["uniview", "unv", "uv"],
        paths: &["media/video1", "media/video2", "media/video3"],
        ports: &[554],
        defaults: &[("admin", "123456"), ("admin", "")],
    },
    VendorProfile {
        name: "amcrest",
        tokens: &["amcrest"],
        paths: &[
            "cam/realmonitor?channel=1&subtype=0",
            "cam/realmonitor?channel=1&subtype=1",
            "h264Preview_01_main",
            "h264Preview_01_sub",
        ],
        ports: &[554],
        defaults: &[("admin", "admin"), ("admin", "")],
    },
    VendorProfile {
        name: "foscam",
        tokens: &["foscam"],
        paths: &["videoMain", "videoSub"],
        ports: &[88, 554],
        defaults: &[("admin", ""), ("user", "user")],
    },
    VendorProfile {
        name: "tapo",
        tokens: &["tapo"],
        paths: &["stream1", "stream2", "stream6", "stream7"],
        ports: &[554],
        defaults: &[],
    },
    VendorProfile {
        name: "hanwha",
        tokens: &["hanwha", "wisenet", "samsung"],
        paths: &["profile1/media.smp", "profile2/media.smp"],
        ports: &[554],
        defaults: &[("admin", "111111"), ("admin", "4321"), ("admin", "")],
    },
    VendorProfile {
        name: "bosch",
        tokens: &["bosch"],
        paths: &["", "video?inst=1", "video?inst=2", "?inst=1", "?inst=2"],
        ports: &[554],
        defaults: &[("admin", "admin"), ("admin", "")],
    },
    VendorProfile {
        name: "unifi_protect",
        tokens: &["unifi", "ubiquiti", "protect"],
        paths: &[""],
        ports: &[7447],
        defaults: &[],
    },
    VendorProfile {
        name: GENERIC,
        tokens: &[],
        paths: &[
            "",
            "live",
            "live.sdp",
            "h264",
            "h265",
            "stream",
            "stream1",
            "stream2",
            "0",
            "1",
            "video",
            "video.mp4",
            "unicast",
        ],
        ports: &[554, 8554],
        defaults: &[
            ("admin", "admin"),
            ("admin", "12345"),
            ("admin", ""),
            ("user", "user"),
        ],
    },
];

/// Profile for `name`, or the generic profile.
pub fn profile(name: &str) -> &'static VendorProfile {
    VENDORS
        .iter()
        .find(|vendor| vendor.name == name)
        .unwrap_or_else(generic)
}

pub fn generic() -> &'static VendorProfile {
    &VENDORS[VENDORS.len() - 1]
}

/// Identify the vendor from lowercased RTSP response headers.
pub fn detect_vendor(headers: &HashMap<String, String>) -> &'static str {
    let text = FINGERPRINT_HEADERS
        .iter()
        .map(|key| headers.get(*key).map(String::as_str).unwrap_or(""))
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase();
    VENDORS
        .iter()
        .find(|vendor| vendor.tokens.iter().any(|token| text.contains(token)))
        .map(|vendor| vendor.name)
        .unwrap_or(GENERIC)
}

/// Operator hint for an RTSP status code.
pub fn error_hint(code: u16) -> Option<&'static str> {
    match code {
        401 => Some("401 unauthorized: check username/password and auth type (Basic/Digest)"),
        404 => Some("404 stream not found: adjust the RTSP path to match the camera model"),
        451 => Some("451 device/firmware error: reduce load, reboot, or enable RTSP"),
        500 => Some("500 internal error: check settings/firmware version and retry"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn detects_vendor_from_server_header() {
        let h = headers(&[("server", "Hikvision-Webs")]);
        assert_eq!(detect_vendor(&h), "hikvision");
    }

    #[test]
    fn detects_vendor_from_auth_challenge() {
        let h = headers(&[("www-authenticate", "Digest realm=\"Login to AMCREST\"")]);
        assert_eq!(detect_vendor(&h), "amcrest");
    }

    #[test]
    fn earlier_profile_wins_on_shared_tokens() {
        // "general" belongs to dahua, which precedes every later profile.
        let h = headers(&[("server", "General Stream Server"), ("proxy-authenticate", "tapo")]);
        assert_eq!(detect_vendor(&h), "dahua");
    }

    #[test]
    fn unrelated_headers_are_ignored() {
        let h = headers(&[("cseq", "1"), ("content-base", "rtsp://axis/")]);
        assert_eq!(detect_vendor(&h), GENERIC);
        assert_eq!(detect_vendor(&HashMap::new()), GENERIC);
    }

    #[test]
    fn unknown_profile_falls_back_to_generic() {
        assert_eq!(profile("no-such-vendor").name, GENERIC);
        assert_eq!(profile(UNKNOWN).name, GENERIC);
        assert_eq!(profile("foscam").ports, &[88, 554]);
    }

    #[test]
    fn hints_cover_known_codes() {
        for code in [401, 404, 451, 500] {
            assert!(error_hint(code).is_some());
        }
        assert!(error_hint(200).is_none());
    }
}
