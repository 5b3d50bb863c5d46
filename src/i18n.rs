//! Status messages in Arabic and English.

use anyhow::{anyhow, Result};
use std::fmt;
use std::str::FromStr;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Lang {
    #[default]
    Ar,
    En,
}

impl Lang {
    pub fn code(&self) -> &'static str {
        match self {
            Lang::Ar => "ar",
            Lang::En => "en",
        }
    }
}

impl FromStr for Lang {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ar" => Ok(Lang::Ar),
            "en" => Ok(Lang::En),
            other => Err(anyhow!("unsupported language '{}' (ar|en)", other)),
        }
    }
}

/// How a status line should be presented.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StatusKind {
    Info,
    Good,
    Warn,
    Bad,
}

/// Operator-facing status messages.
#[derive(Clone, Debug, PartialEq)]
pub enum Msg {
    Added(usize),
    ProbeRunning,
    ProbeFinished { succeeded: usize, failed: usize },
    Copied(usize),
    NothingToCopy,
    SelectRowsFirst,
    PasteIpsFirst,
    NoSuccessfulCameras,
    PreviewLimitReached,
    PreviewStarted(u32),
    StreamOpenFailed(u32),
    StreamLost(u32),
    SnapshotSaved(String),
    SnapshotFailed,
    NotSuccessful(u32),
    PathUpdated(usize),
    PrefsSaved,
}

impl Msg {
    pub fn kind(&self) -> StatusKind {
        match self {
            Msg::ProbeRunning => StatusKind::Info,
            Msg::Added(_)
            | Msg::Copied(_)
            | Msg::PreviewStarted(_)
            | Msg::SnapshotSaved(_)
            | Msg::PathUpdated(_)
            | Msg::PrefsSaved => StatusKind::Good,
            Msg::ProbeFinished { succeeded, .. } => {
                if *succeeded > 0 {
                    StatusKind::Good
                } else {
                    StatusKind::Bad
                }
            }
            Msg::NothingToCopy
            | Msg::SelectRowsFirst
            | Msg::PasteIpsFirst
            | Msg::NoSuccessfulCameras
            | Msg::PreviewLimitReached
            | Msg::NotSuccessful(_) => StatusKind::Warn,
            Msg::StreamOpenFailed(_) | Msg::StreamLost(_) | Msg::SnapshotFailed => StatusKind::Bad,
        }
    }

    pub fn text(&self, lang: Lang) -> String {
        match lang {
            Lang::En => self.english(),
            Lang::Ar => self.arabic(),
        }
    }

    fn english(&self) -> String {
        match self {
            Msg::Added(n) => format!("added {} camera(s)", n),
            Msg::ProbeRunning => "smart probe running...".into(),
            Msg::ProbeFinished { succeeded, failed } => {
                format!("probe finished: {} succeeded, {} failed", succeeded, failed)
            }
            Msg::Copied(n) => format!("copied {} item(s)", n),
            Msg::NothingToCopy => "nothing to copy".into(),
            Msg::SelectRowsFirst => "select rows first".into(),
            Msg::PasteIpsFirst => "paste IP addresses first".into(),
            Msg::NoSuccessfulCameras => "no successful cameras to open".into(),
            Msg::PreviewLimitReached => "preview limit reached".into(),
            Msg::PreviewStarted(id) => format!("preview running for camera #{}", id),
            Msg::StreamOpenFailed(id) => format!("camera #{}: could not open stream", id),
            Msg::StreamLost(id) => format!("camera #{}: stream lost", id),
            Msg::SnapshotSaved(path) => format!("snapshot saved: {}", path),
            Msg::SnapshotFailed => "could not capture snapshot".into(),
            Msg::NotSuccessful(id) => format!("camera #{} is not in a successful state", id),
            Msg::PathUpdated(n) => format!("path updated for {} camera(s)", n),
            Msg::PrefsSaved => "preferences saved".into(),
        }
    }

    fn arabic(&self) -> String {
        match self {
            Msg::Added(n) => format!("تمت إضافة {} كاميرا.", n),
            Msg::ProbeRunning => "جاري الفحص الذكي...".into(),
            Msg::ProbeFinished { succeeded, failed } => {
                format!("انتهى الفحص: ناجحة: {}, فاشلة: {}", succeeded, failed)
            }
            Msg::Copied(n) => format!("تم نسخ {} عنصر(عناصر).", n),
            Msg::NothingToCopy => "لا يوجد ما يُنسخ.".into(),
            Msg::SelectRowsFirst => "اختر صفوفًا أولاً.".into(),
            Msg::PasteIpsFirst => "ألصق عناوين IP أولاً.".into(),
            Msg::NoSuccessfulCameras => "لا توجد كاميرات ناجحة للافتتاح.".into(),
            Msg::PreviewLimitReached => "وصلت للحد الأقصى للمعاينات.".into(),
            Msg::PreviewStarted(id) => format!("تشغيل معاينة للكاميرا #{}", id),
            Msg::StreamOpenFailed(id) => format!("الكاميرا #{}: تعذر فتح البث", id),
            Msg::StreamLost(id) => format!("الكاميرا #{}: انقطع البث", id),
            Msg::SnapshotSaved(path) => format!("تم حفظ لقطة: {}", path),
            Msg::SnapshotFailed => "تعذر التقاط لقطة.".into(),
            Msg::NotSuccessful(id) => format!("الكاميرا #{} ليست في حالة ناجحة.", id),
            Msg::PathUpdated(n) => format!("تم تعيين المسار لـ {} كاميرا.", n),
            Msg::PrefsSaved => "تم حفظ التفضيلات.".into(),
        }
    }
}

impl fmt::Display for Msg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.english())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn probe_result_kind_depends_on_successes() {
        assert_eq!(
            Msg::ProbeFinished {
                succeeded: 0,
                failed: 3
            }
            .kind(),
            StatusKind::Bad
        );
        assert_eq!(
            Msg::ProbeFinished {
                succeeded: 1,
                failed: 3
            }
            .kind(),
            StatusKind::Good
        );
    }

    #[test]
    fn messages_render_per_language() {
        assert_eq!(Msg::Added(2).text(Lang::En), "added 2 camera(s)");
        assert_eq!(Msg::Added(2).text(Lang::Ar), "تمت إضافة 2 كاميرا.");
        assert_eq!("EN".parse::<Lang>().ok(), Some(Lang::En));
        assert!("de".parse::<Lang>().is_err());
        assert_eq!(Msg::ProbeRunning.kind(), StatusKind::Info);
    }
}
