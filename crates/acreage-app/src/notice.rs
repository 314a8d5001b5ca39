//! 用户提示
//!
//! 所有库错误都映射为一条可关闭的提示，不会中断测量会话。

use acreage_bridge::error::{BridgeError, CaptureError, LocationError};
use acreage_core::photo::PhotoError;
use acreage_file::error::SaveError;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Info,
    Success,
    Warning,
    Error,
}

impl NoticeKind {
    fn label(&self) -> &'static str {
        match self {
            NoticeKind::Info => "info",
            NoticeKind::Success => "ok",
            NoticeKind::Warning => "warning",
            NoticeKind::Error => "error",
        }
    }
}

/// 一条提示
#[derive(Debug, Clone, PartialEq)]
pub struct Notice {
    pub title: String,
    pub message: String,
    pub kind: NoticeKind,
}

impl Notice {
    pub fn new(kind: NoticeKind, title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
            kind,
        }
    }

    pub fn info(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(NoticeKind::Info, title, message)
    }

    pub fn success(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(NoticeKind::Success, title, message)
    }

    /// 在日志中记录该提示
    pub fn log(&self) {
        match self.kind {
            NoticeKind::Error => tracing::error!("{}: {}", self.title, self.message),
            NoticeKind::Warning => tracing::warn!("{}: {}", self.title, self.message),
            _ => tracing::info!("{}: {}", self.title, self.message),
        }
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.kind.label(), self.title, self.message)
    }
}

impl From<&SaveError> for Notice {
    fn from(err: &SaveError) -> Self {
        match err {
            SaveError::InvalidPolygon { .. } => Notice::new(
                NoticeKind::Warning,
                "Validation",
                "Add at least 3 points to form a polygon.",
            ),
            SaveError::BelowAreaThreshold { .. } => {
                Notice::new(NoticeKind::Warning, "Validation", err.to_string())
            }
            SaveError::Coordinates(_) | SaveError::NotFound(_) => {
                Notice::new(NoticeKind::Error, "Load failed", err.to_string())
            }
            _ if err.is_retryable() => Notice::new(
                NoticeKind::Error,
                "Save failed",
                format!("{err}. Please try again."),
            ),
            _ => Notice::new(NoticeKind::Error, "Save failed", err.to_string()),
        }
    }
}

impl From<&LocationError> for Notice {
    fn from(err: &LocationError) -> Self {
        match err {
            LocationError::PermissionDenied => Notice::new(
                NoticeKind::Warning,
                "Permission Denied",
                "Location permission is required to show your current location.",
            ),
            LocationError::Cancelled => Notice::info("Location", "Location request cancelled."),
            _ => Notice::new(
                NoticeKind::Error,
                "Location Error",
                "Could not fetch your current location.",
            ),
        }
    }
}

impl From<&PhotoError> for Notice {
    fn from(err: &PhotoError) -> Self {
        match err {
            PhotoError::LimitReached { max } => Notice::new(
                NoticeKind::Warning,
                "Limit reached",
                format!("You can add at most {max} photos."),
            ),
            PhotoError::InvalidPosition(_) => {
                Notice::new(NoticeKind::Error, "Photo", err.to_string())
            }
        }
    }
}

impl From<&CaptureError> for Notice {
    fn from(err: &CaptureError) -> Self {
        match err {
            CaptureError::CameraPermissionDenied => Notice::new(
                NoticeKind::Warning,
                "Permission Denied",
                "Camera permission is required to take land photos.",
            ),
            CaptureError::NoPhoto => Notice::info("Photo", "No photo was taken."),
            CaptureError::Location(e) => e.into(),
            CaptureError::Photo(e) => e.into(),
        }
    }
}

impl From<&BridgeError> for Notice {
    fn from(err: &BridgeError) -> Self {
        Notice::new(NoticeKind::Error, "Map", err.to_string())
    }
}
