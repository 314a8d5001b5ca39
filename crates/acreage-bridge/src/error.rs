//! 桥接、定位与拍照错误定义

use crate::protocol::RequestId;
use acreage_core::photo::PhotoError;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("Malformed bridge message: {0}")]
    Malformed(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Bridge channel closed")]
    Closed,

    #[error("Timed out waiting for state response #{request_id}")]
    Timeout { request_id: RequestId },

    #[error("Bridge cancelled")]
    Cancelled,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum LocationError {
    #[error("Location permission denied")]
    PermissionDenied,

    #[error("Location unavailable: {0}")]
    Unavailable(String),

    #[error("No location fix within {0:?}")]
    Timeout(Duration),

    #[error("Location request cancelled")]
    Cancelled,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CaptureError {
    #[error("Camera permission denied")]
    CameraPermissionDenied,

    #[error("No photo was taken")]
    NoPhoto,

    #[error(transparent)]
    Location(#[from] LocationError),

    #[error(transparent)]
    Photo(#[from] PhotoError),
}
