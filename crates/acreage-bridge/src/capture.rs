//! 拍照取点
//!
//! 流程：数量上限 → 定位权限 → 相机权限 → 拍照 → 定位 → 加入照片集合。

use crate::error::CaptureError;
use crate::location::{LocationProvider, LocationService, PermissionStatus};
use acreage_core::photo::{GeotaggedPhoto, PhotoError, PhotoSet, MAX_PHOTOS};
use acreage_core::session::StateUpdate;
use std::future::Future;

/// 相机（平台接口）
pub trait Camera {
    fn request_permission(&mut self) -> impl Future<Output = PermissionStatus>;

    /// 拍一张照片，返回图片 URI；用户取消时返回 None
    fn capture(&mut self) -> impl Future<Output = Option<String>>;
}

/// 拍照取点流程
pub struct PhotoCapture<P, C> {
    location: LocationService<P>,
    camera: C,
}

impl<P: LocationProvider, C: Camera> PhotoCapture<P, C> {
    pub fn new(location: LocationService<P>, camera: C) -> Self {
        Self { location, camera }
    }

    pub fn location(&self) -> &LocationService<P> {
        &self.location
    }

    /// 拍一张带定位的照片并加入集合
    pub async fn capture_into(&mut self, photos: &mut PhotoSet) -> Result<StateUpdate, CaptureError> {
        if photos.is_full() {
            return Err(PhotoError::LimitReached { max: MAX_PHOTOS }.into());
        }

        self.location.ensure_permission().await?;

        if self.camera.request_permission().await != PermissionStatus::Granted {
            return Err(CaptureError::CameraPermissionDenied);
        }

        let uri = self.camera.capture().await.ok_or(CaptureError::NoPhoto)?;
        let position = self.location.locate().await?;

        Ok(photos.add(GeotaggedPhoto::new(uri, position))?)
    }
}
