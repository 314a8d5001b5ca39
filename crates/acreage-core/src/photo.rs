//! 带地理标记的照片
//!
//! 照片拍摄位置按拍摄顺序构成多边形，照片数达到3张后开始有面积。

use crate::controller::MeasurementController;
use crate::geo::{GeoError, GeoPoint};
use crate::session::{Command, MeasurementSession, Origin, StateUpdate};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// 每块地最多照片数
pub const MAX_PHOTOS: usize = 8;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PhotoError {
    #[error("Photo limit reached: at most {max} photos per parcel")]
    LimitReached { max: usize },

    #[error("Photo position rejected: {0}")]
    InvalidPosition(#[from] GeoError),
}

/// 照片
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeotaggedPhoto {
    pub id: Uuid,
    pub uri: String,
    pub position: GeoPoint,
    pub captured_at: DateTime<Utc>,
}

impl GeotaggedPhoto {
    pub fn new(uri: impl Into<String>, position: GeoPoint) -> Self {
        Self {
            id: Uuid::new_v4(),
            uri: uri.into(),
            position,
            captured_at: Utc::now(),
        }
    }
}

/// 照片集合
pub struct PhotoSet {
    photos: Vec<GeotaggedPhoto>,
    controller: MeasurementController,
}

impl PhotoSet {
    pub fn new() -> Self {
        Self {
            photos: Vec::new(),
            controller: MeasurementController::new(Origin::PhotoDerived),
        }
    }

    pub fn photos(&self) -> &[GeotaggedPhoto] {
        &self.photos
    }

    pub fn len(&self) -> usize {
        self.photos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.photos.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.photos.len() >= MAX_PHOTOS
    }

    pub fn session(&self) -> &MeasurementSession {
        self.controller.session()
    }

    pub fn controller_mut(&mut self) -> &mut MeasurementController {
        &mut self.controller
    }

    /// 添加照片并重新计算面积
    pub fn add(&mut self, photo: GeotaggedPhoto) -> Result<StateUpdate, PhotoError> {
        if self.is_full() {
            return Err(PhotoError::LimitReached { max: MAX_PHOTOS });
        }
        photo.position.validate()?;

        tracing::info!(
            "Photo {} added at ({}, {})",
            photo.id,
            photo.position.latitude,
            photo.position.longitude
        );
        self.photos.push(photo);
        Ok(self.sync())
    }

    /// 删除照片
    pub fn remove(&mut self, id: Uuid) -> Option<StateUpdate> {
        let index = self.photos.iter().position(|p| p.id == id)?;
        self.photos.remove(index);
        Some(self.sync())
    }

    fn sync(&mut self) -> StateUpdate {
        let points = self.photos.iter().map(|p| p.position).collect();
        self.controller.apply(Command::ReplaceAll(points))
    }
}

impl Default for PhotoSet {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_area_starts_at_third_photo() {
        let mut set = PhotoSet::new();
        set.add(GeotaggedPhoto::new("a.jpg", GeoPoint::new(0.0, 0.0))).unwrap();
        let update = set
            .add(GeotaggedPhoto::new("b.jpg", GeoPoint::new(0.0, 0.001)))
            .unwrap();
        assert!(update.area.is_zero());

        let update = set
            .add(GeotaggedPhoto::new("c.jpg", GeoPoint::new(0.001, 0.001)))
            .unwrap();
        assert!(update.area.square_meters > 6_000.0);
        assert_eq!(set.session().origin(), Origin::PhotoDerived);
    }

    #[test]
    fn test_photo_limit() {
        let mut set = PhotoSet::new();
        for i in 0..MAX_PHOTOS {
            let p = GeoPoint::new(0.0001 * i as f64, 0.0);
            set.add(GeotaggedPhoto::new(format!("{i}.jpg"), p)).unwrap();
        }
        assert!(set.is_full());

        let err = set
            .add(GeotaggedPhoto::new("extra.jpg", GeoPoint::new(1.0, 1.0)))
            .unwrap_err();
        assert_eq!(err, PhotoError::LimitReached { max: MAX_PHOTOS });
        assert_eq!(set.len(), MAX_PHOTOS);
    }

    #[test]
    fn test_remove_photo_recomputes() {
        let mut set = PhotoSet::new();
        let ids: Vec<_> = [(0.0, 0.0), (0.0, 0.001), (0.001, 0.001)]
            .into_iter()
            .map(|(lat, lon)| {
                let photo = GeotaggedPhoto::new("p.jpg", GeoPoint::new(lat, lon));
                let id = photo.id;
                set.add(photo).unwrap();
                id
            })
            .collect();

        let update = set.remove(ids[1]).unwrap();
        assert_eq!(update.points.len(), 2);
        assert!(update.area.is_zero());
        assert!(set.remove(Uuid::new_v4()).is_none());
    }

    #[test]
    fn test_invalid_position_rejected() {
        let mut set = PhotoSet::new();
        let err = set
            .add(GeotaggedPhoto::new("bad.jpg", GeoPoint::new(120.0, 0.0)))
            .unwrap_err();
        assert!(matches!(err, PhotoError::InvalidPosition(_)));
        assert!(set.is_empty());
    }
}
