//! 地理坐标定义
//!
//! 支持：
//! - 点 (GeoPoint)：WGS84 经纬度，单位为度
//! - 多边形 (Polygon)：有序点序列，插入顺序决定边
//! - 存储坐标归一化：`[lat, lon]` 数组与 `{latitude, longitude}` 对象

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

/// 地球平均半径（米）
pub const EARTH_RADIUS_M: f64 = 6_371_008.8;

/// 坐标错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeoError {
    #[error("Invalid coordinate: latitude {latitude}, longitude {longitude}")]
    InvalidCoordinate { latitude: f64, longitude: f64 },

    #[error("Malformed stored coordinates: {0}")]
    MalformedCoordinates(String),
}

/// 经纬度点
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// 坐标是否有限且在合法范围内
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && self.latitude.abs() <= 90.0
            && self.longitude.abs() <= 180.0
    }

    pub fn validate(self) -> Result<Self, GeoError> {
        if self.is_valid() {
            Ok(self)
        } else {
            Err(GeoError::InvalidCoordinate {
                latitude: self.latitude,
                longitude: self.longitude,
            })
        }
    }

    /// 大圆距离（米），Haversine 公式
    pub fn haversine_distance(&self, other: &GeoPoint) -> f64 {
        let lat1 = self.latitude.to_radians();
        let lat2 = other.latitude.to_radians();
        let d_lat = (other.latitude - self.latitude).to_radians();
        let d_lon = (other.longitude - self.longitude).to_radians();

        let a = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);
        let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
        EARTH_RADIUS_M * c
    }

    /// 用于去重的位模式，`-0.0` 与 `0.0` 视为同一值
    fn bits(&self) -> (u64, u64) {
        let canonical = |v: f64| if v == 0.0 { 0.0f64 } else { v };
        (
            canonical(self.latitude).to_bits(),
            canonical(self.longitude).to_bits(),
        )
    }
}

/// 点序列是否构成闭合多边形（不少于3点且首尾重合）
pub fn is_closed_ring(points: &[GeoPoint]) -> bool {
    match (points.first(), points.last()) {
        (Some(first), Some(last)) if points.len() >= 3 => first == last,
        _ => false,
    }
}

/// 多边形
///
/// 仅保存点序列，闭合状态由首尾是否重合推导，不单独存储。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Polygon {
    points: Vec<GeoPoint>,
}

impl Polygon {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_points(points: impl IntoIterator<Item = GeoPoint>) -> Self {
        Self {
            points: points.into_iter().collect(),
        }
    }

    pub fn points(&self) -> &[GeoPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn first(&self) -> Option<&GeoPoint> {
        self.points.first()
    }

    pub fn last(&self) -> Option<&GeoPoint> {
        self.points.last()
    }

    pub fn is_closed(&self) -> bool {
        is_closed_ring(&self.points)
    }

    /// 去掉闭合点后的顶点
    pub fn vertices(&self) -> &[GeoPoint] {
        if self.is_closed() {
            &self.points[..self.points.len() - 1]
        } else {
            &self.points
        }
    }

    /// 互不重合的点数
    pub fn distinct_count(&self) -> usize {
        self.points
            .iter()
            .map(GeoPoint::bits)
            .collect::<HashSet<_>>()
            .len()
    }

    /// 距离给定点最近的顶点索引（距离相同时取较早的点）
    pub fn nearest_index(&self, target: &GeoPoint) -> Option<usize> {
        let mut best: Option<(usize, f64)> = None;
        for (i, p) in self.points.iter().enumerate() {
            let d = p.haversine_distance(target);
            match best {
                Some((_, min)) if d >= min => {}
                _ => best = Some((i, d)),
            }
        }
        best.map(|(i, _)| i)
    }

    pub(crate) fn push(&mut self, point: GeoPoint) {
        self.points.push(point);
    }

    pub(crate) fn pop(&mut self) -> Option<GeoPoint> {
        self.points.pop()
    }

    pub(crate) fn clear(&mut self) {
        self.points.clear();
    }

    pub(crate) fn set(&mut self, index: usize, point: GeoPoint) {
        if let Some(slot) = self.points.get_mut(index) {
            *slot = point;
        }
    }

    pub(crate) fn replace(&mut self, points: Vec<GeoPoint>) {
        self.points = points;
    }
}

/// 存储中的坐标，可能是 `[lat, lon]` 或 `{latitude, longitude}`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StoredCoordinate {
    Pair([f64; 2]),
    Object { latitude: f64, longitude: f64 },
}

impl From<StoredCoordinate> for GeoPoint {
    fn from(coord: StoredCoordinate) -> Self {
        match coord {
            StoredCoordinate::Pair([latitude, longitude]) => GeoPoint::new(latitude, longitude),
            StoredCoordinate::Object {
                latitude,
                longitude,
            } => GeoPoint::new(latitude, longitude),
        }
    }
}

/// 将存储坐标归一化为 GeoPoint，任何一个非法坐标都会导致整体失败
pub fn normalize_coordinates(
    coords: impl IntoIterator<Item = StoredCoordinate>,
) -> Result<Vec<GeoPoint>, GeoError> {
    coords
        .into_iter()
        .map(|c| GeoPoint::from(c).validate())
        .collect()
}

/// 解析存储的坐标 JSON 文本
pub fn parse_stored_coordinates(json: &str) -> Result<Vec<GeoPoint>, GeoError> {
    let json = json.trim();
    if json.is_empty() {
        return Ok(Vec::new());
    }
    let coords: Vec<StoredCoordinate> = serde_json::from_str(json)
        .map_err(|e| GeoError::MalformedCoordinates(e.to_string()))?;
    normalize_coordinates(coords)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_haversine_one_degree_latitude() {
        let a = GeoPoint::new(35.0, 139.0);
        let b = GeoPoint::new(36.0, 139.0);
        // 约 111.2 km
        assert!((a.haversine_distance(&b) - 111_195.0).abs() < 10.0);
    }

    #[test]
    fn test_point_validation() {
        assert!(GeoPoint::new(18.5, 73.8).is_valid());
        assert!(!GeoPoint::new(91.0, 0.0).is_valid());
        assert!(!GeoPoint::new(0.0, f64::NAN).is_valid());
        assert!(GeoPoint::new(0.0, 181.0).validate().is_err());
    }

    #[test]
    fn test_polygon_closure() {
        let a = GeoPoint::new(0.0, 0.0);
        let b = GeoPoint::new(0.0, 1.0);
        let c = GeoPoint::new(1.0, 1.0);

        assert!(!Polygon::from_points([a, a]).is_closed());
        assert!(!Polygon::from_points([a, b, c]).is_closed());

        let closed = Polygon::from_points([a, b, c, a]);
        assert!(closed.is_closed());
        assert_eq!(closed.vertices(), &[a, b, c]);
        assert_eq!(closed.distinct_count(), 3);
    }

    #[test]
    fn test_distinct_count_treats_signed_zero_as_equal() {
        let pl = Polygon::from_points([
            GeoPoint::new(0.0, 0.0),
            GeoPoint::new(-0.0, 0.0),
            GeoPoint::new(0.0, 0.001),
        ]);
        assert_eq!(pl.distinct_count(), 2);
    }

    #[test]
    fn test_nearest_index_prefers_earliest() {
        let a = GeoPoint::new(0.0, 0.0);
        let b = GeoPoint::new(0.0, 1.0);
        let c = GeoPoint::new(1.0, 1.0);
        let pl = Polygon::from_points([a, b, c, a]);

        assert_eq!(pl.nearest_index(&GeoPoint::new(0.9, 1.1)), Some(2));
        assert_eq!(pl.nearest_index(&GeoPoint::new(0.01, 0.0)), Some(0));
        assert_eq!(Polygon::new().nearest_index(&a), None);
    }

    #[test]
    fn test_parse_mixed_stored_coordinates() {
        let json = r#"[[18.5, 73.8], {"latitude": 18.6, "longitude": 73.9}]"#;
        let points = parse_stored_coordinates(json).unwrap();
        assert_eq!(points, vec![GeoPoint::new(18.5, 73.8), GeoPoint::new(18.6, 73.9)]);
    }

    #[test]
    fn test_parse_stored_coordinates_rejects_garbage() {
        assert!(matches!(
            parse_stored_coordinates(r#"[{"lat": 1}]"#),
            Err(GeoError::MalformedCoordinates(_))
        ));
        assert!(matches!(
            parse_stored_coordinates("[[95.0, 10.0]]"),
            Err(GeoError::InvalidCoordinate { .. })
        ));
        assert!(parse_stored_coordinates("  ").unwrap().is_empty());
    }
}
