//! 面积引擎
//!
//! 纯函数：有序经纬度序列 → 面积（多种单位）与边界长度。
//!
//! 以顶点质心为原点做等距圆柱投影得到局部平面坐标，
//! 再用鞋带公式求面积。所有单位都由同一个平方米数值换算，
//! 引擎内部不做任何舍入，小数位数属于展示层。

use crate::geo::{is_closed_ring, GeoPoint, EARTH_RADIUS_M};
use nalgebra::Point2;
use serde::{Deserialize, Serialize};

/// 1 公顷 = 10 000 m²
pub const SQ_METERS_PER_HECTARE: f64 = 10_000.0;
/// 1 英亩 = 4 046.856 422 4 m²（国际英亩）
pub const SQ_METERS_PER_ACRE: f64 = 4_046.856_422_4;
/// 1 英亩 = 40 古恩塔
pub const GUNTAS_PER_ACRE: f64 = 40.0;
/// 1 m² = 10.763 910 416 7 ft²
pub const SQ_FEET_PER_SQ_METER: f64 = 10.763_910_416_7;

/// 面积结果
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AreaResult {
    #[serde(rename = "sqm")]
    pub square_meters: f64,
    pub hectare: f64,
    pub acre: f64,
    pub gunta: f64,
    #[serde(rename = "sqft")]
    pub square_feet: f64,
}

impl AreaResult {
    pub fn zero() -> Self {
        Self::default()
    }

    /// 从平方米换算出全部单位
    pub fn from_square_meters(square_meters: f64) -> Self {
        let acre = square_meters / SQ_METERS_PER_ACRE;
        Self {
            square_meters,
            hectare: square_meters / SQ_METERS_PER_HECTARE,
            acre,
            gunta: acre * GUNTAS_PER_ACRE,
            square_feet: square_meters * SQ_FEET_PER_SQ_METER,
        }
    }

    pub fn is_zero(&self) -> bool {
        self.square_meters == 0.0
    }
}

/// 计算多边形面积
///
/// 少于3个点时返回全零结果。序列按环处理，无论是否显式闭合；
/// 显式闭合点在投影前去掉，保证闭合前后结果一致。
pub fn compute_area(points: &[GeoPoint]) -> AreaResult {
    if points.len() < 3 {
        return AreaResult::zero();
    }

    let ring = if is_closed_ring(points) {
        &points[..points.len() - 1]
    } else {
        points
    };

    let projected = project(ring);
    AreaResult::from_square_meters(shoelace(&projected).abs())
}

/// 计算沿序列的累计大圆距离（千米）
///
/// 只累加相邻点之间的线段，闭合边只有在序列显式闭合时才计入。
pub fn compute_distance(points: &[GeoPoint]) -> f64 {
    let meters: f64 = points
        .windows(2)
        .map(|pair| pair[0].haversine_distance(&pair[1]))
        .sum();
    meters / 1000.0
}

/// 同时计算面积与距离
pub fn compute_metrics(points: &[GeoPoint]) -> (AreaResult, f64) {
    (compute_area(points), compute_distance(points))
}

/// 以质心为原点的等距圆柱投影（米）
fn project(points: &[GeoPoint]) -> Vec<Point2<f64>> {
    let n = points.len() as f64;
    let lat0 = (points.iter().map(|p| p.latitude).sum::<f64>() / n).to_radians();
    let lon0 = (points.iter().map(|p| p.longitude).sum::<f64>() / n).to_radians();
    let cos_lat0 = lat0.cos();

    points
        .iter()
        .map(|p| {
            let lat = p.latitude.to_radians();
            let lon = p.longitude.to_radians();
            Point2::new(
                EARTH_RADIUS_M * (lon - lon0) * cos_lat0,
                EARTH_RADIUS_M * (lat - lat0),
            )
        })
        .collect()
}

/// 鞋带公式，返回有符号面积
fn shoelace(ring: &[Point2<f64>]) -> f64 {
    let mut sum = 0.0;
    for i in 0..ring.len() {
        let a = &ring[i];
        let b = &ring[(i + 1) % ring.len()];
        sum += a.x * b.y - b.x * a.y;
    }
    sum / 2.0
}
