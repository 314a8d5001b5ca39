//! 持久化接口的请求/响应体

use crate::error::SaveError;
use acreage_core::area::AreaResult;
use acreage_core::geo::{parse_stored_coordinates, GeoPoint};
use serde::{Deserialize, Serialize};

/// 面积保留的小数位数
pub const AREA_DECIMALS: i32 = 6;

/// 四舍五入到指定小数位
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// `updateArea` 请求体
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAreaPayload {
    pub total_area_in_hectare: f64,
    pub total_area_in_acre: f64,
    pub total_area_in_gunta: f64,
    pub coordinates: Vec<GeoPoint>,
}

impl UpdateAreaPayload {
    pub fn new(area: &AreaResult, coordinates: &[GeoPoint]) -> Self {
        Self {
            total_area_in_hectare: round_to(area.hectare, AREA_DECIMALS),
            total_area_in_acre: round_to(area.acre, AREA_DECIMALS),
            total_area_in_gunta: round_to(area.gunta, AREA_DECIMALS),
            coordinates: coordinates.to_vec(),
        }
    }
}

/// 地块详情中的一条记录
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LandRecord {
    /// 存储为 JSON 字符串的坐标
    #[serde(rename = "Coordinates", default)]
    pub coordinates: Option<String>,
}

/// 地块详情响应 `{data: [...]}`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LandDetails {
    #[serde(default)]
    pub data: Vec<LandRecord>,
}

impl LandDetails {
    pub fn from_json(json: &str) -> Result<Self, SaveError> {
        Ok(serde_json::from_str(json)?)
    }

    /// 第一条记录的坐标，归一化为 GeoPoint；没有坐标时为空
    pub fn coordinates(&self) -> Result<Vec<GeoPoint>, SaveError> {
        match self.data.first().and_then(|r| r.coordinates.as_deref()) {
            Some(raw) => Ok(parse_stored_coordinates(raw)?),
            None => Ok(Vec::new()),
        }
    }
}
