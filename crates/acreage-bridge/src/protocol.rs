//! 桥接消息格式
//!
//! 两个方向各自一个封闭的标签枚举，`type` 字段为标签：
//! - 命令 (控制器 → 渲染面): `addPointAtCenter`、`undoLast`、`closeShape`、
//!   `reset`、`replaceAll`、`requestState`、`setUserLocation`
//! - 事件 (渲染面 → 控制器): `update`、`requestLocation`
//!
//! 未知标签、缺失字段、越界坐标一律视为格式错误。

use crate::error::BridgeError;
use acreage_core::area::AreaResult;
use acreage_core::geo::GeoPoint;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 请求关联 ID
pub type RequestId = u64;

/// 发往渲染面的命令
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum SurfaceCommand {
    AddPointAtCenter,
    UndoLast,
    CloseShape,
    Reset,
    ReplaceAll {
        points: Vec<GeoPoint>,
    },
    /// 请求渲染面回报当前状态，回报中回显 `request_id`
    #[serde(rename_all = "camelCase")]
    RequestState {
        request_id: RequestId,
    },
    SetUserLocation {
        latitude: f64,
        longitude: f64,
    },
}

impl SurfaceCommand {
    pub fn name(&self) -> &'static str {
        match self {
            SurfaceCommand::AddPointAtCenter => "addPointAtCenter",
            SurfaceCommand::UndoLast => "undoLast",
            SurfaceCommand::CloseShape => "closeShape",
            SurfaceCommand::Reset => "reset",
            SurfaceCommand::ReplaceAll { .. } => "replaceAll",
            SurfaceCommand::RequestState { .. } => "requestState",
            SurfaceCommand::SetUserLocation { .. } => "setUserLocation",
        }
    }

    pub fn to_json(&self) -> Result<String, BridgeError> {
        Ok(serde_json::to_string(self)?)
    }
}

/// `update` 事件负载
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePayload {
    pub points: Vec<GeoPoint>,
    #[serde(default)]
    pub is_closed: bool,
    #[serde(default)]
    pub area: AreaResult,
    #[serde(default)]
    pub distance_km: f64,
    /// 触发本次回报的 `requestState` 的 ID
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<RequestId>,
    /// 渲染面单调递增的修订号
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revision: Option<u64>,
    /// 渲染面实例 ID，页面重新加载后变化，修订号随之从头计数
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub surface_id: Option<Uuid>,
}

impl UpdatePayload {
    fn validate(&self) -> Result<(), BridgeError> {
        if let Some(bad) = self.points.iter().find(|p| !p.is_valid()) {
            return Err(BridgeError::Malformed(format!(
                "invalid point ({}, {})",
                bad.latitude, bad.longitude
            )));
        }

        let a = &self.area;
        let figures = [
            a.square_meters,
            a.hectare,
            a.acre,
            a.gunta,
            a.square_feet,
            self.distance_km,
        ];
        if figures.iter().any(|v| !v.is_finite() || *v < 0.0) {
            return Err(BridgeError::Malformed(
                "negative or non-finite area/distance".to_string(),
            ));
        }
        Ok(())
    }
}

/// 渲染面发来的事件
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum SurfaceEvent {
    Update(UpdatePayload),
    RequestLocation,
}

impl SurfaceEvent {
    /// 解析并校验原始消息
    pub fn parse(raw: &str) -> Result<Self, BridgeError> {
        let event: SurfaceEvent =
            serde_json::from_str(raw).map_err(|e| BridgeError::Malformed(e.to_string()))?;
        if let SurfaceEvent::Update(payload) = &event {
            payload.validate()?;
        }
        Ok(event)
    }

    pub fn to_json(&self) -> Result<String, BridgeError> {
        Ok(serde_json::to_string(self)?)
    }
}
