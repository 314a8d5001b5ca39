//! 测量会话
//!
//! 会话是点序列的权威内存模型，只能通过 `MeasurementController` 的命令修改。

use crate::area::{compute_metrics, AreaResult};
use crate::geo::{GeoPoint, Polygon};
use serde::{Deserialize, Serialize};

/// 点序列来源
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Origin {
    /// 由带地理标记的照片生成
    PhotoDerived,
    /// 在地图上绘制
    #[default]
    MapDrawn,
}

/// 形状状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShapeState {
    /// 没有点
    Empty,
    /// 1 个及以上未闭合的点
    Open,
    /// 不少于3点且首尾重合
    Closed,
}

impl ShapeState {
    pub fn name(&self) -> &'static str {
        match self {
            ShapeState::Empty => "Empty",
            ShapeState::Open => "Open",
            ShapeState::Closed => "Closed",
        }
    }
}

/// 测量命令
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    AddPoint(GeoPoint),
    /// 在渲染面当前视图中心添加点
    AddPointAtCenter,
    UndoLast,
    CloseShape,
    Reset,
    /// 整体替换点序列
    ReplaceAll(Vec<GeoPoint>),
    /// 将最近的点移到给定位置
    EditNearest(GeoPoint),
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::AddPoint(_) => "AddPoint",
            Command::AddPointAtCenter => "AddPointAtCenter",
            Command::UndoLast => "UndoLast",
            Command::CloseShape => "CloseShape",
            Command::Reset => "Reset",
            Command::ReplaceAll(_) => "ReplaceAll",
            Command::EditNearest(_) => "EditNearest",
        }
    }
}

/// 状态更新事件，每次命令执行后广播
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateUpdate {
    pub points: Vec<GeoPoint>,
    pub closed: bool,
    pub area: AreaResult,
    pub distance_km: f64,
}

/// 测量会话
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MeasurementSession {
    points: Polygon,
    closed: bool,
    area: AreaResult,
    distance_km: f64,
    origin: Origin,
}

impl MeasurementSession {
    pub fn new(origin: Origin) -> Self {
        Self {
            points: Polygon::new(),
            closed: false,
            area: AreaResult::zero(),
            distance_km: 0.0,
            origin,
        }
    }

    pub fn points(&self) -> &Polygon {
        &self.points
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn area(&self) -> &AreaResult {
        &self.area
    }

    pub fn distance_km(&self) -> f64 {
        self.distance_km
    }

    pub fn origin(&self) -> Origin {
        self.origin
    }

    pub fn state(&self) -> ShapeState {
        if self.points.is_empty() {
            ShapeState::Empty
        } else if self.closed {
            ShapeState::Closed
        } else {
            ShapeState::Open
        }
    }

    /// 当前状态快照
    pub fn snapshot(&self) -> StateUpdate {
        StateUpdate {
            points: self.points.points().to_vec(),
            closed: self.closed,
            area: self.area,
            distance_km: self.distance_km,
        }
    }

    pub(crate) fn polygon_mut(&mut self) -> &mut Polygon {
        &mut self.points
    }

    /// 重新推导闭合状态并计算面积/距离
    pub(crate) fn recompute(&mut self) {
        self.closed = self.points.is_closed();
        let (area, distance_km) = compute_metrics(self.points.points());
        self.area = area;
        self.distance_km = distance_km;
    }
}

impl Default for MeasurementSession {
    fn default() -> Self {
        Self::new(Origin::default())
    }
}
