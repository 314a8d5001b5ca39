//! Acreage 核心测量引擎
//!
//! 提供地块测量所需的纯计算与状态管理：
//!
//! # 架构设计
//!
//! - `geo`: 经纬度点、多边形与存储坐标归一化
//! - `area`: 面积/周长计算（等距圆柱投影 + 鞋带公式）
//! - `session`: 测量会话（点序列、闭合标志、最近一次计算结果）
//! - `controller`: 测量状态机，所有修改都经由命令完成
//! - `photo`: 带地理标记的照片集合，照片位置直接构成多边形
//!
//! # 示例
//!
//! ```rust
//! use acreage_core::prelude::*;
//!
//! let mut controller = MeasurementController::new(Origin::MapDrawn);
//! controller.apply(Command::AddPoint(GeoPoint::new(0.0, 0.0)));
//! controller.apply(Command::AddPoint(GeoPoint::new(0.0, 0.001)));
//! controller.apply(Command::AddPoint(GeoPoint::new(0.001, 0.001)));
//! let update = controller.apply(Command::CloseShape);
//!
//! assert!(update.closed);
//! println!("Area: {} m²", update.area.square_meters);
//! ```

pub mod area;
pub mod controller;
pub mod geo;
pub mod photo;
pub mod session;

pub mod prelude {
    //! 常用类型的便捷导入
    pub use crate::area::{compute_area, compute_distance, compute_metrics, AreaResult};
    pub use crate::controller::MeasurementController;
    pub use crate::geo::{
        normalize_coordinates, parse_stored_coordinates, GeoError, GeoPoint, Polygon,
        StoredCoordinate, EARTH_RADIUS_M,
    };
    pub use crate::photo::{GeotaggedPhoto, PhotoError, PhotoSet, MAX_PHOTOS};
    pub use crate::session::{Command, MeasurementSession, Origin, ShapeState, StateUpdate};
}
