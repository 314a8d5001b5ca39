//! Acreage 地图桥接
//!
//! 控制器与地图渲染面之间的异步消息层：
//!
//! # 架构设计
//!
//! - `protocol`: 命令/事件的 JSON 消息格式与校验
//! - `bridge`: 双工通道、状态镜像、关联请求与取消
//! - `surface`: 进程内渲染面模型（点击、Shift+点击、定位按钮）
//! - `location`: 定位权限缓存与带超时的单次定位
//! - `capture`: 拍照取点流程
//! - `error`: 错误定义

pub mod bridge;
pub mod capture;
pub mod error;
pub mod location;
pub mod protocol;
pub mod surface;

pub use bridge::{BridgeEvent, CancelHandle, MapBridge, SurfaceEndpoint};
pub use capture::{Camera, PhotoCapture};
pub use error::{BridgeError, CaptureError, LocationError};
pub use location::{LocationConfig, LocationProvider, LocationService, PermissionStatus};
pub use protocol::{RequestId, SurfaceCommand, SurfaceEvent, UpdatePayload};
pub use surface::SurfaceModel;
