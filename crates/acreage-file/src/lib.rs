//! Acreage 保存管线
//!
//! 支持：
//! - 保存前校验（点数、面积下限、渲染面最新状态）
//! - `updateArea` 请求体构造（面积保留 6 位小数）
//! - 通过 HTTP 读写地块坐标

pub mod endpoint;
pub mod error;
pub mod payload;
pub mod pipeline;

pub use endpoint::{Ack, HttpLandStore, LandStore};
pub use error::SaveError;
pub use payload::{LandDetails, UpdateAreaPayload};
pub use pipeline::{SaveConfig, SavePipeline};
