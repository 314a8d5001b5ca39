//! 保存管线
//!
//! 本地预检 → 向渲染面确认最新状态 → 复核点数与面积下限 → 构造请求体 → 写入存储。
//! 任何一步失败都不会修改会话，用户可以直接重试。

use crate::endpoint::{Ack, LandStore};
use crate::error::SaveError;
use crate::payload::UpdateAreaPayload;
use acreage_bridge::bridge::MapBridge;
use acreage_core::session::MeasurementSession;
use std::time::Duration;

/// 保存配置
#[derive(Debug, Clone)]
pub struct SaveConfig {
    /// 可保存的最小面积（平方英尺）
    pub min_area_sqft: f64,
    /// 等待渲染面回报最新状态的时限
    pub settle_timeout: Duration,
}

impl Default for SaveConfig {
    fn default() -> Self {
        Self {
            min_area_sqft: 100.0,
            settle_timeout: Duration::from_secs(2),
        }
    }
}

pub struct SavePipeline<S> {
    store: S,
    config: SaveConfig,
}

impl<S: LandStore> SavePipeline<S> {
    pub fn new(store: S, config: SaveConfig) -> Self {
        Self { store, config }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &SaveConfig {
        &self.config
    }

    /// 保存地图绘制的地块
    pub async fn save(&self, land_id: &str, bridge: &mut MapBridge) -> Result<Ack, SaveError> {
        check_points(bridge.session())?;

        bridge
            .request_state(self.config.settle_timeout)
            .await
            .map_err(SaveError::StaleState)?;

        self.save_session(land_id, bridge.session()).await
    }

    /// 保存已有会话（照片取点的会话没有渲染面）
    pub async fn save_session(
        &self,
        land_id: &str,
        session: &MeasurementSession,
    ) -> Result<Ack, SaveError> {
        check_points(session)?;

        let area = session.area();
        if area.square_feet < self.config.min_area_sqft {
            tracing::warn!(
                "Refusing to save land {}: {:.2} sq.ft < {:.2} sq.ft",
                land_id,
                area.square_feet,
                self.config.min_area_sqft
            );
            return Err(SaveError::BelowAreaThreshold {
                square_feet: area.square_feet,
                minimum: self.config.min_area_sqft,
            });
        }

        let payload = UpdateAreaPayload::new(area, session.points().points());
        tracing::info!(
            "Saving land {}: {} ha, {} acre, {} gunta ({} points)",
            land_id,
            payload.total_area_in_hectare,
            payload.total_area_in_acre,
            payload.total_area_in_gunta,
            payload.coordinates.len()
        );

        match self.store.update_area(land_id, &payload).await {
            Ok(ack) => {
                tracing::info!("Land {} saved", land_id);
                Ok(ack)
            }
            Err(e) => {
                tracing::error!("Failed to save land {}: {}", land_id, e);
                Err(e)
            }
        }
    }
}

fn check_points(session: &MeasurementSession) -> Result<(), SaveError> {
    let distinct = session.points().distinct_count();
    if distinct < 3 {
        return Err(SaveError::InvalidPolygon { distinct });
    }
    Ok(())
}
