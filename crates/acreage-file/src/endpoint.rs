//! 地块持久化接口
//!
//! - `PUT {base}/api/land-details/updateArea/{landID}` 更新面积与坐标
//! - `GET {base}/api/land-details/{growerID}/{landID}` 读取已存储的坐标

use crate::error::SaveError;
use crate::payload::{LandDetails, UpdateAreaPayload};
use acreage_core::geo::GeoPoint;
use chrono::{DateTime, Utc};
use std::future::Future;
use std::time::Duration;
use uuid::Uuid;

/// 服务端确认
#[derive(Debug, Clone, PartialEq)]
pub struct Ack {
    pub id: Uuid,
    pub land_id: String,
    pub received_at: DateTime<Utc>,
    /// 服务端原样返回的响应体
    pub body: serde_json::Value,
}

impl Ack {
    pub fn new(land_id: impl Into<String>, body: serde_json::Value) -> Self {
        Self {
            id: Uuid::new_v4(),
            land_id: land_id.into(),
            received_at: Utc::now(),
            body,
        }
    }
}

/// 地块存储
pub trait LandStore {
    fn update_area(
        &self,
        land_id: &str,
        payload: &UpdateAreaPayload,
    ) -> impl Future<Output = Result<Ack, SaveError>>;

    fn fetch_coordinates(
        &self,
        grower_id: &str,
        land_id: &str,
    ) -> impl Future<Output = Result<Vec<GeoPoint>, SaveError>>;
}

/// 基于 HTTP 的地块存储
#[derive(Debug, Clone)]
pub struct HttpLandStore {
    client: reqwest::Client,
    base_url: String,
}

impl HttpLandStore {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, SaveError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SaveError::Network(e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn update_url(&self, land_id: &str) -> String {
        format!("{}/api/land-details/updateArea/{}", self.base_url, land_id)
    }

    fn details_url(&self, grower_id: &str, land_id: &str) -> String {
        format!("{}/api/land-details/{}/{}", self.base_url, grower_id, land_id)
    }

    /// 读取响应体，非 2xx 转为 `Server` 错误
    async fn read_body(response: reqwest::Response) -> Result<String, SaveError> {
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| SaveError::Network(e.to_string()))?;
        if !status.is_success() {
            tracing::error!("Backend error {}: {}", status, body);
            return Err(SaveError::Server {
                status: status.as_u16(),
                body,
            });
        }
        Ok(body)
    }
}

impl LandStore for HttpLandStore {
    async fn update_area(&self, land_id: &str, payload: &UpdateAreaPayload) -> Result<Ack, SaveError> {
        tracing::debug!("PUT {} ({} points)", self.update_url(land_id), payload.coordinates.len());
        let response = self
            .client
            .put(self.update_url(land_id))
            .json(payload)
            .send()
            .await
            .map_err(|e| SaveError::Network(e.to_string()))?;

        let body = Self::read_body(response).await?;
        let value = if body.trim().is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_str(&body)?
        };
        Ok(Ack::new(land_id, value))
    }

    async fn fetch_coordinates(&self, grower_id: &str, land_id: &str) -> Result<Vec<GeoPoint>, SaveError> {
        let url = self.details_url(grower_id, land_id);
        tracing::debug!("GET {}", url);
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| SaveError::Network(e.to_string()))?;

        let details = LandDetails::from_json(&Self::read_body(response).await?)?;
        if details.data.is_empty() {
            return Err(SaveError::NotFound(land_id.to_string()));
        }
        let points = details.coordinates()?;
        tracing::info!("Loaded {} stored coordinates for land {}", points.len(), land_id);
        Ok(points)
    }
}
