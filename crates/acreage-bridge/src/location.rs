//! 定位服务
//!
//! 每个界面生命周期只申请一次权限，拒绝后不再重试；
//! 单次定位有超时上限，拿不到定位时返回错误而不是挂起。

use crate::error::LocationError;
use acreage_core::geo::GeoPoint;
use std::future::Future;
use std::time::Duration;

/// 权限状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionStatus {
    Granted,
    Denied,
}

/// 定位提供者（平台 GPS 接口）
pub trait LocationProvider {
    /// 申请前台定位权限
    fn request_permission(&mut self) -> impl Future<Output = PermissionStatus>;

    /// 单次高精度定位
    fn current_position(&mut self) -> impl Future<Output = Result<GeoPoint, LocationError>>;
}

/// 定位配置
#[derive(Debug, Clone)]
pub struct LocationConfig {
    /// 单次定位超时
    pub fix_timeout: Duration,
}

impl Default for LocationConfig {
    fn default() -> Self {
        Self {
            fix_timeout: Duration::from_secs(15),
        }
    }
}

/// 带权限缓存与超时的定位服务
pub struct LocationService<P> {
    provider: P,
    permission: Option<PermissionStatus>,
    config: LocationConfig,
}

impl<P: LocationProvider> LocationService<P> {
    pub fn new(provider: P, config: LocationConfig) -> Self {
        Self {
            provider,
            permission: None,
            config,
        }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// 已知的权限状态（尚未申请时为 None）
    pub fn permission(&self) -> Option<PermissionStatus> {
        self.permission
    }

    /// 确保已获得权限，只在第一次调用时向平台申请
    pub async fn ensure_permission(&mut self) -> Result<(), LocationError> {
        let status = match self.permission {
            Some(status) => status,
            None => {
                let status = self.provider.request_permission().await;
                tracing::info!("Location permission: {:?}", status);
                self.permission = Some(status);
                status
            }
        };

        match status {
            PermissionStatus::Granted => Ok(()),
            PermissionStatus::Denied => Err(LocationError::PermissionDenied),
        }
    }

    /// 获取一次定位
    pub async fn locate(&mut self) -> Result<GeoPoint, LocationError> {
        self.ensure_permission().await?;

        let timeout = self.config.fix_timeout;
        match tokio::time::timeout(timeout, self.provider.current_position()).await {
            Ok(Ok(fix)) => fix
                .validate()
                .map_err(|e| LocationError::Unavailable(e.to_string())),
            Ok(Err(e)) => {
                tracing::warn!("Failed to get current location: {}", e);
                Err(e)
            }
            Err(_) => {
                tracing::warn!("No location fix within {:?}", timeout);
                Err(LocationError::Timeout(timeout))
            }
        }
    }
}
