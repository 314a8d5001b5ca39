//! 地图桥接
//!
//! 控制器与渲染面之间的双工异步通道：
//! - 命令通道 (控制器 → 渲染面)：发出即忘，不保证确认
//! - 事件通道 (渲染面 → 控制器)：原始 JSON 文本，解析失败只记日志
//!
//! 用户在渲染面上编辑时，渲染面是几何的权威来源，
//! 本地会话只是镜像，只由 `update` 事件更新（后到者覆盖先到者）。
//! `request_state` 通过关联 ID 等待对应的回报，而不是固定延时。

use crate::error::{BridgeError, LocationError};
use crate::location::{LocationProvider, LocationService};
use crate::protocol::{RequestId, SurfaceCommand, SurfaceEvent, UpdatePayload};
use acreage_core::controller::MeasurementController;
use acreage_core::geo::GeoPoint;
use acreage_core::session::{MeasurementSession, StateUpdate};
use futures::channel::mpsc;
use futures::StreamExt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use uuid::Uuid;

/// 桥接事件
#[derive(Debug, Clone, PartialEq)]
pub enum BridgeEvent {
    /// 镜像已按渲染面回报更新
    StateUpdate(StateUpdate),
    /// 渲染面请求用户位置
    LocationRequest,
}

/// 渲染面一侧的通道端点
pub struct SurfaceEndpoint {
    pub commands: mpsc::UnboundedReceiver<SurfaceCommand>,
    pub events: mpsc::UnboundedSender<String>,
}

/// 取消句柄，离开测量界面时调用
#[derive(Clone)]
pub struct CancelHandle {
    sender: Arc<watch::Sender<bool>>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.sender.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.sender.borrow()
    }
}

/// 地图桥接
pub struct MapBridge {
    controller: MeasurementController,
    commands: mpsc::UnboundedSender<SurfaceCommand>,
    events: mpsc::UnboundedReceiver<String>,
    next_request_id: RequestId,
    /// 最近一次应用的 (渲染面实例, 修订号)
    last_revision: Option<(Option<Uuid>, u64)>,
    /// 等待状态回报期间收到的定位请求
    pending_location_requests: usize,
    cancel: CancelHandle,
    cancel_rx: watch::Receiver<bool>,
}

impl MapBridge {
    /// 创建桥接，返回渲染面一侧的端点
    pub fn new(controller: MeasurementController) -> (Self, SurfaceEndpoint) {
        let (command_tx, command_rx) = mpsc::unbounded();
        let (event_tx, event_rx) = mpsc::unbounded();
        let (cancel_tx, cancel_rx) = watch::channel(false);

        let bridge = Self {
            controller,
            commands: command_tx,
            events: event_rx,
            next_request_id: 1,
            last_revision: None,
            pending_location_requests: 0,
            cancel: CancelHandle {
                sender: Arc::new(cancel_tx),
            },
            cancel_rx,
        };
        let endpoint = SurfaceEndpoint {
            commands: command_rx,
            events: event_tx,
        };
        (bridge, endpoint)
    }

    pub fn controller(&self) -> &MeasurementController {
        &self.controller
    }

    pub fn session(&self) -> &MeasurementSession {
        self.controller.session()
    }

    pub fn subscribe(&mut self) -> mpsc::UnboundedReceiver<StateUpdate> {
        self.controller.subscribe()
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    pub fn is_disposed(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// 离开界面：取消所有等待，关闭通道，之后到达的事件全部丢弃
    pub fn dispose(&mut self) {
        if self.is_disposed() {
            return;
        }
        self.cancel.cancel();
        self.commands.close_channel();
        self.events.close();
        tracing::info!("Map bridge disposed");
    }

    // ========== 命令通道 ==========

    pub fn send(&mut self, command: SurfaceCommand) -> Result<(), BridgeError> {
        if self.is_disposed() {
            return Err(BridgeError::Cancelled);
        }
        tracing::debug!("-> surface: {}", command.name());
        self.commands
            .unbounded_send(command)
            .map_err(|_| BridgeError::Closed)
    }

    pub fn add_point_at_center(&mut self) -> Result<(), BridgeError> {
        self.send(SurfaceCommand::AddPointAtCenter)
    }

    pub fn undo_last(&mut self) -> Result<(), BridgeError> {
        self.send(SurfaceCommand::UndoLast)
    }

    pub fn close_shape(&mut self) -> Result<(), BridgeError> {
        self.send(SurfaceCommand::CloseShape)
    }

    pub fn reset(&mut self) -> Result<(), BridgeError> {
        self.send(SurfaceCommand::Reset)
    }

    /// 把已存储的坐标推给渲染面
    pub fn replace_all(&mut self, points: Vec<GeoPoint>) -> Result<(), BridgeError> {
        self.send(SurfaceCommand::ReplaceAll { points })
    }

    pub fn set_user_location(&mut self, point: GeoPoint) -> Result<(), BridgeError> {
        self.send(SurfaceCommand::SetUserLocation {
            latitude: point.latitude,
            longitude: point.longitude,
        })
    }

    // ========== 事件通道 ==========

    /// 处理一条原始消息，格式错误时返回 None
    pub fn handle_raw(&mut self, raw: &str) -> Option<BridgeEvent> {
        self.ingest(raw).map(|(event, _)| event)
    }

    /// 等待下一个有效事件；通道关闭或已取消时返回 None
    pub async fn next_event(&mut self) -> Option<BridgeEvent> {
        loop {
            if self.is_disposed() {
                return None;
            }
            if self.pending_location_requests > 0 {
                self.pending_location_requests -= 1;
                return Some(BridgeEvent::LocationRequest);
            }

            let raw = tokio::select! {
                raw = self.events.next() => raw?,
                _ = cancelled(&mut self.cancel_rx) => return None,
            };
            if let Some((event, _)) = self.ingest(&raw) {
                return Some(event);
            }
        }
    }

    /// 请求渲染面回报状态，并等待带有相同关联 ID 的回报
    ///
    /// 期间收到的其他更新照常应用，定位请求留给下一次 `next_event`。
    pub async fn request_state(&mut self, timeout: Duration) -> Result<StateUpdate, BridgeError> {
        let request_id = self.next_request_id;
        self.next_request_id += 1;
        self.send(SurfaceCommand::RequestState { request_id })?;

        let mut cancel_rx = self.cancel_rx.clone();
        let wait = async {
            loop {
                let raw = match self.events.next().await {
                    Some(raw) => raw,
                    None => return Err(BridgeError::Closed),
                };
                match self.ingest(&raw) {
                    Some((_, Some(echoed))) if echoed == request_id => {
                        return Ok(self.controller.session().snapshot());
                    }
                    Some((BridgeEvent::LocationRequest, _)) => {
                        self.pending_location_requests += 1;
                    }
                    _ => {}
                }
            }
        };

        tokio::select! {
            result = tokio::time::timeout(timeout, wait) => match result {
                Ok(result) => result,
                Err(_) => {
                    tracing::warn!("State request #{} timed out after {:?}", request_id, timeout);
                    Err(BridgeError::Timeout { request_id })
                }
            },
            _ = cancelled(&mut cancel_rx) => Err(BridgeError::Cancelled),
        }
    }

    /// 获取一次定位并推给渲染面
    pub async fn share_location<P: LocationProvider>(
        &mut self,
        service: &mut LocationService<P>,
    ) -> Result<GeoPoint, LocationError> {
        let mut cancel_rx = self.cancel_rx.clone();
        let fix = tokio::select! {
            fix = service.locate() => fix?,
            _ = cancelled(&mut cancel_rx) => return Err(LocationError::Cancelled),
        };

        self.set_user_location(fix).map_err(|e| {
            tracing::debug!("Dropping location fix: {}", e);
            LocationError::Cancelled
        })?;
        Ok(fix)
    }

    /// 解析并应用一条消息，返回事件及其回显的关联 ID
    fn ingest(&mut self, raw: &str) -> Option<(BridgeEvent, Option<RequestId>)> {
        if self.is_disposed() {
            tracing::debug!("Discarding event after dispose");
            return None;
        }

        match SurfaceEvent::parse(raw) {
            Ok(SurfaceEvent::Update(payload)) => Some(self.apply_update(payload)),
            Ok(SurfaceEvent::RequestLocation) => Some((BridgeEvent::LocationRequest, None)),
            Err(e) => {
                tracing::warn!("Invalid message from surface: {}", e);
                None
            }
        }
    }

    fn apply_update(&mut self, payload: UpdatePayload) -> (BridgeEvent, Option<RequestId>) {
        let request_id = payload.request_id;

        if let Some(revision) = payload.revision {
            match self.last_revision {
                Some((surface, last)) if surface == payload.surface_id && revision < last => {
                    tracing::debug!("Ignoring stale update r{} (have r{})", revision, last);
                    let snapshot = self.controller.session().snapshot();
                    return (BridgeEvent::StateUpdate(snapshot), request_id);
                }
                Some((surface, _)) if surface != payload.surface_id => {
                    tracing::info!("Surface reloaded, restarting at r{}", revision);
                }
                _ => {}
            }
            self.last_revision = Some((payload.surface_id, revision));
        }

        let update = self.controller.mirror(payload.points);
        if update.closed != payload.is_closed {
            tracing::warn!(
                "Surface reported isClosed={} but points give closed={}",
                payload.is_closed,
                update.closed
            );
        }
        if (update.area.square_meters - payload.area.square_meters).abs() > 1.0 {
            tracing::debug!(
                "Surface area {:.3} m² differs from engine area {:.3} m²",
                payload.area.square_meters,
                update.area.square_meters
            );
        }
        (BridgeEvent::StateUpdate(update), request_id)
    }
}

/// 等待取消信号
async fn cancelled(rx: &mut watch::Receiver<bool>) {
    while !*rx.borrow_and_update() {
        if rx.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::location::tests::FakeProvider;
    use crate::location::LocationConfig;
    use crate::protocol::UpdatePayload;
    use acreage_core::area::AreaResult;
    use futures::StreamExt;

    const A: GeoPoint = GeoPoint::new(0.0, 0.0);
    const B: GeoPoint = GeoPoint::new(0.0, 0.001);
    const C: GeoPoint = GeoPoint::new(0.001, 0.001);

    fn update_json(points: Vec<GeoPoint>, request_id: Option<RequestId>, revision: Option<u64>) -> String {
        SurfaceEvent::Update(UpdatePayload {
            points,
            is_closed: false,
            area: AreaResult::zero(),
            distance_km: 0.0,
            request_id,
            revision,
            surface_id: None,
        })
        .to_json()
        .unwrap()
    }

    #[tokio::test]
    async fn test_update_mirrors_points_and_recomputes() {
        let (mut bridge, endpoint) = MapBridge::new(MeasurementController::default());
        endpoint
            .events
            .unbounded_send(update_json(vec![A, B, C, A], None, None))
            .unwrap();

        match bridge.next_event().await {
            Some(BridgeEvent::StateUpdate(update)) => {
                assert!(update.closed);
                assert!(update.area.square_meters > 6_000.0);
            }
            other => panic!("Expected StateUpdate, got {:?}", other),
        }
        assert_eq!(bridge.session().points().len(), 4);
    }

    #[tokio::test]
    async fn test_malformed_event_is_dropped() {
        let (mut bridge, endpoint) = MapBridge::new(MeasurementController::default());
        endpoint.events.unbounded_send("{oops".to_string()).unwrap();
        endpoint
            .events
            .unbounded_send(r#"{"type":"update","points":[{"latitude":999,"longitude":0}]}"#.to_string())
            .unwrap();
        endpoint
            .events
            .unbounded_send(r#"{"type":"requestLocation"}"#.to_string())
            .unwrap();

        assert_eq!(bridge.next_event().await, Some(BridgeEvent::LocationRequest));
        assert!(bridge.session().points().is_empty());
    }

    #[tokio::test]
    async fn test_stale_revision_ignored() {
        let (mut bridge, endpoint) = MapBridge::new(MeasurementController::default());
        endpoint.events.unbounded_send(update_json(vec![A, B, C], None, Some(5))).unwrap();
        endpoint.events.unbounded_send(update_json(vec![A], None, Some(3))).unwrap();

        bridge.next_event().await;
        bridge.next_event().await;
        assert_eq!(bridge.session().points().points(), &[A, B, C]);
    }

    #[tokio::test]
    async fn test_new_surface_instance_restarts_revisions() {
        let (mut bridge, endpoint) = MapBridge::new(MeasurementController::default());
        let send = |points: Vec<GeoPoint>, revision: u64, surface_id: Uuid| {
            let raw = SurfaceEvent::Update(UpdatePayload {
                points,
                is_closed: false,
                area: AreaResult::zero(),
                distance_km: 0.0,
                request_id: None,
                revision: Some(revision),
                surface_id: Some(surface_id),
            })
            .to_json()
            .unwrap();
            endpoint.events.unbounded_send(raw).unwrap();
        };

        let first = Uuid::new_v4();
        let reloaded = Uuid::new_v4();
        send(vec![A, B, C], 3, first);
        send(vec![B], 1, reloaded);

        bridge.next_event().await;
        bridge.next_event().await;
        assert_eq!(bridge.session().points().points(), &[B]);

        // 新实例内部仍按修订号丢弃过期回报
        send(vec![B, C], 3, reloaded);
        send(vec![A], 2, reloaded);
        bridge.next_event().await;
        bridge.next_event().await;
        assert_eq!(bridge.session().points().points(), &[B, C]);
    }

    #[tokio::test]
    async fn test_request_state_waits_for_correlated_response() {
        let (mut bridge, mut endpoint) = MapBridge::new(MeasurementController::default());

        // 无关的更新与定位请求先到
        endpoint.events.unbounded_send(update_json(vec![A], None, None)).unwrap();
        endpoint
            .events
            .unbounded_send(r#"{"type":"requestLocation"}"#.to_string())
            .unwrap();
        endpoint
            .events
            .unbounded_send(update_json(vec![A, B, C], Some(99), None))
            .unwrap();

        let events = endpoint.events.clone();
        let responder = tokio::spawn(async move {
            while let Some(cmd) = endpoint.commands.next().await {
                if let SurfaceCommand::RequestState { request_id } = cmd {
                    events
                        .unbounded_send(update_json(vec![A, B, C, A], Some(request_id), None))
                        .unwrap();
                }
            }
        });

        let fresh = bridge.request_state(Duration::from_secs(1)).await.unwrap();
        assert_eq!(fresh.points, vec![A, B, C, A]);
        assert!(fresh.closed);

        // 排队的定位请求仍然交付
        assert_eq!(bridge.next_event().await, Some(BridgeEvent::LocationRequest));

        bridge.dispose();
        responder.await.unwrap();
    }

    #[tokio::test]
    async fn test_request_state_times_out() {
        let (mut bridge, _endpoint) = MapBridge::new(MeasurementController::default());
        let err = bridge
            .request_state(Duration::from_millis(30))
            .await
            .unwrap_err();
        assert!(matches!(err, BridgeError::Timeout { request_id: 1 }));
    }

    #[tokio::test]
    async fn test_dispose_discards_late_events() {
        let (mut bridge, endpoint) = MapBridge::new(MeasurementController::default());
        bridge.dispose();

        let _ = endpoint.events.unbounded_send(update_json(vec![A, B, C], None, None));
        assert_eq!(bridge.handle_raw(&update_json(vec![A, B, C], None, None)), None);
        assert_eq!(bridge.next_event().await, None);
        assert!(bridge.session().points().is_empty());
        assert!(matches!(bridge.reset(), Err(BridgeError::Cancelled)));
    }

    #[tokio::test]
    async fn test_cancel_handle_aborts_pending_wait() {
        let (mut bridge, _endpoint) = MapBridge::new(MeasurementController::default());
        let handle = bridge.cancel_handle();

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            handle.cancel();
        });

        let err = bridge
            .request_state(Duration::from_secs(5))
            .await
            .unwrap_err();
        assert!(matches!(err, BridgeError::Cancelled));
    }

    #[tokio::test]
    async fn test_share_location_sends_fix() {
        let (mut bridge, mut endpoint) = MapBridge::new(MeasurementController::default());
        let fix = GeoPoint::new(18.52, 73.85);
        let mut service = LocationService::new(FakeProvider::granted(Some(fix)), LocationConfig::default());

        assert_eq!(bridge.share_location(&mut service).await, Ok(fix));
        assert_eq!(
            endpoint.commands.next().await,
            Some(SurfaceCommand::SetUserLocation {
                latitude: 18.52,
                longitude: 73.85
            })
        );
    }

    #[tokio::test]
    async fn test_share_location_cancelled() {
        let (mut bridge, _endpoint) = MapBridge::new(MeasurementController::default());
        let mut service = LocationService::new(FakeProvider::granted(None), LocationConfig::default());
        let handle = bridge.cancel_handle();

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            handle.cancel();
        });

        assert_eq!(
            bridge.share_location(&mut service).await,
            Err(LocationError::Cancelled)
        );
    }
}
