//! 渲染面模型
//!
//! 进程内的渲染面实现：自己持有点序列、视图中心与用户位置标记，
//! 只通过桥接端点与控制器通信。每次状态变化后发送一条 `update` 事件，
//! 带实例 ID 与单调递增的修订号；响应 `requestState` 时回显关联 ID。
//! 非法坐标的点击不改变点序列。

use crate::bridge::SurfaceEndpoint;
use crate::protocol::{RequestId, SurfaceCommand, SurfaceEvent, UpdatePayload};
use acreage_core::controller::MeasurementController;
use acreage_core::geo::GeoPoint;
use acreage_core::session::{Command, Origin};
use futures::StreamExt;
use uuid::Uuid;

/// 渲染面
pub struct SurfaceModel {
    controller: MeasurementController,
    user_location: Option<GeoPoint>,
    /// 每次加载生成新的实例 ID
    surface_id: Uuid,
    revision: u64,
    endpoint: SurfaceEndpoint,
}

impl SurfaceModel {
    pub fn new(endpoint: SurfaceEndpoint, view_center: GeoPoint) -> Self {
        let mut controller = MeasurementController::new(Origin::MapDrawn);
        controller.set_view_center(view_center);
        Self {
            controller,
            user_location: None,
            surface_id: Uuid::new_v4(),
            revision: 0,
            endpoint,
        }
    }

    pub fn points(&self) -> &[GeoPoint] {
        self.controller.session().points().points()
    }

    pub fn is_closed(&self) -> bool {
        self.controller.session().is_closed()
    }

    pub fn view_center(&self) -> Option<GeoPoint> {
        self.controller.view_center()
    }

    pub fn user_location(&self) -> Option<GeoPoint> {
        self.user_location
    }

    pub fn surface_id(&self) -> Uuid {
        self.surface_id
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// 平移地图
    pub fn pan_to(&mut self, center: GeoPoint) {
        self.controller.set_view_center(center);
    }

    // ========== 用户交互 ==========

    /// 点击地图添加点
    pub fn tap(&mut self, point: GeoPoint) {
        self.controller.apply(Command::AddPoint(point));
        self.post_state(None);
    }

    /// Shift+点击：移动最近的点；没有点时按普通点击处理
    pub fn shift_tap(&mut self, point: GeoPoint) {
        if self.points().is_empty() {
            self.tap(point);
            return;
        }
        self.controller.apply(Command::EditNearest(point));
        self.post_state(None);
    }

    /// 点击定位按钮，向控制器请求用户位置
    pub fn press_locate(&mut self) {
        self.post(&SurfaceEvent::RequestLocation);
    }

    /// 发送任意原始消息
    pub fn post_raw(&mut self, raw: impl Into<String>) {
        if self.endpoint.events.unbounded_send(raw.into()).is_err() {
            tracing::debug!("Surface event dropped: controller gone");
        }
    }

    // ========== 命令处理 ==========

    pub fn handle_command(&mut self, command: SurfaceCommand) {
        tracing::trace!("<- controller: {}", command.name());
        match command {
            SurfaceCommand::AddPointAtCenter => self.apply(Command::AddPointAtCenter),
            SurfaceCommand::UndoLast => self.apply(Command::UndoLast),
            SurfaceCommand::CloseShape => self.apply(Command::CloseShape),
            SurfaceCommand::Reset => self.apply(Command::Reset),
            SurfaceCommand::ReplaceAll { points } => {
                if let Some(center) = centroid(&points) {
                    self.controller.set_view_center(center);
                }
                self.apply(Command::ReplaceAll(points));
            }
            SurfaceCommand::RequestState { request_id } => self.post_state(Some(request_id)),
            SurfaceCommand::SetUserLocation {
                latitude,
                longitude,
            } => {
                let location = GeoPoint::new(latitude, longitude);
                self.user_location = Some(location);
                self.controller.set_view_center(location);
            }
        }
    }

    /// 处理当前已排队的全部命令，返回处理数量
    pub fn pump(&mut self) -> usize {
        let mut handled = 0;
        while let Ok(Some(command)) = self.endpoint.commands.try_next() {
            self.handle_command(command);
            handled += 1;
        }
        handled
    }

    /// 持续处理命令，直到命令通道关闭
    pub async fn run(mut self) -> Self {
        while let Some(command) = self.endpoint.commands.next().await {
            self.handle_command(command);
        }
        self
    }

    fn apply(&mut self, command: Command) {
        self.controller.apply(command);
        self.post_state(None);
    }

    fn post_state(&mut self, request_id: Option<RequestId>) {
        self.revision += 1;
        let session = self.controller.session();
        let event = SurfaceEvent::Update(UpdatePayload {
            points: session.points().points().to_vec(),
            is_closed: session.is_closed(),
            area: *session.area(),
            distance_km: session.distance_km(),
            request_id,
            revision: Some(self.revision),
            surface_id: Some(self.surface_id),
        });
        self.post(&event);
    }

    fn post(&mut self, event: &SurfaceEvent) {
        match event.to_json() {
            Ok(json) => self.post_raw(json),
            Err(e) => tracing::error!("Failed to encode surface event: {}", e),
        }
    }
}

fn centroid(points: &[GeoPoint]) -> Option<GeoPoint> {
    if points.is_empty() {
        return None;
    }
    let n = points.len() as f64;
    Some(GeoPoint::new(
        points.iter().map(|p| p.latitude).sum::<f64>() / n,
        points.iter().map(|p| p.longitude).sum::<f64>() / n,
    ))
}
