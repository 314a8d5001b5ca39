//! 测量状态机
//!
//! 状态: `Empty` (0 点) → `Open` (未闭合) → `Closed` (≥3 点且首尾重合)。
//!
//! 每条命令执行后都会重新计算面积与距离，并向所有订阅者广播 `StateUpdate`。
//! 不满足前置条件的命令不会报错，按空操作处理。

use crate::geo::GeoPoint;
use crate::session::{Command, MeasurementSession, Origin, ShapeState, StateUpdate};
use futures::channel::mpsc;

/// 测量控制器
pub struct MeasurementController {
    session: MeasurementSession,
    /// 渲染面当前视图中心
    view_center: Option<GeoPoint>,
    subscribers: Vec<mpsc::UnboundedSender<StateUpdate>>,
}

impl MeasurementController {
    pub fn new(origin: Origin) -> Self {
        Self {
            session: MeasurementSession::new(origin),
            view_center: None,
            subscribers: Vec::new(),
        }
    }

    /// 用已存储的坐标预置会话
    pub fn with_points(origin: Origin, points: Vec<GeoPoint>) -> Self {
        let mut controller = Self::new(origin);
        controller.apply(Command::ReplaceAll(points));
        controller
    }

    pub fn session(&self) -> &MeasurementSession {
        &self.session
    }

    pub fn state(&self) -> ShapeState {
        self.session.state()
    }

    pub fn view_center(&self) -> Option<GeoPoint> {
        self.view_center
    }

    /// 记录渲染面的视图中心，供 `AddPointAtCenter` 使用
    pub fn set_view_center(&mut self, center: GeoPoint) {
        self.view_center = Some(center);
    }

    /// 订阅状态更新
    pub fn subscribe(&mut self) -> mpsc::UnboundedReceiver<StateUpdate> {
        let (sender, receiver) = mpsc::unbounded();
        self.subscribers.push(sender);
        receiver
    }

    /// 用渲染面上报的点序列覆盖镜像
    pub fn mirror(&mut self, points: Vec<GeoPoint>) -> StateUpdate {
        tracing::trace!("Mirroring {} points from surface", points.len());
        self.apply(Command::ReplaceAll(points))
    }

    /// 执行命令
    pub fn apply(&mut self, command: Command) -> StateUpdate {
        let name = command.name();
        let changed = match command {
            Command::AddPoint(p) => self.add_point(p),
            Command::AddPointAtCenter => match self.view_center {
                Some(center) => self.add_point(center),
                None => false,
            },
            Command::UndoLast => self.undo_last(),
            Command::CloseShape => self.close_shape(),
            Command::Reset => {
                self.session.polygon_mut().clear();
                true
            }
            Command::ReplaceAll(points) => {
                self.session.polygon_mut().replace(points);
                true
            }
            Command::EditNearest(p) => self.edit_nearest(p),
        };

        if !changed {
            tracing::debug!("{} ignored in state {}", name, self.state().name());
        }

        self.session.recompute();
        let update = self.session.snapshot();
        self.broadcast(&update);
        update
    }

    fn add_point(&mut self, point: GeoPoint) -> bool {
        if !point.is_valid() {
            tracing::warn!("Ignoring invalid point ({}, {})", point.latitude, point.longitude);
            return false;
        }
        let polygon = self.session.polygon_mut();
        // 与上一点重合只在构成闭合时允许，已闭合的环不再追加闭合点
        if polygon.last() == Some(&point) {
            let closes =
                !polygon.is_closed() && polygon.len() >= 3 && polygon.first() == Some(&point);
            if !closes {
                return false;
            }
        }
        polygon.push(point);
        true
    }

    fn undo_last(&mut self) -> bool {
        self.session.polygon_mut().pop().is_some()
    }

    fn close_shape(&mut self) -> bool {
        let polygon = self.session.polygon_mut();
        if polygon.len() < 3 || polygon.is_closed() {
            return false;
        }
        match polygon.first().copied() {
            Some(first) => {
                polygon.push(first);
                true
            }
            None => false,
        }
    }

    fn edit_nearest(&mut self, point: GeoPoint) -> bool {
        if !point.is_valid() {
            tracing::warn!("Ignoring invalid point ({}, {})", point.latitude, point.longitude);
            return false;
        }
        let polygon = self.session.polygon_mut();
        let closed = polygon.is_closed();
        let Some(index) = polygon.nearest_index(&point) else {
            return false;
        };

        let last = polygon.len() - 1;
        if closed && (index == 0 || index == last) {
            // 首点与闭合点同步修改，保持闭合
            polygon.set(0, point);
            polygon.set(last, point);
        } else {
            polygon.set(index, point);
        }
        true
    }

    fn broadcast(&mut self, update: &StateUpdate) {
        self.subscribers
            .retain(|sender| sender.unbounded_send(update.clone()).is_ok());
    }
}

impl Default for MeasurementController {
    fn default() -> Self {
        Self::new(Origin::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const A: GeoPoint = GeoPoint::new(0.0, 0.0);
    const B: GeoPoint = GeoPoint::new(0.0, 0.001);
    const C: GeoPoint = GeoPoint::new(0.001, 0.001);

    fn triangle() -> MeasurementController {
        let mut ctrl = MeasurementController::new(Origin::MapDrawn);
        for p in [A, B, C] {
            ctrl.apply(Command::AddPoint(p));
        }
        ctrl
    }

    #[test]
    fn test_state_progression() {
        let mut ctrl = MeasurementController::default();
        assert_eq!(ctrl.state(), ShapeState::Empty);

        ctrl.apply(Command::AddPoint(A));
        assert_eq!(ctrl.state(), ShapeState::Open);
        assert!(ctrl.session().area().is_zero());

        ctrl.apply(Command::AddPoint(B));
        ctrl.apply(Command::AddPoint(C));
        assert_eq!(ctrl.state(), ShapeState::Open);
        assert!(!ctrl.session().area().is_zero());

        ctrl.apply(Command::AddPoint(A));
        assert_eq!(ctrl.state(), ShapeState::Closed);
    }

    #[test]
    fn test_close_shape() {
        let mut ctrl = triangle();
        let update = ctrl.apply(Command::CloseShape);
        assert_eq!(update.points, vec![A, B, C, A]);
        assert!(update.closed);

        // 已闭合时再次闭合无效
        let again = ctrl.apply(Command::CloseShape);
        assert_eq!(again.points.len(), 4);
    }

    #[test]
    fn test_close_shape_needs_three_points() {
        let mut ctrl = MeasurementController::default();
        ctrl.apply(Command::AddPoint(A));
        ctrl.apply(Command::AddPoint(B));
        let update = ctrl.apply(Command::CloseShape);
        assert_eq!(update.points, vec![A, B]);
        assert!(!update.closed);
    }

    #[test]
    fn test_undo_reopens_and_close_restores() {
        let mut ctrl = triangle();
        let closed = ctrl.apply(Command::CloseShape);

        let reopened = ctrl.apply(Command::UndoLast);
        assert_eq!(reopened.points, vec![A, B, C]);
        assert!(!reopened.closed);
        assert_eq!(ctrl.state(), ShapeState::Open);

        let restored = ctrl.apply(Command::CloseShape);
        assert_eq!(restored, closed);
    }

    #[test]
    fn test_undo_on_empty_is_noop() {
        let mut ctrl = MeasurementController::default();
        let update = ctrl.apply(Command::UndoLast);
        assert!(update.points.is_empty());
        assert_eq!(ctrl.state(), ShapeState::Empty);
    }

    #[test]
    fn test_replace_all_then_reset() {
        let mut ctrl = MeasurementController::default();
        let update = ctrl.apply(Command::ReplaceAll(vec![A, B, C, A]));
        assert!(update.closed);

        let update = ctrl.apply(Command::Reset);
        assert!(update.points.is_empty());
        assert!(!update.closed);
        assert!(update.area.is_zero());
        assert_eq!(update.distance_km, 0.0);
        assert_eq!(ctrl.state(), ShapeState::Empty);
    }

    #[test]
    fn test_edit_nearest_closing_point_keeps_closure() {
        let mut ctrl = triangle();
        ctrl.apply(Command::CloseShape);

        let moved = GeoPoint::new(-0.0001, -0.0001);
        let update = ctrl.apply(Command::EditNearest(moved));
        assert_eq!(update.points.first(), Some(&moved));
        assert_eq!(update.points.last(), Some(&moved));
        assert!(update.closed);
    }

    #[test]
    fn test_edit_nearest_interior_point() {
        let mut ctrl = triangle();
        let moved = GeoPoint::new(0.0011, 0.0012);
        let update = ctrl.apply(Command::EditNearest(moved));
        assert_eq!(update.points, vec![A, B, moved]);
    }

    #[test]
    fn test_duplicate_consecutive_point_ignored() {
        let mut ctrl = MeasurementController::default();
        ctrl.apply(Command::AddPoint(A));
        let update = ctrl.apply(Command::AddPoint(A));
        assert_eq!(update.points, vec![A]);
    }

    #[test]
    fn test_closed_ring_rejects_second_closing_point() {
        let mut ctrl = triangle();
        ctrl.apply(Command::CloseShape);

        let update = ctrl.apply(Command::AddPoint(A));
        assert_eq!(update.points, vec![A, B, C, A]);

        let reopened = ctrl.apply(Command::UndoLast);
        assert_eq!(reopened.points, vec![A, B, C]);
        assert!(!reopened.closed);
        assert_eq!(ctrl.state(), ShapeState::Open);
    }

    #[test]
    fn test_invalid_points_are_ignored() {
        let mut ctrl = triangle();
        let before = ctrl.session().snapshot();

        for bad in [
            GeoPoint::new(f64::NAN, 0.0),
            GeoPoint::new(0.0, f64::INFINITY),
            GeoPoint::new(91.0, 0.0),
        ] {
            assert_eq!(ctrl.apply(Command::AddPoint(bad)), before);
            assert_eq!(ctrl.apply(Command::EditNearest(bad)), before);
        }
    }

    #[test]
    fn test_add_point_at_center_requires_view_center() {
        let mut ctrl = MeasurementController::default();
        assert!(ctrl.apply(Command::AddPointAtCenter).points.is_empty());

        ctrl.set_view_center(B);
        assert_eq!(ctrl.apply(Command::AddPointAtCenter).points, vec![B]);
    }

    #[test]
    fn test_subscribers_receive_every_update() {
        let mut ctrl = MeasurementController::default();
        let mut rx = ctrl.subscribe();

        ctrl.apply(Command::AddPoint(A));
        ctrl.apply(Command::UndoLast);
        ctrl.apply(Command::UndoLast);

        let mut received = Vec::new();
        while let Ok(Some(update)) = rx.try_next() {
            received.push(update.points.len());
        }
        assert_eq!(received, vec![1, 0, 0]);
    }

    #[test]
    fn test_dropped_subscriber_is_pruned() {
        let mut ctrl = MeasurementController::default();
        drop(ctrl.subscribe());
        ctrl.apply(Command::AddPoint(A));
        assert!(ctrl.subscribers.is_empty());
    }
}
