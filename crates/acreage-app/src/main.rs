//! Acreage 主程序入口
//! 无界面测量驱动：加载已存储的地块坐标，按配置点击绘制，输出面积，可选保存

mod config;
mod notice;

use anyhow::Result;
use tracing::info;
use tracing_subscriber::FmtSubscriber;

use acreage_bridge::bridge::MapBridge;
use acreage_bridge::surface::SurfaceModel;
use acreage_core::controller::MeasurementController;
use acreage_core::session::{MeasurementSession, Origin};
use acreage_file::endpoint::{HttpLandStore, LandStore};
use acreage_file::pipeline::{SaveConfig, SavePipeline};
use config::AppConfig;
use notice::Notice;

#[tokio::main]
async fn main() -> Result<()> {
    let config = AppConfig::load()?;

    // 初始化日志
    tracing::subscriber::set_global_default(
        FmtSubscriber::builder()
            .with_max_level(config.log_level())
            .finish(),
    )?;

    info!("Starting Acreage...");

    let store = HttpLandStore::new(config.base_url.clone(), config.http_timeout())?;
    let (mut bridge, endpoint) = MapBridge::new(MeasurementController::new(Origin::MapDrawn));
    let mut surface = SurfaceModel::new(endpoint, config.center);

    // 加载已存储的坐标
    if let (Some(grower_id), Some(land_id)) = (&config.grower_id, &config.land_id) {
        info!("Loading land coordinates...");
        match store.fetch_coordinates(grower_id, land_id).await {
            Ok(points) if !points.is_empty() => {
                bridge.replace_all(points)?;
                surface.pump();
            }
            Ok(_) => info!("No stored coordinates for land {}", land_id),
            Err(e) => Notice::from(&e).log(),
        }
    }

    for point in &config.points {
        surface.tap(*point);
    }
    if config.close {
        bridge.close_shape()?;
        surface.pump();
    }

    let surface_task = tokio::spawn(surface.run());

    match bridge.request_state(config.settle_timeout()).await {
        Ok(_) => print_metrics(bridge.session()),
        Err(e) => Notice::from(&e).log(),
    }

    if config.save {
        if let Some(land_id) = &config.land_id {
            let pipeline = SavePipeline::new(
                store,
                SaveConfig {
                    min_area_sqft: config.min_area_sqft,
                    settle_timeout: config.settle_timeout(),
                },
            );
            let notice = match pipeline.save(land_id, &mut bridge).await {
                Ok(_) => Notice::success("Saved", "Saved successfully"),
                Err(e) => Notice::from(&e),
            };
            notice.log();
            println!("{notice}");
        }
    }

    bridge.dispose();
    let surface = surface_task.await?;
    info!("Surface closed at revision {}", surface.revision());
    Ok(())
}

fn print_metrics(session: &MeasurementSession) {
    let area = session.area();
    println!("Points:   {} ({})", session.points().len(), session.state().name());
    println!("Distance: {:.3} km", session.distance_km());
    println!("Area:     {:.2} sq.ft", area.square_feet);
    println!("          {:.2} gunta", area.gunta);
    println!("          {:.4} acre", area.acre);
    println!("          {:.4} ha", area.hectare);
}
