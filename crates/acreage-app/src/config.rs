//! 应用配置
//!
//! 优先级：命令行参数 > `ACREAGE_*` 环境变量 > JSON 配置文件 > 默认值。

use acreage_core::geo::GeoPoint;
use anyhow::{anyhow, bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

const USAGE: &str = "Usage: acreage [--config <path>] [--base-url <url>] \
[--grower <id>] [--land <id>] [--center <lat,lon>] [--point <lat,lon>]... \
[--close] [--save] [--min-area-sqft <n>] [--settle-timeout-ms <ms>] \
[--log-level <level>]";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// 持久化服务地址
    pub base_url: String,
    pub grower_id: Option<String>,
    pub land_id: Option<String>,
    /// 初始视图中心
    pub center: GeoPoint,
    /// 依次点击的点
    pub points: Vec<GeoPoint>,
    pub close: bool,
    pub save: bool,
    pub min_area_sqft: f64,
    pub settle_timeout_ms: u64,
    pub http_timeout_ms: u64,
    pub log_level: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:3000".to_string(),
            grower_id: None,
            land_id: None,
            center: GeoPoint::new(18.5204, 73.8567),
            points: Vec::new(),
            close: false,
            save: false,
            min_area_sqft: 100.0,
            settle_timeout_ms: 2_000,
            http_timeout_ms: 10_000,
            log_level: "info".to_string(),
        }
    }
}

impl AppConfig {
    /// 从进程参数与环境变量加载
    pub fn load() -> Result<Self> {
        let args: Vec<String> = std::env::args().skip(1).collect();
        Self::resolve(&args, |key| std::env::var(key).ok())
    }

    pub fn resolve(args: &[String], env: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let path = config_path(args)?.or_else(|| env("ACREAGE_CONFIG").map(PathBuf::from));
        let mut config = match path {
            Some(path) => Self::from_file(&path)?,
            None => Self::default(),
        };
        config.apply_env(env)?;
        config.apply_args(args)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("Invalid config {}", path.display()))
    }

    fn apply_env(&mut self, env: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(v) = env("ACREAGE_BASE_URL") {
            self.base_url = v;
        }
        if let Some(v) = env("ACREAGE_GROWER_ID") {
            self.grower_id = Some(v);
        }
        if let Some(v) = env("ACREAGE_LAND_ID") {
            self.land_id = Some(v);
        }
        if let Some(v) = env("ACREAGE_MIN_AREA_SQFT") {
            self.min_area_sqft = v
                .parse()
                .with_context(|| "ACREAGE_MIN_AREA_SQFT must be a number".to_string())?;
        }
        if let Some(v) = env("ACREAGE_SETTLE_TIMEOUT_MS") {
            self.settle_timeout_ms = v
                .parse()
                .with_context(|| "ACREAGE_SETTLE_TIMEOUT_MS must be an integer".to_string())?;
        }
        if let Some(v) = env("ACREAGE_LOG_LEVEL") {
            self.log_level = v;
        }
        Ok(())
    }

    fn apply_args(&mut self, args: &[String]) -> Result<()> {
        let mut idx = 0;
        while idx < args.len() {
            let flag = args[idx].as_str();
            match flag {
                "--close" => self.close = true,
                "--save" => self.save = true,
                "-h" | "--help" => bail!(USAGE),
                _ => {
                    idx += 1;
                    let value = args
                        .get(idx)
                        .ok_or_else(|| anyhow!("{flag} requires a value\n\n{USAGE}"))?;
                    match flag {
                        "--config" => {}
                        "--base-url" => self.base_url = value.clone(),
                        "--grower" => self.grower_id = Some(value.clone()),
                        "--land" => self.land_id = Some(value.clone()),
                        "--center" => self.center = parse_point(value)?,
                        "--point" => self.points.push(parse_point(value)?),
                        "--min-area-sqft" => {
                            self.min_area_sqft = value
                                .parse()
                                .with_context(|| "--min-area-sqft must be a number".to_string())?
                        }
                        "--settle-timeout-ms" => {
                            self.settle_timeout_ms = value
                                .parse()
                                .with_context(|| "--settle-timeout-ms must be an integer".to_string())?
                        }
                        "--log-level" => self.log_level = value.clone(),
                        other => bail!("Unknown argument: {other}\n\n{USAGE}"),
                    }
                }
            }
            idx += 1;
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        self.center
            .validate()
            .map_err(|e| anyhow!("Invalid center: {e}"))?;
        if let Some(bad) = self.points.iter().find(|p| !p.is_valid()) {
            bail!("Invalid point ({}, {})", bad.latitude, bad.longitude);
        }
        if !self.min_area_sqft.is_finite() || self.min_area_sqft < 0.0 {
            bail!("min_area_sqft must be a non-negative number");
        }
        if self.save && self.land_id.is_none() {
            bail!("--save requires --land <id>");
        }
        Ok(())
    }

    pub fn settle_timeout(&self) -> Duration {
        Duration::from_millis(self.settle_timeout_ms)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_millis(self.http_timeout_ms)
    }

    pub fn log_level(&self) -> tracing::Level {
        self.log_level.parse().unwrap_or(tracing::Level::INFO)
    }
}

/// `--config` 需要在其他参数之前确定
fn config_path(args: &[String]) -> Result<Option<PathBuf>> {
    match args.iter().position(|a| a == "--config") {
        Some(idx) => {
            let value = args
                .get(idx + 1)
                .ok_or_else(|| anyhow!("--config requires a value"))?;
            Ok(Some(PathBuf::from(value)))
        }
        None => Ok(None),
    }
}

/// 解析 `lat,lon`
fn parse_point(value: &str) -> Result<GeoPoint> {
    let (lat, lon) = value
        .split_once(',')
        .ok_or_else(|| anyhow!("Expected <lat,lon>, got '{value}'"))?;
    let latitude: f64 = lat.trim().parse().with_context(|| format!("Invalid latitude '{lat}'"))?;
    let longitude: f64 = lon
        .trim()
        .parse()
        .with_context(|| format!("Invalid longitude '{lon}'"))?;
    GeoPoint::new(latitude, longitude)
        .validate()
        .map_err(|e| anyhow!("{e}"))
}
