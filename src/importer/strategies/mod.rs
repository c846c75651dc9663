// ==========================================
// 调查数据导入管道 - 导入策略（每个导入目标一个）
// ==========================================
// 约定: 先收集去重键 → 每类参考数据批量获取一次 → 再逐行校验
// 策略内不打日志，阶段日志由编排器负责
// ==========================================

pub mod capture;
pub mod common;
pub mod critter;
pub mod marking;
pub mod measurement;
pub mod telemetry;

pub use capture::{capture_column_spec, CaptureImportStrategy};
pub use common::ImportSettings;
pub use critter::{critter_column_spec, CritterImportStrategy};
pub use marking::{marking_column_spec, MarkingImportStrategy};
pub use measurement::{measurement_column_spec, MeasurementImportStrategy};
pub use telemetry::{telemetry_column_spec, TelemetryImportStrategy};
