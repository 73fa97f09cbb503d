//! 引擎全局配置
//!
//! 所有参数扁平化，直接在代码中修改默认值即可。

use once_cell::sync::Lazy;
use std::sync::RwLock;

use crate::animation::StringCodec;

/// 动作引擎配置（扁平化，不嵌套）
#[derive(Debug, Clone)]
pub struct MotionConfig {
    // ========== 插值 ==========
    /// 插值表细分数 s（表长 s+1），默认 256
    /// 只影响之后重建的插值表
    pub interpolation_subdivisions: usize,

    // ========== 保存 ==========
    /// 新建 Motion 的字符串编码，默认 UTF-8
    pub default_encoding: StringCodec,
    /// 保存时写入的场景 FPS，默认 30.0
    pub default_scene_fps: f32,

    // ========== 调试 ==========
    /// 是否输出逐段解析日志，默认 false
    pub debug_log: bool,
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            // 细分越大 → 曲线越精确，每条非线性通道占用 (s+1) * 4 字节
            interpolation_subdivisions: 256,

            default_encoding: StringCodec::Utf8,
            default_scene_fps: 30.0,

            debug_log: false,
        }
    }
}

/// 全局配置实例
static MOTION_CONFIG: Lazy<RwLock<MotionConfig>> =
    Lazy::new(|| RwLock::new(MotionConfig::default()));

/// 获取当前配置（只读）
pub fn get_config() -> MotionConfig {
    match MOTION_CONFIG.read() {
        Ok(guard) => guard.clone(),
        Err(poisoned) => poisoned.into_inner().clone(),
    }
}

/// 手动设置配置（用于运行时调试）
pub fn set_config(config: MotionConfig) {
    match MOTION_CONFIG.write() {
        Ok(mut guard) => *guard = config,
        Err(poisoned) => *poisoned.into_inner() = config,
    }
}

/// 重置为默认配置
pub fn reset_config() {
    set_config(MotionConfig::default());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values() {
        let config = MotionConfig::default();
        assert_eq!(config.interpolation_subdivisions, 256);
        assert_eq!(config.default_encoding, StringCodec::Utf8);
        assert!((config.default_scene_fps - 30.0).abs() < f32::EPSILON);
        assert!(!config.debug_log);
    }
}
