//! 求值结果的推送目标
//!
//! 动作本身不持有场景或模型；求值后通过这两个 trait 把结果写给调用方。

use glam::{Quat, Vec3, Vec4};

use super::motion_track::{
    AssetFrameTransform, CameraFrameTransform, LightFrameTransform, ModelFrameState,
    ProjectFrameState,
};

/// 场景（相机 / 光照 / 工程）
pub trait SceneTarget {
    fn set_camera(&mut self, camera: &CameraFrameTransform);

    fn set_light(&mut self, light: &LightFrameTransform);

    fn set_project(&mut self, _project: &ProjectFrameState) {}
}

/// 模型（骨骼 / Morph / 模型状态 / 特效 / 配件）
pub trait ModelTarget {
    /// 用于与 `Motion::set_parent_model_ref` 比对
    fn name(&self) -> &str;

    fn set_bone_translation(&mut self, bone_name: &str, translation: Vec3);

    fn set_bone_rotation(&mut self, bone_name: &str, rotation: Quat);

    fn set_morph_weight(&mut self, morph_name: &str, weight: f32);

    fn set_model_state(&mut self, _state: &ModelFrameState) {}

    fn set_ik_enabled(&mut self, _bone_name: &str, _enabled: bool) {}

    fn set_effect_parameter(&mut self, _parameter_name: &str, _value: Vec4) {}

    fn set_asset_transform(&mut self, _asset: &AssetFrameTransform) {}
}
