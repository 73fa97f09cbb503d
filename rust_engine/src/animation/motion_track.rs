//! 动画轨道
//!
//! 存储单条轨道（一个种类、一个名称、一个层）的全部关键帧，按时间升序排列，
//! 并提供查找与插值求值。

use std::collections::BTreeMap;
use std::fmt::Debug;

use glam::{Quat, Vec3, Vec4};

use super::interpolation::{lerp_f32, SmoothPrecision};
use super::keyframe::{
    AssetKeyframe, BoneKeyframe, CameraKeyframe, EffectKeyframe, LayerIndex, LightKeyframe,
    ModelKeyframe, MorphKeyframe, ProjectKeyframe, TimeIndex,
};

/// 可放入轨道的关键帧
pub trait TrackKeyframe: Clone + Debug {
    /// 求值结果
    type Frame: Clone + Debug;

    fn time_index(&self) -> TimeIndex;

    fn layer_index(&self) -> LayerIndex {
        0
    }

    /// 关键帧自身的值
    fn frame(&self) -> Self::Frame;

    /// 在 from 与 to 之间插值，`coef` 为归一化时间；
    /// 缓动曲线取自 `to` 的插值表
    fn interpolate(from: &Self, to: &Self, coef: SmoothPrecision) -> Self::Frame;
}

/// 多层叠加
pub trait LayeredFrame {
    fn accumulate(&mut self, layer: &Self);
}

/// 骨骼帧变换结果
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoneFrameTransform {
    pub translation: Vec3,
    pub orientation: Quat,
}

impl Default for BoneFrameTransform {
    fn default() -> Self {
        Self {
            translation: Vec3::ZERO,
            orientation: Quat::IDENTITY,
        }
    }
}

impl LayeredFrame for BoneFrameTransform {
    fn accumulate(&mut self, layer: &Self) {
        self.translation += layer.translation;
        self.orientation = self.orientation * layer.orientation;
    }
}

impl LayeredFrame for f32 {
    fn accumulate(&mut self, layer: &Self) {
        *self += *layer;
    }
}

impl LayeredFrame for Vec4 {
    fn accumulate(&mut self, layer: &Self) {
        *self += *layer;
    }
}

/// 相机帧变换结果
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraFrameTransform {
    pub look_at: Vec3,
    /// 欧拉角，弧度：pitch, yaw, roll
    pub angle: Vec3,
    pub distance: f32,
    pub fov: f32,
    pub is_perspective: bool,
}

impl Default for CameraFrameTransform {
    fn default() -> Self {
        Self {
            look_at: Vec3::ZERO,
            angle: Vec3::ZERO,
            distance: 0.0,
            fov: 30.0,
            is_perspective: true,
        }
    }
}

impl CameraFrameTransform {
    /// 相机位置：围绕 look_at 按 angle 旋转，distance 为距离
    pub fn position(&self) -> Vec3 {
        let (sin_x, cos_x) = self.angle.x.sin_cos();
        let (sin_y, cos_y) = self.angle.y.sin_cos();

        let offset = Vec3::new(
            -self.distance * cos_x * sin_y,
            self.distance * sin_x,
            -self.distance * cos_x * cos_y,
        );
        self.look_at + offset
    }
}

/// 光照帧
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightFrameTransform {
    pub color: Vec3,
    pub direction: Vec3,
}

/// 配件帧
#[derive(Debug, Clone, PartialEq)]
pub struct AssetFrameTransform {
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale_factor: f32,
    pub opacity: f32,
    pub visible: bool,
    pub shadow_enabled: bool,
    pub add_blend_enabled: bool,
    pub parent_model_name: Option<String>,
    pub parent_bone_name: Option<String>,
}

/// 模型状态帧
#[derive(Debug, Clone, PartialEq)]
pub struct ModelFrameState {
    pub visible: bool,
    pub shadow_enabled: bool,
    pub add_blend_enabled: bool,
    pub physics_enabled: bool,
    pub physics_still_mode: u8,
    pub edge_width: f32,
    pub edge_color: Vec4,
    pub ik_enabled: BTreeMap<String, bool>,
}

/// 工程帧
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProjectFrameState {
    pub gravity_factor: f32,
    pub gravity_direction: Vec3,
    pub shadow_mode: i32,
    pub shadow_distance: f32,
    pub shadow_depth: f32,
}

/// 逐分量线性插值
fn lerp_element_wise(a: Vec3, b: Vec3, amounts: Vec3) -> Vec3 {
    Vec3::new(
        lerp_f32(a.x, b.x, amounts.x),
        lerp_f32(a.y, b.y, amounts.y),
        lerp_f32(a.z, b.z, amounts.z),
    )
}

/// 四元数逐分量线性插值（不做球面插值，也不归一化）
fn lerp_quat(a: Quat, b: Quat, amount: f32) -> Quat {
    Quat::from_vec4(Vec4::from(a).lerp(Vec4::from(b), amount))
}

impl TrackKeyframe for BoneKeyframe {
    type Frame = BoneFrameTransform;

    fn time_index(&self) -> TimeIndex {
        self.time_index
    }

    fn layer_index(&self) -> LayerIndex {
        self.layer_index
    }

    fn frame(&self) -> Self::Frame {
        BoneFrameTransform {
            translation: self.translation,
            orientation: self.rotation,
        }
    }

    fn interpolate(from: &Self, to: &Self, coef: SmoothPrecision) -> Self::Frame {
        let [ix, iy, iz, ir] = &to.interpolation;
        let amounts = Vec3::new(ix.weight_at(coef), iy.weight_at(coef), iz.weight_at(coef));
        BoneFrameTransform {
            translation: lerp_element_wise(from.translation, to.translation, amounts),
            orientation: lerp_quat(from.rotation, to.rotation, ir.weight_at(coef)),
        }
    }
}

impl TrackKeyframe for MorphKeyframe {
    type Frame = f32;

    fn time_index(&self) -> TimeIndex {
        self.time_index
    }

    fn layer_index(&self) -> LayerIndex {
        self.layer_index
    }

    fn frame(&self) -> Self::Frame {
        self.weight
    }

    fn interpolate(from: &Self, to: &Self, coef: SmoothPrecision) -> Self::Frame {
        lerp_f32(from.weight, to.weight, to.interpolation.weight_at(coef))
    }
}

impl TrackKeyframe for CameraKeyframe {
    type Frame = CameraFrameTransform;

    fn time_index(&self) -> TimeIndex {
        self.time_index
    }

    fn frame(&self) -> Self::Frame {
        CameraFrameTransform {
            look_at: self.look_at,
            angle: self.angle,
            distance: self.distance,
            fov: self.fov,
            is_perspective: self.is_perspective,
        }
    }

    fn interpolate(from: &Self, to: &Self, coef: SmoothPrecision) -> Self::Frame {
        let [ix, iy, iz, ir, id, ifov] = &to.interpolation;

        let look_at_amounts = Vec3::new(ix.weight_at(coef), iy.weight_at(coef), iz.weight_at(coef));
        let angle_amount = ir.weight_at(coef);

        CameraFrameTransform {
            look_at: lerp_element_wise(from.look_at, to.look_at, look_at_amounts),
            angle: from.angle.lerp(to.angle, angle_amount),
            distance: lerp_f32(from.distance, to.distance, id.weight_at(coef)),
            fov: lerp_f32(from.fov, to.fov, ifov.weight_at(coef)),
            is_perspective: from.is_perspective,
        }
    }
}

impl TrackKeyframe for LightKeyframe {
    type Frame = LightFrameTransform;

    fn time_index(&self) -> TimeIndex {
        self.time_index
    }

    fn frame(&self) -> Self::Frame {
        LightFrameTransform {
            color: self.color,
            direction: self.direction,
        }
    }

    fn interpolate(from: &Self, to: &Self, coef: SmoothPrecision) -> Self::Frame {
        let amount = to.interpolation.weight_at(coef);
        LightFrameTransform {
            color: from.color.lerp(to.color, amount),
            direction: from.direction.lerp(to.direction, amount),
        }
    }
}

impl TrackKeyframe for AssetKeyframe {
    type Frame = AssetFrameTransform;

    fn time_index(&self) -> TimeIndex {
        self.time_index
    }

    fn frame(&self) -> Self::Frame {
        AssetFrameTransform {
            translation: self.translation,
            rotation: self.rotation,
            scale_factor: self.scale_factor,
            opacity: self.opacity,
            visible: self.visible,
            shadow_enabled: self.shadow_enabled,
            add_blend_enabled: self.add_blend_enabled,
            parent_model_name: self.parent_model_name.clone(),
            parent_bone_name: self.parent_bone_name.clone(),
        }
    }

    fn interpolate(from: &Self, to: &Self, coef: SmoothPrecision) -> Self::Frame {
        let amount = to.interpolation.weight_at(coef);
        AssetFrameTransform {
            translation: from.translation.lerp(to.translation, amount),
            rotation: lerp_quat(from.rotation, to.rotation, amount),
            scale_factor: lerp_f32(from.scale_factor, to.scale_factor, amount),
            opacity: lerp_f32(from.opacity, to.opacity, amount),
            ..from.frame()
        }
    }
}

impl TrackKeyframe for EffectKeyframe {
    type Frame = Vec4;

    fn time_index(&self) -> TimeIndex {
        self.time_index
    }

    fn frame(&self) -> Self::Frame {
        self.value
    }

    fn interpolate(from: &Self, to: &Self, coef: SmoothPrecision) -> Self::Frame {
        from.value.lerp(to.value, to.interpolation.weight_at(coef))
    }
}

impl TrackKeyframe for ModelKeyframe {
    type Frame = ModelFrameState;

    fn time_index(&self) -> TimeIndex {
        self.time_index
    }

    fn frame(&self) -> Self::Frame {
        ModelFrameState {
            visible: self.visible,
            shadow_enabled: self.shadow_enabled,
            add_blend_enabled: self.add_blend_enabled,
            physics_enabled: self.physics_enabled,
            physics_still_mode: self.physics_still_mode,
            edge_width: self.edge_width,
            edge_color: self.edge_color,
            ik_enabled: self.ik_enabled.clone(),
        }
    }

    fn interpolate(from: &Self, to: &Self, coef: SmoothPrecision) -> Self::Frame {
        // 开关类状态不插值，沿用 from
        let amount = to.interpolation.weight_at(coef);
        ModelFrameState {
            edge_width: lerp_f32(from.edge_width, to.edge_width, amount),
            edge_color: from.edge_color.lerp(to.edge_color, amount),
            ..from.frame()
        }
    }
}

impl TrackKeyframe for ProjectKeyframe {
    type Frame = ProjectFrameState;

    fn time_index(&self) -> TimeIndex {
        self.time_index
    }

    fn frame(&self) -> Self::Frame {
        ProjectFrameState {
            gravity_factor: self.gravity_factor,
            gravity_direction: self.gravity_direction,
            shadow_mode: self.shadow_mode,
            shadow_distance: self.shadow_distance,
            shadow_depth: self.shadow_depth,
        }
    }

    fn interpolate(from: &Self, to: &Self, coef: SmoothPrecision) -> Self::Frame {
        let amount = to.interpolation.weight_at(coef);
        ProjectFrameState {
            gravity_factor: lerp_f32(from.gravity_factor, to.gravity_factor, amount),
            gravity_direction: from.gravity_direction.lerp(to.gravity_direction, amount),
            shadow_mode: from.shadow_mode,
            shadow_distance: lerp_f32(from.shadow_distance, to.shadow_distance, amount),
            shadow_depth: lerp_f32(from.shadow_depth, to.shadow_depth, amount),
        }
    }
}

/// 单条关键帧轨道
///
/// `last_index` 只是查找提示：顺序播放时从上次位置向后探测，
/// 命中失败则回退到二分查找，结果不依赖提示。
#[derive(Debug, Clone)]
pub struct KeyframeTrack<K> {
    keyframes: Vec<K>,
    last_index: usize,
}

impl<K> Default for KeyframeTrack<K> {
    fn default() -> Self {
        Self {
            keyframes: Vec::new(),
            last_index: 0,
        }
    }
}

impl<K: TrackKeyframe> KeyframeTrack<K> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.keyframes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keyframes.is_empty()
    }

    pub fn keyframes(&self) -> &[K] {
        &self.keyframes
    }

    pub fn get(&self, index: usize) -> Option<&K> {
        self.keyframes.get(index)
    }

    /// 插入关键帧并保持时间升序（同时间按插入顺序）
    pub fn insert(&mut self, keyframe: K) {
        self.keyframes.push(keyframe);
        self.sort();
    }

    /// 批量追加，最后统一排序
    pub fn extend<I: IntoIterator<Item = K>>(&mut self, keyframes: I) {
        self.keyframes.extend(keyframes);
        self.sort();
    }

    pub fn remove(&mut self, index: usize) -> K {
        self.last_index = 0;
        self.keyframes.remove(index)
    }

    pub fn position<P: FnMut(&K) -> bool>(&self, predicate: P) -> Option<usize> {
        self.keyframes.iter().position(predicate)
    }

    pub fn max_time_index(&self) -> TimeIndex {
        self.keyframes.last().map(|k| k.time_index()).unwrap_or(0.0)
    }

    pub fn clear_search_hint(&mut self) {
        self.last_index = 0;
    }

    fn sort(&mut self) {
        self.keyframes
            .sort_by(|a, b| a.time_index().total_cmp(&b.time_index()));
        self.last_index = 0;
    }

    /// 最后一个 time_index <= t 的位置；t 早于首帧时为 0
    fn find_from_index(&self, time_index: TimeIndex) -> usize {
        let keyframes = &self.keyframes;
        let len = keyframes.len();
        let hint = self.last_index.min(len - 1);

        if keyframes[hint].time_index() <= time_index {
            let next = hint + 1;
            if next >= len || keyframes[next].time_index() > time_index {
                return hint;
            }
            if next + 1 >= len || keyframes[next + 1].time_index() > time_index {
                return next;
            }
        }

        keyframes
            .partition_point(|k| k.time_index() <= time_index)
            .saturating_sub(1)
    }

    /// 查找前后关键帧位置 (from, to)；到达末尾时 from == to
    pub fn search_closest(&self, time_index: TimeIndex) -> Option<(usize, usize)> {
        if self.keyframes.is_empty() {
            return None;
        }
        let from = self.find_from_index(time_index);
        let to = (from + 1).min(self.keyframes.len() - 1);
        Some((from, to))
    }

    /// 求值；空轨道返回 None
    pub fn seek(&mut self, time_index: TimeIndex) -> Option<K::Frame> {
        let (from_index, to_index) = self.search_closest(time_index)?;
        self.last_index = from_index;

        let from = &self.keyframes[from_index];
        let to = &self.keyframes[to_index];
        let from_time = from.time_index();
        let to_time = to.time_index();

        // 早于 from、到达末尾或相邻帧（间隔不超过 1）时不插值
        if time_index <= from_time || to_time - from_time <= 1.0 {
            return Some(from.frame());
        }

        let coef = ((time_index - from_time) / (to_time - from_time)) as SmoothPrecision;
        Some(K::interpolate(from, to, coef))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::interpolation::InterpolationParameter;
    use crate::animation::keyframe::CameraInterpolationType;

    fn camera(time_index: TimeIndex, distance: f32) -> CameraKeyframe {
        let mut keyframe = CameraKeyframe::new(time_index);
        keyframe.distance = distance;
        keyframe
    }

    #[test]
    fn test_insert_keeps_ascending_order() {
        let mut track = KeyframeTrack::new();
        for t in [30.0, 0.0, 15.0, 5.0, 15.0] {
            track.insert(camera(t, t as f32));
        }
        let times: Vec<_> = track.keyframes().iter().map(|k| k.time_index).collect();
        assert_eq!(times, vec![0.0, 5.0, 15.0, 15.0, 30.0]);
        assert_eq!(track.max_time_index(), 30.0);
    }

    #[test]
    fn test_empty_track_seek_returns_none() {
        let mut track: KeyframeTrack<CameraKeyframe> = KeyframeTrack::new();
        assert!(track.seek(3.0).is_none());
    }

    #[test]
    fn test_linear_distance_interpolation() {
        let mut track = KeyframeTrack::new();
        track.insert(camera(0.0, 10.0));
        track.insert(camera(10.0, 20.0));
        let frame = track.seek(5.0).unwrap();
        assert!((frame.distance - 15.0).abs() < 1e-5);
    }

    #[test]
    fn test_full_range_parameter_is_still_linear() {
        let mut track = KeyframeTrack::new();
        track.insert(camera(0.0, 10.0));
        let mut to = camera(10.0, 20.0);
        to.set_interpolation_parameter(
            CameraInterpolationType::Distance,
            InterpolationParameter::new(0, 0, 127, 127),
        );
        track.insert(to);
        let frame = track.seek(5.0).unwrap();
        assert!((frame.distance - 15.0).abs() < 1e-5);
    }

    #[test]
    fn test_curve_uses_destination_table() {
        let mut from = camera(0.0, 0.0);
        // from 的曲线不应影响结果
        from.set_interpolation_parameter(
            CameraInterpolationType::Distance,
            InterpolationParameter::new(127, 0, 127, 0),
        );
        let mut to = camera(10.0, 100.0);
        to.set_interpolation_parameter(
            CameraInterpolationType::Distance,
            InterpolationParameter::new(63, 0, 64, 127),
        );
        let mut track = KeyframeTrack::new();
        track.insert(from);
        track.insert(to);

        let early = track.seek(2.0).unwrap().distance;
        assert!(early < 20.0);
        let middle = track.seek(5.0).unwrap().distance;
        assert!((middle - 50.0).abs() < 1.0);
    }

    #[test]
    fn test_adjacent_frames_are_not_interpolated() {
        let mut track = KeyframeTrack::new();
        track.insert(camera(5.0, 1.0));
        track.insert(camera(5.5, 2.0));
        let frame = track.seek(5.2).unwrap();
        assert_eq!(frame.distance, 1.0);
    }

    #[test]
    fn test_before_first_and_after_last() {
        let mut track = KeyframeTrack::new();
        track.insert(camera(10.0, 1.0));
        track.insert(camera(20.0, 2.0));
        assert_eq!(track.seek(3.0).unwrap().distance, 1.0);
        assert_eq!(track.seek(25.0).unwrap().distance, 2.0);
        assert_eq!(track.seek(10.0).unwrap().distance, 1.0);
    }

    #[test]
    fn test_search_hint_does_not_change_results() {
        let mut warm = KeyframeTrack::new();
        for (i, t) in [0.0, 4.0, 9.0, 20.0, 33.0].iter().enumerate() {
            warm.insert(camera(*t, i as f32 * 10.0));
        }
        let cold_template = warm.clone();

        let times = [0.0, 2.0, 5.0, 8.5, 12.0, 30.0, 1.0, 25.0, 3.0, 40.0, 9.0];
        for t in times {
            let warm_frame = warm.seek(t).unwrap();
            let mut cold = cold_template.clone();
            cold.clear_search_hint();
            let cold_frame = cold.seek(t).unwrap();
            assert_eq!(warm_frame, cold_frame, "mismatch at {}", t);
        }
    }

    #[test]
    fn test_bone_rotation_is_component_wise_lerp() {
        let mut from = BoneKeyframe::new("arm", 0.0);
        from.rotation = Quat::from_xyzw(0.0, 0.0, 0.0, 1.0);
        let mut to = BoneKeyframe::new("arm", 10.0);
        to.rotation = Quat::from_xyzw(1.0, 0.0, 0.0, 0.0);
        to.translation = Vec3::new(10.0, 0.0, -10.0);

        let mut track = KeyframeTrack::new();
        track.insert(from);
        track.insert(to);
        let frame = track.seek(5.0).unwrap();
        assert_eq!(frame.orientation.to_array(), [0.5, 0.0, 0.0, 0.5]);
        assert!((frame.translation - Vec3::new(5.0, 0.0, -5.0)).length() < 1e-5);
    }

    #[test]
    fn test_camera_position_from_angle_and_distance() {
        let frame = CameraFrameTransform {
            look_at: Vec3::new(0.0, 10.0, 0.0),
            distance: 20.0,
            ..Default::default()
        };
        assert!((frame.position() - Vec3::new(0.0, 10.0, -20.0)).length() < 1e-5);
    }
}
