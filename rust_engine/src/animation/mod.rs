//! 动画系统
//!
//! 提供 MVD 动作的解析与保存、关键帧插值、分层轨道与名称表。

pub mod codec;
pub mod interpolation;
pub mod keyframe;
pub mod motion;
pub mod motion_track;
pub mod name_list;
pub mod scene;
pub mod section;

pub use codec::{ByteReader, StringCodec};
pub use interpolation::{BezierCurve, InterpolationParameter, InterpolationTable, SmoothPrecision};
pub use keyframe::{
    AssetKeyframe, BoneInterpolationType, BoneKeyframe, CameraInterpolationType, CameraKeyframe,
    EffectKeyframe, Keyframe, KeyframeType, LayerIndex, LightKeyframe, ModelKeyframe,
    MorphKeyframe, ProjectKeyframe, TimeIndex,
};
pub use motion::{Animation, DataInfo, Motion, MotionState, SectionChunk};
pub use motion_track::{
    AssetFrameTransform, BoneFrameTransform, CameraFrameTransform, KeyframeTrack,
    LightFrameTransform, ModelFrameState, ProjectFrameState, TrackKeyframe,
};
pub use name_list::{NameKey, NameListSection};
pub use scene::{ModelTarget, SceneTarget};
pub use section::{SectionTag, SectionType};
