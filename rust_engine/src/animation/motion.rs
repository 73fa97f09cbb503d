//! Motion 核心数据结构
//!
//! 持有名称表与八类关键帧段，负责文件头解析、两阶段加载
//! （预解析只校验边界，成功后才构建关键帧）、保存以及求值分派。

use std::io::{self, Write};

use byteorder::{LittleEndian, WriteBytesExt};

use super::codec::{ByteReader, StringCodec};
use super::keyframe::{
    AssetKeyframe, BoneKeyframe, CameraKeyframe, EffectKeyframe, Keyframe, KeyframeType,
    LayerIndex, LightKeyframe, ModelKeyframe, MorphKeyframe, ProjectKeyframe, TimeIndex,
};
use super::motion_track::{
    AssetFrameTransform, BoneFrameTransform, CameraFrameTransform, LightFrameTransform,
    ModelFrameState, ProjectFrameState, TrackKeyframe,
};
use super::name_list::NameListSection;
use super::scene::{ModelTarget, SceneTarget};
use super::section::{FlatSection, NamedSection, SectionTag, SectionType};
use crate::config::get_config;
use crate::{ErrorCode, MotionError, Result};

/// 文件签名（写入时以 NUL 填充到 30 字节）
pub const SIGNATURE: &[u8] = b"Motion Vector Data file";
const SIGNATURE_SIZE: usize = 30;
const VERSION: f32 = 1.0;
/// signature + version + encoding
const HEADER_SIZE: usize = SIGNATURE_SIZE + 4 + 1;

/// 抽象播放接口
pub trait Animation {
    fn seek(&mut self, time_index: TimeIndex);

    fn advance(&mut self, delta: TimeIndex);

    fn max_time_index(&self) -> TimeIndex;

    fn is_reached_to(&self, time_index: TimeIndex) -> bool;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotionState {
    Empty,
    Preparsed,
    Loaded,
    Error,
}

/// 一个段在源数据中的位置
#[derive(Debug, Clone, Copy)]
pub struct SectionChunk<'a> {
    pub section_type: SectionType,
    pub minor: i32,
    /// 段头部与记录（不含标签）
    pub bytes: &'a [u8],
}

/// 预解析结果；只借用调用方的缓冲区
#[derive(Debug, Clone)]
pub struct DataInfo<'a> {
    pub codec: StringCodec,
    pub name: &'a [u8],
    pub name2: &'a [u8],
    pub reserved: &'a [u8],
    pub scene_fps: f32,
    /// 按文件顺序排列
    pub chunks: Vec<SectionChunk<'a>>,
}

impl<'a> DataInfo<'a> {
    pub fn chunks_of(&self, section_type: SectionType) -> impl Iterator<Item = &SectionChunk<'a>> {
        self.chunks
            .iter()
            .filter(move |chunk| chunk.section_type == section_type)
    }

    pub fn count_chunks(&self, section_type: SectionType) -> usize {
        self.chunks_of(section_type).count()
    }
}

fn header_err(e: io::Error) -> MotionError {
    MotionError::InvalidHeader(format!("Failed to read header: {}", e))
}

/// 只校验，不构建关键帧
fn parse_data_info(data: &[u8]) -> Result<DataInfo<'_>> {
    if data.len() < HEADER_SIZE {
        return Err(MotionError::InvalidHeader(format!(
            "buffer too short: {} bytes",
            data.len()
        )));
    }

    let mut reader = ByteReader::new(data);
    let signature = reader.take(SIGNATURE_SIZE).map_err(header_err)?;
    if !signature.starts_with(SIGNATURE) {
        return Err(MotionError::InvalidSignature);
    }
    let version = reader.read_f32().map_err(header_err)?;
    if version != VERSION {
        return Err(MotionError::InvalidVersion(version));
    }
    let encoding = reader.read_u8().map_err(header_err)?;
    let codec = StringCodec::from_encoding(encoding).ok_or(MotionError::InvalidEncoding(encoding))?;

    let name = reader.read_text().map_err(header_err)?;
    let name2 = reader.read_text().map_err(header_err)?;
    let reserved = reader.read_text().map_err(header_err)?;
    let scene_fps = reader.read_f32().map_err(header_err)?;

    let debug_log = get_config().debug_log;
    let mut chunks = Vec::new();
    loop {
        let tag = SectionTag::read(&mut reader)?;
        let start = reader.offset();
        match tag.section_type {
            SectionType::EndOfFile => break,
            SectionType::NameList => NameListSection::preparse(&mut reader)?,
            SectionType::Bone => NamedSection::<BoneKeyframe>::preparse(&mut reader)?,
            SectionType::Morph => NamedSection::<MorphKeyframe>::preparse(&mut reader)?,
            SectionType::Effect => NamedSection::<EffectKeyframe>::preparse(&mut reader)?,
            SectionType::Model => FlatSection::<ModelKeyframe>::preparse(&mut reader)?,
            SectionType::Asset => FlatSection::<AssetKeyframe>::preparse(&mut reader)?,
            SectionType::Camera => FlatSection::<CameraKeyframe>::preparse(&mut reader)?,
            SectionType::Light => FlatSection::<LightKeyframe>::preparse(&mut reader)?,
            SectionType::Project => FlatSection::<ProjectKeyframe>::preparse(&mut reader)?,
        }
        let bytes = &data[start..reader.offset()];
        if debug_log {
            log::debug!("[动作] 段 {:?}: {} 字节", tag.section_type, bytes.len());
        }
        chunks.push(SectionChunk {
            section_type: tag.section_type,
            minor: tag.minor,
            bytes,
        });
    }

    Ok(DataInfo {
        codec,
        name,
        name2,
        reserved,
        scene_fps,
        chunks,
    })
}

/// 名称表与八个段；加载时整体替换
#[derive(Debug, Clone, Default)]
struct Sections {
    name_list: NameListSection,
    asset: FlatSection<AssetKeyframe>,
    bone: NamedSection<BoneKeyframe>,
    camera: FlatSection<CameraKeyframe>,
    effect: NamedSection<EffectKeyframe>,
    light: FlatSection<LightKeyframe>,
    model: FlatSection<ModelKeyframe>,
    morph: NamedSection<MorphKeyframe>,
    project: FlatSection<ProjectKeyframe>,
}

impl Sections {
    /// 先读全部名称表，再按文件顺序读其余段
    fn from_data_info(info: &DataInfo<'_>) -> Result<Self> {
        let mut sections = Self::default();
        for chunk in info.chunks_of(SectionType::NameList) {
            sections.name_list.read(chunk.bytes, info.codec)?;
        }

        let names = &sections.name_list;
        for chunk in &info.chunks {
            match chunk.section_type {
                SectionType::NameList | SectionType::EndOfFile => {}
                SectionType::Asset => sections.asset.read(chunk.bytes, names)?,
                SectionType::Bone => sections.bone.read(chunk.bytes, names)?,
                SectionType::Camera => sections.camera.read(chunk.bytes, names)?,
                SectionType::Effect => sections.effect.read(chunk.bytes, names)?,
                SectionType::Light => sections.light.read(chunk.bytes, names)?,
                SectionType::Model => sections.model.read(chunk.bytes, names)?,
                SectionType::Morph => sections.morph.read(chunk.bytes, names)?,
                SectionType::Project => sections.project.read(chunk.bytes, names)?,
            }
        }
        Ok(sections)
    }

    /// 时间无法按整数帧保存（含小数或为负）的关键帧数
    fn count_inexact_time_indices(&self) -> usize {
        fn inexact<'a, K: TrackKeyframe + 'a>(keyframes: impl IntoIterator<Item = &'a K>) -> usize {
            keyframes
                .into_iter()
                .filter(|k| k.time_index().fract() != 0.0 || k.time_index() < 0.0)
                .count()
        }
        inexact(self.asset.keyframes())
            + inexact(self.bone.keyframes())
            + inexact(self.camera.keyframes())
            + inexact(self.effect.keyframes())
            + inexact(self.light.keyframes())
            + inexact(self.model.keyframes())
            + inexact(self.morph.keyframes())
            + inexact(self.project.keyframes())
    }

    fn count_keyframes(&self, kind: KeyframeType) -> usize {
        match kind {
            KeyframeType::Asset => self.asset.count_keyframes(),
            KeyframeType::Bone => self.bone.count_keyframes(),
            KeyframeType::Camera => self.camera.count_keyframes(),
            KeyframeType::Effect => self.effect.count_keyframes(),
            KeyframeType::Light => self.light.count_keyframes(),
            KeyframeType::Model => self.model.count_keyframes(),
            KeyframeType::Morph => self.morph.count_keyframes(),
            KeyframeType::Project => self.project.count_keyframes(),
        }
    }
}

macro_rules! keyframes_of_kind {
    ($keyframes:expr, $variant:ident) => {
        $keyframes
            .into_iter()
            .filter_map(|keyframe| match keyframe {
                Keyframe::$variant(keyframe) => Some(keyframe),
                _ => None,
            })
            .collect()
    };
}

/// 动作数据
#[derive(Debug)]
pub struct Motion {
    name: String,
    name2: String,
    reserved: String,
    codec: StringCodec,
    scene_fps: f32,
    error: ErrorCode,
    state: MotionState,
    active: bool,
    /// 是否有未保存的修改
    dirty: bool,
    /// 绑定的模型名（不持有模型）
    parent_model: Option<String>,
    sections: Sections,
}

impl Motion {
    pub fn new() -> Self {
        let config = get_config();
        Self {
            name: String::new(),
            name2: String::new(),
            reserved: String::new(),
            codec: config.default_encoding,
            scene_fps: config.default_scene_fps,
            error: ErrorCode::NoError,
            state: MotionState::Empty,
            active: true,
            dirty: false,
            parent_model: None,
            sections: Sections::default(),
        }
    }

    fn fail(&mut self, error: &MotionError) {
        log::warn!("[动作] 解析失败: {}", error);
        self.error = error.code();
        if self.state != MotionState::Loaded {
            self.state = MotionState::Error;
        }
    }

    /// 预解析：校验文件头与所有段的边界，不修改已加载的数据
    pub fn preparse<'a>(&mut self, data: &'a [u8]) -> Result<DataInfo<'a>> {
        match parse_data_info(data) {
            Ok(info) => {
                self.error = ErrorCode::NoError;
                if self.state != MotionState::Loaded {
                    self.state = MotionState::Preparsed;
                }
                Ok(info)
            }
            Err(e) => {
                self.fail(&e);
                Err(e)
            }
        }
    }

    /// 加载；任何错误都保留原有数据
    pub fn try_load(&mut self, data: &[u8]) -> Result<()> {
        let info = self.preparse(data)?;
        let sections = match Sections::from_data_info(&info) {
            Ok(sections) => sections,
            Err(e) => {
                self.fail(&e);
                return Err(e);
            }
        };

        self.codec = info.codec;
        self.name = info.codec.decode(info.name);
        self.name2 = info.codec.decode(info.name2);
        self.reserved = info.codec.decode(info.reserved);
        self.scene_fps = info.scene_fps;
        self.sections = sections;
        self.state = MotionState::Loaded;
        self.error = ErrorCode::NoError;
        self.dirty = false;

        log::info!(
            "[动作] 加载完成 \"{}\": 骨骼={}, Morph={}, 相机={}, 光照={}, 模型={}, 配件={}, 特效={}, 工程={}",
            self.name,
            self.count_keyframes(KeyframeType::Bone),
            self.count_keyframes(KeyframeType::Morph),
            self.count_keyframes(KeyframeType::Camera),
            self.count_keyframes(KeyframeType::Light),
            self.count_keyframes(KeyframeType::Model),
            self.count_keyframes(KeyframeType::Asset),
            self.count_keyframes(KeyframeType::Effect),
            self.count_keyframes(KeyframeType::Project),
        );
        Ok(())
    }

    /// 失败时返回 false，错误代码见 `error()`
    pub fn load(&mut self, data: &[u8]) -> bool {
        self.try_load(data).is_ok()
    }

    /// 时间按整数帧写出：小数部分截断，负数记为 0
    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<()> {
        let codec = self.codec;
        let sections = &self.sections;
        let names = &sections.name_list;

        let inexact = sections.count_inexact_time_indices();
        if inexact > 0 {
            log::warn!("[动作] {} 个关键帧的时间不是非负整数帧，保存时将被截断", inexact);
        }

        let mut signature = [0u8; SIGNATURE_SIZE];
        signature[..SIGNATURE.len()].copy_from_slice(SIGNATURE);
        writer.write_all(&signature)?;
        writer.write_f32::<LittleEndian>(VERSION)?;
        writer.write_u8(codec.encoding())?;
        codec.write_text(writer, &self.name)?;
        codec.write_text(writer, &self.name2)?;
        codec.write_text(writer, &self.reserved)?;
        writer.write_f32::<LittleEndian>(self.scene_fps)?;

        SectionTag::new(SectionType::NameList).write(writer)?;
        names.write(writer, codec)?;
        sections.bone.write(writer, names)?;
        sections.morph.write(writer, names)?;
        sections.model.write(writer, names)?;
        sections.asset.write(writer, names)?;
        sections.effect.write(writer, names)?;
        sections.camera.write(writer, names)?;
        sections.light.write(writer, names)?;
        sections.project.write(writer, names)?;
        SectionTag::new(SectionType::EndOfFile).write(writer)?;
        Ok(())
    }

    /// 见 `write_to`：非整数帧时间会被截断
    pub fn save(&self) -> Result<Vec<u8>> {
        let mut bytes = Vec::with_capacity(self.estimate_size());
        self.write_to(&mut bytes)?;
        Ok(bytes)
    }

    /// 与 `save` 输出的字节数严格相等
    pub fn estimate_size(&self) -> usize {
        let codec = self.codec;
        let sections = &self.sections;
        let names = &sections.name_list;
        HEADER_SIZE
            + codec.text_size(&self.name)
            + codec.text_size(&self.name2)
            + codec.text_size(&self.reserved)
            + 4
            + SectionTag::SIZE
            + names.estimate_size(codec)
            + sections.bone.estimate_size(names)
            + sections.morph.estimate_size(names)
            + sections.model.estimate_size(names)
            + sections.asset.estimate_size(names)
            + sections.effect.estimate_size(names)
            + sections.camera.estimate_size(names)
            + sections.light.estimate_size(names)
            + sections.project.estimate_size(names)
            + SectionTag::SIZE
    }

    /// 求值影响模型姿态的段
    pub fn seek(&mut self, time_index: TimeIndex) {
        let sections = &mut self.sections;
        sections.asset.seek(time_index);
        sections.bone.seek(time_index);
        sections.model.seek(time_index);
        sections.morph.seek(time_index);
        sections.effect.seek(time_index);
    }

    pub fn advance(&mut self, delta: TimeIndex) {
        let sections = &mut self.sections;
        sections.asset.advance(delta);
        sections.bone.advance(delta);
        sections.model.advance(delta);
        sections.morph.advance(delta);
        sections.effect.advance(delta);
    }

    /// 求值相机 / 光照 / 工程段；空段不覆盖场景当前状态
    pub fn seek_scene(&mut self, time_index: TimeIndex, scene: &mut dyn SceneTarget) {
        let sections = &mut self.sections;
        sections.camera.seek(time_index);
        sections.light.seek(time_index);
        sections.project.seek(time_index);
        self.push_scene(scene);
    }

    pub fn advance_scene(&mut self, delta: TimeIndex, scene: &mut dyn SceneTarget) {
        let sections = &mut self.sections;
        sections.camera.advance(delta);
        sections.light.advance(delta);
        sections.project.advance(delta);
        self.push_scene(scene);
    }

    fn push_scene(&self, scene: &mut dyn SceneTarget) {
        let sections = &self.sections;
        if !sections.camera.is_empty() {
            if let Some(camera) = sections.camera.current_frame() {
                scene.set_camera(camera);
            }
        }
        if !sections.light.is_empty() {
            if let Some(light) = sections.light.current_frame() {
                scene.set_light(light);
            }
        }
        if !sections.project.is_empty() {
            if let Some(project) = sections.project.current_frame() {
                scene.set_project(project);
            }
        }
    }

    /// 把当前求值结果写入模型；绑定了其他模型时返回 false
    pub fn apply_to_model(&self, model: &mut dyn ModelTarget) -> bool {
        if let Some(parent) = &self.parent_model {
            if parent != model.name() {
                return false;
            }
        }

        let sections = &self.sections;
        let names = &sections.name_list;
        sections.bone.for_each_frame(names, |name, frame| {
            model.set_bone_translation(name, frame.translation);
            model.set_bone_rotation(name, frame.orientation);
        });
        sections.morph.for_each_frame(names, |name, weight| {
            model.set_morph_weight(name, weight);
        });
        sections.effect.for_each_frame(names, |name, value| {
            model.set_effect_parameter(name, value);
        });
        if let Some(state) = sections.model.current_frame() {
            model.set_model_state(state);
            for (bone_name, enabled) in &state.ik_enabled {
                model.set_ik_enabled(bone_name, *enabled);
            }
        }
        if let Some(asset) = sections.asset.current_frame() {
            model.set_asset_transform(asset);
        }
        true
    }

    pub fn seek_model(&mut self, time_index: TimeIndex, model: &mut dyn ModelTarget) -> bool {
        self.seek(time_index);
        self.apply_to_model(model)
    }

    pub fn add_keyframe(&mut self, keyframe: impl Into<Keyframe>) {
        let s = &mut self.sections;
        match keyframe.into() {
            Keyframe::Asset(k) => s.asset.add_keyframe(k, &mut s.name_list),
            Keyframe::Bone(k) => s.bone.add_keyframe(k, &mut s.name_list),
            Keyframe::Camera(k) => s.camera.add_keyframe(k, &mut s.name_list),
            Keyframe::Effect(k) => s.effect.add_keyframe(k, &mut s.name_list),
            Keyframe::Light(k) => s.light.add_keyframe(k, &mut s.name_list),
            Keyframe::Model(k) => s.model.add_keyframe(k, &mut s.name_list),
            Keyframe::Morph(k) => s.morph.add_keyframe(k, &mut s.name_list),
            Keyframe::Project(k) => s.project.add_keyframe(k, &mut s.name_list),
        }
        self.dirty = true;
    }

    /// 按 (种类, 时间, 名称, 层) 替换
    pub fn replace_keyframe(&mut self, keyframe: impl Into<Keyframe>) {
        let s = &mut self.sections;
        match keyframe.into() {
            Keyframe::Asset(k) => s.asset.replace_keyframe(k, &mut s.name_list),
            Keyframe::Bone(k) => s.bone.replace_keyframe(k, &mut s.name_list),
            Keyframe::Camera(k) => s.camera.replace_keyframe(k, &mut s.name_list),
            Keyframe::Effect(k) => s.effect.replace_keyframe(k, &mut s.name_list),
            Keyframe::Light(k) => s.light.replace_keyframe(k, &mut s.name_list),
            Keyframe::Model(k) => s.model.replace_keyframe(k, &mut s.name_list),
            Keyframe::Morph(k) => s.morph.replace_keyframe(k, &mut s.name_list),
            Keyframe::Project(k) => s.project.replace_keyframe(k, &mut s.name_list),
        }
        self.dirty = true;
    }

    /// 返回被删除的关键帧；时间 0 的关键帧不会被删除
    pub fn delete_keyframe(&mut self, keyframe: &Keyframe) -> Option<Keyframe> {
        let s = &mut self.sections;
        let names = &s.name_list;
        let time_index = keyframe.time_index();
        let deleted = match keyframe {
            Keyframe::Asset(_) => s.asset.delete_keyframe(time_index, 0).map(Keyframe::Asset),
            Keyframe::Bone(k) => s
                .bone
                .delete_keyframe(time_index, &k.name, k.layer_index, names)
                .map(Keyframe::Bone),
            Keyframe::Camera(_) => s.camera.delete_keyframe(time_index, 0).map(Keyframe::Camera),
            Keyframe::Effect(k) => s
                .effect
                .delete_keyframe(time_index, &k.name, 0, names)
                .map(Keyframe::Effect),
            Keyframe::Light(_) => s.light.delete_keyframe(time_index, 0).map(Keyframe::Light),
            Keyframe::Model(_) => s.model.delete_keyframe(time_index, 0).map(Keyframe::Model),
            Keyframe::Morph(k) => s
                .morph
                .delete_keyframe(time_index, &k.name, k.layer_index, names)
                .map(Keyframe::Morph),
            Keyframe::Project(_) => s
                .project
                .delete_keyframe(time_index, 0)
                .map(Keyframe::Project),
        };
        if deleted.is_some() {
            self.dirty = true;
        }
        deleted
    }

    pub fn count_keyframes(&self, kind: KeyframeType) -> usize {
        self.sections.count_keyframes(kind)
    }

    /// 骨骼 / Morph 以外的种类恒为 1
    pub fn count_layers(&self, name: &str, kind: KeyframeType) -> usize {
        let s = &self.sections;
        match kind {
            KeyframeType::Bone => s.bone.count_layers(name, &s.name_list),
            KeyframeType::Morph => s.morph.count_layers(name, &s.name_list),
            _ => 1,
        }
    }

    pub fn find_asset_keyframe(&self, time_index: TimeIndex) -> Option<&AssetKeyframe> {
        self.sections.asset.find_keyframe(time_index, 0)
    }

    pub fn find_asset_keyframe_at(&self, index: usize) -> Option<&AssetKeyframe> {
        self.sections.asset.find_keyframe_at(index)
    }

    pub fn find_bone_keyframe(
        &self,
        time_index: TimeIndex,
        name: &str,
        layer_index: LayerIndex,
    ) -> Option<&BoneKeyframe> {
        let s = &self.sections;
        s.bone.find_keyframe(time_index, name, layer_index, &s.name_list)
    }

    pub fn find_bone_keyframe_at(&self, index: usize) -> Option<&BoneKeyframe> {
        self.sections.bone.find_keyframe_at(index)
    }

    pub fn find_camera_keyframe(
        &self,
        time_index: TimeIndex,
        layer_index: LayerIndex,
    ) -> Option<&CameraKeyframe> {
        self.sections.camera.find_keyframe(time_index, layer_index)
    }

    pub fn find_camera_keyframe_at(&self, index: usize) -> Option<&CameraKeyframe> {
        self.sections.camera.find_keyframe_at(index)
    }

    pub fn find_effect_keyframe(&self, time_index: TimeIndex, name: &str) -> Option<&EffectKeyframe> {
        let s = &self.sections;
        s.effect.find_keyframe(time_index, name, 0, &s.name_list)
    }

    pub fn find_effect_keyframe_at(&self, index: usize) -> Option<&EffectKeyframe> {
        self.sections.effect.find_keyframe_at(index)
    }

    pub fn find_light_keyframe(
        &self,
        time_index: TimeIndex,
        layer_index: LayerIndex,
    ) -> Option<&LightKeyframe> {
        self.sections.light.find_keyframe(time_index, layer_index)
    }

    pub fn find_light_keyframe_at(&self, index: usize) -> Option<&LightKeyframe> {
        self.sections.light.find_keyframe_at(index)
    }

    pub fn find_model_keyframe(&self, time_index: TimeIndex) -> Option<&ModelKeyframe> {
        self.sections.model.find_keyframe(time_index, 0)
    }

    pub fn find_model_keyframe_at(&self, index: usize) -> Option<&ModelKeyframe> {
        self.sections.model.find_keyframe_at(index)
    }

    pub fn find_morph_keyframe(
        &self,
        time_index: TimeIndex,
        name: &str,
        layer_index: LayerIndex,
    ) -> Option<&MorphKeyframe> {
        let s = &self.sections;
        s.morph.find_keyframe(time_index, name, layer_index, &s.name_list)
    }

    pub fn find_morph_keyframe_at(&self, index: usize) -> Option<&MorphKeyframe> {
        self.sections.morph.find_keyframe_at(index)
    }

    pub fn find_project_keyframe(&self, time_index: TimeIndex) -> Option<&ProjectKeyframe> {
        self.sections.project.find_keyframe(time_index, 0)
    }

    pub fn find_project_keyframe_at(&self, index: usize) -> Option<&ProjectKeyframe> {
        self.sections.project.find_keyframe_at(index)
    }

    /// 指定种类的全部关键帧快照
    pub fn keyframes(&self, kind: KeyframeType) -> Vec<Keyframe> {
        let s = &self.sections;
        match kind {
            KeyframeType::Asset => s.asset.keyframes().iter().cloned().map(Keyframe::Asset).collect(),
            KeyframeType::Bone => s.bone.keyframes().cloned().map(Keyframe::Bone).collect(),
            KeyframeType::Camera => s.camera.keyframes().iter().cloned().map(Keyframe::Camera).collect(),
            KeyframeType::Effect => s.effect.keyframes().cloned().map(Keyframe::Effect).collect(),
            KeyframeType::Light => s.light.keyframes().iter().cloned().map(Keyframe::Light).collect(),
            KeyframeType::Model => s.model.keyframes().iter().cloned().map(Keyframe::Model).collect(),
            KeyframeType::Morph => s.morph.keyframes().cloned().map(Keyframe::Morph).collect(),
            KeyframeType::Project => s
                .project
                .keyframes()
                .iter()
                .cloned()
                .map(Keyframe::Project)
                .collect(),
        }
    }

    /// 整体替换指定种类的关键帧；其他种类的条目被忽略
    pub fn set_keyframes(&mut self, kind: KeyframeType, keyframes: Vec<Keyframe>) {
        let s = &mut self.sections;
        let names = &mut s.name_list;
        match kind {
            KeyframeType::Asset => s.asset.set_keyframes(keyframes_of_kind!(keyframes, Asset), names),
            KeyframeType::Bone => s.bone.set_keyframes(keyframes_of_kind!(keyframes, Bone), names),
            KeyframeType::Camera => s.camera.set_keyframes(keyframes_of_kind!(keyframes, Camera), names),
            KeyframeType::Effect => s.effect.set_keyframes(keyframes_of_kind!(keyframes, Effect), names),
            KeyframeType::Light => s.light.set_keyframes(keyframes_of_kind!(keyframes, Light), names),
            KeyframeType::Model => s.model.set_keyframes(keyframes_of_kind!(keyframes, Model), names),
            KeyframeType::Morph => s.morph.set_keyframes(keyframes_of_kind!(keyframes, Morph), names),
            KeyframeType::Project => s.project.set_keyframes(keyframes_of_kind!(keyframes, Project), names),
        }
        self.dirty = true;
    }

    /// 八个段中的最大时间
    pub fn max_time_index(&self) -> TimeIndex {
        let s = &self.sections;
        [
            s.asset.max_time_index(),
            s.bone.max_time_index(),
            s.camera.max_time_index(),
            s.effect.max_time_index(),
            s.light.max_time_index(),
            s.model.max_time_index(),
            s.morph.max_time_index(),
            s.project.max_time_index(),
        ]
        .into_iter()
        .fold(0.0, TimeIndex::max)
    }

    /// 相机 / 光照 / 特效 / 工程不参与判断
    pub fn is_reached_to(&self, time_index: TimeIndex) -> bool {
        if !self.active {
            return true;
        }
        let s = &self.sections;
        s.asset.current_time_index() >= time_index
            && s.bone.current_time_index() >= time_index
            && s.model.current_time_index() >= time_index
            && s.morph.current_time_index() >= time_index
    }

    pub fn bone_frame(&self, name: &str) -> Option<BoneFrameTransform> {
        let s = &self.sections;
        s.bone.current_frame(name, &s.name_list)
    }

    pub fn bone_layer_frame(&self, name: &str, layer_index: LayerIndex) -> Option<BoneFrameTransform> {
        let s = &self.sections;
        s.bone.layer_frame(name, layer_index, &s.name_list).copied()
    }

    pub fn morph_weight(&self, name: &str) -> Option<f32> {
        let s = &self.sections;
        s.morph.current_frame(name, &s.name_list)
    }

    pub fn camera_frame(&self) -> Option<&CameraFrameTransform> {
        self.sections.camera.current_frame()
    }

    pub fn light_frame(&self) -> Option<&LightFrameTransform> {
        self.sections.light.current_frame()
    }

    pub fn model_state(&self) -> Option<&ModelFrameState> {
        self.sections.model.current_frame()
    }

    pub fn asset_frame(&self) -> Option<&AssetFrameTransform> {
        self.sections.asset.current_frame()
    }

    pub fn project_state(&self) -> Option<&ProjectFrameState> {
        self.sections.project.current_frame()
    }

    pub fn name_list(&self) -> &NameListSection {
        &self.sections.name_list
    }

    /// 清空全部关键帧与名称表
    pub fn clear(&mut self) {
        self.sections = Sections::default();
        self.state = MotionState::Empty;
        self.error = ErrorCode::NoError;
        self.dirty = true;
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
        self.dirty = true;
    }

    pub fn name2(&self) -> &str {
        &self.name2
    }

    pub fn set_name2(&mut self, name2: impl Into<String>) {
        self.name2 = name2.into();
        self.dirty = true;
    }

    pub fn reserved(&self) -> &str {
        &self.reserved
    }

    pub fn set_reserved(&mut self, reserved: impl Into<String>) {
        self.reserved = reserved.into();
        self.dirty = true;
    }

    pub fn encoding(&self) -> StringCodec {
        self.codec
    }

    pub fn set_encoding(&mut self, codec: StringCodec) {
        self.codec = codec;
        self.dirty = true;
    }

    pub fn scene_fps(&self) -> f32 {
        self.scene_fps
    }

    pub fn error(&self) -> ErrorCode {
        self.error
    }

    pub fn state(&self) -> MotionState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn set_dirty(&mut self, dirty: bool) {
        self.dirty = dirty;
    }

    pub fn parent_model_ref(&self) -> Option<&str> {
        self.parent_model.as_deref()
    }

    /// 按名称绑定模型；None 解除绑定
    pub fn set_parent_model_ref(&mut self, model_name: Option<&str>) {
        self.parent_model = model_name.map(str::to_string);
    }
}

impl Default for Motion {
    fn default() -> Self {
        Self::new()
    }
}

/// 逐个关键帧重新添加，名称表在副本中重新建立
impl Clone for Motion {
    fn clone(&self) -> Self {
        let mut motion = Motion {
            name: self.name.clone(),
            name2: self.name2.clone(),
            reserved: self.reserved.clone(),
            codec: self.codec,
            scene_fps: self.scene_fps,
            error: self.error,
            state: self.state,
            active: self.active,
            dirty: self.dirty,
            parent_model: self.parent_model.clone(),
            sections: Sections::default(),
        };
        for kind in KeyframeType::ALL {
            for keyframe in self.keyframes(kind) {
                motion.add_keyframe(keyframe);
            }
        }
        motion.dirty = self.dirty;
        motion
    }
}

impl Animation for Motion {
    fn seek(&mut self, time_index: TimeIndex) {
        Motion::seek(self, time_index);
    }

    fn advance(&mut self, delta: TimeIndex) {
        Motion::advance(self, delta);
    }

    fn max_time_index(&self) -> TimeIndex {
        Motion::max_time_index(self)
    }

    fn is_reached_to(&self, time_index: TimeIndex) -> bool {
        Motion::is_reached_to(self, time_index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::interpolation::InterpolationParameter;
    use crate::animation::keyframe::BoneInterpolationType;
    use glam::{Quat, Vec3, Vec4};

    fn scenario_bone() -> BoneKeyframe {
        let mut keyframe = BoneKeyframe::new("This is test.", 42.0);
        keyframe.layer_index = 42;
        keyframe.translation = Vec3::new(1.0, 2.0, 3.0);
        keyframe.rotation = Quat::from_xyzw(4.0, 5.0, 6.0, 7.0);
        let channels = [
            (BoneInterpolationType::TranslationX, InterpolationParameter::new(8, 9, 10, 11)),
            (BoneInterpolationType::TranslationY, InterpolationParameter::new(12, 13, 14, 15)),
            (BoneInterpolationType::TranslationZ, InterpolationParameter::new(16, 17, 18, 19)),
            (BoneInterpolationType::Orientation, InterpolationParameter::new(20, 21, 22, 23)),
        ];
        for (channel, parameter) in channels {
            keyframe.set_interpolation_parameter(channel, parameter);
        }
        keyframe
    }

    fn camera(time_index: TimeIndex, distance: f32) -> CameraKeyframe {
        let mut keyframe = CameraKeyframe::new(time_index);
        keyframe.distance = distance;
        keyframe
    }

    /// 每种关键帧各若干个
    fn populated_motion() -> Motion {
        let mut motion = Motion::new();
        motion.set_name("test motion");
        motion.set_name2("テスト");
        motion.add_keyframe(scenario_bone());
        motion.add_keyframe(BoneKeyframe::new("センター", 0.0));
        motion.add_keyframe(MorphKeyframe::new("まばたき", 10.0, 1.0));
        motion.add_keyframe(camera(0.0, -45.0));
        motion.add_keyframe(camera(60.0, -30.0));
        motion.add_keyframe(LightKeyframe::new(0.0));
        let mut model = ModelKeyframe::new(0.0);
        model.set_ik_enabled("左足ＩＫ", false);
        motion.add_keyframe(model);
        let mut asset = AssetKeyframe::new(5.0);
        asset.parent_model_name = Some("miku".to_string());
        motion.add_keyframe(asset);
        motion.add_keyframe(EffectKeyframe::new("Si", 0.0, Vec4::ONE));
        motion.add_keyframe(ProjectKeyframe::new(0.0));
        motion
    }

    #[derive(Default)]
    struct RecordingScene {
        cameras: Vec<CameraFrameTransform>,
        lights: usize,
        projects: usize,
    }

    impl SceneTarget for RecordingScene {
        fn set_camera(&mut self, camera: &CameraFrameTransform) {
            self.cameras.push(*camera);
        }

        fn set_light(&mut self, _light: &LightFrameTransform) {
            self.lights += 1;
        }

        fn set_project(&mut self, _project: &ProjectFrameState) {
            self.projects += 1;
        }
    }

    struct RecordingModel {
        name: String,
        translations: Vec<(String, Vec3)>,
        weights: Vec<(String, f32)>,
        ik: Vec<(String, bool)>,
    }

    impl RecordingModel {
        fn new(name: &str) -> Self {
            Self {
                name: name.to_string(),
                translations: Vec::new(),
                weights: Vec::new(),
                ik: Vec::new(),
            }
        }
    }

    impl ModelTarget for RecordingModel {
        fn name(&self) -> &str {
            &self.name
        }

        fn set_bone_translation(&mut self, bone_name: &str, translation: Vec3) {
            self.translations.push((bone_name.to_string(), translation));
        }

        fn set_bone_rotation(&mut self, _bone_name: &str, _rotation: Quat) {}

        fn set_morph_weight(&mut self, morph_name: &str, weight: f32) {
            self.weights.push((morph_name.to_string(), weight));
        }

        fn set_ik_enabled(&mut self, bone_name: &str, enabled: bool) {
            self.ik.push((bone_name.to_string(), enabled));
        }
    }

    #[test]
    fn test_preparse_rejects_short_buffers() {
        let mut motion = Motion::new();
        let error = motion.preparse(&[]).unwrap_err();
        assert_eq!(error.code(), ErrorCode::InvalidHeader);
        assert_eq!(motion.error(), ErrorCode::InvalidHeader);
        assert_eq!(motion.state(), MotionState::Error);

        assert!(!motion.load(&SIGNATURE[..10]));
        assert_eq!(motion.error(), ErrorCode::InvalidHeader);
    }

    #[test]
    fn test_preparse_rejects_bad_header_fields() {
        let bytes = Motion::new().save().unwrap();

        let mut signature = bytes.clone();
        signature[0] = b'X';
        let mut version = bytes.clone();
        version[30..34].copy_from_slice(&2.0f32.to_le_bytes());
        let mut encoding = bytes.clone();
        encoding[34] = 7;
        let mut strings = bytes.clone();
        strings.truncate(HEADER_SIZE + 2);

        let mut motion = Motion::new();
        assert_eq!(motion.preparse(&signature).unwrap_err().code(), ErrorCode::InvalidSignature);
        assert_eq!(motion.preparse(&version).unwrap_err().code(), ErrorCode::InvalidVersion);
        assert_eq!(motion.preparse(&encoding).unwrap_err().code(), ErrorCode::InvalidEncoding);
        assert_eq!(motion.preparse(&strings).unwrap_err().code(), ErrorCode::InvalidHeader);
    }

    #[test]
    fn test_empty_motion_roundtrip() {
        let motion = Motion::new();
        let bytes = motion.save().unwrap();
        assert_eq!(bytes.len(), motion.estimate_size());

        let mut decoded = Motion::new();
        let info = decoded.preparse(&bytes).unwrap();
        assert_eq!(info.count_chunks(SectionType::NameList), 1);
        assert_eq!(info.chunks.len(), 1);
        assert_eq!(decoded.state(), MotionState::Preparsed);
        assert!(decoded.load(&bytes));
        assert_eq!(decoded.state(), MotionState::Loaded);
        assert_eq!(decoded.max_time_index(), 0.0);
    }

    #[test]
    fn test_bone_scenario_roundtrip_and_clone() {
        let mut motion = Motion::new();
        motion.add_keyframe(scenario_bone());

        let bytes = motion.save().unwrap();
        let mut decoded = Motion::new();
        assert!(decoded.load(&bytes));
        assert_eq!(decoded.error(), ErrorCode::NoError);
        let keyframe = decoded
            .find_bone_keyframe(42.0, "This is test.", 42)
            .unwrap();
        assert_eq!(*keyframe, scenario_bone());
        assert_eq!(keyframe.rotation.to_array(), [4.0, 5.0, 6.0, 7.0]);
        assert_eq!(
            keyframe.interpolation_parameter(BoneInterpolationType::TranslationY),
            InterpolationParameter::new(12, 13, 14, 15)
        );

        let mut cloned = decoded.clone();
        assert_eq!(cloned.find_bone_keyframe_at(0), decoded.find_bone_keyframe_at(0));
        cloned.set_keyframes(KeyframeType::Bone, Vec::new());
        assert_eq!(cloned.count_keyframes(KeyframeType::Bone), 0);
        assert_eq!(decoded.count_keyframes(KeyframeType::Bone), 1);
    }

    #[test]
    fn test_all_kinds_roundtrip() {
        for codec in [StringCodec::Utf8, StringCodec::Utf16] {
            let mut motion = populated_motion();
            motion.set_encoding(codec);
            let bytes = motion.save().unwrap();
            assert_eq!(bytes.len(), motion.estimate_size());

            let mut decoded = Motion::new();
            assert!(decoded.load(&bytes));
            assert_eq!(decoded.encoding(), codec);
            assert_eq!(decoded.name(), "test motion");
            assert_eq!(decoded.name2(), "テスト");
            assert!(!decoded.is_dirty());
            for kind in KeyframeType::ALL {
                assert_eq!(decoded.count_keyframes(kind), motion.count_keyframes(kind));
            }
            assert_eq!(
                decoded.find_asset_keyframe(5.0).and_then(|k| k.parent_model_name.as_deref()),
                Some("miku")
            );
            assert!(!decoded.find_model_keyframe(0.0).unwrap().is_ik_enabled("左足ＩＫ"));
            assert_eq!(decoded.find_morph_keyframe(10.0, "まばたき", 0).map(|k| k.weight), Some(1.0));
            assert_eq!(decoded.find_effect_keyframe(0.0, "Si").map(|k| k.value), Some(Vec4::ONE));
            assert_eq!(decoded.find_camera_keyframe(60.0, 0).map(|k| k.distance), Some(-30.0));
            assert!(decoded.find_light_keyframe_at(0).is_some());
            assert!(decoded.find_project_keyframe(0.0).is_some());

            // 再次保存字节一致
            assert_eq!(decoded.save().unwrap(), bytes);
        }
    }

    #[test]
    fn test_multiple_chunks_of_same_type() {
        let names = NameListSection::new();
        let mut scratch = NameListSection::new();
        let mut first = FlatSection::new();
        first.add_keyframe(camera(0.0, -10.0), &mut scratch);
        let mut second = FlatSection::new();
        second.add_keyframe(camera(30.0, -20.0), &mut scratch);
        second.add_keyframe(camera(15.0, -15.0), &mut scratch);

        let mut bytes = Motion::new().save().unwrap();
        bytes.truncate(bytes.len() - SectionTag::SIZE);
        first.write(&mut bytes, &names).unwrap();
        second.write(&mut bytes, &names).unwrap();
        SectionTag::new(SectionType::EndOfFile).write(&mut bytes).unwrap();

        let mut motion = Motion::new();
        let info = motion.preparse(&bytes).unwrap();
        assert_eq!(info.count_chunks(SectionType::Camera), 2);
        assert!(motion.load(&bytes));
        assert_eq!(motion.count_keyframes(KeyframeType::Camera), 3);
        let times: Vec<TimeIndex> = (0..3)
            .filter_map(|i| motion.find_camera_keyframe_at(i))
            .map(|k| k.time_index)
            .collect();
        assert_eq!(times, vec![0.0, 15.0, 30.0]);
        assert_eq!(motion.max_time_index(), 30.0);
    }

    fn name_table(entries: &[(i32, &str)], codec: StringCodec) -> Vec<u8> {
        let mut table = Vec::new();
        for value in [0, 0, entries.len() as i32, 0] {
            table.write_i32::<LittleEndian>(value).unwrap();
        }
        for (key, name) in entries {
            table.write_i32::<LittleEndian>(*key).unwrap();
            codec.write_text(&mut table, name).unwrap();
        }
        table
    }

    /// 空动作 + 额外名称表 + 骨骼段
    fn motion_bytes_with_table(
        table: &[u8],
        bones: &NamedSection<BoneKeyframe>,
        names: &NameListSection,
    ) -> Vec<u8> {
        let mut bytes = Motion::new().save().unwrap();
        bytes.truncate(bytes.len() - SectionTag::SIZE);
        SectionTag::new(SectionType::NameList).write(&mut bytes).unwrap();
        bytes.extend_from_slice(table);
        bones.write(&mut bytes, names).unwrap();
        SectionTag::new(SectionType::EndOfFile).write(&mut bytes).unwrap();
        bytes
    }

    #[test]
    fn test_add_keyframe_after_loading_max_name_key() {
        let codec = Motion::new().encoding();
        let table = name_table(&[(i32::MAX, "loaded")], codec);
        let mut names = NameListSection::new();
        names.read(&table, codec).unwrap();
        let mut bones = NamedSection::new();
        bones.add_keyframe(BoneKeyframe::new("loaded", 0.0), &mut names);
        let bytes = motion_bytes_with_table(&table, &bones, &names);

        let mut motion = Motion::new();
        assert!(motion.load(&bytes));
        motion.add_keyframe(BoneKeyframe::new("fresh", 10.0));

        assert_eq!(motion.name_list().key("loaded"), Some(i32::MAX));
        assert_ne!(motion.name_list().key("fresh"), Some(i32::MAX));
        assert_eq!(motion.find_bone_keyframe(0.0, "loaded", 0).unwrap().name, "loaded");
        assert_eq!(motion.find_bone_keyframe(10.0, "fresh", 0).unwrap().name, "fresh");

        let mut reloaded = Motion::new();
        assert!(reloaded.load(&motion.save().unwrap()));
        assert_eq!(reloaded.count_keyframes(KeyframeType::Bone), 2);
        assert!(reloaded.find_bone_keyframe(0.0, "loaded", 0).is_some());
    }

    #[test]
    fn test_duplicate_table_key_binds_last_name() {
        let codec = Motion::new().encoding();
        let mut names = NameListSection::new();
        names.read(&name_table(&[(0, "b")], codec), codec).unwrap();
        let mut bones = NamedSection::new();
        bones.add_keyframe(BoneKeyframe::new("b", 0.0), &mut names);
        let table = name_table(&[(0, "a"), (0, "b")], codec);
        let bytes = motion_bytes_with_table(&table, &bones, &names);

        let mut motion = Motion::new();
        assert!(motion.load(&bytes));
        assert!(motion.find_bone_keyframe(0.0, "a", 0).is_none());
        assert_eq!(motion.find_bone_keyframe(0.0, "b", 0).unwrap().name, "b");

        motion.add_keyframe(BoneKeyframe::new("a", 5.0));
        assert_eq!(motion.count_layers("b", KeyframeType::Bone), 1);
        assert!(motion.find_bone_keyframe(5.0, "b", 0).is_none());
        assert_eq!(motion.find_bone_keyframe(5.0, "a", 0).unwrap().name, "a");
    }

    #[test]
    fn test_fractional_time_is_truncated_on_save() {
        let mut motion = Motion::new();
        motion.add_keyframe(camera(5.0, -10.0));
        motion.add_keyframe(camera(7.5, -20.0));
        assert_eq!(motion.sections.count_inexact_time_indices(), 1);

        let mut decoded = Motion::new();
        assert!(decoded.load(&motion.save().unwrap()));
        assert!(decoded.find_camera_keyframe(7.0, 0).is_some());
        assert_eq!(decoded.sections.count_inexact_time_indices(), 0);
    }

    #[test]
    fn test_failed_load_keeps_previous_data() {
        let source = populated_motion();
        let bytes = source.save().unwrap();
        let mut motion = Motion::new();
        assert!(motion.load(&bytes));

        let truncated = &bytes[..bytes.len() - 1];
        assert!(!motion.load(truncated));
        assert_eq!(motion.error(), ErrorCode::TruncatedSection);
        assert_eq!(motion.state(), MotionState::Loaded);
        for kind in KeyframeType::ALL {
            assert_eq!(motion.count_keyframes(kind), source.count_keyframes(kind));
        }
        assert_eq!(motion.name(), "test motion");
    }

    #[test]
    fn test_unknown_section_tag_aborts_load() {
        let mut bytes = Motion::new().save().unwrap();
        let tag_offset = bytes.len() - SectionTag::SIZE;
        bytes[tag_offset..tag_offset + 4].copy_from_slice(&42i32.to_le_bytes());

        let mut motion = Motion::new();
        assert!(!motion.load(&bytes));
        assert_eq!(motion.error(), ErrorCode::UnknownSection);
    }

    #[test]
    fn test_dangling_name_reference_aborts_load() {
        let mut names = NameListSection::new();
        let mut bones = NamedSection::new();
        bones.add_keyframe(BoneKeyframe::new("orphan", 0.0), &mut names);

        let mut bytes = Motion::new().save().unwrap();
        bytes.truncate(bytes.len() - SectionTag::SIZE);
        bones.write(&mut bytes, &names).unwrap();
        SectionTag::new(SectionType::EndOfFile).write(&mut bytes).unwrap();

        let mut motion = Motion::new();
        assert!(motion.preparse(&bytes).is_ok());
        assert!(!motion.load(&bytes));
        assert_eq!(motion.error(), ErrorCode::InvalidNameReference);
        assert_eq!(motion.count_keyframes(KeyframeType::Bone), 0);
    }

    #[test]
    fn test_scene_push_requires_keyframes() {
        let mut motion = Motion::new();
        motion.add_keyframe(camera(0.0, 10.0));
        motion.add_keyframe(camera(10.0, 20.0));

        let mut scene = RecordingScene::default();
        motion.seek_scene(5.0, &mut scene);
        assert_eq!(scene.cameras.len(), 1);
        assert_eq!(scene.cameras[0].distance, 15.0);
        assert_eq!(scene.lights, 0);
        assert_eq!(scene.projects, 0);

        motion.advance_scene(5.0, &mut scene);
        assert_eq!(scene.cameras.last().map(|c| c.distance), Some(20.0));
        assert_eq!(motion.camera_frame().map(|c| c.distance), Some(20.0));
    }

    #[test]
    fn test_apply_to_model_respects_parent_ref() {
        let mut motion = Motion::new();
        let mut bone = BoneKeyframe::new("arm", 0.0);
        bone.translation = Vec3::new(1.0, 0.0, 0.0);
        motion.add_keyframe(bone);
        motion.add_keyframe(MorphKeyframe::new("あ", 0.0, 0.5));
        let mut state = ModelKeyframe::new(0.0);
        state.set_ik_enabled("右足ＩＫ", false);
        motion.add_keyframe(state);

        let mut model = RecordingModel::new("miku");
        motion.set_parent_model_ref(Some("other"));
        assert!(!motion.seek_model(0.0, &mut model));
        assert!(model.translations.is_empty());

        motion.set_parent_model_ref(Some("miku"));
        assert!(motion.apply_to_model(&mut model));
        assert_eq!(model.translations, vec![("arm".to_string(), Vec3::new(1.0, 0.0, 0.0))]);
        assert_eq!(model.weights, vec![("あ".to_string(), 0.5)]);
        assert_eq!(model.ik, vec![("右足ＩＫ".to_string(), false)]);

        motion.set_parent_model_ref(None);
        assert_eq!(motion.parent_model_ref(), None);
        assert!(motion.apply_to_model(&mut RecordingModel::new("anyone")));
    }

    #[test]
    fn test_layers_and_zero_time_guard() {
        let mut motion = Motion::new();
        let mut base = BoneKeyframe::new("arm", 0.0);
        base.layer_index = 0;
        let mut upper = BoneKeyframe::new("arm", 0.0);
        upper.layer_index = 1;
        motion.add_keyframe(base.clone());
        motion.add_keyframe(upper);
        motion.add_keyframe(BoneKeyframe::new("leg", 0.0));

        assert_eq!(motion.count_layers("arm", KeyframeType::Bone), 2);
        assert_eq!(motion.count_layers("leg", KeyframeType::Bone), 1);
        assert_eq!(motion.count_layers("arm", KeyframeType::Camera), 1);

        assert!(motion.delete_keyframe(&Keyframe::Bone(base)).is_none());
        assert_eq!(motion.count_keyframes(KeyframeType::Bone), 3);

        let mut later = BoneKeyframe::new("arm", 12.0);
        later.translation = Vec3::X;
        motion.add_keyframe(later.clone());
        later.translation = Vec3::Y;
        motion.replace_keyframe(later.clone());
        assert_eq!(motion.count_keyframes(KeyframeType::Bone), 4);
        assert_eq!(
            motion.find_bone_keyframe(12.0, "arm", 0).map(|k| k.translation),
            Some(Vec3::Y)
        );
        assert!(motion.delete_keyframe(&Keyframe::Bone(later)).is_some());
        assert_eq!(motion.count_keyframes(KeyframeType::Bone), 3);
    }

    #[test]
    fn test_reached_and_max_time() {
        let mut motion = Motion::new();
        motion.add_keyframe(BoneKeyframe::new("arm", 0.0));
        motion.add_keyframe(BoneKeyframe::new("arm", 30.0));
        motion.add_keyframe(camera(100.0, 0.0));
        assert_eq!(motion.max_time_index(), 100.0);

        motion.seek(10.0);
        assert!(!motion.is_reached_to(20.0));
        motion.advance(20.0);
        assert!(motion.is_reached_to(30.0));
        // 相机段不参与
        assert!(!motion.is_reached_to(100.0));

        motion.set_active(false);
        assert!(motion.is_reached_to(100.0));
    }

    #[test]
    fn test_animation_trait_dispatch() {
        let mut motion = Motion::new();
        motion.add_keyframe(MorphKeyframe::new("あ", 0.0, 0.0));
        motion.add_keyframe(MorphKeyframe::new("あ", 10.0, 1.0));

        let animation: &mut dyn Animation = &mut motion;
        animation.seek(5.0);
        assert_eq!(animation.max_time_index(), 10.0);
        assert!(!animation.is_reached_to(10.0));
        animation.advance(5.0);
        assert!(animation.is_reached_to(10.0));
        assert_eq!(motion.morph_weight("あ"), Some(1.0));
    }

    #[test]
    fn test_keyframes_snapshot_is_type_filtered() {
        let motion = populated_motion();
        let cameras = motion.keyframes(KeyframeType::Camera);
        assert_eq!(cameras.len(), 2);
        assert!(cameras.iter().all(|k| k.kind() == KeyframeType::Camera));

        let mut target = Motion::new();
        let mut mixed = cameras.clone();
        mixed.push(Keyframe::Light(LightKeyframe::new(3.0)));
        target.set_keyframes(KeyframeType::Camera, mixed);
        assert_eq!(target.count_keyframes(KeyframeType::Camera), 2);
        assert_eq!(target.count_keyframes(KeyframeType::Light), 0);
        assert!(target.is_dirty());
    }
}
