//! 动画关键帧
//!
//! 八类关键帧各自拥有固定布局的二进制记录。名称不写入记录本身，
//! 由所在段的头部（名称表键）提供；配件与模型记录中引用的名称同样
//! 以名称表键的形式存储。

use std::collections::BTreeMap;
use std::io::{self, Write};

use byteorder::{LittleEndian, WriteBytesExt};
use glam::{Quat, Vec3, Vec4};

use super::codec::{write_f32_slice, ByteReader};
use super::interpolation::{InterpolationParameter, InterpolationTable};
use super::name_list::{NameKey, NameListSection};
use super::section::SectionType;
use crate::{MotionError, Result};

/// 播放时间（帧），文件中以 u64 存储
pub type TimeIndex = f64;
/// 层索引
pub type LayerIndex = i32;

/// 关键帧种类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum KeyframeType {
    Asset,
    Bone,
    Camera,
    Effect,
    Light,
    Model,
    Morph,
    Project,
}

impl KeyframeType {
    pub const ALL: [KeyframeType; 8] = [
        KeyframeType::Asset,
        KeyframeType::Bone,
        KeyframeType::Camera,
        KeyframeType::Effect,
        KeyframeType::Light,
        KeyframeType::Model,
        KeyframeType::Morph,
        KeyframeType::Project,
    ];

    pub fn section_type(self) -> SectionType {
        match self {
            KeyframeType::Asset => SectionType::Asset,
            KeyframeType::Bone => SectionType::Bone,
            KeyframeType::Camera => SectionType::Camera,
            KeyframeType::Effect => SectionType::Effect,
            KeyframeType::Light => SectionType::Light,
            KeyframeType::Model => SectionType::Model,
            KeyframeType::Morph => SectionType::Morph,
            KeyframeType::Project => SectionType::Project,
        }
    }
}

/// 关键帧记录的读写
pub trait KeyframeRecord: Sized {
    /// 所属段
    const SECTION: SectionType;
    /// 固定记录大小（不含段级扩展数据）
    const RECORD_SIZE: usize;

    /// 从一条记录读取（名称字段留空，由段负责填写）
    fn read_record(reader: &mut ByteReader<'_>, names: &NameListSection) -> Result<Self>;

    fn write_record<W: Write>(&self, writer: &mut W, names: &NameListSection) -> io::Result<()>;

    /// 写出前把记录引用的名称登记到名称表
    fn intern_names(&self, _names: &mut NameListSection) {}
}

fn read_err(section: SectionType) -> impl Fn(io::Error) -> MotionError {
    move |e| MotionError::truncated(section, format!("Failed to read keyframe: {}", e))
}

fn read_time_index(reader: &mut ByteReader<'_>) -> io::Result<TimeIndex> {
    Ok(reader.read_u64()? as TimeIndex)
}

fn write_time_index<W: Write>(writer: &mut W, time_index: TimeIndex) -> io::Result<()> {
    // 负数饱和为 0，小数部分截断
    writer.write_u64::<LittleEndian>(time_index.max(0.0) as u64)
}

fn read_vec3(reader: &mut ByteReader<'_>) -> io::Result<Vec3> {
    Ok(Vec3::from_array(reader.read_f32_array::<3>()?))
}

fn read_vec4(reader: &mut ByteReader<'_>) -> io::Result<Vec4> {
    Ok(Vec4::from_array(reader.read_f32_array::<4>()?))
}

fn read_quat(reader: &mut ByteReader<'_>) -> io::Result<Quat> {
    // 不做归一化，保留文件中的原始分量
    Ok(Quat::from_array(reader.read_f32_array::<4>()?))
}

fn read_tables<const N: usize>(reader: &mut ByteReader<'_>) -> io::Result<[InterpolationTable; N]> {
    let mut parameters = [InterpolationParameter::default(); N];
    for parameter in parameters.iter_mut() {
        *parameter = InterpolationParameter::read(reader)?;
    }
    Ok(parameters.map(InterpolationTable::new))
}

fn write_tables<W: Write>(writer: &mut W, tables: &[InterpolationTable]) -> io::Result<()> {
    for table in tables {
        table.parameter().write(writer)?;
    }
    Ok(())
}

fn resolve_optional_name(names: &NameListSection, key: NameKey) -> Result<Option<String>> {
    if key < 0 {
        return Ok(None);
    }
    names
        .name(key)
        .map(|name| Some(name.to_string()))
        .ok_or(MotionError::InvalidNameReference(key))
}

fn optional_key(names: &NameListSection, name: Option<&str>) -> NameKey {
    name.and_then(|name| names.key(name)).unwrap_or(-1)
}

/// 骨骼插值通道
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoneInterpolationType {
    TranslationX = 0,
    TranslationY = 1,
    TranslationZ = 2,
    Orientation = 3,
}

/// 骨骼关键帧
#[derive(Clone, Debug, PartialEq)]
pub struct BoneKeyframe {
    pub time_index: TimeIndex,
    pub layer_index: LayerIndex,
    pub name: String,
    pub translation: Vec3,
    pub rotation: Quat,
    pub(crate) interpolation: [InterpolationTable; 4],
}

impl BoneKeyframe {
    pub fn new(name: impl Into<String>, time_index: TimeIndex) -> Self {
        Self {
            time_index,
            layer_index: 0,
            name: name.into(),
            translation: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            interpolation: Default::default(),
        }
    }

    pub fn interpolation_parameter(&self, channel: BoneInterpolationType) -> InterpolationParameter {
        self.interpolation[channel as usize].parameter()
    }

    pub fn set_interpolation_parameter(
        &mut self,
        channel: BoneInterpolationType,
        parameter: InterpolationParameter,
    ) {
        self.interpolation[channel as usize].set_parameter(parameter);
    }

    pub fn interpolation_table(&self, channel: BoneInterpolationType) -> &InterpolationTable {
        &self.interpolation[channel as usize]
    }
}

impl KeyframeRecord for BoneKeyframe {
    const SECTION: SectionType = SectionType::Bone;
    const RECORD_SIZE: usize = 8 + 4 + 12 + 16 + InterpolationParameter::SIZE * 4;

    fn read_record(reader: &mut ByteReader<'_>, _names: &NameListSection) -> Result<Self> {
        let err = read_err(Self::SECTION);
        let time_index = read_time_index(reader).map_err(&err)?;
        let layer_index = reader.read_i32().map_err(&err)?;
        let translation = read_vec3(reader).map_err(&err)?;
        let rotation = read_quat(reader).map_err(&err)?;
        let interpolation = read_tables::<4>(reader).map_err(&err)?;
        Ok(Self {
            time_index,
            layer_index,
            name: String::new(),
            translation,
            rotation,
            interpolation,
        })
    }

    fn write_record<W: Write>(&self, writer: &mut W, _names: &NameListSection) -> io::Result<()> {
        write_time_index(writer, self.time_index)?;
        writer.write_i32::<LittleEndian>(self.layer_index)?;
        write_f32_slice(writer, &self.translation.to_array())?;
        write_f32_slice(writer, &self.rotation.to_array())?;
        write_tables(writer, &self.interpolation)
    }
}

/// Morph 关键帧
#[derive(Clone, Debug, PartialEq)]
pub struct MorphKeyframe {
    pub time_index: TimeIndex,
    pub layer_index: LayerIndex,
    pub name: String,
    pub weight: f32,
    pub(crate) interpolation: InterpolationTable,
}

impl MorphKeyframe {
    pub fn new(name: impl Into<String>, time_index: TimeIndex, weight: f32) -> Self {
        Self {
            time_index,
            layer_index: 0,
            name: name.into(),
            weight,
            interpolation: InterpolationTable::default(),
        }
    }

    pub fn interpolation_parameter(&self) -> InterpolationParameter {
        self.interpolation.parameter()
    }

    pub fn set_interpolation_parameter(&mut self, parameter: InterpolationParameter) {
        self.interpolation.set_parameter(parameter);
    }
}

impl KeyframeRecord for MorphKeyframe {
    const SECTION: SectionType = SectionType::Morph;
    const RECORD_SIZE: usize = 8 + 4 + 4 + InterpolationParameter::SIZE;

    fn read_record(reader: &mut ByteReader<'_>, _names: &NameListSection) -> Result<Self> {
        let err = read_err(Self::SECTION);
        let time_index = read_time_index(reader).map_err(&err)?;
        let layer_index = reader.read_i32().map_err(&err)?;
        let weight = reader.read_f32().map_err(&err)?;
        let parameter = InterpolationParameter::read(reader).map_err(&err)?;
        Ok(Self {
            time_index,
            layer_index,
            name: String::new(),
            weight,
            interpolation: InterpolationTable::new(parameter),
        })
    }

    fn write_record<W: Write>(&self, writer: &mut W, _names: &NameListSection) -> io::Result<()> {
        write_time_index(writer, self.time_index)?;
        writer.write_i32::<LittleEndian>(self.layer_index)?;
        writer.write_f32::<LittleEndian>(self.weight)?;
        self.interpolation.parameter().write(writer)
    }
}

/// 相机插值通道
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CameraInterpolationType {
    LookAtX = 0,
    LookAtY = 1,
    LookAtZ = 2,
    Angle = 3,
    Distance = 4,
    Fov = 5,
}

/// 相机关键帧
#[derive(Clone, Debug, PartialEq)]
pub struct CameraKeyframe {
    pub time_index: TimeIndex,
    pub look_at: Vec3,
    /// 欧拉角（弧度）
    pub angle: Vec3,
    pub fov: f32,
    pub distance: f32,
    pub is_perspective: bool,
    pub(crate) interpolation: [InterpolationTable; 6],
}

impl CameraKeyframe {
    pub fn new(time_index: TimeIndex) -> Self {
        Self {
            time_index,
            look_at: Vec3::ZERO,
            angle: Vec3::ZERO,
            fov: 30.0,
            distance: 0.0,
            is_perspective: true,
            interpolation: Default::default(),
        }
    }

    pub fn interpolation_parameter(&self, channel: CameraInterpolationType) -> InterpolationParameter {
        self.interpolation[channel as usize].parameter()
    }

    pub fn set_interpolation_parameter(
        &mut self,
        channel: CameraInterpolationType,
        parameter: InterpolationParameter,
    ) {
        self.interpolation[channel as usize].set_parameter(parameter);
    }
}

impl KeyframeRecord for CameraKeyframe {
    const SECTION: SectionType = SectionType::Camera;
    const RECORD_SIZE: usize = 8 + 12 + 12 + 4 + 4 + 1 + InterpolationParameter::SIZE * 6;

    fn read_record(reader: &mut ByteReader<'_>, _names: &NameListSection) -> Result<Self> {
        let err = read_err(Self::SECTION);
        let time_index = read_time_index(reader).map_err(&err)?;
        let look_at = read_vec3(reader).map_err(&err)?;
        let angle = read_vec3(reader).map_err(&err)?;
        let fov = reader.read_f32().map_err(&err)?;
        let distance = reader.read_f32().map_err(&err)?;
        let is_perspective = reader.read_bool().map_err(&err)?;
        let interpolation = read_tables::<6>(reader).map_err(&err)?;
        Ok(Self {
            time_index,
            look_at,
            angle,
            fov,
            distance,
            is_perspective,
            interpolation,
        })
    }

    fn write_record<W: Write>(&self, writer: &mut W, _names: &NameListSection) -> io::Result<()> {
        write_time_index(writer, self.time_index)?;
        write_f32_slice(writer, &self.look_at.to_array())?;
        write_f32_slice(writer, &self.angle.to_array())?;
        writer.write_f32::<LittleEndian>(self.fov)?;
        writer.write_f32::<LittleEndian>(self.distance)?;
        writer.write_u8(self.is_perspective as u8)?;
        write_tables(writer, &self.interpolation)
    }
}

/// 光照关键帧
#[derive(Clone, Debug, PartialEq)]
pub struct LightKeyframe {
    pub time_index: TimeIndex,
    pub color: Vec3,
    pub direction: Vec3,
    pub(crate) interpolation: InterpolationTable,
}

impl LightKeyframe {
    pub fn new(time_index: TimeIndex) -> Self {
        Self {
            time_index,
            color: Vec3::splat(0.6),
            direction: Vec3::new(-0.5, -1.0, 0.5),
            interpolation: InterpolationTable::default(),
        }
    }

    pub fn interpolation_parameter(&self) -> InterpolationParameter {
        self.interpolation.parameter()
    }

    pub fn set_interpolation_parameter(&mut self, parameter: InterpolationParameter) {
        self.interpolation.set_parameter(parameter);
    }
}

impl KeyframeRecord for LightKeyframe {
    const SECTION: SectionType = SectionType::Light;
    const RECORD_SIZE: usize = 8 + 12 + 12 + InterpolationParameter::SIZE;

    fn read_record(reader: &mut ByteReader<'_>, _names: &NameListSection) -> Result<Self> {
        let err = read_err(Self::SECTION);
        let time_index = read_time_index(reader).map_err(&err)?;
        let color = read_vec3(reader).map_err(&err)?;
        let direction = read_vec3(reader).map_err(&err)?;
        let parameter = InterpolationParameter::read(reader).map_err(&err)?;
        Ok(Self {
            time_index,
            color,
            direction,
            interpolation: InterpolationTable::new(parameter),
        })
    }

    fn write_record<W: Write>(&self, writer: &mut W, _names: &NameListSection) -> io::Result<()> {
        write_time_index(writer, self.time_index)?;
        write_f32_slice(writer, &self.color.to_array())?;
        write_f32_slice(writer, &self.direction.to_array())?;
        self.interpolation.parameter().write(writer)
    }
}

/// 配件关键帧
#[derive(Clone, Debug, PartialEq)]
pub struct AssetKeyframe {
    pub time_index: TimeIndex,
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale_factor: f32,
    pub opacity: f32,
    pub visible: bool,
    pub shadow_enabled: bool,
    pub add_blend_enabled: bool,
    /// 绑定的父模型名
    pub parent_model_name: Option<String>,
    /// 绑定的父骨骼名
    pub parent_bone_name: Option<String>,
    pub(crate) interpolation: InterpolationTable,
}

impl AssetKeyframe {
    pub fn new(time_index: TimeIndex) -> Self {
        Self {
            time_index,
            translation: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale_factor: 1.0,
            opacity: 1.0,
            visible: true,
            shadow_enabled: true,
            add_blend_enabled: false,
            parent_model_name: None,
            parent_bone_name: None,
            interpolation: InterpolationTable::default(),
        }
    }

    pub fn interpolation_parameter(&self) -> InterpolationParameter {
        self.interpolation.parameter()
    }

    pub fn set_interpolation_parameter(&mut self, parameter: InterpolationParameter) {
        self.interpolation.set_parameter(parameter);
    }
}

impl KeyframeRecord for AssetKeyframe {
    const SECTION: SectionType = SectionType::Asset;
    const RECORD_SIZE: usize = 8 + 12 + 16 + 4 + 4 + 4 + 4 + 4 + InterpolationParameter::SIZE;

    fn read_record(reader: &mut ByteReader<'_>, names: &NameListSection) -> Result<Self> {
        let err = read_err(Self::SECTION);
        let time_index = read_time_index(reader).map_err(&err)?;
        let translation = read_vec3(reader).map_err(&err)?;
        let rotation = read_quat(reader).map_err(&err)?;
        let scale_factor = reader.read_f32().map_err(&err)?;
        let opacity = reader.read_f32().map_err(&err)?;
        let flags = reader.take(4).map_err(&err)?;
        let parent_model_key = reader.read_i32().map_err(&err)?;
        let parent_bone_key = reader.read_i32().map_err(&err)?;
        let parameter = InterpolationParameter::read(reader).map_err(&err)?;
        Ok(Self {
            time_index,
            translation,
            rotation,
            scale_factor,
            opacity,
            visible: flags[0] != 0,
            shadow_enabled: flags[1] != 0,
            add_blend_enabled: flags[2] != 0,
            parent_model_name: resolve_optional_name(names, parent_model_key)?,
            parent_bone_name: resolve_optional_name(names, parent_bone_key)?,
            interpolation: InterpolationTable::new(parameter),
        })
    }

    fn write_record<W: Write>(&self, writer: &mut W, names: &NameListSection) -> io::Result<()> {
        write_time_index(writer, self.time_index)?;
        write_f32_slice(writer, &self.translation.to_array())?;
        write_f32_slice(writer, &self.rotation.to_array())?;
        writer.write_f32::<LittleEndian>(self.scale_factor)?;
        writer.write_f32::<LittleEndian>(self.opacity)?;
        writer.write_all(&[
            self.visible as u8,
            self.shadow_enabled as u8,
            self.add_blend_enabled as u8,
            0,
        ])?;
        writer.write_i32::<LittleEndian>(optional_key(names, self.parent_model_name.as_deref()))?;
        writer.write_i32::<LittleEndian>(optional_key(names, self.parent_bone_name.as_deref()))?;
        self.interpolation.parameter().write(writer)
    }

    fn intern_names(&self, names: &mut NameListSection) {
        if let Some(name) = &self.parent_model_name {
            names.intern(name);
        }
        if let Some(name) = &self.parent_bone_name {
            names.intern(name);
        }
    }
}

/// 特效参数关键帧（按参数名分轨）
#[derive(Clone, Debug, PartialEq)]
pub struct EffectKeyframe {
    pub time_index: TimeIndex,
    pub name: String,
    pub value: Vec4,
    pub(crate) interpolation: InterpolationTable,
}

impl EffectKeyframe {
    pub fn new(name: impl Into<String>, time_index: TimeIndex, value: Vec4) -> Self {
        Self {
            time_index,
            name: name.into(),
            value,
            interpolation: InterpolationTable::default(),
        }
    }

    pub fn interpolation_parameter(&self) -> InterpolationParameter {
        self.interpolation.parameter()
    }

    pub fn set_interpolation_parameter(&mut self, parameter: InterpolationParameter) {
        self.interpolation.set_parameter(parameter);
    }
}

impl KeyframeRecord for EffectKeyframe {
    const SECTION: SectionType = SectionType::Effect;
    const RECORD_SIZE: usize = 8 + 16 + InterpolationParameter::SIZE;

    fn read_record(reader: &mut ByteReader<'_>, _names: &NameListSection) -> Result<Self> {
        let err = read_err(Self::SECTION);
        let time_index = read_time_index(reader).map_err(&err)?;
        let value = read_vec4(reader).map_err(&err)?;
        let parameter = InterpolationParameter::read(reader).map_err(&err)?;
        Ok(Self {
            time_index,
            name: String::new(),
            value,
            interpolation: InterpolationTable::new(parameter),
        })
    }

    fn write_record<W: Write>(&self, writer: &mut W, _names: &NameListSection) -> io::Result<()> {
        write_time_index(writer, self.time_index)?;
        write_f32_slice(writer, &self.value.to_array())?;
        self.interpolation.parameter().write(writer)
    }
}

/// 模型状态关键帧
///
/// IK 开关按骨骼名存储；段头部列出所有 IK 骨骼的名称键，
/// 每条记录在固定部分之后追加等量的开关字节。
#[derive(Clone, Debug, PartialEq)]
pub struct ModelKeyframe {
    pub time_index: TimeIndex,
    pub visible: bool,
    pub shadow_enabled: bool,
    pub add_blend_enabled: bool,
    pub physics_enabled: bool,
    pub physics_still_mode: u8,
    pub edge_width: f32,
    pub edge_color: Vec4,
    pub ik_enabled: BTreeMap<String, bool>,
    pub(crate) interpolation: InterpolationTable,
}

impl ModelKeyframe {
    pub fn new(time_index: TimeIndex) -> Self {
        Self {
            time_index,
            visible: true,
            shadow_enabled: true,
            add_blend_enabled: false,
            physics_enabled: true,
            physics_still_mode: 0,
            edge_width: 1.0,
            edge_color: Vec4::new(0.0, 0.0, 0.0, 1.0),
            ik_enabled: BTreeMap::new(),
            interpolation: InterpolationTable::default(),
        }
    }

    /// 未记录的 IK 骨骼视为启用
    pub fn is_ik_enabled(&self, bone_name: &str) -> bool {
        self.ik_enabled.get(bone_name).copied().unwrap_or(true)
    }

    pub fn set_ik_enabled(&mut self, bone_name: impl Into<String>, enabled: bool) {
        self.ik_enabled.insert(bone_name.into(), enabled);
    }

    pub fn interpolation_parameter(&self) -> InterpolationParameter {
        self.interpolation.parameter()
    }

    pub fn set_interpolation_parameter(&mut self, parameter: InterpolationParameter) {
        self.interpolation.set_parameter(parameter);
    }
}

impl KeyframeRecord for ModelKeyframe {
    const SECTION: SectionType = SectionType::Model;
    const RECORD_SIZE: usize = 8 + 8 + 4 + 16 + InterpolationParameter::SIZE;

    fn read_record(reader: &mut ByteReader<'_>, _names: &NameListSection) -> Result<Self> {
        let err = read_err(Self::SECTION);
        let time_index = read_time_index(reader).map_err(&err)?;
        let flags = reader.take(8).map_err(&err)?;
        let edge_width = reader.read_f32().map_err(&err)?;
        let edge_color = read_vec4(reader).map_err(&err)?;
        let parameter = InterpolationParameter::read(reader).map_err(&err)?;
        Ok(Self {
            time_index,
            visible: flags[0] != 0,
            shadow_enabled: flags[1] != 0,
            add_blend_enabled: flags[2] != 0,
            physics_enabled: flags[3] != 0,
            physics_still_mode: flags[4],
            edge_width,
            edge_color,
            ik_enabled: BTreeMap::new(),
            interpolation: InterpolationTable::new(parameter),
        })
    }

    fn write_record<W: Write>(&self, writer: &mut W, _names: &NameListSection) -> io::Result<()> {
        write_time_index(writer, self.time_index)?;
        writer.write_all(&[
            self.visible as u8,
            self.shadow_enabled as u8,
            self.add_blend_enabled as u8,
            self.physics_enabled as u8,
            self.physics_still_mode,
            0,
            0,
            0,
        ])?;
        writer.write_f32::<LittleEndian>(self.edge_width)?;
        write_f32_slice(writer, &self.edge_color.to_array())?;
        self.interpolation.parameter().write(writer)
    }

    fn intern_names(&self, names: &mut NameListSection) {
        for bone_name in self.ik_enabled.keys() {
            names.intern(bone_name);
        }
    }
}

/// 工程（场景全局）关键帧
#[derive(Clone, Debug, PartialEq)]
pub struct ProjectKeyframe {
    pub time_index: TimeIndex,
    pub gravity_factor: f32,
    pub gravity_direction: Vec3,
    pub shadow_mode: i32,
    pub shadow_distance: f32,
    pub shadow_depth: f32,
    pub(crate) interpolation: InterpolationTable,
}

impl ProjectKeyframe {
    pub fn new(time_index: TimeIndex) -> Self {
        Self {
            time_index,
            gravity_factor: 9.8,
            gravity_direction: Vec3::new(0.0, -1.0, 0.0),
            shadow_mode: 0,
            shadow_distance: 8875.0,
            shadow_depth: 0.0,
            interpolation: InterpolationTable::default(),
        }
    }

    pub fn interpolation_parameter(&self) -> InterpolationParameter {
        self.interpolation.parameter()
    }

    pub fn set_interpolation_parameter(&mut self, parameter: InterpolationParameter) {
        self.interpolation.set_parameter(parameter);
    }
}

impl KeyframeRecord for ProjectKeyframe {
    const SECTION: SectionType = SectionType::Project;
    const RECORD_SIZE: usize = 8 + 4 + 12 + 4 + 4 + 4 + InterpolationParameter::SIZE;

    fn read_record(reader: &mut ByteReader<'_>, _names: &NameListSection) -> Result<Self> {
        let err = read_err(Self::SECTION);
        let time_index = read_time_index(reader).map_err(&err)?;
        let gravity_factor = reader.read_f32().map_err(&err)?;
        let gravity_direction = read_vec3(reader).map_err(&err)?;
        let shadow_mode = reader.read_i32().map_err(&err)?;
        let shadow_distance = reader.read_f32().map_err(&err)?;
        let shadow_depth = reader.read_f32().map_err(&err)?;
        let parameter = InterpolationParameter::read(reader).map_err(&err)?;
        Ok(Self {
            time_index,
            gravity_factor,
            gravity_direction,
            shadow_mode,
            shadow_distance,
            shadow_depth,
            interpolation: InterpolationTable::new(parameter),
        })
    }

    fn write_record<W: Write>(&self, writer: &mut W, _names: &NameListSection) -> io::Result<()> {
        write_time_index(writer, self.time_index)?;
        writer.write_f32::<LittleEndian>(self.gravity_factor)?;
        write_f32_slice(writer, &self.gravity_direction.to_array())?;
        writer.write_i32::<LittleEndian>(self.shadow_mode)?;
        writer.write_f32::<LittleEndian>(self.shadow_distance)?;
        writer.write_f32::<LittleEndian>(self.shadow_depth)?;
        self.interpolation.parameter().write(writer)
    }
}

/// 任意种类的关键帧（按种类分派到对应的段）
#[derive(Clone, Debug, PartialEq)]
pub enum Keyframe {
    Asset(AssetKeyframe),
    Bone(BoneKeyframe),
    Camera(CameraKeyframe),
    Effect(EffectKeyframe),
    Light(LightKeyframe),
    Model(ModelKeyframe),
    Morph(MorphKeyframe),
    Project(ProjectKeyframe),
}

impl Keyframe {
    pub fn kind(&self) -> KeyframeType {
        match self {
            Keyframe::Asset(_) => KeyframeType::Asset,
            Keyframe::Bone(_) => KeyframeType::Bone,
            Keyframe::Camera(_) => KeyframeType::Camera,
            Keyframe::Effect(_) => KeyframeType::Effect,
            Keyframe::Light(_) => KeyframeType::Light,
            Keyframe::Model(_) => KeyframeType::Model,
            Keyframe::Morph(_) => KeyframeType::Morph,
            Keyframe::Project(_) => KeyframeType::Project,
        }
    }

    pub fn time_index(&self) -> TimeIndex {
        match self {
            Keyframe::Asset(k) => k.time_index,
            Keyframe::Bone(k) => k.time_index,
            Keyframe::Camera(k) => k.time_index,
            Keyframe::Effect(k) => k.time_index,
            Keyframe::Light(k) => k.time_index,
            Keyframe::Model(k) => k.time_index,
            Keyframe::Morph(k) => k.time_index,
            Keyframe::Project(k) => k.time_index,
        }
    }

    /// 非分层种类恒为 0
    pub fn layer_index(&self) -> LayerIndex {
        match self {
            Keyframe::Bone(k) => k.layer_index,
            Keyframe::Morph(k) => k.layer_index,
            _ => 0,
        }
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            Keyframe::Bone(k) => Some(&k.name),
            Keyframe::Effect(k) => Some(&k.name),
            Keyframe::Morph(k) => Some(&k.name),
            _ => None,
        }
    }
}

macro_rules! impl_keyframe_from {
    ($($variant:ident => $ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for Keyframe {
                fn from(keyframe: $ty) -> Self {
                    Keyframe::$variant(keyframe)
                }
            }
        )*
    };
}

impl_keyframe_from! {
    Asset => AssetKeyframe,
    Bone => BoneKeyframe,
    Camera => CameraKeyframe,
    Effect => EffectKeyframe,
    Light => LightKeyframe,
    Model => ModelKeyframe,
    Morph => MorphKeyframe,
    Project => ProjectKeyframe,
}
