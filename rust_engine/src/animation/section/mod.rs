//! 段（轨道集合）
//!
//! 每个段以 `SectionTag` 开头，随后是段头部与定长关键帧记录。
//! 同一种类的段可以在文件中出现多次。

mod flat;
mod model;
mod named;

pub use flat::{FlatKeyframe, FlatSection};
pub use named::{NamedKeyframe, NamedSection};

use std::io::{self, Write};

use byteorder::{LittleEndian, WriteBytesExt};

use super::codec::{to_i32, ByteReader};
use crate::{MotionError, Result};

/// 段类型（文件中的 tag 值）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SectionType {
    NameList,
    Bone,
    Morph,
    Model,
    Asset,
    Effect,
    Camera,
    Light,
    Project,
    EndOfFile,
}

impl SectionType {
    pub fn value(self) -> i32 {
        match self {
            SectionType::NameList => 0,
            SectionType::Bone => 16,
            SectionType::Morph => 32,
            SectionType::Model => 64,
            SectionType::Asset => 80,
            SectionType::Effect => 88,
            SectionType::Camera => 96,
            SectionType::Light => 112,
            SectionType::Project => 128,
            SectionType::EndOfFile => 255,
        }
    }

    pub fn from_value(value: i32) -> Option<Self> {
        match value {
            0 => Some(SectionType::NameList),
            16 => Some(SectionType::Bone),
            32 => Some(SectionType::Morph),
            64 => Some(SectionType::Model),
            80 => Some(SectionType::Asset),
            88 => Some(SectionType::Effect),
            96 => Some(SectionType::Camera),
            112 => Some(SectionType::Light),
            128 => Some(SectionType::Project),
            255 => Some(SectionType::EndOfFile),
            _ => None,
        }
    }
}

/// 段标签 `{type: i32, minor: i32}`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectionTag {
    pub section_type: SectionType,
    pub minor: i32,
}

impl SectionTag {
    pub const SIZE: usize = 8;

    pub fn new(section_type: SectionType) -> Self {
        Self {
            section_type,
            minor: 0,
        }
    }

    /// 未知类型与读取不足都会中止解析
    pub fn read(reader: &mut ByteReader<'_>) -> Result<Self> {
        let err = |e: io::Error| {
            MotionError::truncated(
                SectionType::EndOfFile,
                format!("Failed to read section tag: {}", e),
            )
        };
        let value = reader.read_i32().map_err(err)?;
        let minor = reader.read_i32().map_err(err)?;
        let section_type = SectionType::from_value(value).ok_or(MotionError::UnknownSection(value))?;
        Ok(Self {
            section_type,
            minor,
        })
    }

    pub fn write<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        writer.write_i32::<LittleEndian>(self.section_type.value())?;
        writer.write_i32::<LittleEndian>(self.minor)
    }
}

pub(crate) fn truncated(section: SectionType) -> impl Fn(io::Error) -> MotionError {
    move |e| MotionError::truncated(section, format!("Failed to read section: {}", e))
}

/// 通用段头部 `{key/reserved, sizeOfKeyframe, countOfKeyframes, extra}`
#[derive(Debug, Clone, Copy)]
pub(crate) struct ChunkHeader {
    pub key: i32,
    pub size_of_keyframe: usize,
    pub count_of_keyframes: usize,
    pub extra: i32,
}

impl ChunkHeader {
    pub const SIZE: usize = 16;

    pub fn read(reader: &mut ByteReader<'_>, section: SectionType) -> Result<Self> {
        let err = truncated(section);
        let key = reader.read_i32().map_err(&err)?;
        let size_of_keyframe = reader.read_count().map_err(&err)?;
        let count_of_keyframes = reader.read_count().map_err(&err)?;
        let extra = reader.read_i32().map_err(&err)?;
        Ok(Self {
            key,
            size_of_keyframe,
            count_of_keyframes,
            extra,
        })
    }

    pub fn write<W: Write>(
        writer: &mut W,
        key: i32,
        size_of_keyframe: usize,
        count_of_keyframes: usize,
        extra: i32,
    ) -> io::Result<()> {
        writer.write_i32::<LittleEndian>(key)?;
        writer.write_i32::<LittleEndian>(to_i32(size_of_keyframe)?)?;
        writer.write_i32::<LittleEndian>(to_i32(count_of_keyframes)?)?;
        writer.write_i32::<LittleEndian>(extra)
    }

    /// 声明的记录大小不能小于固定记录
    pub fn validate_record_size(&self, section: SectionType, minimum: usize) -> Result<()> {
        if self.size_of_keyframe < minimum {
            return Err(MotionError::truncated(
                section,
                format!(
                    "keyframe size {} is smaller than record size {}",
                    self.size_of_keyframe, minimum
                ),
            ));
        }
        Ok(())
    }

    /// 跳过全部关键帧记录（预解析用）
    pub fn skip_keyframes(&self, reader: &mut ByteReader<'_>, section: SectionType) -> Result<()> {
        let total = self
            .size_of_keyframe
            .checked_mul(self.count_of_keyframes)
            .ok_or_else(|| MotionError::truncated(section, "keyframe table size overflows"))?;
        reader.skip(total).map_err(truncated(section))
    }

    /// 逐条读取记录；记录尾部的保留字节被忽略
    pub fn read_records<'a, K, F>(
        &self,
        reader: &mut ByteReader<'a>,
        section: SectionType,
        mut read: F,
    ) -> Result<Vec<K>>
    where
        F: FnMut(&mut ByteReader<'a>) -> Result<K>,
    {
        let capacity = reader.remaining() / self.size_of_keyframe.max(1);
        let mut keyframes = Vec::with_capacity(self.count_of_keyframes.min(capacity));
        for _ in 0..self.count_of_keyframes {
            let record = reader.take(self.size_of_keyframe).map_err(truncated(section))?;
            let mut record_reader = ByteReader::new(record);
            keyframes.push(read(&mut record_reader)?);
        }
        Ok(keyframes)
    }
}

/// 非负 i32 → usize
pub(crate) fn non_negative(value: i32, section: SectionType, what: &str) -> Result<usize> {
    usize::try_from(value)
        .map_err(|_| MotionError::truncated(section, format!("negative {}: {}", what, value)))
}
