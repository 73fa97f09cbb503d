//! 名称表
//!
//! 骨骼 / Morph / 特效轨道以及配件、模型记录中的名称都以整数键引用此表，
//! 字符串只保存一份。

use std::collections::{BTreeMap, HashMap};
use std::io::{self, Write};

use byteorder::{LittleEndian, WriteBytesExt};

use super::codec::{to_i32, ByteReader, StringCodec};
use super::section::SectionType;
use crate::{MotionError, Result};

/// 名称键
pub type NameKey = i32;

/// 段头部：reserved, reserved2, count, reserved3
const HEADER_SIZE: usize = 16;

fn truncated(e: io::Error) -> MotionError {
    MotionError::truncated(SectionType::NameList, format!("Failed to read name list: {}", e))
}

/// 名称表（字符串驻留）
#[derive(Debug, Clone, Default)]
pub struct NameListSection {
    names: BTreeMap<NameKey, String>,
    keys: HashMap<String, NameKey>,
    next_key: NameKey,
}

impl NameListSection {
    pub fn new() -> Self {
        Self::default()
    }

    /// 只查询，不插入
    pub fn key(&self, name: &str) -> Option<NameKey> {
        self.keys.get(name).copied()
    }

    /// 查询或插入
    pub fn intern(&mut self, name: &str) -> NameKey {
        if let Some(key) = self.keys.get(name) {
            return *key;
        }
        let key = self.free_key();
        self.insert(key, name.to_string());
        key
    }

    /// 未被占用的非负键
    fn free_key(&self) -> NameKey {
        if !self.names.contains_key(&self.next_key) {
            return self.next_key;
        }
        // next_key 已被占用（读入了 i32::MAX）：取最小的空位
        let mut candidate: NameKey = 0;
        for key in self.names.range(0..).map(|(key, _)| *key) {
            if key != candidate {
                break;
            }
            match candidate.checked_add(1) {
                Some(next) => candidate = next,
                None => break,
            }
        }
        candidate
    }

    pub fn name(&self, key: NameKey) -> Option<&str> {
        self.names.get(&key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (NameKey, &str)> {
        self.names.iter().map(|(key, name)| (*key, name.as_str()))
    }

    fn insert(&mut self, key: NameKey, name: String) {
        if let Some(previous) = self.names.insert(key, name.clone()) {
            if previous != name && self.keys.get(&previous) == Some(&key) {
                // 被覆盖的名称改指向它的其他键（若有）
                let other_key = self
                    .names
                    .iter()
                    .find(|(_, other)| **other == previous)
                    .map(|(other_key, _)| *other_key);
                match other_key {
                    Some(other_key) => {
                        self.keys.insert(previous, other_key);
                    }
                    None => {
                        self.keys.remove(&previous);
                    }
                }
            }
        }
        // 同名不同键时，查询返回最先出现的键
        self.keys.entry(name).or_insert(key);
        if let Some(next) = key.checked_add(1) {
            self.next_key = self.next_key.max(next);
        }
    }

    /// 只校验长度，不分配
    pub fn preparse(reader: &mut ByteReader<'_>) -> Result<()> {
        reader.skip(8).map_err(truncated)?;
        let count = reader.read_count().map_err(truncated)?;
        reader.skip(4).map_err(truncated)?;
        for _ in 0..count {
            reader.read_i32().map_err(truncated)?;
            reader.read_text().map_err(truncated)?;
        }
        Ok(())
    }

    /// 从预解析过的段数据读取，追加到当前表；负键无法被引用，视为错误
    pub fn read(&mut self, chunk: &[u8], codec: StringCodec) -> Result<()> {
        let mut reader = ByteReader::new(chunk);
        reader.skip(8).map_err(truncated)?;
        let count = reader.read_count().map_err(truncated)?;
        reader.skip(4).map_err(truncated)?;
        for _ in 0..count {
            let key = reader.read_i32().map_err(truncated)?;
            let text = reader.read_text().map_err(truncated)?;
            if key < 0 {
                return Err(MotionError::InvalidNameReference(key));
            }
            self.insert(key, codec.decode(text));
        }
        Ok(())
    }

    pub fn write<W: Write>(&self, writer: &mut W, codec: StringCodec) -> io::Result<()> {
        writer.write_i32::<LittleEndian>(0)?;
        writer.write_i32::<LittleEndian>(0)?;
        writer.write_i32::<LittleEndian>(to_i32(self.names.len())?)?;
        writer.write_i32::<LittleEndian>(0)?;
        for (key, name) in &self.names {
            writer.write_i32::<LittleEndian>(*key)?;
            codec.write_text(writer, name)?;
        }
        Ok(())
    }

    pub fn estimate_size(&self, codec: StringCodec) -> usize {
        HEADER_SIZE
            + self
                .names
                .values()
                .map(|name| 4 + codec.text_size(name))
                .sum::<usize>()
    }
}
