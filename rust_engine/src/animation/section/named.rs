//! 按名称分轨的段（骨骼 / Morph / 特效）
//!
//! 每个名称一个段；名称下按层索引再分轨，求值时各层结果按层序叠加。

use std::collections::BTreeMap;
use std::io::{self, Write};

use byteorder::{LittleEndian, WriteBytesExt};

use super::{non_negative, truncated, ChunkHeader, SectionTag};
use crate::animation::codec::{to_i32, ByteReader};
use crate::animation::keyframe::{
    BoneKeyframe, EffectKeyframe, KeyframeRecord, LayerIndex, MorphKeyframe, TimeIndex,
};
use crate::animation::motion_track::{KeyframeTrack, LayeredFrame, TrackKeyframe};
use crate::animation::name_list::{NameKey, NameListSection};
use crate::{MotionError, Result};

/// 带名称的关键帧
pub trait NamedKeyframe: TrackKeyframe + KeyframeRecord {
    /// 段头部之后是否跟随层记录
    const HAS_LAYER_RECORDS: bool;

    fn name(&self) -> &str;

    fn set_name(&mut self, name: String);
}

impl NamedKeyframe for BoneKeyframe {
    const HAS_LAYER_RECORDS: bool = true;

    fn name(&self) -> &str {
        &self.name
    }

    fn set_name(&mut self, name: String) {
        self.name = name;
    }
}

impl NamedKeyframe for MorphKeyframe {
    const HAS_LAYER_RECORDS: bool = true;

    fn name(&self) -> &str {
        &self.name
    }

    fn set_name(&mut self, name: String) {
        self.name = name;
    }
}

impl NamedKeyframe for EffectKeyframe {
    const HAS_LAYER_RECORDS: bool = false;

    fn name(&self) -> &str {
        &self.name
    }

    fn set_name(&mut self, name: String) {
        self.name = name;
    }
}

/// 层记录（每层一个 i32）
const LAYER_RECORD_SIZE: usize = 4;

#[derive(Debug, Clone)]
struct LayerTrack<K: TrackKeyframe> {
    track: KeyframeTrack<K>,
    current_frame: Option<K::Frame>,
}

impl<K: TrackKeyframe> Default for LayerTrack<K> {
    fn default() -> Self {
        Self {
            track: KeyframeTrack::new(),
            current_frame: None,
        }
    }
}

/// 单个名称下的全部层
#[derive(Debug, Clone)]
struct NamedContext<K: TrackKeyframe> {
    layers: BTreeMap<LayerIndex, LayerTrack<K>>,
}

impl<K: TrackKeyframe> Default for NamedContext<K> {
    fn default() -> Self {
        Self {
            layers: BTreeMap::new(),
        }
    }
}

impl<K: TrackKeyframe> NamedContext<K> {
    fn count_keyframes(&self) -> usize {
        self.layers.values().map(|layer| layer.track.len()).sum()
    }

    fn keyframes(&self) -> impl Iterator<Item = &K> {
        self.layers
            .values()
            .flat_map(|layer| layer.track.keyframes().iter())
    }
}

/// 按名称分轨的段
#[derive(Debug, Clone)]
pub struct NamedSection<K: TrackKeyframe> {
    contexts: BTreeMap<NameKey, NamedContext<K>>,
    max_time_index: TimeIndex,
    current_time_index: TimeIndex,
    previous_time_index: TimeIndex,
}

impl<K: TrackKeyframe> Default for NamedSection<K> {
    fn default() -> Self {
        Self {
            contexts: BTreeMap::new(),
            max_time_index: 0.0,
            current_time_index: 0.0,
            previous_time_index: 0.0,
        }
    }
}

impl<K> NamedSection<K>
where
    K: NamedKeyframe,
    K::Frame: LayeredFrame,
{
    pub fn new() -> Self {
        Self::default()
    }

    fn read_layer_count(header: &ChunkHeader) -> Result<usize> {
        if K::HAS_LAYER_RECORDS {
            non_negative(header.extra, K::SECTION, "layer count")
        } else {
            Ok(0)
        }
    }

    fn skip_layer_records(reader: &mut ByteReader<'_>, header: &ChunkHeader) -> Result<()> {
        let count = Self::read_layer_count(header)?;
        let size = count
            .checked_mul(LAYER_RECORD_SIZE)
            .ok_or_else(|| MotionError::truncated(K::SECTION, "layer table overflows"))?;
        reader.skip(size).map_err(truncated(K::SECTION))
    }

    pub fn preparse(reader: &mut ByteReader<'_>) -> Result<()> {
        let header = ChunkHeader::read(reader, K::SECTION)?;
        Self::skip_layer_records(reader, &header)?;
        header.validate_record_size(K::SECTION, K::RECORD_SIZE)?;
        header.skip_keyframes(reader, K::SECTION)
    }

    /// 读取一个名称的段；名称键必须存在于名称表
    pub fn read(&mut self, chunk: &[u8], names: &NameListSection) -> Result<()> {
        let mut reader = ByteReader::new(chunk);
        let header = ChunkHeader::read(&mut reader, K::SECTION)?;
        let name = names
            .name(header.key)
            .ok_or(MotionError::InvalidNameReference(header.key))?;
        Self::skip_layer_records(&mut reader, &header)?;
        header.validate_record_size(K::SECTION, K::RECORD_SIZE)?;

        let keyframes = header.read_records(&mut reader, K::SECTION, |record| {
            let mut keyframe = K::read_record(record, names)?;
            keyframe.set_name(name.to_string());
            Ok(keyframe)
        })?;

        let context = self.contexts.entry(header.key).or_default();
        let mut by_layer: BTreeMap<LayerIndex, Vec<K>> = BTreeMap::new();
        for keyframe in keyframes {
            by_layer.entry(keyframe.layer_index()).or_default().push(keyframe);
        }
        for (layer_index, keyframes) in by_layer {
            context
                .layers
                .entry(layer_index)
                .or_default()
                .track
                .extend(keyframes);
        }
        self.update_max_time_index();
        Ok(())
    }

    /// 每个非空名称写出一个段
    pub fn write<W: Write>(&self, writer: &mut W, names: &NameListSection) -> io::Result<()> {
        for (key, context) in &self.contexts {
            let count = context.count_keyframes();
            if count == 0 {
                continue;
            }
            let layer_count = if K::HAS_LAYER_RECORDS {
                context.layers.len()
            } else {
                0
            };
            SectionTag::new(K::SECTION).write(writer)?;
            ChunkHeader::write(
                writer,
                *key,
                K::RECORD_SIZE,
                count,
                to_i32(layer_count)?,
            )?;
            if K::HAS_LAYER_RECORDS {
                for layer_index in context.layers.keys() {
                    writer.write_i32::<LittleEndian>(*layer_index)?;
                }
            }
            for keyframe in context.keyframes() {
                keyframe.write_record(writer, names)?;
            }
        }
        Ok(())
    }

    pub fn estimate_size(&self, _names: &NameListSection) -> usize {
        self.contexts
            .values()
            .filter(|context| context.count_keyframes() > 0)
            .map(|context| {
                let layers = if K::HAS_LAYER_RECORDS {
                    context.layers.len() * LAYER_RECORD_SIZE
                } else {
                    0
                };
                SectionTag::SIZE
                    + ChunkHeader::SIZE
                    + layers
                    + K::RECORD_SIZE * context.count_keyframes()
            })
            .sum()
    }

    /// 各层独立求值；空层保留上一次结果
    pub fn seek(&mut self, time_index: TimeIndex) {
        for context in self.contexts.values_mut() {
            for layer in context.layers.values_mut() {
                if let Some(frame) = layer.track.seek(time_index) {
                    layer.current_frame = Some(frame);
                }
            }
        }
        self.previous_time_index = self.current_time_index;
        self.current_time_index = time_index;
    }

    pub fn advance(&mut self, delta: TimeIndex) {
        let current = self.current_time_index;
        self.seek(current);
        self.seek(current + delta);
    }

    pub fn add_keyframe(&mut self, keyframe: K, names: &mut NameListSection) {
        let key = names.intern(keyframe.name());
        keyframe.intern_names(names);
        self.contexts
            .entry(key)
            .or_default()
            .layers
            .entry(keyframe.layer_index())
            .or_default()
            .track
            .insert(keyframe);
        self.update_max_time_index();
    }

    /// 时间 0 的关键帧不可删除
    pub fn delete_keyframe(
        &mut self,
        time_index: TimeIndex,
        name: &str,
        layer_index: LayerIndex,
        names: &NameListSection,
    ) -> Option<K> {
        if time_index == 0.0 {
            return None;
        }
        self.remove(time_index, name, layer_index, names)
    }

    /// 先按 (time, name, layer) 移除同位关键帧再插入
    pub fn replace_keyframe(&mut self, keyframe: K, names: &mut NameListSection) {
        self.remove(
            keyframe.time_index(),
            keyframe.name(),
            keyframe.layer_index(),
            names,
        );
        self.add_keyframe(keyframe, names);
    }

    fn remove(
        &mut self,
        time_index: TimeIndex,
        name: &str,
        layer_index: LayerIndex,
        names: &NameListSection,
    ) -> Option<K> {
        let key = names.key(name)?;
        let context = self.contexts.get_mut(&key)?;
        let layer = context.layers.get_mut(&layer_index)?;
        let index = layer.track.position(|k| k.time_index() == time_index)?;
        let keyframe = layer.track.remove(index);
        if layer.track.is_empty() {
            context.layers.remove(&layer_index);
        }
        if context.layers.is_empty() {
            self.contexts.remove(&key);
        }
        self.update_max_time_index();
        Some(keyframe)
    }

    pub fn find_keyframe(
        &self,
        time_index: TimeIndex,
        name: &str,
        layer_index: LayerIndex,
        names: &NameListSection,
    ) -> Option<&K> {
        let key = names.key(name)?;
        self.contexts
            .get(&key)?
            .layers
            .get(&layer_index)?
            .track
            .keyframes()
            .iter()
            .find(|k| k.time_index() == time_index)
    }

    /// 按 (名称键, 层, 时间) 顺序的第 index 个
    pub fn find_keyframe_at(&self, index: usize) -> Option<&K> {
        self.keyframes().nth(index)
    }

    pub fn count_keyframes(&self) -> usize {
        self.contexts.values().map(NamedContext::count_keyframes).sum()
    }

    /// 名称下不同层索引的数量；未知名称视为只有基础层
    pub fn count_layers(&self, name: &str, names: &NameListSection) -> usize {
        names
            .key(name)
            .and_then(|key| self.contexts.get(&key))
            .map(|context| context.layers.len())
            .unwrap_or(1)
    }

    pub fn is_empty(&self) -> bool {
        self.count_keyframes() == 0
    }

    pub fn keyframes(&self) -> impl Iterator<Item = &K> {
        self.contexts.values().flat_map(NamedContext::keyframes)
    }

    pub fn set_keyframes(&mut self, keyframes: Vec<K>, names: &mut NameListSection) {
        self.contexts.clear();
        for keyframe in keyframes {
            self.add_keyframe(keyframe, names);
        }
        self.update_max_time_index();
    }

    /// 指定名称的叠加结果（按层序）
    pub fn current_frame(&self, name: &str, names: &NameListSection) -> Option<K::Frame> {
        let context = self.contexts.get(&names.key(name)?)?;
        Self::combine(context)
    }

    pub fn layer_frame(
        &self,
        name: &str,
        layer_index: LayerIndex,
        names: &NameListSection,
    ) -> Option<&K::Frame> {
        self.contexts
            .get(&names.key(name)?)?
            .layers
            .get(&layer_index)?
            .current_frame
            .as_ref()
    }

    /// 遍历所有已求值名称的叠加结果
    pub fn for_each_frame<F>(&self, names: &NameListSection, mut f: F)
    where
        F: FnMut(&str, K::Frame),
    {
        for (key, context) in &self.contexts {
            if let (Some(name), Some(frame)) = (names.name(*key), Self::combine(context)) {
                f(name, frame);
            }
        }
    }

    fn combine(context: &NamedContext<K>) -> Option<K::Frame> {
        let mut frames = context
            .layers
            .values()
            .filter_map(|layer| layer.current_frame.as_ref());
        let mut combined = frames.next()?.clone();
        for frame in frames {
            combined.accumulate(frame);
        }
        Some(combined)
    }

    fn update_max_time_index(&mut self) {
        self.max_time_index = self
            .contexts
            .values()
            .flat_map(|context| context.layers.values())
            .map(|layer| layer.track.max_time_index())
            .fold(0.0, TimeIndex::max);
    }

    pub fn max_time_index(&self) -> TimeIndex {
        self.max_time_index
    }

    pub fn current_time_index(&self) -> TimeIndex {
        self.current_time_index
    }

    pub fn previous_time_index(&self) -> TimeIndex {
        self.previous_time_index
    }
}
