//! 单轨段（相机 / 光照 / 配件 / 模型 / 工程）

use std::io::{self, Write};

use super::{ChunkHeader, SectionTag};
use crate::animation::codec::ByteReader;
use crate::animation::keyframe::{
    AssetKeyframe, CameraKeyframe, KeyframeRecord, LayerIndex, LightKeyframe, ProjectKeyframe,
    TimeIndex,
};
use crate::animation::motion_track::{KeyframeTrack, TrackKeyframe};
use crate::animation::name_list::NameListSection;
use crate::Result;

/// 单轨段中关键帧的整段读写
///
/// 默认实现对应 `{reserved, sizeOfKeyframe, count, reserved2}` 头部加定长记录；
/// 模型关键帧覆盖这些方法以携带 IK 骨骼表。
pub trait FlatKeyframe: TrackKeyframe + KeyframeRecord {
    fn preparse_chunk(reader: &mut ByteReader<'_>) -> Result<()> {
        let header = ChunkHeader::read(reader, Self::SECTION)?;
        header.validate_record_size(Self::SECTION, Self::RECORD_SIZE)?;
        header.skip_keyframes(reader, Self::SECTION)
    }

    fn read_chunk(chunk: &[u8], names: &NameListSection) -> Result<Vec<Self>> {
        let mut reader = ByteReader::new(chunk);
        let header = ChunkHeader::read(&mut reader, Self::SECTION)?;
        header.validate_record_size(Self::SECTION, Self::RECORD_SIZE)?;
        header.read_records(&mut reader, Self::SECTION, |record| {
            Self::read_record(record, names)
        })
    }

    fn write_chunk<W: Write>(
        keyframes: &[Self],
        names: &NameListSection,
        writer: &mut W,
    ) -> io::Result<()> {
        ChunkHeader::write(writer, 0, Self::RECORD_SIZE, keyframes.len(), 0)?;
        for keyframe in keyframes {
            keyframe.write_record(writer, names)?;
        }
        Ok(())
    }

    fn chunk_size(keyframes: &[Self], _names: &NameListSection) -> usize {
        ChunkHeader::SIZE + Self::RECORD_SIZE * keyframes.len()
    }
}

impl FlatKeyframe for AssetKeyframe {}
impl FlatKeyframe for CameraKeyframe {}
impl FlatKeyframe for LightKeyframe {}
impl FlatKeyframe for ProjectKeyframe {}

/// 单轨段：整段只有一条轨道，层数恒为 1
#[derive(Debug, Clone)]
pub struct FlatSection<K: TrackKeyframe> {
    track: KeyframeTrack<K>,
    current_frame: Option<K::Frame>,
    max_time_index: TimeIndex,
    current_time_index: TimeIndex,
    previous_time_index: TimeIndex,
}

impl<K: TrackKeyframe> Default for FlatSection<K> {
    fn default() -> Self {
        Self {
            track: KeyframeTrack::new(),
            current_frame: None,
            max_time_index: 0.0,
            current_time_index: 0.0,
            previous_time_index: 0.0,
        }
    }
}

impl<K: FlatKeyframe> FlatSection<K> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn preparse(reader: &mut ByteReader<'_>) -> Result<()> {
        K::preparse_chunk(reader)
    }

    /// 读取一个段的数据并并入轨道
    pub fn read(&mut self, chunk: &[u8], names: &NameListSection) -> Result<()> {
        let keyframes = K::read_chunk(chunk, names)?;
        self.track.extend(keyframes);
        self.max_time_index = self.track.max_time_index();
        Ok(())
    }

    /// 空轨道不写出任何数据
    pub fn write<W: Write>(&self, writer: &mut W, names: &NameListSection) -> io::Result<()> {
        if self.track.is_empty() {
            return Ok(());
        }
        SectionTag::new(K::SECTION).write(writer)?;
        K::write_chunk(self.track.keyframes(), names, writer)
    }

    pub fn estimate_size(&self, names: &NameListSection) -> usize {
        if self.track.is_empty() {
            return 0;
        }
        SectionTag::SIZE + K::chunk_size(self.track.keyframes(), names)
    }

    /// 空轨道时保留上一次的求值结果
    pub fn seek(&mut self, time_index: TimeIndex) {
        if let Some(frame) = self.track.seek(time_index) {
            self.current_frame = Some(frame);
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
        keyframe.intern_names(names);
        self.track.insert(keyframe);
        self.max_time_index = self.track.max_time_index();
    }

    /// 时间 0 的关键帧不可删除
    pub fn delete_keyframe(&mut self, time_index: TimeIndex, layer_index: LayerIndex) -> Option<K> {
        if time_index == 0.0 {
            return None;
        }
        self.remove(time_index, layer_index)
    }

    /// 先按 (time, layer) 移除同位关键帧再插入
    pub fn replace_keyframe(&mut self, keyframe: K, names: &mut NameListSection) {
        self.remove(keyframe.time_index(), keyframe.layer_index());
        self.add_keyframe(keyframe, names);
    }

    fn remove(&mut self, time_index: TimeIndex, layer_index: LayerIndex) -> Option<K> {
        let index = self.track.position(|k| {
            k.time_index() == time_index && k.layer_index() == layer_index
        })?;
        let keyframe = self.track.remove(index);
        self.max_time_index = self.track.max_time_index();
        Some(keyframe)
    }

    pub fn find_keyframe(&self, time_index: TimeIndex, layer_index: LayerIndex) -> Option<&K> {
        self.track
            .keyframes()
            .iter()
            .find(|k| k.time_index() == time_index && k.layer_index() == layer_index)
    }

    pub fn find_keyframe_at(&self, index: usize) -> Option<&K> {
        self.track.get(index)
    }

    pub fn count_keyframes(&self) -> usize {
        self.track.len()
    }

    pub fn count_layers(&self) -> usize {
        1
    }

    pub fn is_empty(&self) -> bool {
        self.track.is_empty()
    }

    pub fn keyframes(&self) -> &[K] {
        self.track.keyframes()
    }

    pub fn set_keyframes(&mut self, keyframes: Vec<K>, names: &mut NameListSection) {
        self.track = KeyframeTrack::new();
        for keyframe in keyframes {
            keyframe.intern_names(names);
            self.track.insert(keyframe);
        }
        self.max_time_index = self.track.max_time_index();
    }

    pub fn current_frame(&self) -> Option<&K::Frame> {
        self.current_frame.as_ref()
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
