//! 模型段：在通用头部后追加 IK 骨骼表

use std::collections::BTreeSet;
use std::io::{self, Write};

use byteorder::{LittleEndian, WriteBytesExt};

use super::{truncated, ChunkHeader, FlatKeyframe};
use crate::animation::codec::{to_i32, ByteReader};
use crate::animation::keyframe::{KeyframeRecord, ModelKeyframe};
use crate::animation::name_list::{NameKey, NameListSection};
use crate::{MotionError, Result};

/// `countOfIKBones` 字段
const IK_COUNT_SIZE: usize = 4;

fn read_ik_count(reader: &mut ByteReader<'_>) -> Result<usize> {
    reader
        .read_count()
        .map_err(truncated(ModelKeyframe::SECTION))
}

/// 所有关键帧中出现过且已登记的 IK 骨骼，按名称排序
fn collect_ik_bones<'a>(
    keyframes: &'a [ModelKeyframe],
    names: &NameListSection,
) -> Vec<(&'a str, NameKey)> {
    let bone_names: BTreeSet<&str> = keyframes
        .iter()
        .flat_map(|k| k.ik_enabled.keys().map(String::as_str))
        .collect();
    bone_names
        .into_iter()
        .filter_map(|name| names.key(name).map(|key| (name, key)))
        .collect()
}

impl FlatKeyframe for ModelKeyframe {
    fn preparse_chunk(reader: &mut ByteReader<'_>) -> Result<()> {
        let header = ChunkHeader::read(reader, Self::SECTION)?;
        let count_of_ik_bones = read_ik_count(reader)?;
        let table_size = count_of_ik_bones
            .checked_mul(4)
            .ok_or_else(|| MotionError::truncated(Self::SECTION, "IK bone table overflows"))?;
        reader.skip(table_size).map_err(truncated(Self::SECTION))?;
        header.validate_record_size(Self::SECTION, Self::RECORD_SIZE + count_of_ik_bones)?;
        header.skip_keyframes(reader, Self::SECTION)
    }

    fn read_chunk(chunk: &[u8], names: &NameListSection) -> Result<Vec<Self>> {
        let mut reader = ByteReader::new(chunk);
        let header = ChunkHeader::read(&mut reader, Self::SECTION)?;
        let count_of_ik_bones = read_ik_count(&mut reader)?;

        let mut bone_names = Vec::with_capacity(count_of_ik_bones.min(reader.remaining() / 4));
        for _ in 0..count_of_ik_bones {
            let key = reader.read_i32().map_err(truncated(Self::SECTION))?;
            let name = names.name(key).ok_or(MotionError::InvalidNameReference(key))?;
            bone_names.push(name.to_string());
        }
        header.validate_record_size(Self::SECTION, Self::RECORD_SIZE + bone_names.len())?;

        header.read_records(&mut reader, Self::SECTION, |record| {
            let mut keyframe = Self::read_record(record, names)?;
            let flags = record
                .take(bone_names.len())
                .map_err(truncated(Self::SECTION))?;
            for (name, flag) in bone_names.iter().zip(flags) {
                keyframe.ik_enabled.insert(name.clone(), *flag != 0);
            }
            Ok(keyframe)
        })
    }

    fn write_chunk<W: Write>(
        keyframes: &[Self],
        names: &NameListSection,
        writer: &mut W,
    ) -> io::Result<()> {
        let ik_bones = collect_ik_bones(keyframes, names);
        let count = ik_bones.len();
        ChunkHeader::write(
            writer,
            0,
            Self::RECORD_SIZE + count,
            keyframes.len(),
            to_i32(count * 4)?,
        )?;
        writer.write_i32::<LittleEndian>(to_i32(count)?)?;
        for (_, key) in &ik_bones {
            writer.write_i32::<LittleEndian>(*key)?;
        }
        for keyframe in keyframes {
            keyframe.write_record(writer, names)?;
            for (name, _) in &ik_bones {
                writer.write_u8(keyframe.is_ik_enabled(name) as u8)?;
            }
        }
        Ok(())
    }

    fn chunk_size(keyframes: &[Self], names: &NameListSection) -> usize {
        let count = collect_ik_bones(keyframes, names).len();
        ChunkHeader::SIZE
            + IK_COUNT_SIZE
            + count * 4
            + (Self::RECORD_SIZE + count) * keyframes.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::section::{FlatSection, SectionTag};
    use crate::ErrorCode;

    fn encode(section: &FlatSection<ModelKeyframe>, names: &NameListSection) -> Vec<u8> {
        let mut bytes = Vec::new();
        section.write(&mut bytes, names).unwrap();
        assert_eq!(bytes.len(), section.estimate_size(names));
        bytes.split_off(SectionTag::SIZE)
    }

    #[test]
    fn test_ik_flags_roundtrip() {
        let mut names = NameListSection::new();
        let mut section = FlatSection::new();

        let mut first = ModelKeyframe::new(0.0);
        first.set_ik_enabled("左足ＩＫ", false);
        let mut second = ModelKeyframe::new(20.0);
        second.set_ik_enabled("右足ＩＫ", false);
        second.edge_width = 2.5;
        section.add_keyframe(first, &mut names);
        section.add_keyframe(second, &mut names);

        let chunk = encode(&section, &names);
        let mut reader = ByteReader::new(&chunk);
        FlatSection::<ModelKeyframe>::preparse(&mut reader).unwrap();
        assert!(reader.is_empty());

        let mut decoded = FlatSection::<ModelKeyframe>::new();
        decoded.read(&chunk, &names).unwrap();
        assert_eq!(decoded.count_keyframes(), 2);

        let first = decoded.find_keyframe_at(0).unwrap();
        assert!(!first.is_ik_enabled("左足ＩＫ"));
        assert!(first.is_ik_enabled("右足ＩＫ"));
        let second = decoded.find_keyframe_at(1).unwrap();
        assert!(second.is_ik_enabled("左足ＩＫ"));
        assert!(!second.is_ik_enabled("右足ＩＫ"));
        assert_eq!(second.edge_width, 2.5);
    }

    #[test]
    fn test_without_ik_bones_uses_plain_records() {
        let mut names = NameListSection::new();
        let mut section = FlatSection::new();
        section.add_keyframe(ModelKeyframe::new(0.0), &mut names);
        let chunk = encode(&section, &names);
        assert_eq!(
            chunk.len(),
            ChunkHeader::SIZE + IK_COUNT_SIZE + ModelKeyframe::RECORD_SIZE
        );
    }

    #[test]
    fn test_dangling_ik_bone_key() {
        let mut names = NameListSection::new();
        let mut section = FlatSection::new();
        let mut keyframe = ModelKeyframe::new(0.0);
        keyframe.set_ik_enabled("首", true);
        section.add_keyframe(keyframe, &mut names);
        let chunk = encode(&section, &names);

        let mut decoded = FlatSection::<ModelKeyframe>::new();
        let error = decoded.read(&chunk, &NameListSection::new()).unwrap_err();
        assert_eq!(error.code(), ErrorCode::InvalidNameReference);
        assert_eq!(decoded.count_keyframes(), 0);
    }
}
