//! 二进制读写工具
//!
//! `ByteReader` 是借用调用方缓冲区的游标，只前进、不分配；
//! 写出端直接使用 byteorder 的 `WriteBytesExt`。

use std::io::{self, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

/// 字符串编码（文件头 encoding 字节）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StringCodec {
    /// encoding = 0，UTF-16LE
    Utf16,
    /// encoding = 1
    Utf8,
}

impl StringCodec {
    pub fn from_encoding(value: u8) -> Option<Self> {
        match value {
            0 => Some(StringCodec::Utf16),
            1 => Some(StringCodec::Utf8),
            _ => None,
        }
    }

    pub fn encoding(self) -> u8 {
        match self {
            StringCodec::Utf16 => 0,
            StringCodec::Utf8 => 1,
        }
    }

    /// 解码（非法序列替换为 U+FFFD）
    pub fn decode(self, bytes: &[u8]) -> String {
        let encoding = match self {
            StringCodec::Utf16 => encoding_rs::UTF_16LE,
            StringCodec::Utf8 => encoding_rs::UTF_8,
        };
        let (decoded, _) = encoding.decode_without_bom_handling(bytes);
        decoded.into_owned()
    }

    /// 编码后的字节长度
    pub fn encoded_len(self, text: &str) -> usize {
        match self {
            StringCodec::Utf16 => text.encode_utf16().count() * 2,
            StringCodec::Utf8 => text.len(),
        }
    }

    pub fn encode(self, text: &str) -> Vec<u8> {
        match self {
            StringCodec::Utf16 => text.encode_utf16().flat_map(u16::to_le_bytes).collect(),
            StringCodec::Utf8 => text.as_bytes().to_vec(),
        }
    }

    /// 带长度前缀的字符串所占字节数
    pub fn text_size(self, text: &str) -> usize {
        4 + self.encoded_len(text)
    }

    /// 写出 `length: i32` + 字节
    pub fn write_text<W: Write>(self, writer: &mut W, text: &str) -> io::Result<()> {
        let bytes = self.encode(text);
        writer.write_i32::<LittleEndian>(to_i32(bytes.len())?)?;
        writer.write_all(&bytes)
    }
}

/// 小端字节游标
#[derive(Debug, Clone)]
pub struct ByteReader<'a> {
    data: &'a [u8],
    total: usize,
}

impl<'a> ByteReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            total: data.len(),
        }
    }

    /// 剩余字节数
    pub fn remaining(&self) -> usize {
        self.data.len()
    }

    /// 已消耗字节数
    pub fn offset(&self) -> usize {
        self.total - self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// 取出接下来的 `len` 字节；不足时不前进
    pub fn take(&mut self, len: usize) -> io::Result<&'a [u8]> {
        if len > self.data.len() {
            return Err(eof(len, self.data.len()));
        }
        let (head, tail) = self.data.split_at(len);
        self.data = tail;
        Ok(head)
    }

    pub fn skip(&mut self, len: usize) -> io::Result<()> {
        self.take(len).map(|_| ())
    }

    pub fn read_u8(&mut self) -> io::Result<u8> {
        self.data.read_u8()
    }

    pub fn read_bool(&mut self) -> io::Result<bool> {
        Ok(self.read_u8()? != 0)
    }

    pub fn read_i32(&mut self) -> io::Result<i32> {
        self.data.read_i32::<LittleEndian>()
    }

    pub fn read_u64(&mut self) -> io::Result<u64> {
        self.data.read_u64::<LittleEndian>()
    }

    pub fn read_f32(&mut self) -> io::Result<f32> {
        self.data.read_f32::<LittleEndian>()
    }

    pub fn read_f32_array<const N: usize>(&mut self) -> io::Result<[f32; N]> {
        let mut values = [0.0f32; N];
        self.data.read_f32_into::<LittleEndian>(&mut values)?;
        Ok(values)
    }

    /// 读取非负的 i32 计数
    pub fn read_count(&mut self) -> io::Result<usize> {
        let value = self.read_i32()?;
        usize::try_from(value).map_err(|_| {
            io::Error::new(io::ErrorKind::InvalidData, format!("negative count {}", value))
        })
    }

    /// 读取带长度前缀的字符串字节（不解码）
    pub fn read_text(&mut self) -> io::Result<&'a [u8]> {
        let len = self.read_count()?;
        self.take(len)
    }
}

fn eof(wanted: usize, available: usize) -> io::Error {
    io::Error::new(
        io::ErrorKind::UnexpectedEof,
        format!("need {} bytes, {} available", wanted, available),
    )
}

/// usize → i32（写出计数/长度用）
pub(crate) fn to_i32(value: usize) -> io::Result<i32> {
    i32::try_from(value)
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "value exceeds i32 range"))
}

pub(crate) fn write_f32_slice<W: Write>(writer: &mut W, values: &[f32]) -> io::Result<()> {
    for value in values {
        writer.write_f32::<LittleEndian>(*value)?;
    }
    Ok(())
}
