//! MVD Engine - MVD (Motion Vector Data) 动作编解码与关键帧插值引擎
//!
//! 提供：
//! - MVD 二进制格式的预解析、加载与保存
//! - 骨骼 / Morph / 相机 / 光照 / 模型 / 特效 / 工程 / 配件 八类关键帧轨道
//! - 基于贝塞尔插值表的逐通道插值求值
//! - 名称表（字符串驻留）与分层轨道索引

pub mod animation;
pub mod config;

pub use animation::{
    Animation, InterpolationParameter, InterpolationTable, Keyframe, KeyframeType, ModelTarget,
    Motion, MotionState, NameListSection, SceneTarget, SectionType, StringCodec,
};
pub use config::MotionConfig;

use thiserror::Error;

/// 错误代码（不携带上下文，供 `Motion::error()` 查询）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    NoError,
    InvalidHeader,
    InvalidSignature,
    InvalidVersion,
    InvalidEncoding,
    TruncatedSection,
    UnknownSection,
    InvalidNameReference,
    Io,
}

#[derive(Error, Debug)]
pub enum MotionError {
    #[error("Invalid header: {0}")]
    InvalidHeader(String),

    #[error("Invalid signature")]
    InvalidSignature,

    #[error("Invalid version: {0}")]
    InvalidVersion(f32),

    #[error("Invalid encoding: {0}")]
    InvalidEncoding(u8),

    #[error("Truncated {section:?} section: {reason}")]
    TruncatedSection {
        section: SectionType,
        reason: String,
    },

    #[error("Unknown section tag: {0}")]
    UnknownSection(i32),

    #[error("Invalid name reference: {0}")]
    InvalidNameReference(i32),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl MotionError {
    pub(crate) fn truncated(section: SectionType, reason: impl Into<String>) -> Self {
        MotionError::TruncatedSection {
            section,
            reason: reason.into(),
        }
    }

    /// 对应的错误代码
    pub fn code(&self) -> ErrorCode {
        match self {
            MotionError::InvalidHeader(_) => ErrorCode::InvalidHeader,
            MotionError::InvalidSignature => ErrorCode::InvalidSignature,
            MotionError::InvalidVersion(_) => ErrorCode::InvalidVersion,
            MotionError::InvalidEncoding(_) => ErrorCode::InvalidEncoding,
            MotionError::TruncatedSection { .. } => ErrorCode::TruncatedSection,
            MotionError::UnknownSection(_) => ErrorCode::UnknownSection,
            MotionError::InvalidNameReference(_) => ErrorCode::InvalidNameReference,
            MotionError::Io(_) => ErrorCode::Io,
        }
    }
}

pub type Result<T> = std::result::Result<T, MotionError>;
