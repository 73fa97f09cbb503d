//! 贝塞尔曲线插值
//!
//! 每个关键帧通道携带 4 字节控制点 `(x1, y1, x2, y2)`，取值 [0, 127]。
//! 控制点满足 `x1 == y1 && x2 == y2` 时为线性通道，不生成查找表；
//! 否则预先生成 s+1 项的缓动查找表，求值时只做查表。

use std::fmt;
use std::io::{self, Write};

use byteorder::WriteBytesExt;

use super::codec::ByteReader;
use crate::config::get_config;

/// 插值精度
pub type SmoothPrecision = f32;

/// 控制点量化上限
const CONTROL_POINT_MAX: f32 = 127.0;

/// 插值参数（四个量化控制点）
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct InterpolationParameter {
    pub x1: u8,
    pub y1: u8,
    pub x2: u8,
    pub y2: u8,
}

impl Default for InterpolationParameter {
    fn default() -> Self {
        Self::new(20, 20, 107, 107)
    }
}

impl InterpolationParameter {
    /// 序列化大小
    pub const SIZE: usize = 4;

    pub const fn new(x1: u8, y1: u8, x2: u8, y2: u8) -> Self {
        Self { x1, y1, x2, y2 }
    }

    pub fn from_array(values: [u8; 4]) -> Self {
        Self::new(values[0], values[1], values[2], values[3])
    }

    pub fn to_array(self) -> [u8; 4] {
        [self.x1, self.y1, self.x2, self.y2]
    }

    /// 两个控制点都在对角线上即为线性
    pub fn is_linear(&self) -> bool {
        self.x1 == self.y1 && self.x2 == self.y2
    }

    pub fn read(reader: &mut ByteReader<'_>) -> io::Result<Self> {
        let bytes = reader.take(Self::SIZE)?;
        Ok(Self::new(bytes[0], bytes[1], bytes[2], bytes[3]))
    }

    pub fn write<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        writer.write_u8(self.x1)?;
        writer.write_u8(self.y1)?;
        writer.write_u8(self.x2)?;
        writer.write_u8(self.y2)
    }
}

/// 归一化的三次贝塞尔曲线，端点固定为 (0,0) 与 (1,1)
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct BezierCurve {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

impl BezierCurve {
    pub fn new(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// 从量化参数创建
    pub fn from_parameter(parameter: &InterpolationParameter) -> Self {
        Self {
            x1: parameter.x1 as f32 / CONTROL_POINT_MAX,
            y1: parameter.y1 as f32 / CONTROL_POINT_MAX,
            x2: parameter.x2 as f32 / CONTROL_POINT_MAX,
            y2: parameter.y2 as f32 / CONTROL_POINT_MAX,
        }
    }

    /// 求 x(s) = t 对应的 y(s)
    pub fn evaluate(&self, t: f32) -> f32 {
        if t <= 0.0 {
            return 0.0;
        }
        if t >= 1.0 {
            return 1.0;
        }

        // 牛顿法；导数退化或未收敛时改用二分（x(s) 在 [0,1] 上单调）
        let mut s = t;
        let mut converged = false;
        for _ in 0..15 {
            let x = self.bezier_x(s) - t;
            if x.abs() < 1e-6 {
                converged = true;
                break;
            }
            let dx = self.bezier_dx(s);
            if dx.abs() < 1e-6 {
                break;
            }
            s = (s - x / dx).clamp(0.0, 1.0);
        }

        if !converged {
            s = self.bisect(t);
        }

        self.bezier_y(s)
    }

    fn bisect(&self, t: f32) -> f32 {
        let (mut lo, mut hi) = (0.0f32, 1.0f32);
        for _ in 0..32 {
            let mid = (lo + hi) * 0.5;
            if self.bezier_x(mid) < t {
                lo = mid;
            } else {
                hi = mid;
            }
        }
        (lo + hi) * 0.5
    }

    fn bezier_x(&self, s: f32) -> f32 {
        let s2 = s * s;
        let s3 = s2 * s;
        let t = 1.0 - s;
        let t2 = t * t;

        3.0 * t2 * s * self.x1 + 3.0 * t * s2 * self.x2 + s3
    }

    fn bezier_y(&self, s: f32) -> f32 {
        let s2 = s * s;
        let s3 = s2 * s;
        let t = 1.0 - s;
        let t2 = t * t;

        3.0 * t2 * s * self.y1 + 3.0 * t * s2 * self.y2 + s3
    }

    fn bezier_dx(&self, s: f32) -> f32 {
        let s2 = s * s;
        let t = 1.0 - s;

        3.0 * t * t * self.x1 + 6.0 * t * s * (self.x2 - self.x1) + 3.0 * s2 * (1.0 - self.x2)
    }
}

/// 单个通道的插值表
///
/// 线性通道不持有表；曲线通道持有 `subdivisions + 1` 项在归一化时间上
/// 等距采样的缓动值，仅在参数变化时重建。
#[derive(Clone)]
pub struct InterpolationTable {
    parameter: InterpolationParameter,
    linear: bool,
    subdivisions: usize,
    table: Vec<SmoothPrecision>,
}

impl InterpolationTable {
    /// 使用全局配置的细分数构建
    pub fn new(parameter: InterpolationParameter) -> Self {
        let mut table = Self {
            parameter,
            linear: true,
            subdivisions: 0,
            table: Vec::new(),
        };
        table.build(parameter, get_config().interpolation_subdivisions);
        table
    }

    pub fn build(&mut self, parameter: InterpolationParameter, subdivisions: usize) {
        self.parameter = parameter;
        self.linear = parameter.is_linear();
        self.table.clear();
        if self.linear {
            self.subdivisions = 0;
            return;
        }

        let subdivisions = subdivisions.max(1);
        let curve = BezierCurve::from_parameter(&parameter);
        self.subdivisions = subdivisions;
        self.table.reserve_exact(subdivisions + 1);
        for i in 0..=subdivisions {
            let t = i as f32 / subdivisions as f32;
            self.table.push(curve.evaluate(t));
        }
    }

    /// 参数不变时不重建
    pub fn set_parameter(&mut self, parameter: InterpolationParameter) {
        if parameter != self.parameter {
            self.build(parameter, get_config().interpolation_subdivisions);
        }
    }

    /// 恢复默认 (20,20,107,107) 线性状态
    pub fn reset(&mut self) {
        self.parameter = InterpolationParameter::default();
        self.linear = true;
        self.subdivisions = 0;
        self.table.clear();
    }

    pub fn parameter(&self) -> InterpolationParameter {
        self.parameter
    }

    pub fn is_linear(&self) -> bool {
        self.linear
    }

    pub fn subdivisions(&self) -> usize {
        self.subdivisions
    }

    /// 归一化时间 → 缓动后的权重
    pub fn weight_at(&self, t: SmoothPrecision) -> SmoothPrecision {
        if self.linear {
            return t;
        }
        let t = t.clamp(0.0, 1.0);
        let position = t * self.subdivisions as f32;
        let index = position.floor() as usize;
        if index >= self.subdivisions {
            return self.table[self.subdivisions];
        }
        let fraction = position - index as f32;
        let from = self.table[index];
        let to = self.table[index + 1];
        from + (to - from) * fraction
    }
}

impl Default for InterpolationTable {
    fn default() -> Self {
        Self::new(InterpolationParameter::default())
    }
}

impl PartialEq for InterpolationTable {
    fn eq(&self, other: &Self) -> bool {
        self.parameter == other.parameter
    }
}

impl fmt::Debug for InterpolationTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InterpolationTable")
            .field("parameter", &self.parameter)
            .field("linear", &self.linear)
            .field("subdivisions", &self.subdivisions)
            .finish()
    }
}

impl From<InterpolationParameter> for InterpolationTable {
    fn from(parameter: InterpolationParameter) -> Self {
        Self::new(parameter)
    }
}

/// 标量线性插值
pub fn lerp_f32(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_linear() {
        let table = InterpolationTable::default();
        assert!(table.is_linear());
        assert_eq!(table.parameter(), InterpolationParameter::new(20, 20, 107, 107));
        assert_eq!(table.weight_at(0.37), 0.37);
    }

    #[test]
    fn test_degenerate_full_range_is_linear() {
        let table = InterpolationTable::new(InterpolationParameter::new(0, 0, 127, 127));
        assert!(table.is_linear());
        assert_eq!(table.weight_at(0.5), 0.5);
    }

    #[test]
    fn test_curved_table_endpoints_and_monotonic() {
        let mut table = InterpolationTable::default();
        table.build(InterpolationParameter::new(63, 0, 64, 127), 64);
        assert!(!table.is_linear());
        assert_eq!(table.subdivisions(), 64);
        assert!(table.weight_at(0.0).abs() < 1e-4);
        assert!((table.weight_at(1.0) - 1.0).abs() < 1e-4);

        let mut previous = -1.0;
        for i in 0..=20 {
            let w = table.weight_at(i as f32 / 20.0);
            assert!(w >= previous - 1e-5);
            previous = w;
        }
        // ease-in-out：中点对称
        assert!((table.weight_at(0.5) - 0.5).abs() < 1e-2);
        // 前段慢于线性
        assert!(table.weight_at(0.2) < 0.2);
    }

    #[test]
    fn test_curved_lookup_matches_curve() {
        let parameter = InterpolationParameter::new(10, 90, 30, 120);
        let mut table = InterpolationTable::default();
        table.build(parameter, 256);
        let curve = BezierCurve::from_parameter(&parameter);
        for i in 1..10 {
            let t = i as f32 / 10.0;
            assert!((table.weight_at(t) - curve.evaluate(t)).abs() < 1e-3);
        }
    }

    #[test]
    fn test_reset_restores_default() {
        let mut table = InterpolationTable::new(InterpolationParameter::new(1, 100, 2, 3));
        assert!(!table.is_linear());
        table.reset();
        assert!(table.is_linear());
        assert_eq!(table.parameter(), InterpolationParameter::default());
    }

    #[test]
    fn test_out_of_range_weight_is_clamped_for_curves() {
        let table = InterpolationTable::new(InterpolationParameter::new(1, 100, 2, 3));
        assert!((table.weight_at(1.5) - 1.0).abs() < 1e-4);
        assert!(table.weight_at(-0.5).abs() < 1e-4);
    }
}
