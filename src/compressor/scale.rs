//! # 缩放调度序列
//!
//! 缩放系数是一个纯粹、惰性、有限且可重复迭代的序列：
//! 从 1.0 开始，每一项都是上一项乘以衰减系数，一旦严格小于下限就结束。
//! 终止条件固定为 `scale < floor`，等于下限的那一项仍然会被尝试。

use std::iter::FusedIterator;

use super::CompressError;

/// 缩放调度参数。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaleSchedule {
    step: f64,
    floor: f64,
}

impl ScaleSchedule {
    /// `step` 必须在 `(0, 1)`，`floor` 必须为正。
    ///
    /// # 示例
    /// ```rust
    /// use image_budget::compressor::ScaleSchedule;
    ///
    /// let schedule = ScaleSchedule::new(0.5, 0.4)?;
    /// assert_eq!(schedule.iter().collect::<Vec<_>>(), vec![1.0, 0.5]);
    /// # Ok::<(), image_budget::compressor::CompressError>(())
    /// ```
    pub fn new(step: f64, floor: f64) -> Result<Self, CompressError> {
        if !step.is_finite() || step <= 0.0 || step >= 1.0 {
            return Err(CompressError::InvalidConfig(format!(
                "scale_step 必须在 (0, 1) 之间，当前：{}",
                step
            )));
        }
        if !floor.is_finite() || floor <= 0.0 {
            return Err(CompressError::InvalidConfig(format!(
                "scale_floor 必须大于 0，当前：{}",
                floor
            )));
        }
        Ok(Self { step, floor })
    }

    pub fn step(&self) -> f64 {
        self.step
    }

    pub fn floor(&self) -> f64 {
        self.floor
    }

    /// 每次调用都从 1.0 重新开始。
    pub fn iter(&self) -> Scales {
        Scales {
            next: 1.0,
            step: self.step,
            floor: self.floor,
        }
    }
}

impl IntoIterator for &ScaleSchedule {
    type Item = f64;
    type IntoIter = Scales;

    fn into_iter(self) -> Scales {
        self.iter()
    }
}

/// `ScaleSchedule` 的迭代器。
#[derive(Debug, Clone)]
pub struct Scales {
    next: f64,
    step: f64,
    floor: f64,
}

impl Iterator for Scales {
    type Item = f64;

    fn next(&mut self) -> Option<f64> {
        if self.next < self.floor {
            return None;
        }
        let current = self.next;
        self.next *= self.step;
        Some(current)
    }
}

impl FusedIterator for Scales {}

/// 按缩放系数计算像素尺寸：四舍五入，每个轴至少 1 像素。
pub fn scaled_dimensions(width: u32, height: u32, scale: f64) -> (u32, u32) {
    let axis = |length: u32| ((f64::from(length) * scale).round() as u32).max(1);
    (axis(width), axis(height))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_schedule_yields_six_scales() {
        let schedule = ScaleSchedule::new(0.82, 0.35).unwrap();
        let scales: Vec<f64> = schedule.iter().collect();

        assert_eq!(scales.len(), 6);
        assert_eq!(scales[0], 1.0);
        assert!((scales[1] - 0.82).abs() < 1e-12);
        assert!(scales.iter().all(|s| *s >= 0.35));
        assert!(scales.windows(2).all(|w| w[1] < w[0]));
    }

    #[test]
    fn scale_equal_to_floor_is_still_tried() {
        let schedule = ScaleSchedule::new(0.5, 0.25).unwrap();
        let scales: Vec<f64> = schedule.iter().collect();
        assert_eq!(scales, vec![1.0, 0.5, 0.25]);
    }

    #[test]
    fn floor_above_one_yields_nothing() {
        let schedule = ScaleSchedule::new(0.82, 1.01).unwrap();
        assert_eq!(schedule.iter().count(), 0);
    }

    #[test]
    fn iteration_is_restartable() {
        let schedule = ScaleSchedule::new(0.7, 0.3).unwrap();
        let first: Vec<f64> = schedule.iter().collect();
        let second: Vec<f64> = (&schedule).into_iter().collect();
        assert_eq!(first, second);
    }

    #[test]
    fn rejects_non_decaying_step() {
        assert!(ScaleSchedule::new(1.0, 0.5).is_err());
        assert!(ScaleSchedule::new(0.0, 0.5).is_err());
        assert!(ScaleSchedule::new(f64::NAN, 0.5).is_err());
        assert!(ScaleSchedule::new(0.5, -0.1).is_err());
    }

    #[test]
    fn dimensions_round_and_never_hit_zero() {
        assert_eq!(scaled_dimensions(1000, 501, 1.0), (1000, 501));
        assert_eq!(scaled_dimensions(1000, 501, 0.5), (500, 251));
        assert_eq!(scaled_dimensions(3, 1, 0.1), (1, 1));
    }
}
