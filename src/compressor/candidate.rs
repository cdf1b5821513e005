//! # 候选结果与双槽累加器
//!
//! ## 设计思路
//!
//! 一次编码尝试产生一个 `Candidate`。整个搜索过程中只保留两个槽位：
//! - 预算内的最优候选（体积最大且不超过目标）
//! - 超预算的最近候选（体积最小且超过目标）
//!
//! 两个槽位各自只在“严格更好”时替换，因此预算内体积单调上升、超预算体积单调下降。
//! 被替换掉的候选连同其字节缓冲会立即释放，峰值内存约等于一张图的编码体积。

use bytes::Bytes;

/// 一次 `(scale, quality)` 编码尝试的结果。
///
/// `size` 始终等于 `blob` 的真实长度，不做估算。
#[derive(Debug, Clone)]
pub struct Candidate {
    pub blob: Bytes,
    pub size: u64,
    pub quality: u8,
    pub scale: f64,
    pub width: u32,
    pub height: u32,
}

impl Candidate {
    pub fn new(blob: Bytes, quality: u8, scale: f64, width: u32, height: u32) -> Self {
        Self {
            size: blob.len() as u64,
            blob,
            quality,
            scale,
            width,
            height,
        }
    }

    pub fn fits(&self, target_bytes: u64) -> bool {
        self.size <= target_bytes
    }
}

/// 预算内最优 / 超预算最近 两个槽位。
#[derive(Debug)]
pub struct BestTracker {
    target_bytes: u64,
    best_under: Option<Candidate>,
    closest_over: Option<Candidate>,
}

impl BestTracker {
    pub fn new(target_bytes: u64) -> Self {
        Self {
            target_bytes,
            best_under: None,
            closest_over: None,
        }
    }

    pub fn target_bytes(&self) -> u64 {
        self.target_bytes
    }

    /// 同一缩放档位内的候选：按是否在预算内分派到对应槽位，返回候选是否被保留。
    ///
    /// 预算内体积相同时保留质量更高者，因此同一档位内取到的是最高可行质量。
    pub fn offer(&mut self, candidate: Candidate) -> bool {
        if candidate.fits(self.target_bytes) {
            Self::replace_if(&mut self.best_under, candidate, |new, old| {
                new.size > old.size || (new.size == old.size && new.quality > old.quality)
            })
        } else {
            Self::replace_if(&mut self.closest_over, candidate, |new, old| new.size < old.size)
        }
    }

    /// 合并单个缩放档位的结果：有预算内候选时只看它，否则看超预算候选。
    ///
    /// 跨档位只在体积严格更好时替换，体积相同则保留先找到的（分辨率更高的）结果。
    pub fn absorb(&mut self, at_scale: BestTracker) {
        let (under, over) = at_scale.into_parts();
        if let Some(under) = under {
            Self::replace_if(&mut self.best_under, under, |new, old| new.size > old.size);
        } else if let Some(over) = over {
            Self::replace_if(&mut self.closest_over, over, |new, old| new.size < old.size);
        }
    }

    pub fn best_under(&self) -> Option<&Candidate> {
        self.best_under.as_ref()
    }

    pub fn closest_over(&self) -> Option<&Candidate> {
        self.closest_over.as_ref()
    }

    pub fn is_empty(&self) -> bool {
        self.best_under.is_none() && self.closest_over.is_none()
    }

    pub fn into_parts(self) -> (Option<Candidate>, Option<Candidate>) {
        (self.best_under, self.closest_over)
    }

    /// 预算内最优优先，其次超预算最近。
    pub fn into_winner(self) -> Option<Candidate> {
        self.best_under.or(self.closest_over)
    }

    fn replace_if<F>(slot: &mut Option<Candidate>, candidate: Candidate, better: F) -> bool
    where
        F: Fn(&Candidate, &Candidate) -> bool,
    {
        let replace = match slot.as_ref() {
            Some(current) => better(&candidate, current),
            None => true,
        };
        if replace {
            *slot = Some(candidate);
        }
        replace
    }
}
