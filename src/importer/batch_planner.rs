// ==========================================
// 表格批量导入系统 - 批次规划
// ==========================================
// 批次大小按源文件字节数分档（不是按行数）
// 批次区间 [start, end) 连续、不重叠、覆盖 [0, total_rows)
// 任意批次可由 (total_rows, batch_size) 重新推算，支持续跑
// ==========================================

use serde::{Deserialize, Serialize};
use std::ops::Range;

const MIB: u64 = 1024 * 1024;

/// 批次大小分档策略
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSizePolicy {
    pub small_limit_bytes: u64,  // 小于此值 → small_batch
    pub medium_limit_bytes: u64, // 小于此值 → medium_batch
    pub large_limit_bytes: u64,  // 小于此值 → large_batch
    pub small_batch: usize,
    pub medium_batch: usize,
    pub large_batch: usize,
    pub huge_batch: usize,
}

impl Default for BatchSizePolicy {
    fn default() -> Self {
        Self {
            small_limit_bytes: MIB,
            medium_limit_bytes: 5 * MIB,
            large_limit_bytes: 20 * MIB,
            small_batch: 50,
            medium_batch: 100,
            large_batch: 250,
            huge_batch: 500,
        }
    }
}

impl BatchSizePolicy {
    pub fn choose(&self, source_bytes: u64) -> usize {
        if source_bytes < self.small_limit_bytes {
            self.small_batch
        } else if source_bytes < self.medium_limit_bytes {
            self.medium_batch
        } else if source_bytes < self.large_limit_bytes {
            self.large_batch
        } else {
            self.huge_batch
        }
    }
}

/// 按默认分档选择批次大小
pub fn choose_batch_size(source_bytes: u64) -> usize {
    BatchSizePolicy::default().choose(source_bytes)
}

/// 规划批次（batch_size 为 0 时按 1 处理）
pub fn plan_batches(total_rows: usize, batch_size: usize) -> BatchPlan {
    BatchPlan {
        total_rows,
        batch_size: batch_size.max(1),
    }
}

// ==========================================
// BatchPlan - 批次计划
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchPlan {
    total_rows: usize,
    batch_size: usize,
}

impl BatchPlan {
    pub fn total_rows(&self) -> usize {
        self.total_rows
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn total_batches(&self) -> usize {
        self.total_rows.div_ceil(self.batch_size)
    }

    /// 第 index 个批次（从 0 开始）的行区间
    pub fn batch(&self, index: usize) -> Option<Range<usize>> {
        let start = index.checked_mul(self.batch_size)?;
        if start >= self.total_rows {
            return None;
        }
        let end = (start + self.batch_size).min(self.total_rows);
        Some(start..end)
    }

    pub fn iter(&self) -> BatchIter {
        self.iter_from(0)
    }

    /// 从第 index 个批次开始迭代（续跑使用）
    pub fn iter_from(&self, index: usize) -> BatchIter {
        BatchIter {
            plan: *self,
            next: index,
        }
    }
}

impl IntoIterator for BatchPlan {
    type Item = (usize, Range<usize>);
    type IntoIter = BatchIter;

    fn into_iter(self) -> BatchIter {
        self.iter()
    }
}

/// 惰性批次迭代器，产出 (批次序号, 行区间)
#[derive(Debug, Clone)]
pub struct BatchIter {
    plan: BatchPlan,
    next: usize,
}

impl Iterator for BatchIter {
    type Item = (usize, Range<usize>);

    fn next(&mut self) -> Option<Self::Item> {
        let index = self.next;
        let range = self.plan.batch(index)?;
        self.next += 1;
        Some((index, range))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.plan.total_batches().saturating_sub(self.next);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for BatchIter {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_choose_batch_size_thresholds() {
        assert_eq!(choose_batch_size(500 * 1024), 50);
        assert_eq!(choose_batch_size(2 * MIB), 100);
        assert_eq!(choose_batch_size(10 * MIB), 250);
        assert_eq!(choose_batch_size(50 * MIB), 500);
    }

    #[test]
    fn test_choose_batch_size_boundaries_exclusive() {
        assert_eq!(choose_batch_size(0), 50);
        assert_eq!(choose_batch_size(MIB - 1), 50);
        assert_eq!(choose_batch_size(MIB), 100);
        assert_eq!(choose_batch_size(5 * MIB), 250);
        assert_eq!(choose_batch_size(20 * MIB), 500);
    }

    #[test]
    fn test_plan_120_by_50() {
        let ranges: Vec<Range<usize>> = plan_batches(120, 50).iter().map(|(_, r)| r).collect();
        assert_eq!(ranges, vec![0..50, 50..100, 100..120]);
    }

    #[test]
    fn test_plan_covers_exactly_and_disjoint() {
        for total in [0usize, 1, 7, 49, 50, 51, 100, 1234] {
            for size in [1usize, 3, 50, 500] {
                let plan = plan_batches(total, size);
                let mut expected_start = 0;
                let mut count = 0;
                for (index, range) in plan.iter() {
                    assert_eq!(index, count);
                    assert_eq!(range.start, expected_start);
                    assert!(range.end > range.start);
                    assert!(range.len() <= size);
                    expected_start = range.end;
                    count += 1;
                }
                assert_eq!(expected_start, total);
                assert_eq!(count, plan.total_batches());
            }
        }
    }

    #[test]
    fn test_plan_is_restartable() {
        let plan = plan_batches(120, 50);
        let resumed: Vec<(usize, Range<usize>)> = plan.iter_from(1).collect();
        assert_eq!(resumed, vec![(1, 50..100), (2, 100..120)]);
        assert_eq!(plan.batch(2), Some(100..120));
        assert_eq!(plan.batch(3), None);
        assert_eq!(plan.iter_from(1).len(), 2);
    }

    #[test]
    fn test_zero_batch_size_is_clamped() {
        let plan = plan_batches(3, 0);
        assert_eq!(plan.batch_size(), 1);
        assert_eq!(plan.total_batches(), 3);
    }
}
