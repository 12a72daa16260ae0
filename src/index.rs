//! 到期索引：从到期时刻到该时刻到期的定时器键的有序映射。
//! Expiry index: ordered mapping from expiry tick to the keys due at it.

use crate::arena::TimerKey;
use crate::clock::Tick;
use std::collections::BTreeMap;

/// Ordered expiry buckets. Multiple timers may share an exact tick; a
/// bucket is consumed whole once its tick has passed. Only weak
/// [`TimerKey`]s live here, so cancellation never has to touch the index;
/// stale keys are dropped when their bucket is extracted.
///
/// 有序的到期分桶。多个定时器可以共享同一到期时刻；时刻一过，
/// 整个桶被一次性取走。这里只存放弱 [`TimerKey`]，因此取消操作
/// 永远不需要碰索引；过期的键在其所在桶被提取时被丢弃。
#[derive(Debug, Default)]
pub struct ExpiryIndex {
    buckets: BTreeMap<Tick, Vec<TimerKey>>,
}

impl ExpiryIndex {
    /// 创建空索引 / Creates an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Indexes `key` under its expiry tick, appended after any keys already
    /// sharing the bucket.
    ///
    /// 将 `key` 按其到期时刻建立索引，附加在已共享该桶的键之后。
    pub fn insert(&mut self, expiry: Tick, key: TimerKey) {
        self.buckets.entry(expiry).or_default().push(key);
    }

    /// The smallest expiry tick currently indexed.
    /// 当前索引中最小的到期时刻。
    pub fn next_expiry(&self) -> Option<Tick> {
        self.buckets.keys().next().copied()
    }

    /// Removes and returns every bucket whose tick is `<= now`, in
    /// ascending tick order; keys keep their bucket insertion order.
    ///
    /// 移除并返回所有时刻 `<= now` 的桶，按时刻升序排列；
    /// 桶内的键保持插入顺序。
    pub fn extract_due(&mut self, now: Tick) -> Vec<(Tick, Vec<TimerKey>)> {
        // split_off keeps the boundary key on the right side, so split one
        // past `now` to make the extraction inclusive.
        let remaining = self.buckets.split_off(&(now + 1));
        let due = std::mem::replace(&mut self.buckets, remaining);
        due.into_iter().collect()
    }

    /// 索引的键总数 / Total number of indexed keys.
    pub fn len(&self) -> usize {
        self.buckets.values().map(Vec::len).sum()
    }

    /// 索引是否为空 / Whether the index is empty.
    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena::TimerArena;
    use crate::record::TimerRecord;
    use std::sync::Arc;

    fn keys(n: usize) -> Vec<TimerKey> {
        // Real keys require an arena; their records are irrelevant here.
        let mut arena = TimerArena::new();
        (0..n)
            .map(|id| {
                arena.insert(TimerRecord {
                    id: id as u64,
                    period_ms: 1,
                    remaining_repeats: 1,
                    next_expiry: 0,
                    callback: Arc::new(|| {}),
                })
            })
            .collect()
    }

    #[test]
    fn next_expiry_is_smallest_tick() {
        let k = keys(3);
        let mut index = ExpiryIndex::new();
        index.insert(30, k[0]);
        index.insert(10, k[1]);
        index.insert(20, k[2]);
        assert_eq!(index.next_expiry(), Some(10));
    }

    #[test]
    fn extract_due_is_inclusive_and_ordered() {
        let k = keys(4);
        let mut index = ExpiryIndex::new();
        index.insert(30, k[0]);
        index.insert(10, k[1]);
        index.insert(20, k[2]);
        index.insert(20, k[3]);

        let due = index.extract_due(20);
        let ticks: Vec<_> = due.iter().map(|(tick, _)| *tick).collect();
        assert_eq!(ticks, vec![10, 20]);
        // Same-tick keys keep insertion order.
        assert_eq!(due[1].1, vec![k[2], k[3]]);
        // The bucket past `now` stays behind.
        assert_eq!(index.next_expiry(), Some(30));
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn extract_due_on_empty_index_yields_nothing() {
        let mut index = ExpiryIndex::new();
        assert!(index.extract_due(1000).is_empty());
        assert!(index.is_empty());
        assert_eq!(index.next_expiry(), None);
    }
}
