//! 定时器记录的代际槽位区。
//! Generational slot arena for timer records.
//!
//! 槽位区持有定时器记录的唯一强所有权，[`TimerKey`] 则是可以检测
//! "记录已被移除"的弱引用等价物。槽位被释放时其代数递增，
//! 因此过期的键永远不会解析到重用后的槽位。
//!
//! The arena holds the only strong ownership of timer records; a
//! [`TimerKey`] is the weak-reference equivalent that can detect "record
//! already removed". Freeing a slot bumps its generation, so a stale key
//! never resolves to a reused slot.

use crate::record::TimerRecord;

/// Weak handle to an arena slot: the slot index plus the generation the
/// slot carried when the record was inserted.
///
/// 槽位区中某个槽位的弱句柄：槽位下标加上记录插入时槽位的代数。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerKey {
    slot: u32,
    generation: u32,
}

#[derive(Debug)]
struct Slot {
    generation: u32,
    record: Option<TimerRecord>,
    /// Next vacant slot, only meaningful while `record` is `None`.
    /// 下一个空闲槽位，仅在 `record` 为 `None` 时有意义。
    next_free: Option<u32>,
}

/// Slot arena with free-list reuse and generation-checked resolution.
/// 带空闲链表复用与代数校验解析的槽位区。
#[derive(Debug, Default)]
pub struct TimerArena {
    slots: Vec<Slot>,
    free_head: Option<u32>,
    live: usize,
}

impl TimerArena {
    /// 创建空的槽位区 / Creates an empty arena.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an arena with `capacity` slots preallocated.
    /// 创建预分配 `capacity` 个槽位的槽位区。
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            free_head: None,
            live: 0,
        }
    }

    /// Stores a record and returns the key that resolves to it until the
    /// record is removed.
    ///
    /// 存入一条记录并返回其键；在记录被移除之前，该键都能解析到它。
    pub fn insert(&mut self, record: TimerRecord) -> TimerKey {
        self.live += 1;
        match self.free_head {
            Some(slot_index) => {
                let slot = &mut self.slots[slot_index as usize];
                self.free_head = slot.next_free.take();
                slot.record = Some(record);
                TimerKey {
                    slot: slot_index,
                    generation: slot.generation,
                }
            }
            None => {
                let slot_index = self.slots.len() as u32;
                self.slots.push(Slot {
                    generation: 0,
                    record: Some(record),
                    next_free: None,
                });
                TimerKey {
                    slot: slot_index,
                    generation: 0,
                }
            }
        }
    }

    /// Resolves a key to its record, or `None` if the record was removed
    /// since the key was issued.
    ///
    /// 将键解析为记录；若键签发后记录已被移除则返回 `None`。
    pub fn get(&self, key: TimerKey) -> Option<&TimerRecord> {
        self.slots
            .get(key.slot as usize)
            .filter(|slot| slot.generation == key.generation)
            .and_then(|slot| slot.record.as_ref())
    }

    /// Mutable variant of [`TimerArena::get`].
    /// [`TimerArena::get`] 的可变版本。
    pub fn get_mut(&mut self, key: TimerKey) -> Option<&mut TimerRecord> {
        self.slots
            .get_mut(key.slot as usize)
            .filter(|slot| slot.generation == key.generation)
            .and_then(|slot| slot.record.as_mut())
    }

    /// Removes the record behind `key`, invalidating every outstanding copy
    /// of the key at once. Returns `None` if the key is already stale.
    ///
    /// 移除 `key` 对应的记录，同时使该键的所有副本立即失效。
    /// 若键已过期则返回 `None`。
    pub fn remove(&mut self, key: TimerKey) -> Option<TimerRecord> {
        let slot = self
            .slots
            .get_mut(key.slot as usize)
            .filter(|slot| slot.generation == key.generation)?;
        let record = slot.record.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        slot.next_free = self.free_head;
        self.free_head = Some(key.slot);
        self.live -= 1;
        Some(record)
    }

    /// 当前存活的记录数 / Number of live records.
    pub fn len(&self) -> usize {
        self.live
    }

    /// 槽位区是否为空 / Whether the arena holds no live records.
    pub fn is_empty(&self) -> bool {
        self.live == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::TimerRecord;
    use std::sync::Arc;

    fn record(id: u64) -> TimerRecord {
        TimerRecord {
            id,
            period_ms: 10,
            remaining_repeats: 1,
            next_expiry: 10,
            callback: Arc::new(|| {}),
        }
    }

    #[test]
    fn insert_then_resolve() {
        let mut arena = TimerArena::new();
        let key = arena.insert(record(7));
        assert_eq!(arena.get(key).map(|r| r.id), Some(7));
        assert_eq!(arena.len(), 1);
    }

    #[test]
    fn removed_key_goes_stale() {
        let mut arena = TimerArena::new();
        let key = arena.insert(record(1));
        assert!(arena.remove(key).is_some());
        assert!(arena.get(key).is_none());
        assert!(arena.remove(key).is_none());
        assert!(arena.is_empty());
    }

    #[test]
    fn reused_slot_does_not_resurrect_old_key() {
        let mut arena = TimerArena::new();
        let old_key = arena.insert(record(1));
        arena.remove(old_key);

        // The freed slot is reused, but under a new generation.
        let new_key = arena.insert(record(2));
        assert!(arena.get(old_key).is_none());
        assert_eq!(arena.get(new_key).map(|r| r.id), Some(2));
    }

    #[test]
    fn free_list_reuses_slots_in_lifo_order() {
        let mut arena = TimerArena::new();
        let a = arena.insert(record(1));
        let b = arena.insert(record(2));
        arena.remove(a);
        arena.remove(b);

        let c = arena.insert(record(3));
        let d = arena.insert(record(4));
        assert_eq!(arena.len(), 2);
        assert_eq!(arena.get(c).map(|r| r.id), Some(3));
        assert_eq!(arena.get(d).map(|r| r.id), Some(4));
    }

    #[test]
    fn get_mut_allows_in_place_advance() {
        let mut arena = TimerArena::new();
        let key = arena.insert(record(1));
        if let Some(rec) = arena.get_mut(key) {
            rec.next_expiry += rec.period_ms;
        }
        assert_eq!(arena.get(key).map(|r| r.next_expiry), Some(20));
    }
}
