//! # Receipt Counter
//!
//! Per-day sequence behind receipt numbers.
//!
//! The sequence restarts at 1 on the first allocation seen for a new calendar
//! day and increments by one per allocation within the same day. The whole
//! read-day / reset-or-increment / write cycle runs under one mutex, so
//! concurrent callers always get distinct, contiguous numbers.

use crate::domain::entities::ReceiptId;
use chrono::NaiveDate;
use parking_lot::Mutex;

/// Last issued `(day, sequence)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Cursor {
    day: NaiveDate,
    sequence: u32,
}

/// Process-wide receipt sequence.
#[derive(Debug, Default)]
pub struct ReceiptCounter {
    cursor: Mutex<Option<Cursor>>,
}

impl ReceiptCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Counter that continues after `last_sequence` on `day`.
    ///
    /// Used at startup so numbering resumes after artifacts already on disk.
    pub fn resume_from(day: NaiveDate, last_sequence: u32) -> Self {
        Self {
            cursor: Mutex::new(Some(Cursor {
                day,
                sequence: last_sequence,
            })),
        }
    }

    /// Issue the next id for `today`.
    pub fn next(&self, today: NaiveDate) -> ReceiptId {
        let mut cursor = self.cursor.lock();
        let sequence = match *cursor {
            Some(Cursor { day, sequence }) if day == today => sequence + 1,
            _ => 1,
        };
        *cursor = Some(Cursor {
            day: today,
            sequence,
        });
        ReceiptId::new(today, sequence)
    }

    /// Most recently issued id, if any.
    pub fn last(&self) -> Option<ReceiptId> {
        let cursor = *self.cursor.lock();
        cursor.map(|Cursor { day, sequence }| ReceiptId::new(day, sequence))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::HashSet;
    use std::sync::Arc;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, d).unwrap()
    }

    #[test]
    fn test_first_allocation_starts_at_one() {
        let counter = ReceiptCounter::new();
        assert_eq!(counter.next(day(14)).to_string(), "202406140001");
        assert_eq!(counter.next(day(14)).to_string(), "202406140002");
    }

    #[test]
    fn test_day_rollover_resets_sequence() {
        let counter = ReceiptCounter::new();
        counter.next(day(14));
        counter.next(day(14));
        counter.next(day(14));
        assert_eq!(counter.next(day(15)).to_string(), "202406150001");
        assert_eq!(counter.next(day(15)).to_string(), "202406150002");
    }

    #[test]
    fn test_resume_continues_after_existing() {
        let counter = ReceiptCounter::resume_from(day(14), 41);
        assert_eq!(counter.next(day(14)).sequence(), 42);

        // A stale seed from another day is ignored.
        let counter = ReceiptCounter::resume_from(day(13), 41);
        assert_eq!(counter.next(day(14)).sequence(), 1);
    }

    #[test]
    fn test_last_reports_most_recent() {
        let counter = ReceiptCounter::new();
        assert!(counter.last().is_none());
        let id = counter.next(day(14));
        assert_eq!(counter.last(), Some(id));
    }

    #[test]
    fn test_concurrent_allocations_are_unique_and_contiguous() {
        let counter = Arc::new(ReceiptCounter::new());
        let handles: Vec<_> = (0..100)
            .map(|_| {
                let counter = Arc::clone(&counter);
                std::thread::spawn(move || counter.next(day(14)))
            })
            .collect();

        let ids: HashSet<ReceiptId> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert_eq!(ids.len(), 100);
        let sequences: HashSet<u32> = ids.iter().map(ReceiptId::sequence).collect();
        assert_eq!(sequences, (1..=100).collect());
    }

    proptest! {
        #[test]
        fn prop_same_day_ids_strictly_increase(n in 1usize..200) {
            let counter = ReceiptCounter::new();
            let ids: Vec<ReceiptId> = (0..n).map(|_| counter.next(day(14))).collect();
            for pair in ids.windows(2) {
                prop_assert!(pair[0] < pair[1]);
                prop_assert!(pair[0].to_string() < pair[1].to_string());
            }
        }
    }
}
