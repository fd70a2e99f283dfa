//! Session statistics.
//!
//! Pure aggregation over the ledger, recomputed on demand. Volumes are a
//! single user's history, so nothing is cached or maintained incrementally.

use std::collections::HashMap;

use chrono::{DateTime, TimeZone};
use serde::{Deserialize, Serialize};

use crate::ledger::SessionRecord;

/// Per-tag totals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagSummary {
    pub tag: String,
    pub count: u64,
    pub total_seconds: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stats {
    /// Sorted by count descending; ties keep first-occurrence order.
    pub by_tag: Vec<TagSummary>,
    pub total_count: u64,
    pub total_seconds: u64,
    /// Intervals that ran to natural expiry.
    pub completed_count: u64,
    /// Sessions recorded since midnight of `now`, in `now`'s time zone.
    pub today_count: u64,
    pub today_seconds: u64,
}

/// Group by tag, count descending.
pub fn by_tag(records: &[SessionRecord]) -> Vec<TagSummary> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut summaries: Vec<TagSummary> = Vec::new();
    for record in records {
        let slot = *index.entry(record.tag.as_str()).or_insert_with(|| {
            summaries.push(TagSummary {
                tag: record.tag.clone(),
                count: 0,
                total_seconds: 0,
            });
            summaries.len() - 1
        });
        summaries[slot].count += 1;
        summaries[slot].total_seconds += record.duration;
    }
    // `sort_by` is stable, so equal counts stay in first-occurrence order.
    summaries.sort_by(|a, b| b.count.cmp(&a.count));
    summaries
}

/// `now` decides where "today" begins; the CLI passes local time.
pub fn aggregate<Tz: TimeZone>(records: &[SessionRecord], now: DateTime<Tz>) -> Stats {
    let day_start = now
        .date_naive()
        .and_hms_opt(0, 0, 0)
        .and_then(|midnight| now.timezone().from_local_datetime(&midnight).earliest())
        .map(|d| d.timestamp_millis().max(0) as u64)
        .unwrap_or(0);

    let mut stats = Stats {
        by_tag: by_tag(records),
        ..Stats::default()
    };
    for record in records {
        stats.total_count += 1;
        stats.total_seconds += record.duration;
        if record.completed {
            stats.completed_count += 1;
        }
        if record.timestamp >= day_start {
            stats.today_count += 1;
            stats.today_seconds += record.duration;
        }
    }
    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn record(tag: &str, duration: u64) -> SessionRecord {
        SessionRecord::new(tag, duration, 0, true)
    }

    #[test]
    fn groups_and_sorts_by_count() {
        let records = vec![record("A", 100), record("B", 50), record("A", 200)];
        let stats = aggregate(&records, Utc::now());
        assert_eq!(
            stats.by_tag,
            vec![
                TagSummary { tag: "A".into(), count: 2, total_seconds: 300 },
                TagSummary { tag: "B".into(), count: 1, total_seconds: 50 },
            ]
        );
        assert_eq!(stats.total_count, 3);
        assert_eq!(stats.total_seconds, 350);
    }

    #[test]
    fn ties_keep_first_occurrence_order() {
        let records = vec![record("Z", 1), record("M", 1), record("A", 1)];
        let tags: Vec<_> = by_tag(&records).into_iter().map(|s| s.tag).collect();
        assert_eq!(tags, ["Z", "M", "A"]);
    }

    #[test]
    fn today_counts_only_since_midnight() {
        let now = DateTime::parse_from_rfc3339("2026-03-10T15:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let midnight = now.timestamp_millis() as u64 - 15 * 3_600_000;
        let records = vec![
            SessionRecord::new("Work", 1500, midnight - 1, true),
            SessionRecord::new("Work", 600, midnight, false),
        ];
        let stats = aggregate(&records, now);
        assert_eq!(stats.today_count, 1);
        assert_eq!(stats.today_seconds, 600);
        assert_eq!(stats.completed_count, 1);
    }

    #[test]
    fn today_starts_at_midnight_of_the_given_zone() {
        let now = DateTime::parse_from_rfc3339("2026-03-10T01:00:00+05:00").unwrap();
        let utc_evening = DateTime::parse_from_rfc3339("2026-03-09T18:00:00Z")
            .unwrap()
            .timestamp_millis() as u64;
        let records = vec![
            SessionRecord::new("Work", 1500, utc_evening, true),
            SessionRecord::new("Work", 600, utc_evening + 3_600_000, true),
        ];
        let local = aggregate(&records, now);
        assert_eq!(local.today_count, 1);
        assert_eq!(local.today_seconds, 600);

        let utc = aggregate(&records, now.with_timezone(&Utc));
        assert_eq!(utc.today_count, 2);
    }

    #[test]
    fn empty_ledger_is_all_zero() {
        assert_eq!(aggregate(&[], Utc::now()), Stats::default());
    }
}
