//! Incremental reads over a user's log.
//!
//! A client keeps the `nextSyncId` of its last poll and sends it back as the
//! cursor. Each poll returns only what was appended since, and the new
//! `nextSyncId = cursor + returned`.
use tracing::debug;

use crate::{
    codec::{Event, decode},
    store::{StoreError, VoteLog},
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct Cursor(u64);

impl Cursor {
    pub const START: Cursor = Cursor(0);

    pub fn new(position: u64) -> Self {
        Self(position)
    }

    /// Anything missing, non-numeric or negative falls back to the start of
    /// the log. Replaying from 0 is always safe.
    pub fn parse(raw: Option<&str>) -> Self {
        raw.and_then(|raw| raw.parse::<i64>().ok())
            .and_then(|position| u64::try_from(position).ok())
            .map_or(Self::START, Self)
    }

    pub fn position(self) -> u64 {
        self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncPage {
    pub events: Vec<Event>,
    pub next_sync_id: u64,
}

impl SyncPage {
    /// `[action, target, action, target, ...]` in arrival order.
    pub fn flatten(&self) -> Vec<u64> {
        self.events
            .iter()
            .flat_map(|event| [event.action as u64, event.target])
            .collect()
    }
}

pub async fn read_since(
    log: &dyn VoteLog,
    user: &str,
    cursor: Cursor,
) -> Result<SyncPage, StoreError> {
    let entries = log.read_from(user, cursor.position()).await?;
    let next_sync_id = cursor.position() + entries.len() as u64;

    debug!(user, cursor = cursor.position(), next_sync_id, "Read votes");

    Ok(SyncPage {
        events: entries.into_iter().map(decode).collect(),
        next_sync_id,
    })
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::{codec::encode, store::MemoryLog};

    async fn append(log: &MemoryLog, user: &str, action: u64, target: u64) {
        log.append(user, encode(action, target).unwrap())
            .await
            .unwrap();
    }

    fn event(action: u8, target: u64) -> Event {
        Event { action, target }
    }

    #[test]
    fn test_parse_cursor() {
        assert_eq!(Cursor::parse(None), Cursor::START);
        assert_eq!(Cursor::parse(Some("")), Cursor::START);
        assert_eq!(Cursor::parse(Some("abc")), Cursor::START);
        assert_eq!(Cursor::parse(Some("-3")), Cursor::START);
        assert_eq!(Cursor::parse(Some("1.5")), Cursor::START);
        assert_eq!(Cursor::parse(Some(" 5")), Cursor::START);
        assert_eq!(Cursor::parse(Some("0")), Cursor::START);
        assert_eq!(Cursor::parse(Some("42")), Cursor::new(42));
    }

    #[test]
    fn test_flatten() {
        let page = SyncPage {
            events: vec![event(5, 1337), event(7, 9000)],
            next_sync_id: 2,
        };

        assert_eq!(page.flatten(), [5, 1337, 7, 9000]);
    }

    #[tokio::test]
    async fn test_resume_from_cursor() {
        let log = MemoryLog::new();
        append(&log, "15000", 5, 1337).await;
        append(&log, "15000", 7, 9000).await;

        let page = read_since(&log, "15000", Cursor::parse(None)).await.unwrap();
        assert_eq!(page.events, [event(5, 1337), event(7, 9000)]);
        assert_eq!(page.next_sync_id, 2);

        let page = read_since(&log, "15000", Cursor::new(1)).await.unwrap();
        assert_eq!(page.events, [event(7, 9000)]);
        assert_eq!(page.next_sync_id, 2);
    }

    #[tokio::test]
    async fn test_unknown_user() {
        let log = MemoryLog::new();

        let page = read_since(&log, "ghost", Cursor::START).await.unwrap();
        assert!(page.events.is_empty());
        assert_eq!(page.next_sync_id, 0);
    }

    #[tokio::test]
    async fn test_cursor_past_end_is_echoed() {
        let log = MemoryLog::new();
        append(&log, "a", 1, 1).await;

        let page = read_since(&log, "a", Cursor::new(1)).await.unwrap();
        assert!(page.events.is_empty());
        assert_eq!(page.next_sync_id, 1);

        let page = read_since(&log, "a", Cursor::new(10)).await.unwrap();
        assert!(page.events.is_empty());
        assert_eq!(page.next_sync_id, 10);
    }

    #[tokio::test]
    async fn test_repeated_read_is_idempotent() {
        let log = MemoryLog::new();
        append(&log, "a", 1, 1).await;
        append(&log, "a", 2, 2).await;

        let first = read_since(&log, "a", Cursor::new(1)).await.unwrap();
        let second = read_since(&log, "a", Cursor::new(1)).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_poll_picks_up_new_appends() {
        let log = MemoryLog::new();
        append(&log, "a", 1, 10).await;

        let page = read_since(&log, "a", Cursor::START).await.unwrap();
        assert_eq!(page.next_sync_id, 1);

        append(&log, "a", 2, 20).await;
        append(&log, "a", 3, 30).await;

        let page = read_since(&log, "a", Cursor::new(page.next_sync_id))
            .await
            .unwrap();
        assert_eq!(page.events, [event(2, 20), event(3, 30)]);
        assert_eq!(page.next_sync_id, 3);
    }

    proptest! {
        #[test]
        fn chunked_polling_sees_each_entry_once(
            events in prop::collection::vec((0u8..16, 0u64..1_000_000), 0..40),
            chunks in prop::collection::vec(0usize..6, 1..20),
        ) {
            let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();

            runtime.block_on(async {
                let log = MemoryLog::new();
                let mut seen = Vec::new();
                let mut cursor = Cursor::START;
                let mut appended = 0;

                // interleave appends with polls, then drain
                for chunk in chunks {
                    for &(action, target) in events.iter().skip(appended).take(chunk) {
                        append(&log, "u", action as u64, target).await;
                    }
                    appended = (appended + chunk).min(events.len());

                    let page = read_since(&log, "u", cursor).await.unwrap();
                    prop_assert!(page.next_sync_id >= cursor.position());
                    seen.extend(page.events);
                    cursor = Cursor::new(page.next_sync_id);
                }

                for &(action, target) in events.iter().skip(appended) {
                    append(&log, "u", action as u64, target).await;
                }
                let page = read_since(&log, "u", cursor).await.unwrap();
                seen.extend(page.events);

                let expected: Vec<Event> = events
                    .iter()
                    .map(|&(action, target)| event(action, target))
                    .collect();
                prop_assert_eq!(seen, expected);
                Ok::<(), TestCaseError>(())
            })?;
        }
    }
}
