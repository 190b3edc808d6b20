//! Lazy per-day cache for the production month grid.
//!
//! Each date moves `Unrequested -> Loading -> Loaded`. A date is fetched at
//! most once; repeated requests while it is loading or loaded return
//! immediately. Saving a group overwrites the cached record with the merged
//! result returned by the source.

use async_trait::async_trait;
use chrono::NaiveDate;
use dashmap::{mapref::entry::Entry, DashMap};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::errors::ServiceError;
use crate::models::{DayPatch, DayRecord};

/// Where day records come from.
#[async_trait]
pub trait DaySource: Send + Sync {
    /// The stored record for `date`, or `None` when nothing was written.
    async fn fetch_day(&self, date: NaiveDate) -> Result<Option<DayRecord>, ServiceError>;

    /// Merges one field group and returns the whole record as stored.
    async fn save_day_group(
        &self,
        date: NaiveDate,
        patch: DayPatch,
    ) -> Result<DayRecord, ServiceError>;
}

#[derive(Debug, Clone)]
enum Slot {
    Loading,
    Loaded(DayRecord),
}

/// What the grid should render for a date.
#[derive(Debug, Clone, PartialEq)]
pub enum DayView {
    Unrequested,
    Loading,
    Loaded(DayRecord),
}

pub struct DayCache<S: ?Sized> {
    source: Arc<S>,
    slots: DashMap<NaiveDate, Slot>,
}

impl<S> DayCache<S>
where
    S: DaySource + ?Sized,
{
    pub fn new(source: Arc<S>) -> Self {
        Self {
            source,
            slots: DashMap::new(),
        }
    }

    /// Fetches `date` unless it is already loading or loaded.
    ///
    /// A failed fetch is cached as the blank record, the same as a day with
    /// no data.
    pub async fn ensure_loaded(&self, date: NaiveDate) {
        match self.slots.entry(date) {
            Entry::Occupied(_) => return,
            Entry::Vacant(slot) => {
                slot.insert(Slot::Loading);
            }
        }
        self.fetch_into_slot(date).await;
    }

    async fn fetch_into_slot(&self, date: NaiveDate) {
        debug!(%date, "fetching production day");
        let record = match self.source.fetch_day(date).await {
            Ok(Some(record)) => record.normalized(),
            Ok(None) => DayRecord::blank(date),
            Err(err) => {
                warn!(%date, error = %err, "production day fetch failed; showing blank day");
                DayRecord::blank(date)
            }
        };
        // A save that completed during the fetch already holds the newer record.
        match self.slots.entry(date) {
            Entry::Occupied(mut slot) => {
                if matches!(slot.get(), Slot::Loading) {
                    slot.insert(Slot::Loaded(record));
                } else {
                    debug!(%date, "discarding fetch result superseded by a save");
                }
            }
            Entry::Vacant(slot) => {
                slot.insert(Slot::Loaded(record));
            }
        }
    }

    /// Loads `date` if needed and returns what is cached for it.
    pub async fn load(&self, date: NaiveDate) -> DayRecord {
        self.ensure_loaded(date).await;
        self.record_or_blank(date)
    }

    /// Saves one field group. On success the cached record is replaced with
    /// the merged record; on failure the cache is left as it was.
    pub async fn save(&self, date: NaiveDate, patch: DayPatch) -> Result<DayRecord, ServiceError> {
        let merged = self.source.save_day_group(date, patch).await?;
        self.slots.insert(date, Slot::Loaded(merged.clone()));
        Ok(merged)
    }

    pub fn view(&self, date: NaiveDate) -> DayView {
        match self.slots.get(&date).as_deref() {
            None => DayView::Unrequested,
            Some(Slot::Loading) => DayView::Loading,
            Some(Slot::Loaded(record)) => DayView::Loaded(record.clone()),
        }
    }

    /// The cached record, or the blank record when the date is not loaded.
    pub fn record_or_blank(&self, date: NaiveDate) -> DayRecord {
        match self.view(date) {
            DayView::Loaded(record) => record,
            _ => DayRecord::blank(date),
        }
    }

    pub fn loaded_count(&self) -> usize {
        self.slots
            .iter()
            .filter(|slot| matches!(slot.value(), Slot::Loaded(_)))
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{MachineRow, ProductionSheet, Stage, StageEntry};
    use crate::services::production_log::ProductionLogService;
    use crate::store::{MemoryStore, StoreError};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Notify;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 14).unwrap()
    }

    /// Counts fetches and holds each one until released.
    #[derive(Default)]
    struct GatedSource {
        fetches: AtomicUsize,
        gate: Notify,
        fail: bool,
    }

    #[async_trait]
    impl DaySource for GatedSource {
        async fn fetch_day(&self, _date: NaiveDate) -> Result<Option<DayRecord>, ServiceError> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            self.gate.notified().await;
            if self.fail {
                Err(ServiceError::StoreError(StoreError::Unavailable(
                    "permission denied".into(),
                )))
            } else {
                Ok(None)
            }
        }

        async fn save_day_group(
            &self,
            date: NaiveDate,
            patch: DayPatch,
        ) -> Result<DayRecord, ServiceError> {
            let mut record = DayRecord::blank(date);
            patch.apply(&mut record);
            Ok(record)
        }
    }

    #[tokio::test]
    async fn concurrent_requests_issue_one_fetch() {
        let source = Arc::new(GatedSource::default());
        let cache = DayCache::new(source.clone());

        let observed_loading = async {
            tokio::task::yield_now().await;
            let view = cache.view(day());
            source.gate.notify_one();
            view
        };
        let (_, _, view_while_loading) = tokio::join!(
            cache.ensure_loaded(day()),
            cache.ensure_loaded(day()),
            observed_loading
        );

        assert_eq!(view_while_loading, DayView::Loading);
        assert_eq!(source.fetches.load(Ordering::SeqCst), 1);
        assert_eq!(cache.view(day()), DayView::Loaded(DayRecord::blank(day())));

        cache.ensure_loaded(day()).await;
        assert_eq!(source.fetches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failed_fetch_settles_as_blank() {
        let source = Arc::new(GatedSource {
            fail: true,
            ..Default::default()
        });
        source.gate.notify_one();
        let cache = DayCache::new(source);

        assert_eq!(cache.load(day()).await, DayRecord::blank(day()));
        assert_eq!(cache.loaded_count(), 1);
    }

    #[tokio::test]
    async fn save_merges_and_updates_cache_without_refetch() {
        let store = Arc::new(MemoryStore::new());
        let log = Arc::new(ProductionLogService::new(store));
        let cache = DayCache::new(log.clone());

        let mut sheet = ProductionSheet::new();
        sheet.insert(
            Stage::Cutting,
            StageEntry {
                planned: 800,
                actual: 760,
                ..Default::default()
            },
        );
        cache
            .save(day(), DayPatch::Production(sheet))
            .await
            .unwrap();
        let before = cache.load(day()).await;

        let machines = vec![MachineRow {
            machine: "Kansai-2".into(),
            output: 300,
            ..Default::default()
        }];
        cache
            .save(day(), DayPatch::Machines(machines.clone()))
            .await
            .unwrap();
        let after = cache.load(day()).await;

        assert_eq!(after.production, before.production);
        assert_eq!(after.materials, before.materials);
        assert_eq!(after.machines, machines);
        assert_eq!(log.get_day(day()).await.unwrap(), after);
    }

    #[rstest::rstest]
    #[case::empty_fetch(false)]
    #[case::failed_fetch(true)]
    #[tokio::test]
    async fn save_during_fetch_wins_over_the_fetch_result(#[case] fail: bool) {
        let source = Arc::new(GatedSource {
            fail,
            ..Default::default()
        });
        let cache = DayCache::new(source.clone());
        let machines = vec![MachineRow {
            machine: "Juki-4".into(),
            output: 120,
            ..Default::default()
        }];

        let save_then_release = async {
            tokio::task::yield_now().await;
            let saved = cache
                .save(day(), DayPatch::Machines(machines.clone()))
                .await
                .unwrap();
            source.gate.notify_one();
            saved
        };
        let (_, saved) = tokio::join!(cache.ensure_loaded(day()), save_then_release);

        assert_eq!(source.fetches.load(Ordering::SeqCst), 1);
        assert_eq!(saved.machines, machines);
        assert_eq!(cache.view(day()), DayView::Loaded(saved));
    }

    #[tokio::test]
    async fn failed_save_keeps_cached_record() {
        let store = Arc::new(MemoryStore::new());
        let log = Arc::new(ProductionLogService::new(store.clone()));
        let cache = DayCache::new(log);
        let loaded = cache.load(day()).await;

        store.set_offline(true);
        assert!(cache
            .save(day(), DayPatch::Machines(vec![MachineRow::default()]))
            .await
            .is_err());
        assert_eq!(cache.view(day()), DayView::Loaded(loaded));
    }

    #[tokio::test]
    async fn unrequested_dates_render_blank() {
        let cache = DayCache::new(Arc::new(GatedSource::default()));
        assert_eq!(cache.view(day()), DayView::Unrequested);
        assert_eq!(cache.record_or_blank(day()), DayRecord::blank(day()));
    }
}
