use crate::{
    errors::ServiceError,
    models::{DayPatch, DayRecord},
    services::day_cache::DaySource,
    store::{collections, Collection, DocumentStore},
};
use async_trait::async_trait;
use chrono::{Datelike, NaiveDate};
use futures::future::try_join_all;
use std::sync::Arc;
use tracing::{info, instrument};

/// Daily production documents, one per calendar date, keyed `YYYY-MM-DD`.
#[derive(Clone)]
pub struct ProductionLogService {
    store: Arc<dyn DocumentStore>,
    days: Collection<DayRecord>,
}

fn day_key(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

impl ProductionLogService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            days: Collection::new(store.clone(), collections::PRODUCTION_LOGS),
            store,
        }
    }

    /// The stored record for `date`, normalized to all six stages, or the
    /// blank record when nothing was written for that day.
    #[instrument(skip(self))]
    pub async fn get_day(&self, date: NaiveDate) -> Result<DayRecord, ServiceError> {
        Ok(self
            .find_day(date)
            .await?
            .unwrap_or_else(|| DayRecord::blank(date)))
    }

    async fn find_day(&self, date: NaiveDate) -> Result<Option<DayRecord>, ServiceError> {
        Ok(self
            .days
            .get(&day_key(date))
            .await?
            .map(DayRecord::normalized))
    }

    /// Writes one field group of a day, leaving the other groups as stored.
    /// The day document is created on its first write.
    #[instrument(skip(self, patch), fields(group = %patch.group()))]
    pub async fn save_group(
        &self,
        date: NaiveDate,
        patch: DayPatch,
    ) -> Result<DayRecord, ServiceError> {
        let fields = patch.to_fields(date)?;
        let merged = self
            .store
            .merge(self.days.name(), &day_key(date), fields)
            .await?;
        let record: DayRecord = serde_json::from_value(merged)?;
        info!(%date, group = %patch.group(), "production day saved");
        Ok(record.normalized())
    }

    /// One record per calendar day of the month, blank where nothing is stored.
    #[instrument(skip(self))]
    pub async fn month(&self, year: i32, month: u32) -> Result<Vec<DayRecord>, ServiceError> {
        let first = NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(|| {
            ServiceError::InvalidInput(format!("{}-{:02} is not a valid month", year, month))
        })?;
        let days = first.iter_days().take_while(|d| d.month() == month);
        try_join_all(days.map(|date| self.get_day(date))).await
    }
}

#[async_trait]
impl DaySource for ProductionLogService {
    async fn fetch_day(&self, date: NaiveDate) -> Result<Option<DayRecord>, ServiceError> {
        self.find_day(date).await
    }

    async fn save_day_group(
        &self,
        date: NaiveDate,
        patch: DayPatch,
    ) -> Result<DayRecord, ServiceError> {
        self.save_group(date, patch).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{MachineRow, MaterialRow, ProductionSheet, Stage, StageEntry};
    use crate::store::MemoryStore;
    use assert_matches::assert_matches;
    use rust_decimal_macros::dec;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 2, d).unwrap()
    }

    fn service() -> ProductionLogService {
        ProductionLogService::new(Arc::new(MemoryStore::new()))
    }

    fn sewing(actual: u32) -> ProductionSheet {
        let mut sheet = ProductionSheet::new();
        sheet.insert(
            Stage::Sewing,
            StageEntry {
                planned: 500,
                actual,
                staff_count: 42,
                machine_count: 40,
                supervisor: "Lakshmi".into(),
                remarks: String::new(),
            },
        );
        sheet
    }

    #[tokio::test]
    async fn unwritten_day_reads_as_blank() {
        let svc = service();
        assert_eq!(svc.get_day(date(3)).await.unwrap(), DayRecord::blank(date(3)));
    }

    #[tokio::test]
    async fn group_writes_do_not_disturb_siblings() {
        let svc = service();
        svc.save_group(date(5), DayPatch::Production(sewing(470)))
            .await
            .unwrap();
        svc.save_group(
            date(5),
            DayPatch::Materials(vec![MaterialRow {
                material: "Thread 40s".into(),
                unit: "CONE".into(),
                quantity_used: dec!(12),
                remarks: String::new(),
            }]),
        )
        .await
        .unwrap();
        let saved = svc
            .save_group(
                date(5),
                DayPatch::Machines(vec![MachineRow {
                    machine: "Overlock-3".into(),
                    hours_run: dec!(7.5),
                    ..Default::default()
                }]),
            )
            .await
            .unwrap();

        assert_eq!(saved.stage(Stage::Sewing).actual, 470);
        assert_eq!(saved.materials.len(), 1);
        assert_eq!(saved.machines[0].machine, "Overlock-3");
        assert_eq!(svc.get_day(date(5)).await.unwrap(), saved);
    }

    #[tokio::test]
    async fn month_covers_every_calendar_day() {
        let svc = service();
        svc.save_group(date(29), DayPatch::Production(sewing(300)))
            .await
            .unwrap();

        let month = svc.month(2024, 2).await.unwrap();
        assert_eq!(month.len(), 29);
        assert_eq!(month[0].date, date(1));
        assert_eq!(month[28].stage(Stage::Sewing).actual, 300);
        assert_eq!(month[10], DayRecord::blank(date(11)));
    }

    #[tokio::test]
    async fn invalid_month_is_rejected() {
        assert_matches!(
            service().month(2024, 13).await,
            Err(ServiceError::InvalidInput(_))
        );
    }
}
