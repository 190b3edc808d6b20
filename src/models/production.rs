use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use strum::{Display, EnumIter, EnumString, IntoEnumIterator};
use utoipa::ToSchema;

/// The six fixed production stages, in floor order.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Stage {
    Cutting,
    Sewing,
    Quality,
    Finishing,
    Packaging,
    Inspection,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct StageEntry {
    pub planned: u32,
    pub actual: u32,
    pub staff_count: u32,
    pub machine_count: u32,
    pub supervisor: String,
    pub remarks: String,
}

pub type ProductionSheet = BTreeMap<Stage, StageEntry>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct MaterialRow {
    pub material: String,
    pub unit: String,
    #[schema(value_type = String)]
    pub quantity_used: Decimal,
    pub remarks: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct MachineRow {
    pub machine: String,
    pub operator: String,
    #[schema(value_type = String)]
    pub hours_run: Decimal,
    pub output: u32,
    pub downtime_minutes: u32,
    pub remarks: String,
}

/// One production day, keyed by its date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DayRecord {
    pub date: NaiveDate,
    #[serde(default)]
    #[schema(value_type = Object)]
    pub production: ProductionSheet,
    #[serde(default)]
    pub materials: Vec<MaterialRow>,
    #[serde(default)]
    pub machines: Vec<MachineRow>,
}

impl DayRecord {
    /// The record returned for a day nobody has written yet: every stage
    /// present with zero counts and empty text.
    pub fn blank(date: NaiveDate) -> Self {
        Self {
            date,
            production: blank_sheet(),
            materials: Vec::new(),
            machines: Vec::new(),
        }
    }

    /// Fills in any stage missing from a stored record.
    pub fn normalized(mut self) -> Self {
        fill_stages(&mut self.production);
        self
    }

    pub fn stage(&self, stage: Stage) -> &StageEntry {
        // normalized records always carry every stage
        static EMPTY: StageEntry = StageEntry {
            planned: 0,
            actual: 0,
            staff_count: 0,
            machine_count: 0,
            supervisor: String::new(),
            remarks: String::new(),
        };
        self.production.get(&stage).unwrap_or(&EMPTY)
    }
}

pub fn blank_sheet() -> ProductionSheet {
    Stage::iter().map(|stage| (stage, StageEntry::default())).collect()
}

fn fill_stages(sheet: &mut ProductionSheet) {
    for stage in Stage::iter() {
        sheet.entry(stage).or_default();
    }
}

/// Field groups that are written independently on a day document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum DayGroup {
    Production,
    Materials,
    Machines,
}

/// A write to exactly one field group of a day.
#[derive(Debug, Clone, PartialEq)]
pub enum DayPatch {
    Production(ProductionSheet),
    Materials(Vec<MaterialRow>),
    Machines(Vec<MachineRow>),
}

impl DayPatch {
    /// Decodes the body of a group write.
    pub fn from_group(group: DayGroup, body: Value) -> Result<Self, serde_json::Error> {
        Ok(match group {
            DayGroup::Production => DayPatch::Production(serde_json::from_value(body)?),
            DayGroup::Materials => DayPatch::Materials(serde_json::from_value(body)?),
            DayGroup::Machines => DayPatch::Machines(serde_json::from_value(body)?),
        })
    }

    pub fn group(&self) -> DayGroup {
        match self {
            DayPatch::Production(_) => DayGroup::Production,
            DayPatch::Materials(_) => DayGroup::Materials,
            DayPatch::Machines(_) => DayGroup::Machines,
        }
    }

    /// Applies the patch to an in-memory record.
    pub fn apply(&self, record: &mut DayRecord) {
        match self {
            DayPatch::Production(sheet) => {
                record.production = sheet.clone();
                fill_stages(&mut record.production);
            }
            DayPatch::Materials(rows) => record.materials = rows.clone(),
            DayPatch::Machines(rows) => record.machines = rows.clone(),
        }
    }

    /// The top-level fields to merge into the stored document, `date` included.
    pub fn to_fields(&self, date: NaiveDate) -> Result<Map<String, Value>, serde_json::Error> {
        let mut fields = Map::new();
        fields.insert("date".into(), serde_json::to_value(date)?);
        let value = match self {
            DayPatch::Production(sheet) => serde_json::to_value(sheet)?,
            DayPatch::Materials(rows) => serde_json::to_value(rows)?,
            DayPatch::Machines(rows) => serde_json::to_value(rows)?,
        };
        fields.insert(self.group().to_string(), value);
        Ok(fields)
    }
}
