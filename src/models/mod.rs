//! Persisted record shapes. All of them serialize with camelCase keys.

pub mod audit;
pub mod material;
pub mod partner;
pub mod production;
pub mod purchase_order;

pub use audit::{AuditEvent, AuditEventInput, AuditEventType};
pub use material::{Material, MaterialInput};
pub use partner::{Address, Partner, PartnerInput, PartnerType};
pub use production::{
    DayGroup, DayPatch, DayRecord, MachineRow, MaterialRow, ProductionSheet, Stage, StageEntry,
};
pub use purchase_order::{
    OrderKind, OrderLine, PaymentStatus, PurchaseOrder, PurchaseOrderInput, PurchaseOrderStatus,
};
