pub mod audit;
pub mod common;
pub mod materials;
pub mod partners;
pub mod production;
pub mod purchase_orders;

use crate::config::AppConfig;
use crate::services::{
    materials::MaterialService, partners::PartnerService, production_log::ProductionLogService,
    purchase_orders::PurchaseOrderService,
};
use crate::store::DocumentStore;
use std::sync::Arc;

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub partners: Arc<PartnerService>,
    pub materials: Arc<MaterialService>,
    pub purchase_orders: Arc<PurchaseOrderService>,
    pub production: Arc<ProductionLogService>,
}

impl AppServices {
    /// Builds every service over the same document store.
    pub fn new(store: Arc<dyn DocumentStore>, config: &AppConfig) -> Self {
        let materials = MaterialService::new(store.clone());
        let purchase_orders = PurchaseOrderService::new(
            store.clone(),
            materials.clone(),
            config.default_currency.clone(),
        );

        Self {
            partners: Arc::new(PartnerService::new(store.clone())),
            materials: Arc::new(materials),
            purchase_orders: Arc::new(purchase_orders),
            production: Arc::new(ProductionLogService::new(store)),
        }
    }
}
