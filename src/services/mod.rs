// Order pricing engine shared by the purchase order books and draft edits
pub mod pricing;

// Directories
pub mod materials;
pub mod partners;

// Purchase orders (received and given books)
pub mod purchase_orders;

// Daily production
pub mod day_cache;
pub mod production_log;

// Audit trail
pub mod audit_queue;
