pub mod audit;
pub mod request_id;

pub use audit::{audit_middleware, SESSION_ID_HEADER};
pub use request_id::{request_id_middleware, REQUEST_ID_HEADER};
