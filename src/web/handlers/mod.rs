pub mod audit_handlers;
pub mod auth_handlers;
pub mod cv_handlers;
pub mod page_handlers;
pub mod system_handlers;
pub mod task_handlers;

pub use audit_handlers::*;
pub use auth_handlers::*;
pub use cv_handlers::*;
pub use page_handlers::*;
pub use system_handlers::*;
pub use task_handlers::*;
