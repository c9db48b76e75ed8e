pub mod fiscal;
pub mod loyalty;
pub mod orders;

use crate::config::AppConfig;
use crate::db::DbPool;
use crate::events::EventSender;
use crate::services::fiscal::FiscalService;
use crate::services::loyalty::LoyaltyService;
use crate::services::orders::OrderService;
use std::sync::Arc;

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers.
#[derive(Clone)]
pub struct AppServices {
    pub orders: Arc<OrderService>,
    pub loyalty: Arc<LoyaltyService>,
    pub fiscal: Arc<FiscalService>,
}

impl AppServices {
    pub fn new(db: Arc<DbPool>, event_sender: EventSender, config: &AppConfig) -> Self {
        Self {
            orders: Arc::new(OrderService::new(db.clone(), event_sender.clone())),
            loyalty: Arc::new(LoyaltyService::new(db.clone(), event_sender)),
            fiscal: Arc::new(FiscalService::new(db, &config.fiscal)),
        }
    }
}
