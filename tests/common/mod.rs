#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    http::{Method, Request},
    routing::get,
    Router,
};
use chrono::Utc;
use comanda_api::{
    config::AppConfig,
    db,
    entities::{
        coupon::{self, RewardKind},
        customer,
        discount::{self, DiscountKind},
        earning_rule::{self, RuleChannel, RuleKind},
        extra, product, product_size,
    },
    events::{self, EventContext, EventSender},
    handlers::AppServices,
    middleware_helpers::request_id_middleware,
    services::notifications::NotificationService,
    AppState,
};
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, Set};
use serde_json::Value;
use tokio::sync::mpsc;
use tower::ServiceExt;
use uuid::Uuid;

/// Helper harness for spinning up an application state backed by a private
/// SQLite database file.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    db_file: String,
    _event_task: tokio::task::JoinHandle<()>,
}

impl TestApp {
    /// Construct a new test application with fresh database state.
    pub async fn new() -> Self {
        Self::with_config(|_| {}).await
    }

    /// Construct a test application, letting the caller adjust the config
    /// before the services are built (fiscal endpoint, retries, page sizes).
    pub async fn with_config(customize: impl FnOnce(&mut AppConfig)) -> Self {
        // One database file per harness so parallel tests never share state.
        let db_file = format!("comanda_test_{}.db", Uuid::new_v4().simple());
        remove_db_files(&db_file);

        let mut cfg = AppConfig::new(
            format!("sqlite://{db_file}?mode=rwc"),
            "127.0.0.1".to_string(),
            18_080,
            "test".to_string(),
        );
        cfg.auto_migrate = true;
        cfg.db_max_connections = 1;
        cfg.db_min_connections = 1;
        // Point fiscal submission at a closed port so stray background
        // dispatches fail fast instead of reaching a real service.
        cfg.fiscal.base_url = "http://127.0.0.1:1".to_string();
        cfg.fiscal.dispatch_delay_secs = 0;
        cfg.fiscal.max_retries = 1;
        cfg.fiscal.timeout_secs = 2;
        customize(&mut cfg);

        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("failed to create test database");

        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");

        let db_arc = Arc::new(pool);
        let (event_tx, event_rx) = mpsc::channel(256);
        let event_sender = EventSender::new(event_tx);

        let services = AppServices::new(db_arc.clone(), event_sender.clone(), &cfg);
        let event_ctx = EventContext {
            db: db_arc.clone(),
            loyalty: services.loyalty.as_ref().clone(),
            fiscal: services.fiscal.as_ref().clone(),
            notifications: NotificationService::new(&cfg.notifications),
            fiscal_dispatch_delay: Duration::from_secs(cfg.fiscal.dispatch_delay_secs),
        };
        let event_task = tokio::spawn(events::process_events(event_rx, event_ctx));

        let state = AppState {
            db: db_arc,
            config: cfg,
            event_sender,
            services,
        };

        let router = Router::new()
            .route("/health", get(comanda_api::health_check))
            .nest("/api/v1", comanda_api::api_v1_routes())
            .layer(axum::middleware::from_fn(request_id_middleware))
            .with_state(state.clone());

        Self {
            router,
            state,
            db_file,
            _event_task: event_task,
        }
    }

    /// Send a request against the router with an optional JSON body.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> axum::response::Response {
        let mut builder = Request::builder().method(method).uri(uri);

        let body = if let Some(json) = body {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_vec(&json).expect("failed to serialize json request body"))
        } else {
            Body::empty()
        };

        let request = builder.body(body).expect("failed to build request");
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }

    /// Insert an active, stock-tracked product.
    pub async fn seed_product(
        &self,
        name: &str,
        price: Decimal,
        tax_rate: Decimal,
        stock: i32,
    ) -> product::Model {
        self.insert_product(name, price, tax_rate, stock, true)
            .await
    }

    /// Insert an active product that does not track stock.
    pub async fn seed_untracked_product(
        &self,
        name: &str,
        price: Decimal,
        tax_rate: Decimal,
    ) -> product::Model {
        self.insert_product(name, price, tax_rate, 0, false).await
    }

    async fn insert_product(
        &self,
        name: &str,
        price: Decimal,
        tax_rate: Decimal,
        stock: i32,
        tracks_stock: bool,
    ) -> product::Model {
        let now = Utc::now();
        let code = format!("P-{}", &Uuid::new_v4().simple().to_string()[..8]);
        product::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name.to_string()),
            code: Set(Some(code)),
            price: Set(price),
            cost: Set(Decimal::ZERO),
            tax_rate: Set(tax_rate),
            stock_quantity: Set(stock),
            tracks_stock: Set(tracks_stock),
            active: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(self.state.db.as_ref())
        .await
        .expect("seed product for tests")
    }

    /// Insert an active size variant for a product.
    pub async fn seed_size(
        &self,
        product_id: Uuid,
        name: &str,
        price_adjustment: Decimal,
    ) -> product_size::Model {
        product_size::ActiveModel {
            id: Set(Uuid::new_v4()),
            product_id: Set(product_id),
            name: Set(name.to_string()),
            price_adjustment: Set(price_adjustment),
            active: Set(true),
        }
        .insert(self.state.db.as_ref())
        .await
        .expect("seed product size for tests")
    }

    /// Insert an active extra.
    pub async fn seed_extra(&self, name: &str, price: Decimal) -> extra::Model {
        extra::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name.to_string()),
            price: Set(price),
            active: Set(true),
        }
        .insert(self.state.db.as_ref())
        .await
        .expect("seed extra for tests")
    }

    pub async fn seed_customer(
        &self,
        name: &str,
        identification: Option<&str>,
    ) -> customer::Model {
        let now = Utc::now();
        customer::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name.to_string()),
            identification: Set(identification.map(|id| id.to_string())),
            email: Set(None),
            phone: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(self.state.db.as_ref())
        .await
        .expect("seed customer for tests")
    }

    pub async fn seed_earning_rule(
        &self,
        name: &str,
        rule_kind: RuleKind,
        min_order_value: Decimal,
        points_to_award: i32,
        amount_step: Option<Decimal>,
        channel: RuleChannel,
    ) -> earning_rule::Model {
        earning_rule::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name.to_string()),
            rule_kind: Set(rule_kind),
            min_order_value: Set(min_order_value),
            points_to_award: Set(points_to_award),
            amount_step: Set(amount_step),
            channel: Set(channel),
            active: Set(true),
            created_at: Set(Utc::now()),
        }
        .insert(self.state.db.as_ref())
        .await
        .expect("seed earning rule for tests")
    }

    /// Insert an active store discount with no validity window.
    pub async fn seed_discount(
        &self,
        code: &str,
        discount_kind: DiscountKind,
        value: Decimal,
        min_purchase_amount: Option<Decimal>,
        max_discount_amount: Option<Decimal>,
    ) -> discount::Model {
        discount::ActiveModel {
            id: Set(Uuid::new_v4()),
            code: Set(code.to_string()),
            discount_kind: Set(discount_kind),
            value: Set(value),
            min_purchase_amount: Set(min_purchase_amount),
            max_discount_amount: Set(max_discount_amount),
            active: Set(true),
            starts_at: Set(None),
            ends_at: Set(None),
            created_at: Set(Utc::now()),
        }
        .insert(self.state.db.as_ref())
        .await
        .expect("seed discount for tests")
    }

    /// Insert an unused coupon with no expiry.
    pub async fn seed_coupon(
        &self,
        customer_id: Uuid,
        code: &str,
        reward_kind: RewardKind,
        value: Decimal,
    ) -> coupon::Model {
        coupon::ActiveModel {
            id: Set(Uuid::new_v4()),
            customer_id: Set(customer_id),
            code: Set(code.to_string()),
            reward_kind: Set(reward_kind),
            value: Set(value),
            used: Set(false),
            used_on_order_id: Set(None),
            expires_at: Set(None),
            created_at: Set(Utc::now()),
        }
        .insert(self.state.db.as_ref())
        .await
        .expect("seed coupon for tests")
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        self._event_task.abort();
        remove_db_files(&self.db_file);
    }
}

fn remove_db_files(db_file: &str) {
    for suffix in ["", "-wal", "-shm", "-journal"] {
        let _ = std::fs::remove_file(format!("{db_file}{suffix}"));
    }
}
