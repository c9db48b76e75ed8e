// Core order engine
pub mod orders;
pub mod stock;

// Pure helpers the order engine is built from
pub mod order_status;
pub mod order_totals;

// Discounts and loyalty
pub mod discounts;
pub mod loyalty;

// Fiscal invoicing and outbound side effects
pub mod fiscal;
pub mod notifications;
