pub mod coupon;
pub mod customer;
pub mod discount;
pub mod discount_usage;
pub mod earning_rule;
pub mod extra;
pub mod loyalty_account;
pub mod order;
pub mod order_item;
pub mod order_item_extra;
pub mod point_transaction;
pub mod product;
pub mod product_size;
pub mod sri_document;
