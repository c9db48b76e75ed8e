use crate::entities::order::OrderStatus;

/// Validates if a lifecycle transition is allowed.
///
/// The forward path is pending -> confirmed -> preparing -> ready ->
/// delivering -> delivered|completed. Cancellation and rejection gates are
/// narrower than "any non-terminal" and live in their own predicates below.
pub fn is_valid_transition(from: OrderStatus, to: OrderStatus) -> bool {
    use OrderStatus::*;
    match (from, to) {
        (Pending, Confirmed) => true,
        (Pending, Preparing) => true,

        (Confirmed, Preparing) => true,

        (Preparing, Ready) => true,

        (Ready, Delivering) => true,
        (Ready, Delivered) => true,

        (Delivering, Delivered) => true,

        // POS checkout: complete straight from any pre-delivery working state
        (Pending, Completed) => true,
        (Confirmed, Completed) => true,
        (Preparing, Completed) => true,
        (Ready, Completed) => true,

        (from, Cancelled) => can_cancel(from),
        (from, Rejected) => can_reject(from),

        _ => false,
    }
}

/// Cancellation is only allowed before the kitchen hands the order off.
/// It is the only transition that restores stock.
pub fn can_cancel(status: OrderStatus) -> bool {
    matches!(
        status,
        OrderStatus::Pending | OrderStatus::Confirmed | OrderStatus::Preparing
    )
}

/// Rejection is allowed from any non-terminal state.
pub fn can_reject(status: OrderStatus) -> bool {
    !status.is_terminal()
}

/// Line items may only change while the order is still in the kitchen's
/// hands. Totals are recomputed on every item mutation.
pub fn can_modify_items(status: OrderStatus) -> bool {
    matches!(
        status,
        OrderStatus::Pending | OrderStatus::Confirmed | OrderStatus::Preparing
    )
}
