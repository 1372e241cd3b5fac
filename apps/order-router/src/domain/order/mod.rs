//! Order commands and their routing lifecycle.

mod edit_saga;
mod errors;
#[allow(clippy::module_inception)]
mod order;
mod order_action;
mod order_side;
mod order_status;

pub use edit_saga::{EditSaga, EditSagaState, SagaStepError};
pub use errors::{InvalidTransition, OrderValidationError};
pub use order::{Order, OrderCommand};
pub use order_action::OrderAction;
pub use order_side::OrderSide;
pub use order_status::OrderStatus;
