pub mod account;
pub mod copy_rule;
pub mod locate;
pub mod order;
pub mod order_event;
pub mod route;

pub use account::{Account, AccountType};
pub use copy_rule::{CopyRule, RatioType};
pub use locate::LocateContext;
pub use order::Order;
pub use order_event::{ExecType, OrderEvent, OrderStatus};
pub use route::{LocateType, Route};
