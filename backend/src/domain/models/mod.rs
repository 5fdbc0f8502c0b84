pub mod action;
pub mod child;
pub mod event;
pub mod group;
pub mod monthly_result;

pub use action::Action;
pub use child::Child;
pub use event::{Event, EventKind};
pub use group::Group;
pub use monthly_result::{MonthlyResult, MonthlyResultRow};
