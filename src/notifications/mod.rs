pub mod dispatcher;
pub mod models;
pub mod plan;
pub mod senders;
pub mod template;

pub use dispatcher::{ChannelOutcome, Dispatcher};
pub use models::{Channel, Direction, EmailSpec, NotificationPlan, WebhookSpec};
pub use plan::{ChannelRouting, Named, PlanBuilder};
