pub mod publisher;

pub use publisher::{EventPublisher, EventSubscriber, SubscriberError};
