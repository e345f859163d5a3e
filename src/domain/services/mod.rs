pub mod criteria;
pub mod dispatch;
pub mod engine;
pub mod handlers;
pub mod map_listeners;
pub mod subscriptions;
