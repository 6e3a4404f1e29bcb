//! Subscription-churn notification.

mod manager;
mod repository;

pub(crate) use manager::NotificationManager;
pub(crate) use repository::NotificationRepository;
