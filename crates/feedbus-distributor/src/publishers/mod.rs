//! Publisher tracking and data distribution.

mod manager;
mod repository;

pub(crate) use manager::PublisherManager;
pub(crate) use repository::PublisherRepository;
