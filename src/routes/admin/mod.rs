mod dashboard;
mod news;
mod subscribers;
mod users;

pub use dashboard::dashboard;
pub use news::{delete_news, publish_news, update_news, NewsError};
pub use subscribers::list_subscribers;
pub use users::{delete_user, list_users};
