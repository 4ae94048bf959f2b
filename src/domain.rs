mod article;
mod email_address;
mod new_user;
mod user_name;

pub use article::{ArticleContent, ArticleId, ArticleTitle, ImageUrl, NewArticle, Rating};
pub use email_address::EmailAddress;
pub use new_user::{NewUser, Password};
pub use user_name::UserName;
