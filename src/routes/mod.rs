mod admin;
mod healthcheck;
mod home;
mod login;
mod logout;
mod news;
mod profile;
mod register;
mod subscriptions;

pub use admin::*;
pub use healthcheck::*;
pub use home::*;
pub use login::*;
pub use logout::*;
pub use news::*;
pub use profile::*;
pub use register::*;
pub use subscriptions::*;
