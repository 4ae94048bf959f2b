mod admin;
mod health_check;
mod helpers;
mod register;
mod subscriptions;
