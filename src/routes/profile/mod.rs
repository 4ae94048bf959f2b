mod subscription;

pub use subscription::toggle_subscription;
