mod credentials;
mod middleware;

pub use credentials::{compute_password_hash, validate_creds, AuthError, Credentials};
pub use middleware::{
    get_authenticated_user, reject_logged_out_users, reject_non_admin_users, AuthenticatedUser,
    Role, UserId,
};
