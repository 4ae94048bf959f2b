// Utility to generate SQL statements that seed the users table

use std::{env, process};

use casino_hub::authentication::{compute_password_hash, Role};
use fake::faker::internet::en::{Password, SafeEmail};
use fake::faker::name::en::Name;
use fake::Fake;
use secrecy::ExposeSecret;
use uuid::Uuid;

/// Seed user
#[derive(Debug)]
pub struct SeedUser {
    pub user_id: Uuid,
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: Role,
}

impl SeedUser {
    /// Generate new random seed user
    pub fn generate() -> Self {
        Self {
            user_id: Uuid::new_v4(),
            name: Name().fake(),
            email: SafeEmail().fake(),
            password: Password(16..17).fake(),
            role: Role::User,
        }
    }

    /// Render the INSERT statement for this user, hashing its password
    pub fn to_sql(&self) -> anyhow::Result<String> {
        let password_hash = compute_password_hash(&self.password)?;
        Ok(format!(
            "INSERT INTO users (user_id, name, email, password_hash, role) \
             VALUES ('{}', '{}', '{}', '{}', '{}'); -- password: {}",
            self.user_id,
            quote(&self.name),
            quote(&self.email.to_lowercase()),
            password_hash.expose_secret(),
            self.role.as_str(),
            self.password,
        ))
    }
}

/// Escape single quotes in SQL string literals
fn quote(value: &str) -> String {
    value.replace('\'', "''")
}

/// Generate example seed users
fn main() -> anyhow::Result<()> {
    let args: Vec<String> = env::args().collect();
    if args.iter().skip(1).any(|arg| arg.starts_with('-')) {
        usage(&args[0]);
    }

    let users = match args.len() {
        // Ten random regular users
        1 => (0..10).map(|_| SeedUser::generate()).collect(),

        // One user with the specified email, and optionally password and role
        2..=4 => {
            let mut user = SeedUser::generate();
            user.email.clone_from(&args[1]);
            if let Some(password) = args.get(2) {
                user.password.clone_from(password);
            }
            if let Some(role) = args.get(3) {
                user.role = Role::try_from(role.clone()).map_err(anyhow::Error::msg)?;
            }
            vec![user]
        }

        _ => usage(&args[0]),
    };

    for user in &users {
        println!("{}", user.to_sql()?);
    }

    Ok(())
}

/// Print usage information and exit
fn usage(prog: &str) -> ! {
    println!("Usage:");
    println!("{prog} [email] [password] [admin|user]");
    println!("\nExamples:");
    println!("{prog}");
    println!("{prog} admin@email.com everythinghastostartsomewhere admin");

    process::exit(1);
}
