//! Login, registration and session commands.

use std::io::{self, BufRead};

use secrecy::SecretString;

use tienda_storefront::backend::Backend;
use tienda_storefront::db::OrderRepository;
use tienda_storefront::AppState;
use tienda_storefront::storage::LocalStore;

use crate::error::Result;

/// Log in and report who we are.
///
/// # Errors
///
/// Returns an error if the password cannot be read or the login fails.
pub async fn login<B: Backend, S: LocalStore, R: OrderRepository>(
    state: &mut AppState<B, S, R>,
    email: &str,
    password: Option<String>,
) -> Result<()> {
    let password = password_or_stdin(password)?;
    let user = state.login(email, password).await?;

    #[allow(clippy::print_stdout)]
    {
        println!("Logged in as {} <{}>", user.name, user.email);
        if user.token.is_none() {
            println!("  (no backend token; remote purchases unavailable)");
        }
    }
    Ok(())
}

/// Create an account.
///
/// # Errors
///
/// Returns an error if the password cannot be read or registration fails.
pub async fn register<B: Backend, S: LocalStore, R: OrderRepository>(
    state: &mut AppState<B, S, R>,
    name: &str,
    email: &str,
    password: Option<String>,
) -> Result<()> {
    let password = password_or_stdin(password)?;
    let user = state.register(name, email, password).await?;

    #[allow(clippy::print_stdout)]
    {
        println!("Registered {} <{}>", user.name, user.email);
    }
    Ok(())
}

/// Forget the saved session.
///
/// # Errors
///
/// Returns an error if the session record cannot be removed.
pub fn logout<B: Backend, S: LocalStore, R: OrderRepository>(
    state: &mut AppState<B, S, R>,
) -> Result<()> {
    state.logout()?;

    #[allow(clippy::print_stdout)]
    {
        println!("Logged out");
    }
    Ok(())
}

/// Print the logged-in user.
#[allow(clippy::print_stdout)]
pub fn whoami<B: Backend, S: LocalStore, R: OrderRepository>(state: &AppState<B, S, R>) {
    match state.current_user() {
        Some(user) => println!("{} <{}>", user.name, user.email),
        None => println!("Not logged in"),
    }
}

fn password_or_stdin(password: Option<String>) -> Result<SecretString> {
    if let Some(password) = password {
        return Ok(SecretString::from(password));
    }

    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)?;
    Ok(SecretString::from(
        line.trim_end_matches(['\r', '\n']).to_owned(),
    ))
}
