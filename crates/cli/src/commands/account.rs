//! Session commands: login, register, whoami, logout.

use vitrine_storefront::Storefront;
use vitrine_storefront::stores::AuthStatus;

use super::CliError;

pub async fn login(app: &Storefront, email: &str, password: &str) -> Result<(), CliError> {
    let user = app.auth().login(email, password).await?;
    println!("Signed in as {} <{}>", user.name, user.email);
    println!("Cart: {} item(s)", app.cart().count());
    Ok(())
}

pub async fn register(
    app: &Storefront,
    name: &str,
    email: &str,
    password: &str,
    confirmation: &str,
) -> Result<(), CliError> {
    let user = app
        .auth()
        .register(name, email, password, confirmation)
        .await?;
    println!("Welcome, {}! Account {} created", user.name, user.id);
    Ok(())
}

pub fn whoami(app: &Storefront) -> Result<(), CliError> {
    let user = app.auth().user().ok_or(CliError::NotSignedIn)?;
    println!("{} <{}> (id {})", user.name, user.email, user.id);
    if user.is_staff {
        println!("staff");
    }
    Ok(())
}

/// Sign out this device, or every device with `all`.
pub async fn logout(app: &Storefront, all: bool) -> Result<(), CliError> {
    if app.auth().status() != AuthStatus::Authenticated {
        println!("Not signed in");
        return Ok(());
    }
    if all {
        app.auth().logout_all().await?;
        println!("Signed out of all sessions");
    } else {
        app.auth().logout().await;
        println!("Signed out");
    }
    Ok(())
}
