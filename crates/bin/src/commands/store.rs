//! Store management commands.

use std::path::Path;

use tollgate::{
    AuthService, Drivers,
    service::NewUser,
    storage::{Capability, StorageError},
};

use crate::cli::UserAddArgs;
use crate::config::Config;
use crate::output::OutputFormat;

/// Run the `create-store` command
pub async fn create(path: &Path, format: OutputFormat) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load(path)?;
    let drivers = Drivers::builtin()?;
    let store = config.open_store(&drivers).await?;

    if !store.supports(Capability::CreateStore).await {
        store.close().await?;
        return Err(StorageError::NoSupport {
            capability: Capability::CreateStore.to_string(),
        }
        .into());
    }
    store.create_store().await?;
    let dsn = store.dsn().await;
    store.close().await?;

    match format {
        OutputFormat::Human => println!("Created {} store at {dsn}", store.name()),
        OutputFormat::Json => {
            let value = serde_json::json!({ "driver": store.name(), "dsn": dsn });
            println!("{}", serde_json::to_string(&value)?);
        }
    }
    Ok(())
}

/// Run the `user-add` command
pub async fn user_add(
    path: &Path,
    args: &UserAddArgs,
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load(path)?;
    let drivers = Drivers::builtin()?;
    let service = AuthService::new(config.encryption(&drivers)?, config.service_options()?);
    let store = config.open_store(&drivers).await?;

    let new_user = NewUser {
        domain: args.domain.clone(),
        login: args.login.clone(),
        name: args.name.clone(),
        email: args.email.clone(),
        password: args.password.clone(),
    };
    let added = service.add_user(&store, new_user, args.system).await;
    store.close().await?;
    let user = added?;

    match format {
        OutputFormat::Human => {
            println!("Guid:    {}", user.guid());
            println!("Domain:  {}", user.domain());
            println!("Login:   {}", user.login_name());
            println!("System:  {}", user.is_system());
            // The salt doubles as the account's signing secret
            println!("Secret:  {}", user.salt());
        }
        OutputFormat::Json => {
            let value = serde_json::json!({
                "guid": user.guid(),
                "domain": user.domain(),
                "login": user.login_name(),
                "system": user.is_system(),
                "secret": user.salt(),
            });
            println!("{}", serde_json::to_string(&value)?);
        }
    }
    Ok(())
}
