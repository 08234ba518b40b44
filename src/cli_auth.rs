use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

use ganjoor_server::archive_store::SqliteArchiveStore;
use ganjoor_server::user::{SqliteUserStore, UserManager, UserRole};

const ARCHIVE_DB_FILE: &str = "archive.db";
const USER_DB_FILE: &str = "user.db";

fn parse_path(s: &str) -> Result<PathBuf> {
    let original_path = PathBuf::from(s);
    if original_path.is_absolute() {
        return Ok(original_path);
    }
    let cwd = std::env::current_dir()?;
    Ok(cwd.join(original_path))
}

#[derive(Parser, Debug)]
#[command(about = "Manages users, passwords and roles of the user database")]
struct CliArgs {
    /// Directory holding archive.db and user.db.
    #[clap(long, value_parser = parse_path)]
    pub db_dir: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Creates a user with the given handle.
    AddUser { user_handle: String },

    /// Creates a password authentication for the given user.
    /// Fails if the user already has a password set.
    AddLogin {
        user_handle: String,
        password: String,
    },

    /// Change the password of a user, fails if no password was set.
    UpdateLogin {
        user_handle: String,
        password: String,
    },

    /// Deletes the password authentication for a given user.
    DeleteLogin { user_handle: String },

    /// Shows authentication information, roles and permissions of a user.
    Show { user_handle: String },

    /// Verifies the password of a given user without creating a token.
    CheckPassword {
        user_handle: String,
        password: String,
    },

    /// Shows all user handles.
    UserHandles,

    /// Shows all available roles and their permissions.
    ListRoles,

    /// Adds a role to a user.
    AddRole { user_handle: String, role: String },

    /// Removes a role from a user.
    RemoveRole { user_handle: String, role: String },
}

fn parse_role(role: &str) -> Result<UserRole> {
    match UserRole::from_str(role) {
        Some(role) => Ok(role),
        None => bail!("Invalid role '{}'. Valid roles are: Admin, Regular", role),
    }
}

fn require_user_id(user_manager: &UserManager, user_handle: &str) -> Result<usize> {
    user_manager
        .get_user_id(user_handle)?
        .with_context(|| format!("User '{}' not found", user_handle))
}

fn show_user(user_manager: &UserManager, user_handle: &str) -> Result<()> {
    let user_id = require_user_id(user_manager, user_handle)?;
    let user_credentials = user_manager.get_user_credentials(user_handle)?;
    let user_tokens = user_manager.get_user_tokens(user_handle)?;

    println!("User id: {}", user_id);
    println!("User Credentials:");
    println!("{:#?}", user_credentials);

    println!("\nAuth Tokens:");
    for token in user_tokens.iter() {
        println!("{:#?}", token);
    }

    let roles = user_manager.get_user_roles(user_id)?;
    println!("\nRoles:");
    if roles.is_empty() {
        println!("  (no roles assigned)");
    } else {
        for role in roles.iter() {
            println!("  - {}", role);
        }
    }

    let permissions = user_manager.get_user_permissions(user_id)?;
    println!("\nResolved Permissions:");
    if permissions.is_empty() {
        println!("  (no permissions)");
    } else {
        for permission in permissions.iter() {
            println!("  - {:?}", permission);
        }
    }
    Ok(())
}

fn execute_command(command: Command, user_manager: &UserManager) -> Result<()> {
    match command {
        Command::AddUser { user_handle } => {
            let user_id = user_manager.add_user(&user_handle)?;
            println!("Created user '{}' with id {}", user_handle, user_id);
        }
        Command::AddLogin {
            user_handle,
            password,
        } => {
            user_manager.create_password_credentials(&user_handle, &password)?;
            println!("Password set for '{}'", user_handle);
        }
        Command::UpdateLogin {
            user_handle,
            password,
        } => {
            user_manager.update_password_credentials(&user_handle, &password)?;
            println!("Password updated for '{}'", user_handle);
        }
        Command::DeleteLogin { user_handle } => {
            user_manager.delete_password_credentials(&user_handle)?;
            println!("Password removed for '{}'", user_handle);
        }
        Command::Show { user_handle } => show_user(user_manager, &user_handle)?,
        Command::CheckPassword {
            user_handle,
            password,
        } => {
            let credentials = user_manager
                .get_user_credentials(&user_handle)?
                .with_context(|| format!("User {} not found.", user_handle))?;
            let password_credentials = credentials
                .username_password
                .with_context(|| format!("User {} has no password set.", user_handle))?;
            match password_credentials.verify(&password) {
                Ok(true) => println!("The password provided is correct!"),
                Ok(false) => println!("Wrong password."),
                Err(err) => bail!(
                    "Could not verify the password, something went wrong: {}",
                    err
                ),
            }
        }
        Command::UserHandles => {
            for handle in user_manager.get_all_user_handles()? {
                println!("{}", handle);
            }
        }
        Command::ListRoles => {
            println!("Available Roles:\n");
            for role in &[UserRole::Admin, UserRole::Regular] {
                println!("Role: {}", role);
                println!("Permissions:");
                for permission in role.permissions() {
                    println!("  - {:?}", permission);
                }
                println!();
            }
        }
        Command::AddRole { user_handle, role } => {
            let role_enum = parse_role(&role)?;
            let user_id = require_user_id(user_manager, &user_handle)?;
            user_manager.add_user_role(user_id, role_enum)?;
            println!("Role '{}' added to user '{}'", role, user_handle);
        }
        Command::RemoveRole { user_handle, role } => {
            let role_enum = parse_role(&role)?;
            let user_id = require_user_id(user_manager, &user_handle)?;
            user_manager.remove_user_role(user_id, role_enum)?;
            println!("Role '{}' removed from user '{}'", role, user_handle);
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli_args = CliArgs::parse();
    if !cli_args.db_dir.is_dir() {
        bail!("Database directory does not exist: {:?}", cli_args.db_dir);
    }

    let archive_store = SqliteArchiveStore::new(cli_args.db_dir.join(ARCHIVE_DB_FILE), 1)
        .context("Failed to open archive database")?;
    let user_store = SqliteUserStore::new(cli_args.db_dir.join(USER_DB_FILE))
        .context("Failed to open user database")?;
    let user_manager = UserManager::new(Arc::new(archive_store), Box::new(user_store));

    execute_command(cli_args.command, &user_manager)
}
