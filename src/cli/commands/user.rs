//! User commands.
//!
//! Users only exist so emails in documents (lead, assignee, reporter,
//! comment author) resolve to rows in the index. Unknown emails index as
//! NULL; adding the user and running `sm repair` links them up.

use crate::cli::commands::{print_json, Context};
use crate::cli::UserCommands;
use crate::error::{Error, Result};

/// Execute a user command.
///
/// # Errors
///
/// Returns an error if the tracker is not initialized or the index write fails.
pub fn execute(command: &UserCommands, ctx: &Context, json: bool) -> Result<()> {
    let mut tracker = ctx.open_tracker()?;

    match command {
        UserCommands::Add { email, first, last } => {
            let email = email.trim();
            if !email.contains('@') {
                return Err(Error::InvalidArgument(format!("invalid email '{email}'")));
            }
            let id = tracker
                .storage_mut()
                .add_user(email, first.as_deref(), last.as_deref())?;
            if json {
                print_json(&serde_json::json!({ "id": id, "email": email }))
            } else {
                println!("Added user {email}");
                Ok(())
            }
        }
        UserCommands::List => {
            let users = tracker.storage().list_users()?;
            if json {
                return print_json(&users);
            }
            if users.is_empty() {
                println!("No users found.");
            }
            for user in &users {
                println!("  {:<32} {}", user.email, user.display_name());
            }
            Ok(())
        }
    }
}
