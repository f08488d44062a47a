//! Interactive shell for manual follow-up on a signed-in session
//!
//! Runs a readline loop against the open settings page so credentials can be
//! inspected, created and deleted by hand.

use anyhow::{Context, Result};
use colored::Colorize;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use std::str::FromStr;
use tracing::debug;

use crate::display;
use crate::github::{CredentialKind, GitHubSession};

const HELP: &str = "\
Commands:
  info                 show the app's OAuth credentials section
  secrets              list client secrets
  keys                 list private keys
  refresh              reload the settings page
  create-secret        generate a new client secret
  create-key           generate and download a new private key
  delete-secret <id>   delete a client secret
  delete-key <id>      delete a private key
  help                 show this help
  quit                 close the browser and exit";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShellCommand {
    Help,
    Info,
    List(CredentialKind),
    Refresh,
    Create(CredentialKind),
    Delete(CredentialKind, u64),
    Quit,
}

impl FromStr for ShellCommand {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut words = s.split_whitespace();
        let command = words.next().unwrap_or_default().to_lowercase();
        let arg = words.next();
        if words.next().is_some() {
            return Err(format!("Too many arguments: {}", s));
        }

        let id = |kind: CredentialKind| -> Result<u64, String> {
            let raw = arg.ok_or_else(|| format!("Usage: {} <id>", command))?;
            raw.parse()
                .map_err(|_| format!("Invalid {} id: {}", kind, raw))
        };

        let parsed = match command.as_str() {
            "help" | "?" => ShellCommand::Help,
            "info" => ShellCommand::Info,
            "secrets" => ShellCommand::List(CredentialKind::ClientSecret),
            "keys" => ShellCommand::List(CredentialKind::PrivateKey),
            "refresh" => ShellCommand::Refresh,
            "create-secret" => ShellCommand::Create(CredentialKind::ClientSecret),
            "create-key" => ShellCommand::Create(CredentialKind::PrivateKey),
            "delete-secret" => {
                return Ok(ShellCommand::Delete(
                    CredentialKind::ClientSecret,
                    id(CredentialKind::ClientSecret)?,
                ))
            }
            "delete-key" => {
                return Ok(ShellCommand::Delete(
                    CredentialKind::PrivateKey,
                    id(CredentialKind::PrivateKey)?,
                ))
            }
            "quit" | "exit" => ShellCommand::Quit,
            _ => return Err(format!("Unknown command: {}. Type `help` for a list", command)),
        };

        match arg {
            Some(extra) => Err(format!("{} takes no argument (got {})", command, extra)),
            None => Ok(parsed),
        }
    }
}

async fn run_command(session: &GitHubSession, command: ShellCommand) -> Result<()> {
    match command {
        ShellCommand::Help => println!("{}", HELP),
        ShellCommand::Info => display::print_info(&session.info().await?)?,
        ShellCommand::List(CredentialKind::ClientSecret) => {
            display::print_credentials("Client secrets", &session.client_secrets().await?)?
        }
        ShellCommand::List(CredentialKind::PrivateKey) => {
            display::print_credentials("Private keys", &session.private_keys().await?)?
        }
        ShellCommand::Refresh => session.refresh().await?,
        ShellCommand::Create(CredentialKind::ClientSecret) => {
            display::print_created(&session.create_client_secret().await?)?
        }
        ShellCommand::Create(CredentialKind::PrivateKey) => {
            display::print_created(&session.create_private_key().await?)?
        }
        ShellCommand::Delete(kind, id) => {
            session.delete(kind, id).await?;
            println!("{} {} {}", "Deleted".green(), kind, id);
        }
        ShellCommand::Quit => {}
    }
    Ok(())
}

/// Read commands until `quit`, Ctrl-C or Ctrl-D
pub async fn run_shell(session: &GitHubSession) -> Result<()> {
    let mut rl = DefaultEditor::new().context("Failed to initialize readline")?;

    println!("{} for {}", "Interactive shell".bold().green(), session.app());
    println!("Type {} for commands, {} to exit.\n", "help".yellow(), "quit".yellow());

    let prompt = format!("{}> ", session.app().green());
    loop {
        match rl.readline(&prompt) {
            Ok(line) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                let _ = rl.add_history_entry(trimmed);

                match trimmed.parse::<ShellCommand>() {
                    Ok(ShellCommand::Quit) => break,
                    Ok(command) => {
                        debug!("Shell command {:?}", command);
                        if let Err(e) = run_command(session, command).await {
                            eprintln!("{}: {:#}", "error".red(), e);
                        }
                    }
                    Err(message) => eprintln!("{}", message.yellow()),
                }
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(e) => return Err(e).context("Failed to read shell input"),
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_commands() {
        assert_eq!("help".parse::<ShellCommand>(), Ok(ShellCommand::Help));
        assert_eq!("  INFO ".parse::<ShellCommand>(), Ok(ShellCommand::Info));
        assert_eq!(
            "secrets".parse::<ShellCommand>(),
            Ok(ShellCommand::List(CredentialKind::ClientSecret))
        );
        assert_eq!("keys".parse::<ShellCommand>(), Ok(ShellCommand::List(CredentialKind::PrivateKey)));
        assert_eq!(
            "create-key".parse::<ShellCommand>(),
            Ok(ShellCommand::Create(CredentialKind::PrivateKey))
        );
        assert_eq!("exit".parse::<ShellCommand>(), Ok(ShellCommand::Quit));
    }

    #[test]
    fn test_parse_delete() {
        assert_eq!(
            "delete-secret 122683".parse::<ShellCommand>(),
            Ok(ShellCommand::Delete(CredentialKind::ClientSecret, 122683))
        );
        assert_eq!(
            "delete-key 9001".parse::<ShellCommand>(),
            Ok(ShellCommand::Delete(CredentialKind::PrivateKey, 9001))
        );
    }

    #[test]
    fn test_parse_errors() {
        assert!("delete-secret".parse::<ShellCommand>().is_err());
        assert!("delete-key abc".parse::<ShellCommand>().is_err());
        assert!("delete-key 1 2".parse::<ShellCommand>().is_err());
        assert!("secrets now".parse::<ShellCommand>().is_err());
        assert!("rotate".parse::<ShellCommand>().is_err());
    }
}
