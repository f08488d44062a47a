//! Terminal output for scraped records

use anyhow::{Context, Result};
use colored::Colorize;
use serde::Serialize;
use std::collections::BTreeMap;

use crate::github::Credential;

fn pretty<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    serde_json::to_string_pretty(value).context("Failed to format output")
}

pub fn print_info(info: &BTreeMap<String, String>) -> Result<()> {
    println!("{}", "App".bold());
    println!("{}", pretty(info)?);
    Ok(())
}

pub fn print_credentials(title: &str, credentials: &BTreeMap<u64, Credential>) -> Result<()> {
    println!("{} ({})", title.bold(), credentials.len());
    if credentials.is_empty() {
        println!("  none");
        return Ok(());
    }
    let list: Vec<&Credential> = credentials.values().collect();
    println!("{}", pretty(&list)?);
    Ok(())
}

/// Show a newly created credential, which includes its cleartext value
pub fn print_created(credential: &Credential) -> Result<()> {
    eprintln!(
        "{}",
        "WARNING: Secret value will be displayed. Ensure this output is secured.".yellow()
    );
    println!("{} {} {}", "Created".green().bold(), credential.kind, credential.id);
    println!("{}", pretty(credential)?);
    eprintln!(
        "{}",
        "Store the new value where it is consumed and clear your terminal history.".yellow()
    );
    Ok(())
}
