mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use dialoguer::Confirm;
use replitdb::{Client, ConnectionSource};
use tracing_subscriber::EnvFilter;

use cli::{Cli, Command};

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let url = cli.url.as_deref();

    match cli.command {
        Command::Get { key, json } => cmd_get(&connect(url)?, &key, json).await?,
        Command::Set { key, value, json } => cmd_set(&connect(url)?, &key, &value, json).await?,
        Command::Delete { key, yes } => cmd_delete(&connect(url)?, &key, yes).await?,
        Command::List { prefix } => cmd_list(&connect(url)?, &prefix).await?,
        Command::CacheUrl { url } => cmd_cache_url(&url)?,
    }

    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn connect(url: Option<&str>) -> Result<Client> {
    let client = match url {
        Some(url) => Client::new(url),
        None => Client::from_env(),
    };
    client.context("failed to configure database client")
}

async fn cmd_get(client: &Client, key: &str, json: bool) -> Result<()> {
    if json {
        let value: serde_json::Value = client
            .get_json(key)
            .await
            .with_context(|| format!("failed to get '{}'", key))?;
        println!("{}", serde_json::to_string_pretty(&value)?);
    } else {
        let value = client
            .get(key)
            .await
            .with_context(|| format!("failed to get '{}'", key))?;
        println!("{}", value);
    }
    Ok(())
}

async fn cmd_set(client: &Client, key: &str, value: &str, json: bool) -> Result<()> {
    let result = if json {
        let parsed: serde_json::Value =
            serde_json::from_str(value).context("value is not valid JSON")?;
        client.set_json(key, &parsed).await
    } else {
        client.set(key, value).await
    };
    result.with_context(|| format!("failed to set '{}'", key))?;

    println!("Set '{}'", key);
    Ok(())
}

async fn cmd_delete(client: &Client, key: &str, yes: bool) -> Result<()> {
    if !yes
        && !Confirm::new()
            .with_prompt(format!("Delete key '{}'?", key))
            .default(false)
            .interact()?
    {
        println!("Cancelled");
        return Ok(());
    }

    client
        .delete(key)
        .await
        .with_context(|| format!("failed to delete '{}'", key))?;
    println!("Deleted '{}'", key);
    Ok(())
}

async fn cmd_list(client: &Client, prefix: &str) -> Result<()> {
    let keys = client
        .list_keys(prefix)
        .await
        .with_context(|| format!("failed to list keys with prefix '{}'", prefix))?;
    for key in &keys {
        println!("{}", display_key(key));
    }
    Ok(())
}

fn cmd_cache_url(url: &str) -> Result<()> {
    let source = ConnectionSource::default();
    source
        .write_cached_url(url)
        .context("failed to cache database url")?;
    println!("Saved database url to {}", source.url_file().display());
    Ok(())
}

/// Keys with control characters are printed escaped so one key stays on one
/// line.
fn display_key(key: &str) -> String {
    if key.chars().any(char::is_control) {
        format!("{:?}", key)
    } else {
        key.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_key_leaves_plain_keys_alone() {
        assert_eq!(display_key("user:42 name"), "user:42 name");
    }

    #[test]
    fn display_key_escapes_control_characters() {
        assert_eq!(display_key("line\nbreak"), "\"line\\nbreak\"");
    }

    #[test]
    fn connect_rejects_invalid_explicit_url() {
        let err = connect(Some("not a url")).unwrap_err();
        assert!(err.to_string().contains("failed to configure database client"));
    }
}
