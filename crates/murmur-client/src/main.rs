//! `murmur`: command-line front end for the local messaging core.

use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use tracing::{debug, info};
use uuid::Uuid;

use murmur_client::config::ClientConfig;
use murmur_client::{local_key_store, open_database, open_local, Messenger, Readable};
use murmur_shared::{conversation_key_for, Message, UserId};

#[derive(Parser)]
#[command(name = "murmur", version, about = "End-to-end encrypted 1:1 messaging")]
struct Cli {
    /// Account id of the local user
    #[arg(long, short, env = "MURMUR_USER", global = true)]
    user: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print this device's public key, creating the keypair on first use
    Identity,

    /// Delete this device's keypair; messages addressed to it become unreadable
    WipeIdentity {
        #[arg(long)]
        yes: bool,
    },

    /// Print the conversation id shared by two account ids
    ConversationId { a: String, b: String },

    /// Publish this device's public key under a username
    Register { username: String },

    /// Send a text message
    Send { to: String, text: String },

    /// Encrypt and send a file
    SendFile {
        to: String,
        path: PathBuf,
        #[arg(long)]
        mime: Option<String>,
    },

    /// Show the decrypted history with a peer
    History {
        with: String,
        /// Print JSON instead of text lines
        #[arg(long)]
        json: bool,
    },

    /// Download and decrypt an attachment
    Download {
        id: Uuid,
        #[arg(short, long)]
        out: PathBuf,
    },

    /// List contacts, most recent first
    Contacts {
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    murmur_client::init_tracing();

    let cli = Cli::parse();
    let config = ClientConfig::from_env();
    debug!(?config, "Loaded configuration");

    match cli.command {
        Command::ConversationId { a, b } => {
            println!("{}", conversation_key_for(&a, &b));
        }
        Command::Identity => {
            let db = open_database(&config)?;
            let keys = local_key_store(&db).get_or_create_identity_keys()?;
            println!("{}", keys.public_key_b64());
        }
        Command::WipeIdentity { yes } => {
            if !yes {
                bail!("refusing to wipe the device keypair without --yes");
            }
            let db = open_database(&config)?;
            local_key_store(&db).clear_identity_keys()?;
            println!("Device keypair deleted");
        }
        command => {
            let user = cli
                .user
                .context("an account id is required (--user or MURMUR_USER)")?;
            let messenger = open_local(UserId::new(user), &config).await?;
            run(&messenger, command).await?;
        }
    }

    Ok(())
}

async fn run(messenger: &Messenger, command: Command) -> anyhow::Result<()> {
    match command {
        Command::Register { username } => {
            let profile = messenger.register_profile(&username).await?;
            println!("Registered {} ({})", profile.username, profile.public_key);
        }
        Command::Send { to, text } => {
            let conversation = messenger.open_conversation(&to).await?;
            let row = messenger.send_text(&conversation, &text).await?;
            println!("{}", row.id);
        }
        Command::SendFile { to, path, mime } => {
            let bytes = tokio::fs::read(&path)
                .await
                .with_context(|| format!("reading {}", path.display()))?;
            let file_name = path
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or("file");

            let conversation = messenger.open_conversation(&to).await?;
            let row = messenger
                .send_file(&conversation, file_name, mime.as_deref(), &bytes)
                .await?;
            println!("{}", row.id);
        }
        Command::History { with, json } => {
            let conversation = messenger.open_conversation(&with).await?;
            let history = messenger.load_history(&conversation.id).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&history)?);
                return Ok(());
            }
            for item in history {
                let when = item.message.created_at().format("%Y-%m-%d %H:%M:%S");
                let who = item.message.sender_id();
                match (&item.readable, &item.message) {
                    (Readable::Text { text }, _) => println!("[{when}] {who}: {text}"),
                    (
                        Readable::Attachment {
                            file_name,
                            mime_type,
                            size_bytes,
                        },
                        Message::File(row),
                    ) => println!(
                        "[{when}] {who}: <file {file_name} {mime_type} {size_bytes}B id={}>",
                        row.id
                    ),
                    _ => println!("[{when}] {who}: <unavailable on this device>"),
                }
            }
        }
        Command::Download { id, out } => {
            let (row, file) = messenger.download_file_by_id(id).await?;
            tokio::fs::write(&out, &file.bytes)
                .await
                .with_context(|| format!("writing {}", out.display()))?;
            info!(file = %row.file_name, mime = %file.mime_type, "Saved attachment");
            println!("{}", out.display());
        }
        Command::Contacts { json } => {
            let contacts = messenger.contacts().await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&contacts)?);
                return Ok(());
            }
            for contact in contacts {
                println!(
                    "{}\t{}\t{}",
                    contact.username,
                    contact.peer_id,
                    contact.last_message_at.format("%Y-%m-%d %H:%M:%S")
                );
            }
        }
        Command::Identity | Command::WipeIdentity { .. } | Command::ConversationId { .. } => {
            bail!("command does not run inside a session")
        }
    }

    Ok(())
}
