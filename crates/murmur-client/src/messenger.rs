//! Messaging workflows for one signed-in user on one device.
//!
//! [`Messenger`] ties the device keypair to the collaborators: it resolves
//! peers through the profile directory, seals every text and file key twice
//! (recipient copy and sender copy), persists rows, and fans them out through
//! the relay. Only ciphertext ever reaches a collaborator.

use std::sync::Arc;

use chrono::Utc;
use futures::StreamExt;
use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;
use x25519_dalek::PublicKey;

use murmur_shared::cipher::{decrypt_wire, encrypt_dual};
use murmur_shared::constants::DEFAULT_MIME_TYPE;
use murmur_shared::encoding::from_base64;
use murmur_shared::file_cipher::{
    decrypt_file_from_bytes, encrypt_file_for_upload, unwrap_content_key, wrap_content_key,
    DecryptedFile,
};
use murmur_shared::identity::parse_public_key;
use murmur_shared::keystore::{IdentityKeyStore, KeyStorage};
use murmur_shared::protocol::{ClientEvent, FileDescriptor, ServerEvent};
use murmur_shared::{
    conversation_key_for, ConversationId, CryptoError, FileMessageRow, IdentityKeys, Message,
    Profile, ReaderRole, TextMessageRow, UserId,
};
use murmur_store::{storage_locator, Contact};

use crate::collaborators::{BlobStore, MessageStore, ProfileDirectory, Relay, RoomEvents};
use crate::error::{ClientError, Result};

/// Device key provider shared by every workflow of a session.
pub type SharedKeyStore = Arc<IdentityKeyStore<Arc<dyn KeyStorage>>>;

pub struct Collaborators {
    pub directory: Arc<dyn ProfileDirectory>,
    pub store: Arc<dyn MessageStore>,
    pub blobs: Arc<dyn BlobStore>,
    pub relay: Arc<dyn Relay>,
}

/// An open 1:1 conversation and its live relay feed.
pub struct Conversation {
    pub id: ConversationId,
    pub peer: Profile,
    peer_key: PublicKey,
    events: RoomEvents,
}

impl Conversation {
    pub fn peer_public_key(&self) -> &PublicKey {
        &self.peer_key
    }

    /// Next relay delivery for this room, or `None` once the relay is gone.
    pub async fn next_event(&mut self) -> Option<ServerEvent> {
        self.events.next().await
    }
}

impl std::fmt::Debug for Conversation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Conversation")
            .field("id", &self.id)
            .field("peer", &self.peer)
            .finish_non_exhaustive()
    }
}

/// What the local user can see of one history entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Readable {
    Text { text: String },
    Attachment {
        file_name: String,
        mime_type: String,
        size_bytes: u64,
    },
    /// The row could not be opened with this device's keys.
    Unavailable,
}

#[derive(Debug, Clone, Serialize)]
pub struct HistoryItem {
    pub message: Message,
    pub readable: Readable,
}

pub struct Messenger {
    user_id: UserId,
    keys: SharedKeyStore,
    directory: Arc<dyn ProfileDirectory>,
    store: Arc<dyn MessageStore>,
    blobs: Arc<dyn BlobStore>,
    relay: Arc<dyn Relay>,
    max_file_size: usize,
}

impl Messenger {
    pub fn new(
        user_id: UserId,
        keys: SharedKeyStore,
        collaborators: Collaborators,
        max_file_size: usize,
    ) -> Self {
        Self {
            user_id,
            keys,
            directory: collaborators.directory,
            store: collaborators.store,
            blobs: collaborators.blobs,
            relay: collaborators.relay,
            max_file_size,
        }
    }

    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    /// The device keypair, created and persisted on first use.
    pub fn identity(&self) -> Result<IdentityKeys> {
        Ok(self.keys.get_or_create_identity_keys()?)
    }

    // -- Profiles --

    /// Publish this device's public key under `username`.
    pub async fn register_profile(&self, username: &str) -> Result<Profile> {
        let username = username.trim();
        if username.is_empty() {
            return Err(ClientError::InvalidUsername);
        }

        if let Some(holder) = self.directory.profile_by_username(username).await? {
            if holder.id != self.user_id {
                return Err(ClientError::UsernameTaken(username.to_string()));
            }
        }

        let keys = self.identity()?;
        let profile = Profile {
            id: self.user_id.clone(),
            username: username.to_string(),
            public_key: keys.public_key_b64(),
        };
        self.directory.register(&profile).await?;

        info!(user = %self.user_id, username, "Registered profile");
        Ok(profile)
    }

    async fn own_profile(&self) -> Result<Profile> {
        self.directory
            .profile_by_id(&self.user_id)
            .await?
            .ok_or_else(|| ClientError::ProfileMissing(self.user_id.to_string()))
    }

    // -- Conversations --

    /// Resolve `peer_username`, join the conversation room and record the
    /// peer as a contact.
    pub async fn open_conversation(&self, peer_username: &str) -> Result<Conversation> {
        let peer = self
            .directory
            .profile_by_username(peer_username.trim())
            .await?
            .ok_or_else(|| ClientError::RecipientNotFound(peer_username.to_string()))?;

        if peer.id == self.user_id {
            return Err(ClientError::SelfConversation);
        }

        let peer_key = parse_public_key(&peer.public_key)?;
        let id = conversation_key_for(self.user_id.as_str(), peer.id.as_str());
        let events = self.relay.join(id.as_str()).await?;

        self.store
            .upsert_contact(&self.user_id, &peer.id, Utc::now())
            .await?;

        debug!(conversation = %id, peer = %peer.id, "Opened conversation");
        Ok(Conversation {
            id,
            peer,
            peer_key,
            events,
        })
    }

    pub async fn set_typing(&self, conversation: &Conversation, state: bool) -> Result<()> {
        self.relay
            .publish(ClientEvent::Typing {
                room: conversation.id.to_string(),
                state,
            })
            .await
    }

    // -- Sending --

    pub async fn send_text(&self, conversation: &Conversation, text: &str) -> Result<TextMessageRow> {
        if text.trim().is_empty() {
            return Err(ClientError::EmptyMessage);
        }

        let me = self.own_profile().await?;
        let keys = self.identity()?;
        self.warn_if_stale_key(&me, &keys);

        let sealed = encrypt_dual(text, conversation.peer_public_key(), &keys)?;
        let row = TextMessageRow::new(
            conversation.id.clone(),
            self.user_id.clone(),
            conversation.peer.id.clone(),
            keys.public_key_b64(),
            sealed,
        );

        self.store
            .insert_text(&row)
            .await
            .map_err(|e| ClientError::PersistFailed(e.to_string()))?;

        debug!(conversation = %row.conversation_id, message = %row.id, "Stored text message");

        self.after_send(
            ClientEvent::MessageSend {
                room: row.conversation_id.to_string(),
                row: row.clone(),
            },
            &conversation.peer.id,
        )
        .await;

        Ok(row)
    }

    /// Encrypt and upload an attachment, then persist its metadata row.
    ///
    /// The blob upload completes before the row is inserted; a failed upload
    /// leaves no row behind.
    pub async fn send_file(
        &self,
        conversation: &Conversation,
        file_name: &str,
        mime_type: Option<&str>,
        bytes: &[u8],
    ) -> Result<FileMessageRow> {
        if bytes.len() > self.max_file_size {
            return Err(ClientError::FileTooLarge {
                size: bytes.len(),
                max: self.max_file_size,
            });
        }

        let me = self.own_profile().await?;
        let keys = self.identity()?;
        self.warn_if_stale_key(&me, &keys);

        let encrypted = encrypt_file_for_upload(bytes)?;
        let wrapped_key =
            wrap_content_key(&encrypted.content_key, conversation.peer_public_key(), &keys)?;
        let iv = encrypted.iv_b64();
        let cipher_blob = encrypted.cipher_blob;
        drop(encrypted.content_key);

        let locator = storage_locator(&conversation.id, file_name);
        self.blobs
            .upload(&locator, &cipher_blob)
            .await
            .map_err(|e| ClientError::UploadFailed(e.to_string()))?;

        debug!(locator = %locator, size = cipher_blob.len(), "Uploaded encrypted blob");

        let mime_type = mime_type
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .unwrap_or(DEFAULT_MIME_TYPE);

        let row = FileMessageRow::new(
            conversation.id.clone(),
            self.user_id.clone(),
            conversation.peer.id.clone(),
            keys.public_key_b64(),
            FileDescriptor {
                storage_locator: locator,
                file_name: file_name.to_string(),
                mime_type: mime_type.to_string(),
                size_bytes: bytes.len() as u64,
                iv,
                wrapped_key,
            },
        );

        self.store
            .insert_file(&row)
            .await
            .map_err(|e| ClientError::PersistFailed(e.to_string()))?;

        info!(conversation = %row.conversation_id, message = %row.id, "Sent file");

        self.after_send(
            ClientEvent::FileSend {
                room: row.conversation_id.to_string(),
                row: row.clone(),
            },
            &conversation.peer.id,
        )
        .await;

        Ok(row)
    }

    /// Relay fan-out and contact bookkeeping. The row is already stored, so
    /// failures here are logged and not returned.
    async fn after_send(&self, event: ClientEvent, peer: &UserId) {
        if let Err(e) = self.relay.publish(event).await {
            warn!(error = %e, "Relay publish failed");
        }

        let now = Utc::now();
        for (owner, other) in [(&self.user_id, peer), (peer, &self.user_id)] {
            if let Err(e) = self.store.upsert_contact(owner, other, now).await {
                warn!(owner = %owner, error = %e, "Contact update failed");
            }
        }
    }

    fn warn_if_stale_key(&self, me: &Profile, keys: &IdentityKeys) {
        if me.public_key != keys.public_key_b64() {
            warn!(
                user = %self.user_id,
                "Published public key differs from device key; re-register the profile"
            );
        }
    }

    // -- Reading --

    /// Every row of the conversation, oldest first, each decrypted where
    /// possible. A row that cannot be opened shows as [`Readable::Unavailable`]
    /// without affecting the rest; a key store failure fails the whole load.
    pub async fn load_history(&self, conversation_id: &ConversationId) -> Result<Vec<HistoryItem>> {
        let keys = self.identity()?;
        let (texts, files) = futures::try_join!(
            self.store.text_messages(conversation_id),
            self.store.file_messages(conversation_id),
        )?;

        let mut messages: Vec<Message> = texts
            .into_iter()
            .map(Message::Text)
            .chain(files.into_iter().map(Message::File))
            .collect();
        messages.sort_by_key(|m| m.created_at());

        messages
            .into_iter()
            .map(|message| {
                Ok(HistoryItem {
                    readable: self.readable_with(&keys, &message)?,
                    message,
                })
            })
            .collect()
    }

    pub fn readable(&self, message: &Message) -> Result<Readable> {
        let keys = self.identity()?;
        self.readable_with(&keys, message)
    }

    fn readable_with(&self, keys: &IdentityKeys, message: &Message) -> Result<Readable> {
        match message {
            Message::Text(row) => match self.open_text(keys, row) {
                Ok(text) => Ok(Readable::Text { text }),
                Err(e @ (ClientError::Crypto(_) | ClientError::NotParticipant)) => {
                    debug!(message = %row.id, error = %e, "Message not readable on this device");
                    Ok(Readable::Unavailable)
                }
                Err(e) => Err(e),
            },
            Message::File(row) => Ok(Readable::Attachment {
                file_name: row.file_name.clone(),
                mime_type: row.mime_type.clone(),
                size_bytes: row.size_bytes,
            }),
        }
    }

    /// Open the copy of a text row addressed to this user.
    pub fn decrypt_message(&self, row: &TextMessageRow) -> Result<String> {
        let keys = self.identity()?;
        self.open_text(&keys, row)
    }

    fn open_text(&self, keys: &IdentityKeys, row: &TextMessageRow) -> Result<String> {
        let role = self.role_in(&row.sender_id, &row.recipient_id)?;
        let sender_key =
            parse_public_key(&row.sender_public_key).map_err(|_| CryptoError::DecryptionFailed)?;

        Ok(decrypt_wire(&row.slot(role), &sender_key, keys.secret())?)
    }

    pub async fn download_file(&self, row: &FileMessageRow) -> Result<DecryptedFile> {
        let role = self.role_in(&row.sender_id, &row.recipient_id)?;
        let keys = self.identity()?;

        let content_key = parse_public_key(&row.sender_public_key)
            .and_then(|sender_key| {
                unwrap_content_key(&row.wrapped_key(role), &sender_key, keys.secret())
            })
            .map_err(|_| ClientError::FileKeyUnavailable)?;

        let cipher_blob = self
            .blobs
            .download(&row.storage_locator)
            .await
            .map_err(|e| ClientError::DownloadFailed(e.to_string()))?;
        let iv = from_base64(&row.iv)?;

        let file = decrypt_file_from_bytes(&cipher_blob, &iv, &content_key, Some(&row.mime_type))?;
        debug!(message = %row.id, size = file.bytes.len(), "Decrypted attachment");
        Ok(file)
    }

    pub async fn download_file_by_id(&self, id: Uuid) -> Result<(FileMessageRow, DecryptedFile)> {
        let row = self
            .store
            .file_message(id)
            .await?
            .ok_or_else(|| ClientError::MessageNotFound(id.to_string()))?;
        let file = self.download_file(&row).await?;
        Ok((row, file))
    }

    pub async fn contacts(&self) -> Result<Vec<Contact>> {
        self.store.contacts(&self.user_id).await
    }

    fn role_in(&self, sender: &UserId, recipient: &UserId) -> Result<ReaderRole> {
        ReaderRole::of(&self.user_id, sender, recipient).ok_or(ClientError::NotParticipant)
    }
}
