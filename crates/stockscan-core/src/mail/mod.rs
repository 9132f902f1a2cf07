pub mod graph;

use std::cell::RefCell;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::StockscanError;
use crate::model::Message;

/// Source of messages carrying spreadsheet attachments.
pub trait MessageSource {
    fn fetch_messages(&self) -> Result<Vec<Message>, StockscanError>;
}

/// Issues a fresh access token after the current one expired.
pub trait TokenProvider {
    fn refresh(&self) -> Result<String, StockscanError>;
}

/// Run `op` with the current access token; on [`StockscanError::AuthExpired`]
/// refresh the token exactly once and retry. A second expiry propagates.
pub fn with_auth_retry<T>(
    token: &RefCell<String>,
    provider: Option<&dyn TokenProvider>,
    mut op: impl FnMut(&str) -> Result<T, StockscanError>,
) -> Result<T, StockscanError> {
    let current = token.borrow().clone();
    match op(&current) {
        Err(StockscanError::AuthExpired) => {
            let Some(provider) = provider else {
                return Err(StockscanError::AuthExpired);
            };
            debug!("access token expired, refreshing");
            let fresh = provider.refresh()?;
            *token.borrow_mut() = fresh.clone();
            op(&fresh)
        }
        other => other,
    }
}

/// Directory holding the saved copy of message `number` (1-based).
pub fn message_dir(run_dir: &Path, number: usize) -> PathBuf {
    run_dir.join("Messages").join(format!("Message {number}"))
}

/// Path an attachment of message `number` is saved to. Directory parts of
/// the attachment name are dropped.
pub fn attachment_path(run_dir: &Path, number: usize, attachment: &str) -> PathBuf {
    let dir = message_dir(run_dir, number).join("Attachments");
    match Path::new(attachment).file_name() {
        Some(name) => dir.join(name),
        None => dir.join("attachment"),
    }
}

/// Persist each message body and its Excel attachments under the run
/// directory, numbering messages from 1 in the given order.
pub fn save_messages(run_dir: &Path, messages: &[Message]) -> Result<(), StockscanError> {
    for (index, message) in messages.iter().enumerate() {
        let number = index + 1;
        let dir = message_dir(run_dir, number);
        fs::create_dir_all(&dir)?;

        let body_file = if message.body.content_type.eq_ignore_ascii_case("html") {
            "message.html"
        } else {
            "message.txt"
        };
        fs::write(dir.join(body_file), &message.body.content)?;

        for attachment in message.attachments.iter().filter(|a| a.is_excel()) {
            let path = attachment_path(run_dir, number, &attachment.name);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(&path, &attachment.content)?;
        }
    }
    info!(count = messages.len(), "saved messages");
    Ok(())
}
