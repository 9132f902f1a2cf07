use std::cell::RefCell;

use base64::Engine;
use chrono::{DateTime, Duration, Utc};
use serde_json::Value;
use tracing::{debug, info};

use crate::error::StockscanError;
use crate::mail::{with_auth_retry, MessageSource, TokenProvider};
use crate::model::{Attachment, Message, MessageBody, Sender};

pub const GRAPH_BASE_URL: &str = "https://graph.microsoft.com/v1.0";
pub const TOKEN_URL: &str = "https://login.microsoftonline.com/common/oauth2/v2.0/token";
const FILE_ATTACHMENT: &str = "#microsoft.graph.fileAttachment";
const PREFER_TEXT_BODY: &str = "outlook.body-content-type='text'";

/// Inbox reader backed by the Microsoft Graph mail API.
pub struct GraphMessageSource {
    client: reqwest::blocking::Client,
    base_url: String,
    token: RefCell<String>,
    refresher: Option<Box<dyn TokenProvider>>,
    days: i64,
}

impl GraphMessageSource {
    pub fn new(
        access_token: &str,
        refresher: Option<Box<dyn TokenProvider>>,
        days: i64,
    ) -> Result<Self, StockscanError> {
        Ok(Self {
            client: reqwest::blocking::Client::builder().build()?,
            base_url: GRAPH_BASE_URL.to_string(),
            token: RefCell::new(access_token.to_string()),
            refresher,
            days,
        })
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    fn list_url(&self, since: DateTime<Utc>) -> String {
        format!(
            "{}/me/mailFolders/inbox/messages?$filter=receivedDateTime ge {}\
             &$select=id,bodyPreview,body,hasAttachments,sender,from,toRecipients,receivedDateTime&$top=100",
            self.base_url,
            since.format("%Y-%m-%dT%H:%M:%SZ")
        )
    }

    fn get_json(&self, url: &str, prefer_text: bool) -> Result<Value, StockscanError> {
        with_auth_retry(&self.token, self.refresher.as_deref(), |token| {
            let mut request = self.client.get(url).bearer_auth(token);
            if prefer_text {
                request = request.header("Prefer", PREFER_TEXT_BODY);
            }
            let body: Value = request.send()?.json()?;
            check_error(&body)?;
            Ok(body)
        })
    }

    fn fetch_attachments(&self, message_id: &str) -> Result<Vec<Attachment>, StockscanError> {
        let url = format!("{}/me/messages/{message_id}/attachments", self.base_url);
        let body = self.get_json(&url, false)?;
        parse_attachments(&body)
    }
}

impl MessageSource for GraphMessageSource {
    fn fetch_messages(&self) -> Result<Vec<Message>, StockscanError> {
        let since = Utc::now() - Duration::days(self.days);
        info!(since = %since.format("%d/%m/%Y %H:%M:%S"), "downloading messages");

        let mut messages = Vec::new();
        let mut next = Some(self.list_url(since));
        while let Some(url) = next {
            let page = self.get_json(&url, true)?;
            messages.extend(parse_messages(&page)?);
            next = page["@odata.nextLink"].as_str().map(str::to_string);
        }
        info!(count = messages.len(), "downloaded messages");

        for message in messages.iter_mut().filter(|m| m.has_attachments) {
            message.attachments = self.fetch_attachments(&message.id)?;
        }

        messages.retain(Message::has_excel_files);
        info!(count = messages.len(), "messages with Excel attachments");
        Ok(messages)
    }
}

/// Graph reports failures as `{"error": {"code": ..., "message": ...}}`.
fn check_error(body: &Value) -> Result<(), StockscanError> {
    let Some(error) = body.get("error") else {
        return Ok(());
    };
    match error["code"].as_str() {
        Some("InvalidAuthenticationToken") => Err(StockscanError::AuthExpired),
        code => Err(StockscanError::Mail(format!(
            "{}: {}",
            code.unwrap_or("unknown"),
            error["message"].as_str().unwrap_or_default()
        ))),
    }
}

fn parse_messages(page: &Value) -> Result<Vec<Message>, StockscanError> {
    let values = page["value"]
        .as_array()
        .ok_or_else(|| StockscanError::Mail("message list has no 'value' array".into()))?;
    Ok(values.iter().filter_map(parse_message).collect())
}

fn parse_message(v: &Value) -> Option<Message> {
    let id = v["id"].as_str()?.to_string();
    let email = &v["sender"]["emailAddress"];
    let received = v["receivedDateTime"].as_str().unwrap_or_default();

    Some(Message {
        id,
        sender: Sender {
            name: email["name"].as_str().unwrap_or_default().to_string(),
            address: email["address"].as_str().unwrap_or_default().to_string(),
        },
        received_at: received_at(received),
        body: MessageBody {
            content: v["body"]["content"].as_str().unwrap_or_default().to_string(),
            content_type: v["body"]["contentType"].as_str().unwrap_or("text").to_string(),
        },
        has_attachments: v["hasAttachments"].as_bool().unwrap_or(false),
        attachments: Vec::new(),
    })
}

/// `2024-05-01T10:15:00Z` becomes `2024-05-01 10:15:00`.
fn received_at(raw: &str) -> String {
    match raw.split_once('T') {
        Some((date, time)) => format!("{date} {}", time.trim_end_matches(['Z', 'z'])),
        None => raw.to_string(),
    }
}

fn parse_attachments(body: &Value) -> Result<Vec<Attachment>, StockscanError> {
    let values = body["value"]
        .as_array()
        .ok_or_else(|| StockscanError::Mail("attachment list has no 'value' array".into()))?;

    let mut attachments = Vec::new();
    for v in values {
        if v["@odata.type"].as_str() != Some(FILE_ATTACHMENT) {
            continue;
        }
        let name = v["name"].as_str().unwrap_or_default().to_string();
        let content = base64::engine::general_purpose::STANDARD
            .decode(v["contentBytes"].as_str().unwrap_or_default())
            .map_err(|e| StockscanError::Mail(format!("attachment {name}: {e}")))?;
        attachments.push(Attachment { name, content });
    }
    debug!(count = attachments.len(), "parsed file attachments");
    Ok(attachments)
}

/// Refresh-token grant against the Microsoft identity platform.
pub struct RefreshTokenProvider {
    client: reqwest::blocking::Client,
    token_url: String,
    client_id: String,
    refresh_token: RefCell<String>,
}

impl RefreshTokenProvider {
    pub fn new(client_id: &str, refresh_token: &str) -> Result<Self, StockscanError> {
        Ok(Self {
            client: reqwest::blocking::Client::builder().build()?,
            token_url: TOKEN_URL.to_string(),
            client_id: client_id.to_string(),
            refresh_token: RefCell::new(refresh_token.to_string()),
        })
    }
}

impl TokenProvider for RefreshTokenProvider {
    fn refresh(&self) -> Result<String, StockscanError> {
        let refresh_token = self.refresh_token.borrow().clone();
        let form = [
            ("client_id", self.client_id.as_str()),
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token.as_str()),
            ("scope", "Mail.Read offline_access"),
        ];
        let body: Value = self.client.post(&self.token_url).form(&form).send()?.json()?;

        let access = body["access_token"].as_str().ok_or_else(|| {
            StockscanError::Mail(format!(
                "token refresh failed: {}",
                body["error_description"].as_str().unwrap_or("no access token")
            ))
        })?;
        if let Some(rotated) = body["refresh_token"].as_str() {
            *self.refresh_token.borrow_mut() = rotated.to_string();
        }
        Ok(access.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_messages_page() {
        let page = json!({
            "value": [
                {
                    "id": "AAMk1",
                    "bodyPreview": "Please find",
                    "body": { "contentType": "text", "content": "Please find attached" },
                    "hasAttachments": true,
                    "sender": { "emailAddress": { "name": "Ann", "address": "ann@example.com" } },
                    "from": { "emailAddress": { "name": "Ann", "address": "ann@example.com" } },
                    "toRecipients": [],
                    "receivedDateTime": "2024-05-01T10:15:00Z"
                },
                { "bodyPreview": "no id, skipped" }
            ],
            "@odata.nextLink": "https://graph.microsoft.com/v1.0/next"
        });
        let messages = parse_messages(&page).unwrap();
        assert_eq!(messages.len(), 1);
        let m = &messages[0];
        assert_eq!(m.sender.to_string(), "Ann - ann@example.com");
        assert_eq!(m.received_at, "2024-05-01 10:15:00");
        assert_eq!(m.body.content_type, "text");
        assert!(m.has_attachments);
    }

    #[test]
    fn test_parse_attachments_keeps_file_attachments() {
        let body = json!({
            "value": [
                { "@odata.type": "#microsoft.graph.fileAttachment", "name": "stock.xlsx", "contentBytes": "UEsDBA==" },
                { "@odata.type": "#microsoft.graph.itemAttachment", "name": "fwd" }
            ]
        });
        let attachments = parse_attachments(&body).unwrap();
        assert_eq!(attachments.len(), 1);
        assert_eq!(attachments[0].name, "stock.xlsx");
        assert_eq!(attachments[0].content, b"PK\x03\x04");
    }

    #[test]
    fn test_check_error_maps_expired_token() {
        let expired = json!({ "error": { "code": "InvalidAuthenticationToken", "message": "expired" } });
        assert!(matches!(check_error(&expired), Err(StockscanError::AuthExpired)));

        let other = json!({ "error": { "code": "ErrorAccessDenied", "message": "no" } });
        assert!(matches!(check_error(&other), Err(StockscanError::Mail(_))));

        assert!(check_error(&json!({ "value": [] })).is_ok());
    }

    #[test]
    fn test_list_url_filters_and_pages() {
        let source = GraphMessageSource::new("t", None, 7)
            .unwrap()
            .with_base_url("https://graph.example.com/v1.0/");
        let since = DateTime::parse_from_rfc3339("2024-05-01T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let url = source.list_url(since);
        assert!(url.starts_with("https://graph.example.com/v1.0/me/mailFolders/inbox/messages?"));
        assert!(url.contains("$filter=receivedDateTime ge 2024-05-01T00:00:00Z&$select=id,"));
        assert!(url.ends_with("&$top=100"));
    }
}
