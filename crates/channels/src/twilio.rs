//! Twilio REST client implementing [`MessagingService`].
//!
//! Individual texts go through the Messaging API. Group texts go to a
//! Conversations thread: an active thread whose SMS participants match the
//! recipients exactly is reused, otherwise a new one is created with every
//! recipient plus a projected chat participant for our own number.

use async_trait::async_trait;
use std::collections::BTreeSet;
use serde::Deserialize;
use textpilot_core::channel::{Delivery, DeliveryKind, MessagingService, SmsRecord};
use textpilot_core::error::MessagingError;
use tracing::{debug, info, warn};

/// Identity of our own participant in group conversations.
const ASSISTANT_IDENTITY: &str = "textpilot_assistant";

/// How many recent conversations are checked for a reusable group thread.
const CONVERSATION_SCAN_LIMIT: usize = 50;

/// Twilio credentials and endpoints.
#[derive(Clone)]
pub struct TwilioConfig {
    pub account_sid: String,
    pub auth_token: String,
    pub from_number: String,
    pub api_url: String,
    pub conversations_api_url: String,
}

impl std::fmt::Debug for TwilioConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TwilioConfig")
            .field("account_sid", &self.account_sid)
            .field("auth_token", &"[REDACTED]")
            .field("from_number", &self.from_number)
            .field("api_url", &self.api_url)
            .field("conversations_api_url", &self.conversations_api_url)
            .finish()
    }
}

pub struct TwilioClient {
    config: TwilioConfig,
    client: reqwest::Client,
}

impl TwilioClient {
    pub fn new(config: TwilioConfig) -> Result<Self, MessagingError> {
        if config.account_sid.is_empty() || config.auth_token.is_empty() {
            return Err(MessagingError::NotConfigured(
                "TWILIO_ACCOUNT_SID and TWILIO_AUTH_TOKEN are required".into(),
            ));
        }
        if config.from_number.is_empty() {
            return Err(MessagingError::NotConfigured("TWILIO_PHONE_NUMBER is required".into()));
        }
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(|e| MessagingError::Network(e.to_string()))?;
        Ok(Self { config, client })
    }

    fn messages_url(&self) -> String {
        format!(
            "{}/2010-04-01/Accounts/{}/Messages.json",
            self.config.api_url.trim_end_matches('/'),
            self.config.account_sid
        )
    }

    fn conversations_url(&self, path: &str) -> String {
        format!(
            "{}/v1/Conversations{path}",
            self.config.conversations_api_url.trim_end_matches('/')
        )
    }

    async fn post_form<T: for<'de> Deserialize<'de>>(
        &self,
        url: &str,
        form: &[(&str, &str)],
    ) -> Result<T, MessagingError> {
        let response = self
            .client
            .post(url)
            .basic_auth(&self.config.account_sid, Some(&self.config.auth_token))
            .form(form)
            .send()
            .await
            .map_err(|e| MessagingError::Network(e.to_string()))?;
        decode(response).await
    }

    async fn get_json<T: for<'de> Deserialize<'de>>(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<T, MessagingError> {
        let response = self
            .client
            .get(url)
            .basic_auth(&self.config.account_sid, Some(&self.config.auth_token))
            .query(query)
            .send()
            .await
            .map_err(|e| MessagingError::Network(e.to_string()))?;
        decode(response).await
    }

    /// An active conversation whose SMS participants are exactly `to`.
    async fn find_group_conversation(&self, to: &[String]) -> Result<Option<GroupThread>, MessagingError> {
        let page: ConversationPage = self
            .get_json(&self.conversations_url(""), &[("PageSize", CONVERSATION_SCAN_LIMIT.to_string())])
            .await?;
        let target: BTreeSet<&str> = to.iter().map(String::as_str).collect();

        for conversation in page.conversations.iter().filter(|c| c.is_active()) {
            let participants: ParticipantPage = match self
                .get_json(&self.conversations_url(&format!("/{}/Participants", conversation.sid)), &[])
                .await
            {
                Ok(page) => page,
                Err(e) => {
                    warn!(conversation = %conversation.sid, error = %e, "Skipping conversation");
                    continue;
                }
            };
            if let Some(has_assistant) = match_participants(&target, &participants.participants) {
                debug!(conversation = %conversation.sid, "Found matching group conversation");
                return Ok(Some(GroupThread {
                    sid: conversation.sid.clone(),
                    has_assistant,
                }));
            }
        }
        Ok(None)
    }

    async fn post_to_existing(&self, thread: &GroupThread, body: &str) -> Result<String, MessagingError> {
        if !thread.has_assistant {
            self.add_assistant(&thread.sid).await?;
        }
        self.post_group_message(&thread.sid, body).await
    }

    async fn create_group_conversation(&self, to: &[String]) -> Result<String, MessagingError> {
        let friendly_name = format!("Group conversation {} participants", to.len());
        let conversation: ApiResource = self
            .post_form(&self.conversations_url(""), &[("FriendlyName", friendly_name.as_str())])
            .await?;
        debug!(conversation = %conversation.sid, "Created group conversation");

        let participants_url = self.conversations_url(&format!("/{}/Participants", conversation.sid));
        for number in to {
            let _: ApiResource = self
                .post_form(&participants_url, &[("MessagingBinding.Address", number.as_str())])
                .await?;
        }
        self.add_assistant(&conversation.sid).await?;
        Ok(conversation.sid)
    }

    async fn add_assistant(&self, conversation_sid: &str) -> Result<(), MessagingError> {
        let _: ApiResource = self
            .post_form(
                &self.conversations_url(&format!("/{conversation_sid}/Participants")),
                &[
                    ("Identity", ASSISTANT_IDENTITY),
                    ("MessagingBinding.ProjectedAddress", self.config.from_number.as_str()),
                ],
            )
            .await?;
        Ok(())
    }

    async fn post_group_message(&self, conversation_sid: &str, body: &str) -> Result<String, MessagingError> {
        let message: ApiResource = self
            .post_form(
                &self.conversations_url(&format!("/{conversation_sid}/Messages")),
                &[("Author", ASSISTANT_IDENTITY), ("Body", body)],
            )
            .await?;
        Ok(message.sid)
    }

    fn group_delivery(
        &self,
        to: &[String],
        body: &str,
        conversation_sid: String,
        message_sid: String,
        reused_existing: bool,
    ) -> Delivery {
        Delivery {
            kind: DeliveryKind::Group,
            message_sid,
            conversation_sid: Some(conversation_sid),
            reused_existing,
            to: to.to_vec(),
            from: self.config.from_number.clone(),
            body: body.to_string(),
            status: None,
        }
    }

    async fn list_messages(&self, from: &str, to: &str, limit: usize) -> Result<Vec<SmsRecord>, MessagingError> {
        let page: MessagePage = self
            .get_json(
                &self.messages_url(),
                &[
                    ("From", from.to_string()),
                    ("To", to.to_string()),
                    ("PageSize", limit.to_string()),
                ],
            )
            .await?;
        Ok(page.messages.into_iter().map(ApiMessage::into_record).collect())
    }
}

async fn decode<T: for<'de> Deserialize<'de>>(response: reqwest::Response) -> Result<T, MessagingError> {
    let status = response.status().as_u16();
    if !(200..300).contains(&status) {
        let body = response.text().await.unwrap_or_default();
        warn!(status, "Twilio API returned error");
        return Err(MessagingError::Api {
            status_code: status,
            message: api_error_message(&body),
        });
    }
    response.json().await.map_err(|e| MessagingError::Api {
        status_code: status,
        message: format!("Failed to parse response: {e}"),
    })
}

/// Pull `message` out of a Twilio error body, falling back to the raw text.
fn api_error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(String::from))
        .unwrap_or_else(|| body.to_string())
}

/// Conversation ids look like `CH` followed by 32 hex characters.
pub fn is_conversation_sid(identifier: &str) -> bool {
    identifier.starts_with("CH") && identifier.len() == 34
}

/// `Some(has_assistant)` when the SMS addresses among `participants` are
/// exactly `target`. Chat participants (no address) are not compared.
fn match_participants(target: &BTreeSet<&str>, participants: &[ApiParticipant]) -> Option<bool> {
    let addresses: BTreeSet<&str> = participants.iter().filter_map(ApiParticipant::address).collect();
    if addresses != *target {
        return None;
    }
    Some(participants.iter().any(|p| p.identity.as_deref() == Some(ASSISTANT_IDENTITY)))
}

/// Merge both directions of a thread, newest first, capped at `limit`.
fn merge_newest_first(mut records: Vec<SmsRecord>, limit: usize) -> Vec<SmsRecord> {
    records.sort_by(|a, b| b.date_sent.cmp(&a.date_sent));
    records.dedup_by(|a, b| a.sid == b.sid);
    records.truncate(limit);
    records
}

/// Twilio renders dates as RFC 2822; normalise to RFC 3339 so they sort.
fn normalise_date(raw: Option<String>) -> Option<String> {
    let raw = raw?;
    Some(
        chrono::DateTime::parse_from_rfc2822(&raw)
            .map(|d| d.with_timezone(&chrono::Utc).to_rfc3339())
            .unwrap_or(raw),
    )
}

#[async_trait]
impl MessagingService for TwilioClient {
    fn name(&self) -> &str {
        "twilio"
    }

    fn from_number(&self) -> &str {
        &self.config.from_number
    }

    async fn send_sms(&self, to: &str, body: &str) -> Result<Delivery, MessagingError> {
        let sent: ApiMessage = self
            .post_form(
                &self.messages_url(),
                &[("To", to), ("From", self.config.from_number.as_str()), ("Body", body)],
            )
            .await?;
        info!(to = %to, sid = %sent.sid, "SMS sent");
        Ok(Delivery {
            kind: DeliveryKind::Individual,
            message_sid: sent.sid,
            conversation_sid: None,
            reused_existing: false,
            to: vec![to.to_string()],
            from: self.config.from_number.clone(),
            body: body.to_string(),
            status: sent.status,
        })
    }

    async fn send_group(&self, to: &[String], body: &str) -> Result<Delivery, MessagingError> {
        let existing = match self.find_group_conversation(to).await {
            Ok(found) => found,
            Err(e) => {
                warn!(error = %e, "Could not search existing group conversations");
                None
            }
        };

        if let Some(existing) = existing {
            match self.post_to_existing(&existing, body).await {
                Ok(message_sid) => {
                    info!(conversation = %existing.sid, recipients = to.len(), "Group message sent to existing thread");
                    return Ok(self.group_delivery(to, body, existing.sid, message_sid, true));
                }
                Err(e) => {
                    warn!(conversation = %existing.sid, error = %e, "Reusing group conversation failed, creating a new one");
                }
            }
        }

        let conversation_sid = self.create_group_conversation(to).await?;
        let message_sid = self.post_group_message(&conversation_sid, body).await?;
        info!(conversation = %conversation_sid, recipients = to.len(), "Group message sent");
        Ok(self.group_delivery(to, body, conversation_sid, message_sid, false))
    }

    async fn history(&self, identifier: &str, limit: usize) -> Result<Vec<SmsRecord>, MessagingError> {
        if is_conversation_sid(identifier) {
            let page: ConversationMessagePage = self
                .get_json(
                    &self.conversations_url(&format!("/{identifier}/Messages")),
                    &[("Order", "desc".into()), ("PageSize", limit.to_string())],
                )
                .await?;
            let records = page
                .messages
                .into_iter()
                .map(|m| m.into_record(identifier))
                .collect();
            return Ok(merge_newest_first(records, limit));
        }

        let own = self.config.from_number.as_str();
        let mut records = self.list_messages(identifier, own, limit).await?;
        records.extend(self.list_messages(own, identifier, limit).await?);
        Ok(merge_newest_first(records, limit))
    }
}

// --- Twilio API types (internal) ---

#[derive(Debug, Deserialize)]
struct ApiResource {
    sid: String,
}

#[derive(Debug, Deserialize)]
struct ApiMessage {
    sid: String,
    #[serde(default)]
    from: Option<String>,
    #[serde(default)]
    to: Option<String>,
    #[serde(default)]
    body: Option<String>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    direction: Option<String>,
    #[serde(default)]
    date_sent: Option<String>,
    #[serde(default)]
    date_created: Option<String>,
}

impl ApiMessage {
    fn into_record(self) -> SmsRecord {
        let direction = match self.direction.as_deref() {
            Some(d) if d.starts_with("inbound") => "inbound",
            _ => "outbound",
        };
        SmsRecord {
            sid: self.sid,
            from: self.from.unwrap_or_default(),
            to: self.to.unwrap_or_default(),
            body: self.body.unwrap_or_default(),
            direction: direction.into(),
            date_sent: normalise_date(self.date_sent.or(self.date_created)),
        }
    }
}

/// A group thread found for reuse.
#[derive(Debug)]
struct GroupThread {
    sid: String,
    has_assistant: bool,
}

#[derive(Debug, Deserialize)]
struct ApiConversation {
    sid: String,
    #[serde(default)]
    state: Option<String>,
}

impl ApiConversation {
    fn is_active(&self) -> bool {
        self.state.as_deref().is_none_or(|s| s == "active")
    }
}

#[derive(Debug, Deserialize)]
struct ConversationPage {
    #[serde(default)]
    conversations: Vec<ApiConversation>,
}

#[derive(Debug, Deserialize)]
struct MessagingBinding {
    #[serde(default)]
    address: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiParticipant {
    #[serde(default)]
    identity: Option<String>,
    #[serde(default)]
    messaging_binding: Option<MessagingBinding>,
}

impl ApiParticipant {
    fn address(&self) -> Option<&str> {
        self.messaging_binding
            .as_ref()
            .and_then(|b| b.address.as_deref())
            .filter(|a| !a.is_empty())
    }
}

#[derive(Debug, Deserialize)]
struct ParticipantPage {
    #[serde(default)]
    participants: Vec<ApiParticipant>,
}

#[derive(Debug, Deserialize)]
struct MessagePage {
    #[serde(default)]
    messages: Vec<ApiMessage>,
}

#[derive(Debug, Deserialize)]
struct ConversationMessage {
    sid: String,
    #[serde(default)]
    author: Option<String>,
    #[serde(default)]
    body: Option<String>,
    #[serde(default)]
    date_created: Option<String>,
}

impl ConversationMessage {
    fn into_record(self, conversation_sid: &str) -> SmsRecord {
        let author = self.author.unwrap_or_default();
        let direction = if author == ASSISTANT_IDENTITY { "outbound" } else { "inbound" };
        SmsRecord {
            sid: self.sid,
            from: author,
            to: conversation_sid.to_string(),
            body: self.body.unwrap_or_default(),
            direction: direction.into(),
            date_sent: self.date_created,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ConversationMessagePage {
    #[serde(default)]
    messages: Vec<ConversationMessage>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> TwilioConfig {
        TwilioConfig {
            account_sid: "AC123".into(),
            auth_token: "token".into(),
            from_number: "+15550000000".into(),
            api_url: "https://api.twilio.com/".into(),
            conversations_api_url: "https://conversations.twilio.com".into(),
        }
    }

    #[test]
    fn missing_credentials_not_configured() {
        let mut c = config();
        c.auth_token.clear();
        assert!(matches!(TwilioClient::new(c), Err(MessagingError::NotConfigured(_))));
    }

    #[test]
    fn urls_are_built_from_config() {
        let client = TwilioClient::new(config()).unwrap();
        assert_eq!(
            client.messages_url(),
            "https://api.twilio.com/2010-04-01/Accounts/AC123/Messages.json"
        );
        assert_eq!(
            client.conversations_url("/CHabc/Messages"),
            "https://conversations.twilio.com/v1/Conversations/CHabc/Messages"
        );
    }

    #[test]
    fn conversation_sid_detection() {
        assert!(is_conversation_sid("CH0123456789abcdef0123456789abcdef"));
        assert!(!is_conversation_sid("+12035839125"));
        assert!(!is_conversation_sid("CH123"));
    }

    #[test]
    fn message_page_parses_and_normalises_dates() {
        let raw = r#"{"messages": [
            {"sid": "SM1", "from": "+12035839125", "to": "+15550000000", "body": "hey",
             "direction": "inbound", "date_sent": "Mon, 15 Jan 2024 19:30:00 +0000"},
            {"sid": "SM2", "from": "+15550000000", "to": "+12035839125", "body": "hi!",
             "direction": "outbound-api", "date_sent": "Mon, 15 Jan 2024 19:31:00 +0000"}
        ]}"#;
        let page: MessagePage = serde_json::from_str(raw).unwrap();
        let records: Vec<SmsRecord> = page.messages.into_iter().map(ApiMessage::into_record).collect();
        assert_eq!(records[0].direction, "inbound");
        assert_eq!(records[1].direction, "outbound");
        assert_eq!(records[0].date_sent.as_deref(), Some("2024-01-15T19:30:00+00:00"));

        let merged = merge_newest_first(records, 1);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].sid, "SM2");
    }

    #[test]
    fn error_body_message_extracted() {
        let body = r#"{"code": 21211, "message": "The 'To' number is not a valid phone number.", "status": 400}"#;
        assert_eq!(api_error_message(body), "The 'To' number is not a valid phone number.");
        assert_eq!(api_error_message("gateway down"), "gateway down");
    }

    fn participant(identity: Option<&str>, address: Option<&str>) -> ApiParticipant {
        ApiParticipant {
            identity: identity.map(String::from),
            messaging_binding: address.map(|a| MessagingBinding {
                address: Some(a.to_string()),
            }),
        }
    }

    #[test]
    fn participants_must_match_exactly() {
        let target: BTreeSet<&str> = ["+12035550101", "+12035550102"].into_iter().collect();
        let same = vec![
            participant(None, Some("+12035550102")),
            participant(None, Some("+12035550101")),
            participant(Some(ASSISTANT_IDENTITY), None),
        ];
        assert_eq!(match_participants(&target, &same), Some(true));

        let without_assistant = vec![
            participant(None, Some("+12035550101")),
            participant(None, Some("+12035550102")),
        ];
        assert_eq!(match_participants(&target, &without_assistant), Some(false));

        let superset = vec![
            participant(None, Some("+12035550101")),
            participant(None, Some("+12035550102")),
            participant(None, Some("+12035550103")),
        ];
        assert_eq!(match_participants(&target, &superset), None);
    }

    #[test]
    fn conversation_page_parses_bindings() {
        let raw = r#"{"participants": [
            {"sid": "MB1", "identity": null, "messaging_binding": {"type": "sms", "address": "+12035550101"}},
            {"sid": "MB2", "identity": "textpilot_assistant", "messaging_binding": {"type": "sms", "projected_address": "+15550000000"}}
        ]}"#;
        let page: ParticipantPage = serde_json::from_str(raw).unwrap();
        assert_eq!(page.participants[0].address(), Some("+12035550101"));
        assert_eq!(page.participants[1].address(), None);

        let conversations: ConversationPage =
            serde_json::from_str(r#"{"conversations": [{"sid": "CH1", "state": "closed"}, {"sid": "CH2"}]}"#).unwrap();
        assert!(!conversations.conversations[0].is_active());
        assert!(conversations.conversations[1].is_active());
    }

    mod group_threads {
        use super::*;
        use axum::extract::{Path, State};
        use axum::routing::get;
        use axum::{Json, Router};
        use serde_json::{Value, json};
        use std::sync::{Arc, Mutex};

        type Calls = Arc<Mutex<Vec<String>>>;

        async fn list_conversations() -> Json<Value> {
            Json(json!({"conversations": [
                {"sid": "CHclosed", "state": "closed"},
                {"sid": "CHbroken", "state": "active"},
                {"sid": "CHgroup", "state": "active"}
            ]}))
        }

        async fn create_conversation(State(calls): State<Calls>) -> Json<Value> {
            calls.lock().unwrap().push("create".into());
            Json(json!({"sid": "CHnew"}))
        }

        async fn list_participants(Path(sid): Path<String>) -> axum::response::Response {
            use axum::response::IntoResponse;
            let pair = json!([
                {"sid": "MB1", "messaging_binding": {"address": "+12035550101"}},
                {"sid": "MB2", "messaging_binding": {"address": "+12035550102"}}
            ]);
            match sid.as_str() {
                "CHbroken" => (axum::http::StatusCode::INTERNAL_SERVER_ERROR, "boom").into_response(),
                "CHclosed" | "CHgroup" => Json(json!({"participants": pair})).into_response(),
                _ => Json(json!({"participants": []})).into_response(),
            }
        }

        async fn add_participant(State(calls): State<Calls>, Path(sid): Path<String>) -> Json<Value> {
            calls.lock().unwrap().push(format!("participant {sid}"));
            Json(json!({"sid": "MBx"}))
        }

        async fn post_message(State(calls): State<Calls>, Path(sid): Path<String>) -> Json<Value> {
            calls.lock().unwrap().push(format!("message {sid}"));
            Json(json!({"sid": "IM1"}))
        }

        /// Serve a fake Conversations API on a local port.
        async fn fake_conversations_api() -> (TwilioClient, Calls) {
            let calls = Calls::default();
            let app = Router::new()
                .route("/v1/Conversations", get(list_conversations).post(create_conversation))
                .route(
                    "/v1/Conversations/{sid}/Participants",
                    get(list_participants).post(add_participant),
                )
                .route("/v1/Conversations/{sid}/Messages", axum::routing::post(post_message))
                .with_state(calls.clone());
            let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
            let addr = listener.local_addr().unwrap();
            tokio::spawn(async move {
                axum::serve(listener, app).await.unwrap();
            });

            let client = TwilioClient::new(TwilioConfig {
                conversations_api_url: format!("http://{addr}"),
                ..config()
            })
            .unwrap();
            (client, calls)
        }

        #[tokio::test]
        async fn same_people_reuse_the_active_thread() {
            let (client, calls) = fake_conversations_api().await;
            let to = vec!["+12035550102".to_string(), "+12035550101".to_string()];

            let delivery = client.send_group(&to, "Run at 6").await.unwrap();
            assert!(delivery.reused_existing);
            assert_eq!(delivery.conversation_sid.as_deref(), Some("CHgroup"));
            assert_eq!(delivery.message_sid, "IM1");
            // The thread had no assistant participant yet, so one is added first.
            assert_eq!(
                *calls.lock().unwrap(),
                vec!["participant CHgroup".to_string(), "message CHgroup".to_string()]
            );
        }

        #[tokio::test]
        async fn different_people_get_a_new_thread() {
            let (client, calls) = fake_conversations_api().await;
            let to = vec!["+12035550101".to_string(), "+12035550109".to_string()];

            let delivery = client.send_group(&to, "Run at 6").await.unwrap();
            assert!(!delivery.reused_existing);
            assert_eq!(delivery.conversation_sid.as_deref(), Some("CHnew"));
            let calls = calls.lock().unwrap();
            assert_eq!(calls[0], "create");
            // Two recipients, then the assistant, then the message.
            assert_eq!(calls.iter().filter(|c| *c == "participant CHnew").count(), 3);
            assert_eq!(calls.last().map(String::as_str), Some("message CHnew"));
        }
    }

    #[test]
    fn debug_hides_auth_token() {
        let mut c = config();
        c.auth_token = "tw-secret-value".into();
        assert!(!format!("{c:?}").contains("tw-secret-value"));
    }
}
