use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum::{Display, EnumString};
use utoipa::ToSchema;
use validator::Validate;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, ToSchema,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditEventType {
    SignIn,
    SignOut,
    Create,
    Update,
    Delete,
    View,
    Error,
    Custom,
}

/// One entry of the audit trail, as written to the `logs` collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AuditEvent {
    #[serde(rename = "type")]
    pub event_type: AuditEventType,
    pub action: String,
    /// Identifier of the record the action touched
    #[serde(rename = "ref", default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    /// Screen or route the action came from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    pub session_id: String,
    pub date: DateTime<Utc>,
}

impl AuditEvent {
    pub fn new(event_type: AuditEventType, action: impl Into<String>) -> Self {
        Self {
            event_type,
            action: action.into(),
            reference: None,
            from: None,
            message: None,
            data: None,
            session_id: String::new(),
            date: Utc::now(),
        }
    }

    pub fn with_ref(mut self, reference: impl Into<String>) -> Self {
        self.reference = Some(reference.into());
        self
    }

    pub fn with_from(mut self, from: impl Into<String>) -> Self {
        self.from = Some(from.into());
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = session_id.into();
        self
    }
}

/// Event posted by a client to `POST /api/v1/audit`.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AuditEventInput {
    #[serde(rename = "type")]
    pub event_type: AuditEventType,
    #[validate(length(min = 1, max = 200))]
    pub action: String,
    #[serde(rename = "ref", default)]
    pub reference: Option<String>,
    #[serde(default)]
    pub from: Option<String>,
    #[serde(default)]
    #[validate(length(max = 2000))]
    pub message: Option<String>,
    #[serde(default)]
    pub data: Option<Value>,
}

impl AuditEventInput {
    pub fn into_event(self, session_id: String) -> AuditEvent {
        AuditEvent {
            event_type: self.event_type,
            action: self.action,
            reference: self.reference,
            from: self.from,
            message: self.message,
            data: self.data,
            session_id,
            date: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn event_type_uses_screaming_snake_case() {
        assert_eq!(
            serde_json::to_value(AuditEventType::SignIn).unwrap(),
            json!("SIGN_IN")
        );
        assert_eq!(AuditEventType::SignOut.to_string(), "SIGN_OUT");
    }

    #[test]
    fn event_serializes_ref_and_skips_empty_optionals() {
        let event = AuditEvent::new(AuditEventType::Delete, "delete partner")
            .with_ref("p-7")
            .with_session("s-1");
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "DELETE");
        assert_eq!(json["ref"], "p-7");
        assert_eq!(json["sessionId"], "s-1");
        assert!(json.get("message").is_none());
    }

    #[test]
    fn client_input_parses_custom_events() {
        let input: AuditEventInput = serde_json::from_value(json!({
            "type": "CUSTOM",
            "action": "export grid",
            "from": "/production"
        }))
        .unwrap();
        let event = input.into_event("s-9".into());
        assert_eq!(event.event_type, AuditEventType::Custom);
        assert_eq!(event.from.as_deref(), Some("/production"));
    }
}
