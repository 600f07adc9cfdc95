use std::fmt;

use serde::{Deserialize, Serialize};

/// What kind of entity a notification event refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NotificationType {
    Post,
    Comment,
    Interaction,
    FollowAccount,
}

impl NotificationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Post => "Post",
            Self::Comment => "Comment",
            Self::Interaction => "Interaction",
            Self::FollowAccount => "FollowAccount",
        }
    }
}

impl fmt::Display for NotificationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Queue message emitted after a successful write
///
/// Wire form: `{"type": "Interaction", "id": "01H..."}`. The id names the
/// entity the event is keyed by: the new post, comment or interaction, or
/// the followed account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationEvent {
    #[serde(rename = "type")]
    pub kind: NotificationType,
    pub id: String,
}

impl NotificationEvent {
    pub fn new(kind: NotificationType, id: impl Into<String>) -> Self {
        Self {
            kind,
            id: id.into(),
        }
    }

    pub fn post(id: impl Into<String>) -> Self {
        Self::new(NotificationType::Post, id)
    }

    pub fn comment(id: impl Into<String>) -> Self {
        Self::new(NotificationType::Comment, id)
    }

    pub fn interaction(id: impl Into<String>) -> Self {
        Self::new(NotificationType::Interaction, id)
    }

    pub fn follow_account(id: impl Into<String>) -> Self {
        Self::new(NotificationType::FollowAccount, id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_form_uses_type_and_id() {
        let event = NotificationEvent::follow_account("01ACCOUNT");
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json, serde_json::json!({"type": "FollowAccount", "id": "01ACCOUNT"}));

        let parsed: NotificationEvent =
            serde_json::from_str(r#"{"type":"Interaction","id":"i1"}"#).unwrap();
        assert_eq!(parsed, NotificationEvent::interaction("i1"));
    }

    #[test]
    fn unknown_type_is_rejected() {
        let parsed = serde_json::from_str::<NotificationEvent>(r#"{"type":"Mention","id":"x"}"#);
        assert!(parsed.is_err());
    }
}
