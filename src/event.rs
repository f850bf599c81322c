use std::collections::HashMap;

pub const OTP_REQUESTED: &str = "otp_requested";
pub const OTP_VERIFIED: &str = "otp_verified";
pub const OTP_EXPIRED: &str = "otp_expired";

/// A lifecycle notification. Never mutated once published.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub event_type: String,
    pub data: HashMap<String, String>,
}

impl Event {
    pub fn new(event_type: impl Into<String>, data: HashMap<String, String>) -> Self {
        Event {
            event_type: event_type.into(),
            data,
        }
    }

    pub fn otp_requested(user: &str, code: &str) -> Self {
        Event::new(
            OTP_REQUESTED,
            HashMap::from([
                ("user".to_string(), user.to_string()),
                ("code".to_string(), code.to_string()),
            ]),
        )
    }

    pub fn otp_verified(user: &str) -> Self {
        Event::new(
            OTP_VERIFIED,
            HashMap::from([("user".to_string(), user.to_string())]),
        )
    }

    pub fn otp_expired(user: &str) -> Self {
        Event::new(
            OTP_EXPIRED,
            HashMap::from([("user".to_string(), user.to_string())]),
        )
    }

    pub fn user(&self) -> Option<&str> {
        self.data.get("user").map(String::as_str)
    }
}
