use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

/// Lemon Squeezy webhook body. Only the fields the dispatcher reads are
/// modelled; everything else is ignored.
#[derive(Debug, Deserialize)]
pub struct WebhookPayload {
    pub meta: Meta,
    pub data: Data,
}

#[derive(Debug, Deserialize)]
pub struct Meta {
    pub event_name: String,
    #[serde(default)]
    pub test_mode: bool,
}

#[derive(Debug, Deserialize)]
pub struct Data {
    #[serde(default)]
    pub id: Option<String>,
    pub attributes: Attributes,
}

#[derive(Debug, Deserialize)]
pub struct Attributes {
    #[serde(default)]
    pub customer_email: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventName {
    OrderCreated,
    OrderRefunded,
    SubscriptionCreated,
    SubscriptionCancelled,
    SubscriptionResumed,
    SubscriptionExpired,
    SubscriptionPaused,
    SubscriptionUnpaused,
    SubscriptionPaymentFailed,
    SubscriptionPaymentSuccess,
    SubscriptionPaymentRecovered,
}

impl EventName {
    pub const ALL: [EventName; 11] = [
        EventName::OrderCreated,
        EventName::OrderRefunded,
        EventName::SubscriptionCreated,
        EventName::SubscriptionCancelled,
        EventName::SubscriptionResumed,
        EventName::SubscriptionExpired,
        EventName::SubscriptionPaused,
        EventName::SubscriptionUnpaused,
        EventName::SubscriptionPaymentFailed,
        EventName::SubscriptionPaymentSuccess,
        EventName::SubscriptionPaymentRecovered,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            EventName::OrderCreated => "order_created",
            EventName::OrderRefunded => "order_refunded",
            EventName::SubscriptionCreated => "subscription_created",
            EventName::SubscriptionCancelled => "subscription_cancelled",
            EventName::SubscriptionResumed => "subscription_resumed",
            EventName::SubscriptionExpired => "subscription_expired",
            EventName::SubscriptionPaused => "subscription_paused",
            EventName::SubscriptionUnpaused => "subscription_unpaused",
            EventName::SubscriptionPaymentFailed => "subscription_payment_failed",
            EventName::SubscriptionPaymentSuccess => "subscription_payment_success",
            EventName::SubscriptionPaymentRecovered => "subscription_payment_recovered",
        }
    }

    /// Events that, going by their name, should revoke access rather than
    /// grant it.
    pub fn looks_like_revocation(self) -> bool {
        matches!(
            self,
            EventName::OrderRefunded
                | EventName::SubscriptionCancelled
                | EventName::SubscriptionExpired
                | EventName::SubscriptionPaymentFailed
        )
    }
}

impl fmt::Display for EventName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EventName::ALL
            .into_iter()
            .find(|e| e.as_str() == s)
            .ok_or_else(|| s.to_string())
    }
}
