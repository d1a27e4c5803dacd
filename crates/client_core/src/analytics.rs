use serde_json::{json, Map, Value};
use shared::domain::{mask_phone, Intent, UserType};
use tracing::info;

/// Where on the landing page a waitlist call-to-action sits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CtaPlacement {
    Hero,
    Bottom,
}

impl CtaPlacement {
    fn location(self) -> &'static str {
        match self {
            Self::Hero => "hero_section",
            Self::Bottom => "bottom_section",
        }
    }

    fn cta_name(self) -> &'static str {
        match self {
            Self::Hero => "join_waitlist_top",
            Self::Bottom => "join_waitlist_bottom",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnalyticsEvent {
    CtaClick {
        placement: CtaPlacement,
    },
    IntentSelected {
        intent: Intent,
    },
    UserTypeSelected {
        user_type: UserType,
    },
    /// `phone` carries the country code.
    PhoneEntered {
        phone: String,
    },
    SignupComplete {
        intent: Intent,
        user_type: UserType,
        phone: String,
    },
}

impl AnalyticsEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::CtaClick { .. } => "cta_click",
            Self::IntentSelected { .. }
            | Self::UserTypeSelected { .. }
            | Self::PhoneEntered { .. } => "form_step",
            Self::SignupComplete { .. } => "waitlist_signup_complete",
        }
    }

    /// Flat parameter map sent along with the event name.
    pub fn params(&self) -> Map<String, Value> {
        let value = match self {
            Self::CtaClick { placement } => json!({
                "cta_location": placement.location(),
                "cta_name": placement.cta_name(),
            }),
            Self::IntentSelected { intent } => json!({
                "step_number": 1,
                "step_name": "intent_selection",
                "selected_value": intent.label(),
            }),
            Self::UserTypeSelected { user_type } => json!({
                "step_number": 2,
                "step_name": "user_type_selection",
                "selected_value": user_type.label(),
            }),
            Self::PhoneEntered { phone } => json!({
                "step_number": 3,
                "step_name": "phone_entry",
                "phone_number": phone,
            }),
            Self::SignupComplete {
                intent,
                user_type,
                phone,
            } => json!({
                "intent": intent.label(),
                "user_type": user_type.label(),
                "phone": phone,
            }),
        };

        match value {
            Value::Object(map) => map,
            _ => Map::new(),
        }
    }
}

/// Fire-and-forget event notifications; nothing is returned to the caller.
pub trait AnalyticsSink: Send + Sync {
    fn track(&self, event: &AnalyticsEvent);
}

/// Emits each event as a structured `tracing` record with phone values masked.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingAnalytics;

impl AnalyticsSink for TracingAnalytics {
    fn track(&self, event: &AnalyticsEvent) {
        let params = masked_params(event);
        info!(
            target: "analytics",
            event = event.name(),
            params = %params,
            "analytics event"
        );
    }
}

fn masked_params(event: &AnalyticsEvent) -> Value {
    let mut params = event.params();
    for key in ["phone", "phone_number"] {
        if let Some(Value::String(phone)) = params.get_mut(key) {
            *phone = mask_phone(phone);
        }
    }
    Value::Object(params)
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopAnalytics;

impl AnalyticsSink for NoopAnalytics {
    fn track(&self, _event: &AnalyticsEvent) {}
}
