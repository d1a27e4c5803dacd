//! Sheet endpoint behaviour: turning a POST into a row, and the replies the
//! waitlist client expects.

use chrono::{DateTime, Utc};
use shared::{
    domain::{iso_timestamp, WaitlistEntry},
    protocol::{HealthStatus, SubmitResponse},
};
use serde_json::{Map, Value};
use storage::{SheetRow, Storage};
use tracing::{error, info, warn};

#[derive(Clone)]
pub struct ApiContext {
    pub storage: Storage,
}

pub fn exec_route() -> &'static str {
    "/exec"
}

pub fn health_status(now: DateTime<Utc>) -> HealthStatus {
    HealthStatus {
        status: "OK".to_string(),
        message: "Waitlist sheet endpoint is running. Use POST to submit waitlist entries."
            .to_string(),
        timestamp: iso_timestamp(now),
    }
}

/// Reads an entry from a JSON body, falling back to the query string when the
/// body is absent or not a JSON object. A missing timestamp becomes `now`.
pub fn entry_from_request(
    body: &[u8],
    query: Option<&str>,
    now: DateTime<Utc>,
) -> WaitlistEntry {
    let parsed = if body.is_empty() {
        None
    } else {
        match serde_json::from_slice::<Value>(body) {
            Ok(Value::Object(fields)) => Some(entry_from_json(&fields)),
            Ok(_) => {
                warn!("request body is not a JSON object; falling back to query parameters");
                None
            }
            Err(error) => {
                warn!(%error, "request body is not JSON; falling back to query parameters");
                None
            }
        }
    };

    let mut entry = parsed.unwrap_or_else(|| entry_from_query(query.unwrap_or_default()));
    if entry.timestamp.is_empty() {
        entry.timestamp = iso_timestamp(now);
    }
    entry
}

/// Null or missing fields become empty; other scalars keep their JSON text.
fn entry_from_json(fields: &Map<String, Value>) -> WaitlistEntry {
    let field = |key: &str| match fields.get(key) {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(text)) => text.clone(),
        Some(other) => other.to_string(),
    };
    WaitlistEntry {
        intent: field("intent"),
        user_type: field("userType"),
        phone: field("phone"),
        timestamp: field("timestamp"),
    }
}

fn entry_from_query(query: &str) -> WaitlistEntry {
    let mut entry = WaitlistEntry {
        intent: String::new(),
        user_type: String::new(),
        phone: String::new(),
        timestamp: String::new(),
    };
    for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
        match key.as_ref() {
            "intent" => entry.intent = value.into_owned(),
            "userType" => entry.user_type = value.into_owned(),
            "phone" => entry.phone = value.into_owned(),
            "timestamp" => entry.timestamp = value.into_owned(),
            _ => {}
        }
    }
    entry
}

/// Appends the entry as a sheet row. Failures are reported in the reply body,
/// never as an HTTP error.
pub async fn append_entry(ctx: &ApiContext, entry: &WaitlistEntry) -> SubmitResponse {
    if !entry.has_data() {
        warn!("rejecting waitlist submission without any field");
        return SubmitResponse::empty_submission();
    }

    match ctx.storage.append_sheet_row(&SheetRow::from(entry)).await {
        Ok(row_id) => {
            info!(
                row_id,
                intent = %entry.intent,
                user_type = %entry.user_type,
                phone = %entry.masked_phone(),
                "waitlist row appended"
            );
            SubmitResponse::saved()
        }
        Err(error) => {
            error!(%error, "failed to append waitlist row");
            SubmitResponse::save_failed(format!("{error:#}"))
        }
    }
}

#[cfg(test)]
#[path = "tests/mod_tests.rs"]
mod tests;
