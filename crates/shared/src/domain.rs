use std::{fmt, str::FromStr};

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{EntryError, UnknownChoice};

/// Country code prepended to every stored phone number.
pub const PHONE_PREFIX: &str = "+91";
/// Length of a national mobile number, digits only.
pub const PHONE_DIGITS: usize = 10;

macro_rules! choice_enum {
    ($name:ident, $kind:literal { $($variant:ident => $label:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(
                #[serde(rename = $label)]
                $variant,
            )+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn label(self) -> &'static str {
                match self {
                    $($name::$variant => $label,)+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.label())
            }
        }

        impl FromStr for $name {
            type Err = UnknownChoice;

            fn from_str(value: &str) -> Result<Self, Self::Err> {
                let wanted = value.trim();
                Self::ALL
                    .iter()
                    .copied()
                    .find(|choice| choice.label().eq_ignore_ascii_case(wanted))
                    .ok_or_else(|| UnknownChoice::new($kind, value))
            }
        }
    };
}

choice_enum!(Intent, "intent" {
    CreditCard => "I want to get a credit card someday",
    Loan => "I want to take a loan in the future",
    CreditScore => "I just want to build my credit score",
    Curious => "I'm curious what this is about",
});

choice_enum!(UserType, "user type" {
    Student => "Student",
    WorkingProfessional => "Working professional",
    Freelancer => "Freelancer / Self-employed",
    Other => "Other",
});

/// Strips every non-digit and keeps at most [`PHONE_DIGITS`] characters.
pub fn sanitize_phone(raw: &str) -> String {
    raw.chars()
        .filter(char::is_ascii_digit)
        .take(PHONE_DIGITS)
        .collect()
}

pub fn is_valid_phone(digits: &str) -> bool {
    digits.len() == PHONE_DIGITS && digits.bytes().all(|b| b.is_ascii_digit())
}

pub fn prefixed_phone(digits: &str) -> String {
    format!("{PHONE_PREFIX}{digits}")
}

/// Masks a phone number for logs, keeping the first and last three characters.
pub fn mask_phone(phone: &str) -> String {
    let chars: Vec<char> = phone.chars().collect();
    if chars.len() < 7 {
        return "****".to_string();
    }
    let head: String = chars[..3].iter().collect();
    let tail: String = chars[chars.len() - 3..].iter().collect();
    format!("{head}****{tail}")
}

/// ISO-8601 in UTC with millisecond precision, e.g. `2025-01-31T08:15:00.123Z`.
pub fn iso_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// A single waitlist signup record, complete or partial.
///
/// Field values are plain strings on the wire so the remote sheet and the
/// local cache see exactly what was submitted, including empty fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WaitlistEntry {
    #[serde(default)]
    pub intent: String,
    #[serde(default)]
    pub user_type: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub timestamp: String,
}

impl WaitlistEntry {
    /// Builds the entry for a completed wizard. `digits` must be a valid
    /// national number without the country code.
    pub fn finalized(
        intent: Intent,
        user_type: UserType,
        digits: &str,
        at: DateTime<Utc>,
    ) -> Result<Self, EntryError> {
        if !is_valid_phone(digits) {
            return Err(EntryError::InvalidPhone {
                expected: PHONE_DIGITS,
                actual: digits.to_string(),
            });
        }

        Ok(Self {
            intent: intent.label().to_string(),
            user_type: user_type.label().to_string(),
            phone: prefixed_phone(digits),
            timestamp: iso_timestamp(at),
        })
    }

    /// Builds an entry from whatever an abandoned wizard had collected.
    pub fn partial(
        intent: Option<Intent>,
        user_type: Option<UserType>,
        digits: &str,
        at: DateTime<Utc>,
    ) -> Self {
        let phone = if digits.is_empty() {
            String::new()
        } else {
            prefixed_phone(digits)
        };

        Self {
            intent: intent.map(|i| i.label().to_string()).unwrap_or_default(),
            user_type: user_type.map(|u| u.label().to_string()).unwrap_or_default(),
            phone,
            timestamp: iso_timestamp(at),
        }
    }

    pub fn has_data(&self) -> bool {
        !self.intent.is_empty() || !self.user_type.is_empty() || !self.phone.is_empty()
    }

    pub fn masked_phone(&self) -> String {
        if self.phone.is_empty() {
            String::new()
        } else {
            mask_phone(&self.phone)
        }
    }
}

#[cfg(test)]
#[path = "tests/domain_tests.rs"]
mod tests;
