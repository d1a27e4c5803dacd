//! Client side of the CredUPI waitlist: the signup wizard state machine, the
//! gateway that delivers entries to the remote sheet, and the local backup
//! trail of everything submitted.

pub mod analytics;
pub mod cache;
pub mod flow;
pub mod gateway;

pub use analytics::{AnalyticsEvent, AnalyticsSink, CtaPlacement, NoopAnalytics, TracingAnalytics};
pub use cache::{EntryCache, LocalEntryCache, WAITLIST_SLOT};
pub use flow::{FlowError, SignupFlow, SignupState, SignupStep, CELEBRATION_DURATION, RESET_DELAY};
pub use gateway::{
    DeliveryMode, GatewayConfig, GatewayError, SheetGateway, SubmitOutcome, WaitlistGateway,
};
