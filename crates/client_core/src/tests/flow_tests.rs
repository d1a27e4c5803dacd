use super::*;
use anyhow::Result;
use async_trait::async_trait;
use chrono::DateTime;
use std::sync::Mutex as StdMutex;

#[derive(Default)]
struct MemoryCache {
    entries: StdMutex<Vec<WaitlistEntry>>,
}

#[async_trait]
impl EntryCache for MemoryCache {
    async fn append(&self, entry: &WaitlistEntry) -> Result<usize> {
        let mut entries = self.entries.lock().expect("cache lock");
        entries.push(entry.clone());
        Ok(entries.len())
    }

    async fn entries(&self) -> Result<Vec<WaitlistEntry>> {
        Ok(self.entries.lock().expect("cache lock").clone())
    }
}

struct RecordingGateway {
    outcome: SubmitOutcome,
    submitted: StdMutex<Vec<WaitlistEntry>>,
}

#[async_trait]
impl WaitlistGateway for RecordingGateway {
    async fn submit(&self, entry: &WaitlistEntry) -> SubmitOutcome {
        self.submitted
            .lock()
            .expect("gateway lock")
            .push(entry.clone());
        self.outcome
    }
}

#[derive(Default)]
struct RecordingAnalytics {
    events: StdMutex<Vec<AnalyticsEvent>>,
}

impl AnalyticsSink for RecordingAnalytics {
    fn track(&self, event: &AnalyticsEvent) {
        self.events
            .lock()
            .expect("analytics lock")
            .push(event.clone());
    }
}

struct Harness {
    flow: SignupFlow,
    cache: Arc<MemoryCache>,
    gateway: Arc<RecordingGateway>,
    analytics: Arc<RecordingAnalytics>,
}

impl Harness {
    fn new(outcome: SubmitOutcome) -> Self {
        let cache = Arc::new(MemoryCache::default());
        let gateway = Arc::new(RecordingGateway {
            outcome,
            submitted: StdMutex::new(Vec::new()),
        });
        let analytics = Arc::new(RecordingAnalytics::default());
        let mut flow = SignupFlow::new(gateway.clone(), cache.clone(), analytics.clone());
        flow.open();
        Self {
            flow,
            cache,
            gateway,
            analytics,
        }
    }

    fn cached(&self) -> Vec<WaitlistEntry> {
        self.cache.entries.lock().expect("cache lock").clone()
    }

    fn submitted(&self) -> Vec<WaitlistEntry> {
        self.gateway.submitted.lock().expect("gateway lock").clone()
    }

    fn events(&self) -> Vec<AnalyticsEvent> {
        self.analytics.events.lock().expect("analytics lock").clone()
    }

    async fn complete(&mut self, now: Instant) {
        self.flow.select_intent(Intent::Curious).expect("intent");
        self.flow.advance(now).await.expect("to user type");
        self.flow.select_user_type(UserType::Student).expect("user type");
        self.flow.advance(now).await.expect("to phone");
        self.flow.input_phone("9876543210").expect("phone");
        self.flow.advance(now).await.expect("to done");
    }
}

#[tokio::test]
async fn completing_the_wizard_submits_a_finalized_entry() {
    let mut h = Harness::new(SubmitOutcome::Delivered);
    let now = Instant::now();

    h.complete(now).await;

    assert_eq!(h.flow.step(), SignupStep::Done);
    assert!(h.flow.state().already_submitted);

    let submitted = h.submitted();
    assert_eq!(submitted.len(), 1);
    let entry = &submitted[0];
    assert_eq!(entry.intent, "I'm curious what this is about");
    assert_eq!(entry.user_type, "Student");
    assert_eq!(entry.phone, "+919876543210");
    DateTime::parse_from_rfc3339(&entry.timestamp).expect("iso timestamp");

    assert_eq!(h.cached(), submitted);

    assert_eq!(
        h.events(),
        vec![
            AnalyticsEvent::IntentSelected {
                intent: Intent::Curious
            },
            AnalyticsEvent::UserTypeSelected {
                user_type: UserType::Student
            },
            AnalyticsEvent::PhoneEntered {
                phone: "+919876543210".to_string()
            },
            AnalyticsEvent::SignupComplete {
                intent: Intent::Curious,
                user_type: UserType::Student,
                phone: "+919876543210".to_string()
            },
        ]
    );
}

#[tokio::test]
async fn failed_delivery_still_confirms_and_caches() {
    let mut h = Harness::new(SubmitOutcome::Failed);
    h.complete(Instant::now()).await;

    assert_eq!(h.flow.step(), SignupStep::Done);
    assert_eq!(h.cached().len(), 1);
    assert_eq!(h.submitted().len(), 1);
}

#[tokio::test]
async fn advance_without_selection_is_rejected() {
    let mut h = Harness::new(SubmitOutcome::Delivered);
    let now = Instant::now();

    assert_eq!(h.flow.advance(now).await, Err(FlowError::MissingIntent));
    assert_eq!(h.flow.step(), SignupStep::Intent);

    h.flow.select_intent(Intent::Loan).expect("intent");
    h.flow.advance(now).await.expect("to user type");
    assert_eq!(h.flow.advance(now).await, Err(FlowError::MissingUserType));
    assert_eq!(h.flow.step(), SignupStep::UserType);
    assert_eq!(h.events().len(), 1);
}

#[tokio::test]
async fn short_phone_blocks_completion() {
    let mut h = Harness::new(SubmitOutcome::Delivered);
    let now = Instant::now();
    h.flow.select_intent(Intent::Loan).expect("intent");
    h.flow.advance(now).await.expect("to user type");
    h.flow.select_user_type(UserType::Other).expect("user type");
    h.flow.advance(now).await.expect("to phone");

    h.flow.input_phone("12345").expect("phone");
    assert_eq!(
        h.flow.advance(now).await,
        Err(FlowError::InvalidPhone { digits: 5 })
    );
    assert_eq!(h.flow.step(), SignupStep::Phone);
    assert!(h.submitted().is_empty());
    assert!(h.cached().is_empty());
    assert!(!h.flow.state().already_submitted);
}

#[tokio::test]
async fn phone_input_is_filtered_on_every_keystroke() {
    let mut h = Harness::new(SubmitOutcome::Delivered);
    let now = Instant::now();
    h.flow.select_intent(Intent::CreditCard).expect("intent");
    h.flow.advance(now).await.expect("to user type");
    h.flow.select_user_type(UserType::Freelancer).expect("user type");
    h.flow.advance(now).await.expect("to phone");

    assert_eq!(h.flow.input_phone("98a").expect("phone"), "98");
    assert_eq!(
        h.flow.input_phone("(987) 654-3210 ext 9").expect("phone"),
        "9876543210"
    );
}

#[tokio::test]
async fn selections_are_tied_to_their_step() {
    let mut h = Harness::new(SubmitOutcome::Delivered);
    assert_eq!(
        h.flow.select_user_type(UserType::Student),
        Err(FlowError::WrongStep {
            expected: SignupStep::UserType,
            actual: SignupStep::Intent,
        })
    );
    assert!(h.flow.input_phone("9876543210").is_err());
}

#[tokio::test]
async fn dismissing_an_untouched_wizard_saves_nothing() {
    let mut h = Harness::new(SubmitOutcome::Delivered);
    assert!(h.flow.dismiss(Instant::now()).is_none());
    assert!(h.cached().is_empty());
    assert!(h.submitted().is_empty());
    assert!(!h.flow.state().open);
}

#[tokio::test]
async fn dismissing_after_first_answer_saves_one_partial_entry() {
    let mut h = Harness::new(SubmitOutcome::Delivered);
    h.flow.select_intent(Intent::CreditScore).expect("intent");

    let task = h.flow.dismiss(Instant::now()).expect("partial save task");
    assert_eq!(task.await.expect("join"), SubmitOutcome::Delivered);

    let cached = h.cached();
    assert_eq!(cached.len(), 1);
    assert_eq!(cached[0].intent, "I just want to build my credit score");
    assert!(cached[0].user_type.is_empty());
    assert!(cached[0].phone.is_empty());
    assert_eq!(h.submitted(), cached);

    assert!(h.flow.dismiss(Instant::now()).is_none());
    assert_eq!(h.cached().len(), 1);
}

#[tokio::test]
async fn closing_after_completion_does_not_save_again() {
    let mut h = Harness::new(SubmitOutcome::Delivered);
    h.complete(Instant::now()).await;

    assert!(h.flow.dismiss(Instant::now()).is_none());
    assert_eq!(h.cached().len(), 1);
    assert_eq!(h.submitted().len(), 1);
}

#[tokio::test]
async fn reset_waits_for_close_animation() {
    let mut h = Harness::new(SubmitOutcome::Delivered);
    let closed_at = Instant::now();
    h.flow.select_intent(Intent::Loan).expect("intent");
    h.flow
        .dismiss(closed_at)
        .expect("partial save task")
        .await
        .expect("join");

    h.flow.tick(closed_at + Duration::from_millis(100));
    assert_eq!(h.flow.state().intent, Some(Intent::Loan));

    h.flow.tick(closed_at + RESET_DELAY);
    let state = h.flow.state();
    assert_eq!(state.step, SignupStep::Intent);
    assert_eq!(state.intent, None);
    assert!(state.phone.is_empty());
    assert!(state.already_submitted, "guard clears only on next open");

    h.flow.open();
    assert!(!h.flow.state().already_submitted);
    assert!(h.flow.state().open);
}

#[tokio::test]
async fn reopening_starts_a_new_lifecycle() {
    let mut h = Harness::new(SubmitOutcome::Delivered);
    let now = Instant::now();
    h.flow.select_intent(Intent::Loan).expect("intent");
    h.flow.dismiss(now).expect("first save").await.expect("join");

    h.flow.open();
    assert_eq!(h.flow.state().intent, None);

    h.flow.select_intent(Intent::Curious).expect("intent");
    h.flow.dismiss(now).expect("second save").await.expect("join");

    let intents: Vec<_> = h.cached().into_iter().map(|e| e.intent).collect();
    assert_eq!(
        intents,
        vec![
            "I want to take a loan in the future".to_string(),
            "I'm curious what this is about".to_string(),
        ]
    );
}

#[tokio::test]
async fn celebration_clears_after_its_window() {
    let mut h = Harness::new(SubmitOutcome::Delivered);
    let done_at = Instant::now();
    h.complete(done_at).await;

    assert!(h.flow.is_celebrating(done_at + Duration::from_secs(1)));
    assert!(!h.flow.is_celebrating(done_at + CELEBRATION_DURATION));

    h.flow.tick(done_at + CELEBRATION_DURATION);
    assert_eq!(h.flow.state().celebrate_until, None);
    assert_eq!(h.flow.step(), SignupStep::Done);
}

#[tokio::test]
async fn done_is_terminal() {
    let mut h = Harness::new(SubmitOutcome::Delivered);
    h.complete(Instant::now()).await;
    assert_eq!(
        h.flow.advance(Instant::now()).await,
        Err(FlowError::AlreadyComplete)
    );
}
