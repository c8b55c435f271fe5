#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use masa::{AppConfig, AppState, ResetMailer};
use masa_core::{ActionResult, ManualClock};
use masa_data::{NewOrganization, NewTable, Organization, Profile, Repositories, Table};
use masa_test::{TestApp, TestTokens};
use serde_json::{json, Value};
use uuid::Uuid;

pub const SECRET: &str = "integration-test-secret";

/// Keeps every reset link instead of sending it.
#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<(String, String)>>,
}

impl RecordingMailer {
    pub fn last_token_for(&self, email: &str) -> Option<String> {
        let sent = self.sent.lock().unwrap();
        sent.iter()
            .rev()
            .find(|(to, _)| to == email)
            .and_then(|(_, link)| link.split("token=").nth(1).map(str::to_string))
    }

    pub fn count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

#[async_trait]
impl ResetMailer for RecordingMailer {
    async fn send_reset(&self, profile: &Profile, link: &str) -> ActionResult<()> {
        self.sent
            .lock()
            .unwrap()
            .push((profile.email.clone(), link.to_string()));
        Ok(())
    }
}

pub struct TestContext {
    pub app: TestApp,
    pub state: AppState,
    pub clock: ManualClock,
    pub tokens: TestTokens,
    pub mailer: Arc<RecordingMailer>,
}

impl TestContext {
    pub fn new() -> Self {
        Self::with_config(AppConfig::for_memory(SECRET))
    }

    pub fn with_config(config: AppConfig) -> Self {
        let clock = ManualClock::new(Utc::now());
        let mailer = Arc::new(RecordingMailer::default());
        let state = AppState::builder(config, Repositories::in_memory())
            .clock(Arc::new(clock.clone()))
            .mailer(mailer.clone())
            .build();
        Self {
            app: TestApp::new(masa::router(state.clone())),
            tokens: TestTokens::new(state.tokens.clone()),
            state,
            clock,
            mailer,
        }
    }

    pub async fn organization(&self, name: &str) -> Organization {
        let slug = masa::services::auth::slugify(name);
        self.state
            .repos
            .organizations
            .create(NewOrganization { name: name.into(), slug }, Utc::now())
            .await
            .unwrap()
    }

    pub async fn table(&self, organization_id: Uuid, name: &str) -> Table {
        self.state
            .repos
            .tables
            .create(
                NewTable {
                    organization_id,
                    name: name.into(),
                    capacity: 4,
                    qr_token: format!("qr-{}", Uuid::new_v4().simple()),
                    is_active: true,
                },
                Utc::now(),
            )
            .await
            .unwrap()
    }

    /// An organization with one active table.
    pub async fn restaurant(&self, name: &str) -> (Organization, Table) {
        let organization = self.organization(name).await;
        let table = self.table(organization.id, "Masa 1").await;
        (organization, table)
    }
}

pub fn waiter_call(organization_id: Uuid, table_id: Uuid) -> Value {
    json!({
        "organization_id": organization_id,
        "table_id": table_id,
        "request_type": "call_waiter",
    })
}
