use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::Serialize;

use haul_core::errors::ApiError;
use haul_core::profile::DriverProfile;
use haul_core::raw::{RawNotification, RawSchedule, RawSession, RawTask};
use haul_core::schedule::Appointment;
use haul_core::task::{TaskId, TaskStatus};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Abstract contract for the dispatch backend.
///
/// All calls are bearer-token authenticated. Implementations classify
/// failures per [`ApiError`]; callers decide whether a failure degrades,
/// propagates, or ends the session.
#[async_trait]
pub trait DispatchApi: Send + Sync {
    async fn fetch_tasks(&self, driver_id: &str) -> Result<Vec<RawTask>, ApiError>;
    async fn fetch_driver_profile(&self) -> Result<DriverProfile, ApiError>;
    async fn update_task_status(&self, task_id: TaskId, status: TaskStatus)
        -> Result<(), ApiError>;
    async fn schedule_task_collection(
        &self,
        task_id: TaskId,
        date: NaiveDate,
        time_slot: &str,
    ) -> Result<Appointment, ApiError>;
    async fn fetch_recurring_schedules(&self) -> Result<Vec<RawSchedule>, ApiError>;
    async fn fetch_active_live_sessions(&self) -> Result<Vec<RawSession>, ApiError>;
    async fn fetch_notifications(&self) -> Result<Vec<RawNotification>, ApiError>;
    async fn mark_notification_read(&self, id: &str) -> Result<(), ApiError>;
}

/// HTTP implementation of [`DispatchApi`] backed by `reqwest`.
pub struct HttpDispatchApi {
    client: Client,
    base_url: String,
    token: SecretString,
}

#[derive(Serialize)]
struct StatusBody {
    status: TaskStatus,
}

#[derive(Serialize)]
struct ScheduleBody<'a> {
    date: NaiveDate,
    time_slot: &'a str,
}

impl HttpDispatchApi {
    pub fn new(base_url: impl Into<String>, token: SecretString) -> Self {
        Self {
            client: Client::builder()
                .connect_timeout(CONNECT_TIMEOUT)
                .timeout(REQUEST_TIMEOUT)
                .build()
                .expect("failed to build HTTP client"),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let resp = self
            .client
            .get(self.url(path))
            .bearer_auth(self.token.expose_secret())
            .header("accept", "application/json")
            .send()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;
        Self::decode(resp).await
    }

    async fn post_json<T: DeserializeOwned, B: Serialize + Sync>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let resp = self
            .client
            .post(self.url(path))
            .bearer_auth(self.token.expose_secret())
            .header("accept", "application/json")
            .json(body)
            .send()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;
        Self::decode(resp).await
    }

    /// POST where only the status code matters; the response body, if
    /// any, is ignored.
    async fn post_ack<B: Serialize + Sync>(&self, path: &str, body: &B) -> Result<(), ApiError> {
        let resp = self
            .client
            .post(self.url(path))
            .bearer_auth(self.token.expose_secret())
            .json(body)
            .send()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;
        Self::check(resp).await.map(|_| ())
    }

    async fn post_empty(&self, path: &str) -> Result<(), ApiError> {
        let resp = self
            .client
            .post(self.url(path))
            .bearer_auth(self.token.expose_secret())
            .send()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;
        Self::check(resp).await.map(|_| ())
    }

    async fn check(resp: reqwest::Response) -> Result<reqwest::Response, ApiError> {
        if resp.status().is_success() {
            return Ok(resp);
        }
        let status = resp.status().as_u16();
        let body = resp.text().await.unwrap_or_default();
        Err(ApiError::from_status(status, body))
    }

    async fn decode<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, ApiError> {
        let resp = Self::check(resp).await?;
        resp.json::<T>()
            .await
            .map_err(|e| ApiError::Transport(format!("malformed response body: {e}")))
    }
}

#[async_trait]
impl DispatchApi for HttpDispatchApi {
    async fn fetch_tasks(&self, driver_id: &str) -> Result<Vec<RawTask>, ApiError> {
        self.get_json(&format!("/api/drivers/{driver_id}/tasks")).await
    }

    async fn fetch_driver_profile(&self) -> Result<DriverProfile, ApiError> {
        self.get_json("/api/drivers/me").await
    }

    async fn update_task_status(
        &self,
        task_id: TaskId,
        status: TaskStatus,
    ) -> Result<(), ApiError> {
        self.post_ack(&format!("/api/tasks/{task_id}/status"), &StatusBody { status })
            .await
    }

    async fn schedule_task_collection(
        &self,
        task_id: TaskId,
        date: NaiveDate,
        time_slot: &str,
    ) -> Result<Appointment, ApiError> {
        self.post_json(
            &format!("/api/tasks/{task_id}/schedule"),
            &ScheduleBody { date, time_slot },
        )
        .await
    }

    async fn fetch_recurring_schedules(&self) -> Result<Vec<RawSchedule>, ApiError> {
        self.get_json("/api/schedules").await
    }

    async fn fetch_active_live_sessions(&self) -> Result<Vec<RawSession>, ApiError> {
        self.get_json("/api/live-sessions").await
    }

    async fn fetch_notifications(&self) -> Result<Vec<RawNotification>, ApiError> {
        self.get_json("/api/notifications").await
    }

    async fn mark_notification_read(&self, id: &str) -> Result<(), ApiError> {
        self.post_empty(&format!("/api/notifications/{id}/read")).await
    }
}
