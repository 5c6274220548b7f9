use async_trait::async_trait;
use serde_json::{Map, Value};
use std::time::Duration;
use wed_proto::{ApprovalStatus, EventId, EventSubmission, GuestRow, InsertedEvent};

use super::RemoteBackend;
use crate::config::RemoteConfig;
use crate::error::RemoteError;
use crate::models::EventDocument;

const EVENTS_TABLE: &str = "events";
const GUESTS_TABLE: &str = "event_guests";

/// PostgREST style client for the event tables
#[derive(Debug, Clone)]
pub struct RestRemote {
    client: reqwest::Client,
    base_url: String,
    anon_key: String,
    access_token: Option<String>,
}

impl RestRemote {
    pub fn new(config: &RemoteConfig) -> Result<Self, RemoteError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            anon_key: config.anon_key.clone(),
            access_token: config.access_token.clone(),
        })
    }

    fn endpoint(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    fn request(&self, method: reqwest::Method, table: &str) -> reqwest::RequestBuilder {
        let token = self.access_token.as_deref().unwrap_or(&self.anon_key);
        self.client
            .request(method, self.endpoint(table))
            .header("apikey", self.anon_key.as_str())
            .bearer_auth(token)
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response, RemoteError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        Err(RemoteError::Rejected {
            status: status.as_u16(),
            body,
        })
    }
}

#[async_trait]
impl RemoteBackend for RestRemote {
    async fn fetch_approved_document(
        &self,
        user_id: &str,
    ) -> Result<Option<EventDocument>, RemoteError> {
        let response = self
            .request(reqwest::Method::GET, EVENTS_TABLE)
            .query(&[
                ("user_id", format!("eq.{}", user_id)),
                ("status", format!("eq.{}", ApprovalStatus::Approved.as_str())),
                ("order", "created_at.desc".to_string()),
                ("limit", "1".to_string()),
            ])
            .send()
            .await?;
        let rows: Vec<Map<String, Value>> = Self::check(response).await?.json().await?;

        match rows.into_iter().next() {
            Some(row) => EventDocument::from_remote_row(row)
                .map(Some)
                .map_err(|e| RemoteError::Decode(e.to_string())),
            None => Ok(None),
        }
    }

    async fn insert_document(
        &self,
        payload: &EventSubmission,
    ) -> Result<InsertedEvent, RemoteError> {
        let response = self
            .request(reqwest::Method::POST, EVENTS_TABLE)
            .header("Prefer", "return=representation")
            .json(payload)
            .send()
            .await?;
        let rows: Vec<InsertedEvent> = Self::check(response).await?.json().await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| RemoteError::Decode("insert returned no rows".into()))
    }

    async fn insert_guest_records(
        &self,
        event_id: &EventId,
        guests: &[GuestRow],
    ) -> Result<(), RemoteError> {
        if guests.is_empty() {
            return Ok(());
        }
        let rows: Vec<GuestRow> = guests
            .iter()
            .cloned()
            .map(|mut row| {
                row.event_id = Some(event_id.clone());
                row
            })
            .collect();
        let response = self
            .request(reqwest::Method::POST, GUESTS_TABLE)
            .header("Prefer", "return=minimal")
            .json(&rows)
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoints_ignore_trailing_slash() {
        let remote = RestRemote::new(&RemoteConfig {
            base_url: "https://example.supabase.co/".into(),
            anon_key: "anon".into(),
            access_token: None,
            timeout_seconds: 5,
        })
        .unwrap();
        assert_eq!(
            remote.endpoint(EVENTS_TABLE),
            "https://example.supabase.co/rest/v1/events"
        );
    }
}
