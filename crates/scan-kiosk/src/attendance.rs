//! Attendance service client
//!
//! A scan carries a member id. The service looks up the member's name and
//! toggles their attendance: the first record of a visit is a check-in, the
//! next one closes it as a check-out.

use crate::config::KioskConfig;
use crate::error::{KioskError, Result};
use async_trait::async_trait;
use chrono::NaiveDateTime;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Attendance record returned by the service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceRecord {
    /// Record id
    pub attendance_id: i64,
    /// Member id
    pub user_id: i64,
    /// Member name as known to the service
    pub user_name: String,
    /// Start of the visit
    pub check_in_time: NaiveDateTime,
    /// End of the visit; present once the member has checked out
    #[serde(default)]
    pub check_out_time: Option<NaiveDateTime>,
    /// Visit length, present with `check_out_time`
    #[serde(default)]
    pub time_spent_minutes: Option<i64>,
}

impl AttendanceRecord {
    /// This record closed a visit
    #[inline]
    #[must_use]
    pub fn is_check_out(&self) -> bool {
        self.check_out_time.is_some()
    }
}

/// Attendance service operations used by the kiosk
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AttendanceApi: Send + Sync {
    /// Name of the member with `member_id`, if the service knows one
    async fn find_member_name(&self, member_id: i64) -> Result<Option<String>>;

    /// Record a check-in or check-out for `member_id`
    ///
    /// `member_name` is only used to word the failure message.
    async fn record_attendance(&self, member_id: i64, member_name: &str) -> Result<AttendanceRecord>;
}

/// Parse the member id at the start of scanned text
///
/// Leading whitespace and a sign are accepted and anything after the digits
/// is ignored, so `"42-A"` reads as 42.
///
/// # Errors
/// - `KioskError::InvalidMemberId` if the text does not start with digits
pub fn parse_member_id(text: &str) -> Result<i64> {
    let trimmed = text.trim_start();
    let (negative, rest) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };
    let digits = rest.bytes().take_while(u8::is_ascii_digit).count();
    if digits == 0 {
        return Err(KioskError::InvalidMemberId(text.to_string()));
    }

    let value: i64 = rest[..digits]
        .parse()
        .map_err(|_| KioskError::InvalidMemberId(text.to_string()))?;
    Ok(if negative { -value } else { value })
}

/// Failure message shown for a rejected attendance request
///
/// Prefers the service's own wording: a JSON `message` field, then a plain
/// text body. Falls back to a not-found hint for 404 and a generic message
/// naming the member otherwise.
#[must_use]
pub fn describe_failure(status: StatusCode, body: &str, member_name: &str) -> String {
    match serde_json::from_str::<serde_json::Value>(body) {
        Ok(serde_json::Value::Object(fields)) => match fields.get("message") {
            Some(serde_json::Value::String(message)) => return message.clone(),
            Some(message) if !message.is_null() => return message.to_string(),
            _ => {}
        },
        Ok(serde_json::Value::String(text)) if !text.is_empty() => return text,
        Ok(_) => {}
        Err(_) if !body.trim().is_empty() => return body.trim().to_string(),
        Err(_) => {}
    }

    if status == StatusCode::NOT_FOUND {
        "Attendance failed: User not found. Please verify the ID.".to_string()
    } else {
        format!("Failed to process attendance for {member_name}.")
    }
}

#[derive(Debug, Deserialize)]
struct MemberSummary {
    name: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RecordRequest {
    user_id: i64,
}

/// [`AttendanceApi`] over the REST service
#[derive(Debug, Clone)]
pub struct HttpAttendanceClient {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl HttpAttendanceClient {
    /// Create a client for the API rooted at `base_url`
    ///
    /// # Errors
    /// - `KioskError::Http` if the HTTP client cannot be built
    pub fn new(base_url: impl Into<String>, token: Option<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Ok(Self {
            client,
            base_url,
            token,
        })
    }

    /// Create a client from kiosk configuration
    ///
    /// # Errors
    /// - `KioskError::Http` if the HTTP client cannot be built
    pub fn from_config(config: &KioskConfig) -> Result<Self> {
        Self::new(
            config.api_base_url.clone(),
            config.api_token.clone(),
            config.request_timeout(),
        )
    }

    /// Base URL requests are sent to
    #[inline]
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let builder = self.client.request(method, format!("{}{}", self.base_url, path));
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }
}

#[async_trait]
impl AttendanceApi for HttpAttendanceClient {
    async fn find_member_name(&self, member_id: i64) -> Result<Option<String>> {
        let members: Vec<MemberSummary> = self
            .request(reqwest::Method::GET, "/dashboard/users/search")
            .query(&[("query", member_id.to_string())])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(members.into_iter().next().map(|m| m.name))
    }

    async fn record_attendance(&self, member_id: i64, member_name: &str) -> Result<AttendanceRecord> {
        let response = self
            .request(reqwest::Method::POST, "/attendance/record")
            .json(&RecordRequest { user_id: member_id })
            .send()
            .await
            .map_err(|err| {
                tracing::warn!("Attendance request for {} failed: {}", member_id, err);
                KioskError::Attendance(format!("Failed to process attendance for {member_name}."))
            })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response.json().await?);
        }

        let body = response.text().await.unwrap_or_default();
        tracing::debug!("Attendance service returned {}: {}", status, body);
        Err(KioskError::Attendance(describe_failure(status, &body, member_name)))
    }
}
