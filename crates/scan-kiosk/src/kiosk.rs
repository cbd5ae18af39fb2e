//! Attendance kiosk
//!
//! Consumes scanner events. Each accepted scan is read as a member id and
//! recorded with the attendance service; scanner errors become notices for
//! whoever is standing at the kiosk.

use crate::attendance::{parse_member_id, AttendanceApi, AttendanceRecord};
use crate::error::Result;
use scan_core::{ScanError, ScannerEvent, ScannerEvents};

/// Status line shown after an invalid scan
pub const INVALID_SCAN_STATUS: &str = "Invalid QR Code: Non-numeric ID.";

/// Member identified by the last successful scan
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannedMember {
    /// Member id read from the code
    pub member_id: i64,
    /// Display name
    pub name: String,
}

/// Result of a successful scan
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanOutcome {
    /// A visit was opened
    CheckedIn {
        /// Who checked in
        member: ScannedMember,
        /// Service record
        record: AttendanceRecord,
    },
    /// A visit was closed
    CheckedOut {
        /// Who checked out
        member: ScannedMember,
        /// Service record
        record: AttendanceRecord,
    },
}

impl ScanOutcome {
    fn new(member: ScannedMember, record: AttendanceRecord) -> Self {
        if record.is_check_out() {
            Self::CheckedOut { member, record }
        } else {
            Self::CheckedIn { member, record }
        }
    }

    /// Member the outcome is for
    #[must_use]
    pub fn member(&self) -> &ScannedMember {
        match self {
            Self::CheckedIn { member, .. } | Self::CheckedOut { member, .. } => member,
        }
    }

    /// Service record
    #[must_use]
    pub fn record(&self) -> &AttendanceRecord {
        match self {
            Self::CheckedIn { record, .. } | Self::CheckedOut { record, .. } => record,
        }
    }
}

impl std::fmt::Display for ScanOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CheckedIn { member, .. } => write!(f, "{} has checked in!", member.name),
            Self::CheckedOut { member, .. } => write!(f, "{} has checked out!", member.name),
        }
    }
}

/// Message for the person at the kiosk
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// Check-in or check-out succeeded
    Success(String),
    /// The scan could not be processed
    Error(String),
    /// Camera or permission problem; stays up until the user acts
    Alert(String),
    /// Transient scanner problem
    Warning(String),
}

impl Notice {
    /// Text to display
    #[must_use]
    pub fn text(&self) -> &str {
        match self {
            Self::Success(text) | Self::Error(text) | Self::Alert(text) | Self::Warning(text) => text,
        }
    }
}

/// Counters over a kiosk run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KioskSummary {
    /// Successful check-ins
    pub checked_in: u64,
    /// Successful check-outs
    pub checked_out: u64,
    /// Scans rejected as invalid or by the service
    pub failed_scans: u64,
    /// Errors reported by the scanner
    pub scanner_errors: u64,
}

/// Attendance kiosk state
#[derive(Debug)]
pub struct Kiosk<A> {
    api: A,
    last_member: Option<ScannedMember>,
    last_record: Option<AttendanceRecord>,
    status_message: Option<String>,
    summary: KioskSummary,
}

impl<A: AttendanceApi> Kiosk<A> {
    /// Create a kiosk over `api`
    pub fn new(api: A) -> Self {
        Self {
            api,
            last_member: None,
            last_record: None,
            status_message: None,
            summary: KioskSummary::default(),
        }
    }

    /// Member from the last successful scan
    #[must_use]
    pub fn last_member(&self) -> Option<&ScannedMember> {
        self.last_member.as_ref()
    }

    /// Record from the last successful scan
    #[must_use]
    pub fn last_record(&self) -> Option<&AttendanceRecord> {
        self.last_record.as_ref()
    }

    /// Current status line; cleared by a successful scan
    #[must_use]
    pub fn status_message(&self) -> Option<&str> {
        self.status_message.as_deref()
    }

    /// Counters so far
    #[must_use]
    pub fn summary(&self) -> KioskSummary {
        self.summary
    }

    /// Check a member in or out from scanned text
    ///
    /// A failed name lookup is not fatal; the member is shown by id instead.
    ///
    /// # Errors
    /// - `KioskError::InvalidMemberId` if the text is not a member id
    /// - `KioskError::Attendance` if the service rejects the request
    pub async fn handle_scan(&mut self, text: &str) -> Result<ScanOutcome> {
        let member_id = match parse_member_id(text) {
            Ok(id) => id,
            Err(err) => {
                self.reject(INVALID_SCAN_STATUS.to_string());
                return Err(err);
            }
        };

        let name = match self.api.find_member_name(member_id).await {
            Ok(Some(name)) => name,
            Ok(None) => format!("User ID: {member_id}"),
            Err(err) => {
                tracing::warn!("Name lookup for member {} failed: {}", member_id, err);
                format!("User ID: {member_id}")
            }
        };

        match self.api.record_attendance(member_id, &name).await {
            Ok(record) => {
                let member = ScannedMember { member_id, name };
                self.last_member = Some(member.clone());
                self.last_record = Some(record.clone());
                self.status_message = None;

                let outcome = ScanOutcome::new(member, record);
                match outcome {
                    ScanOutcome::CheckedIn { .. } => self.summary.checked_in += 1,
                    ScanOutcome::CheckedOut { .. } => self.summary.checked_out += 1,
                }
                Ok(outcome)
            }
            Err(err) => {
                self.reject(err.to_string());
                Err(err)
            }
        }
    }

    /// Turn a scanner error into a notice
    pub fn handle_scanner_error(&mut self, err: &ScanError) -> Notice {
        self.summary.scanner_errors += 1;
        let text = err.to_string();
        self.status_message = Some(text.clone());
        if err.is_persistent() {
            Notice::Alert(text)
        } else {
            Notice::Warning(text)
        }
    }

    /// Process one scanner event
    pub async fn handle_event(&mut self, event: ScannerEvent) -> Notice {
        match event {
            ScannerEvent::Decoded(text) => match self.handle_scan(&text).await {
                Ok(outcome) => Notice::Success(outcome.to_string()),
                Err(err) => Notice::Error(err.to_string()),
            },
            ScannerEvent::Error(err) => self.handle_scanner_error(&err),
        }
    }

    /// Process events until the scanner's event stream ends
    ///
    /// Every notice is logged and passed to `on_notice`.
    pub async fn run(mut self, mut events: ScannerEvents, mut on_notice: impl FnMut(&Notice)) -> KioskSummary {
        while let Some(event) = events.recv().await {
            let notice = self.handle_event(event).await;
            match &notice {
                Notice::Success(text) => tracing::info!("{}", text),
                Notice::Error(text) | Notice::Warning(text) => tracing::warn!("{}", text),
                Notice::Alert(text) => tracing::error!("{}", text),
            }
            on_notice(&notice);
        }

        tracing::debug!("Scanner event stream closed");
        self.summary
    }

    fn reject(&mut self, status: String) {
        self.summary.failed_scans += 1;
        self.last_member = None;
        self.status_message = Some(status);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attendance::MockAttendanceApi;
    use crate::error::KioskError;
    use chrono::NaiveDate;
    use scan_core::DeviceError;

    fn record(member_id: i64, checked_out: bool) -> AttendanceRecord {
        let check_in = NaiveDate::from_ymd_opt(2024, 5, 1)
            .and_then(|d| d.and_hms_opt(7, 30, 0))
            .unwrap();
        AttendanceRecord {
            attendance_id: 1,
            user_id: member_id,
            user_name: "Ada".into(),
            check_in_time: check_in,
            check_out_time: checked_out.then(|| check_in + chrono::Duration::minutes(90)),
            time_spent_minutes: checked_out.then_some(90),
        }
    }

    #[tokio::test]
    async fn check_in_with_looked_up_name() {
        let mut api = MockAttendanceApi::new();
        api.expect_find_member_name()
            .withf(|id| *id == 42)
            .times(1)
            .returning(|_| Ok(Some("Ada".into())));
        api.expect_record_attendance()
            .withf(|id, name| *id == 42 && name == "Ada")
            .times(1)
            .returning(|id, _| Ok(record(id, false)));

        let mut kiosk = Kiosk::new(api);
        let outcome = kiosk.handle_scan("42").await.unwrap();

        assert!(matches!(outcome, ScanOutcome::CheckedIn { .. }));
        assert_eq!(outcome.to_string(), "Ada has checked in!");
        assert_eq!(kiosk.last_member().map(|m| m.member_id), Some(42));
        assert_eq!(kiosk.last_record(), Some(outcome.record()));
        assert_eq!(kiosk.summary().checked_in, 1);
        assert!(kiosk.status_message().is_none());
    }

    #[tokio::test]
    async fn check_out_when_record_is_closed() {
        let mut api = MockAttendanceApi::new();
        api.expect_find_member_name().returning(|_| Ok(Some("Ada".into())));
        api.expect_record_attendance()
            .returning(|id, _| Ok(record(id, true)));

        let mut kiosk = Kiosk::new(api);
        let outcome = kiosk.handle_scan("42").await.unwrap();

        assert_eq!(outcome.to_string(), "Ada has checked out!");
        assert_eq!(kiosk.summary().checked_out, 1);
    }

    #[tokio::test]
    async fn unknown_member_shown_by_id() {
        let mut api = MockAttendanceApi::new();
        api.expect_find_member_name().returning(|_| Ok(None));
        api.expect_record_attendance()
            .withf(|_, name| name == "User ID: 7")
            .returning(|id, _| Ok(record(id, false)));

        let mut kiosk = Kiosk::new(api);
        let outcome = kiosk.handle_scan("7").await.unwrap();
        assert_eq!(outcome.member().name, "User ID: 7");
    }

    #[tokio::test]
    async fn lookup_failure_is_not_fatal() {
        let mut api = MockAttendanceApi::new();
        api.expect_find_member_name()
            .returning(|_| Err(KioskError::Attendance("search unavailable".into())));
        api.expect_record_attendance()
            .returning(|id, _| Ok(record(id, false)));

        let mut kiosk = Kiosk::new(api);
        let outcome = kiosk.handle_scan("7").await.unwrap();
        assert_eq!(outcome.to_string(), "User ID: 7 has checked in!");
    }

    #[tokio::test]
    async fn invalid_code_never_reaches_service() {
        let mut api = MockAttendanceApi::new();
        api.expect_find_member_name().never();
        api.expect_record_attendance().never();

        let mut kiosk = Kiosk::new(api);
        let err = kiosk.handle_scan("not-a-member").await.unwrap_err();

        assert_eq!(
            err.to_string(),
            "Invalid QR Code: Scanned value 'not-a-member' is not a valid User ID."
        );
        assert_eq!(kiosk.status_message(), Some(INVALID_SCAN_STATUS));
        assert_eq!(kiosk.summary().failed_scans, 1);
    }

    #[tokio::test]
    async fn service_rejection_clears_last_member() {
        let mut api = MockAttendanceApi::new();
        api.expect_find_member_name().returning(|_| Ok(Some("Ada".into())));
        let mut calls = 0;
        api.expect_record_attendance().times(2).returning(move |id, _| {
            calls += 1;
            if calls == 1 {
                Ok(record(id, false))
            } else {
                Err(KioskError::Attendance("Membership expired".into()))
            }
        });

        let mut kiosk = Kiosk::new(api);
        kiosk.handle_scan("42").await.unwrap();
        assert!(kiosk.last_member().is_some());

        let err = kiosk.handle_scan("42").await.unwrap_err();
        assert_eq!(err.to_string(), "Membership expired");
        assert!(kiosk.last_member().is_none());
        assert!(kiosk.last_record().is_some());
        assert_eq!(kiosk.status_message(), Some("Membership expired"));
    }

    #[tokio::test]
    async fn scanner_errors_map_to_notices() {
        let mut kiosk = Kiosk::new(MockAttendanceApi::new());

        let notice = kiosk.handle_scanner_error(&ScanError::NoCameraFound);
        assert!(matches!(notice, Notice::Alert(_)));

        let notice = kiosk.handle_scanner_error(&ScanError::StopFailed(DeviceError::Gone("cam0".into())));
        assert!(matches!(notice, Notice::Warning(_)));
        assert!(notice.text().contains("failed to stop scanner"));

        assert_eq!(kiosk.summary().scanner_errors, 2);
    }

    #[tokio::test]
    async fn decoded_event_becomes_success_notice() {
        let mut api = MockAttendanceApi::new();
        api.expect_find_member_name().returning(|_| Ok(Some("Ada".into())));
        api.expect_record_attendance()
            .returning(|id, _| Ok(record(id, false)));

        let mut kiosk = Kiosk::new(api);
        let notice = kiosk.handle_event(ScannerEvent::Decoded("42".into())).await;
        assert_eq!(notice, Notice::Success("Ada has checked in!".into()));

        let notice = kiosk.handle_event(ScannerEvent::Decoded("x".into())).await;
        assert!(matches!(notice, Notice::Error(_)));
    }
}
