//! Kiosk event loop over a scripted scanner

use async_trait::async_trait;
use chrono::NaiveDate;
use parking_lot::Mutex;
use scan_core::{ScannerConfig, ScannerStatus};
use scan_kiosk::{AttendanceApi, AttendanceRecord, Kiosk, KioskError, KioskSummary, Notice};
use scan_test_utils::{spawn_scanner, FakeCameraBackend};
use std::collections::HashSet;
use std::sync::Arc;

/// Toggles members in and out; member 13 is rejected
#[derive(Default)]
struct StubService {
    inside: Mutex<HashSet<i64>>,
}

#[async_trait]
impl AttendanceApi for StubService {
    async fn find_member_name(&self, member_id: i64) -> scan_kiosk::Result<Option<String>> {
        Ok((member_id == 42).then(|| "Ada".to_string()))
    }

    async fn record_attendance(&self, member_id: i64, _member_name: &str) -> scan_kiosk::Result<AttendanceRecord> {
        if member_id == 13 {
            return Err(KioskError::Attendance("Membership expired".into()));
        }
        let check_in = NaiveDate::from_ymd_opt(2024, 5, 1)
            .and_then(|d| d.and_hms_opt(7, 30, 0))
            .unwrap();
        let was_inside = !self.inside.lock().insert(member_id);
        if was_inside {
            self.inside.lock().remove(&member_id);
        }
        Ok(AttendanceRecord {
            attendance_id: 1,
            user_id: member_id,
            user_name: String::new(),
            check_in_time: check_in,
            check_out_time: was_inside.then_some(check_in),
            time_spent_minutes: was_inside.then_some(0),
        })
    }
}

#[tokio::test(start_paused = true)]
async fn test_kiosk_processes_scans_until_scanner_closes() {
    let fake = FakeCameraBackend::with_cameras(&["cam0"]);
    let (scanner, events) = spawn_scanner(&fake, ScannerConfig::default());

    let notices = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&notices);
    let kiosk = tokio::spawn(
        Kiosk::new(StubService::default()).run(events, move |notice: &Notice| sink.lock().push(notice.clone())),
    );

    scanner.set_desired_active(true).unwrap();
    for code in ["42", "42", "abc", "13", "7"] {
        scanner
            .wait_for(|s| s.status == ScannerStatus::Running)
            .await
            .unwrap();
        fake.emit_decoded(code);
        scanner.wait_for_status(ScannerStatus::CoolingDown).await.unwrap();
    }
    scanner.shutdown().await;

    let summary = kiosk.await.unwrap();
    assert_eq!(
        summary,
        KioskSummary {
            checked_in: 2,
            checked_out: 1,
            failed_scans: 2,
            scanner_errors: 0,
        }
    );

    let notices = notices.lock().clone();
    assert_eq!(
        notices,
        vec![
            Notice::Success("Ada has checked in!".into()),
            Notice::Success("Ada has checked out!".into()),
            Notice::Error("Invalid QR Code: Scanned value 'abc' is not a valid User ID.".into()),
            Notice::Error("Membership expired".into()),
            Notice::Success("User ID: 7 has checked in!".into()),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_kiosk_reports_camera_problems() {
    let fake = FakeCameraBackend::without_cameras();
    let (scanner, events) = spawn_scanner(&fake, ScannerConfig::default());

    let notices = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&notices);
    let kiosk = tokio::spawn(
        Kiosk::new(StubService::default()).run(events, move |notice: &Notice| sink.lock().push(notice.clone())),
    );

    scanner.set_desired_active(true).unwrap();
    scanner.wait_for_status(ScannerStatus::Failed).await.unwrap();
    scanner.shutdown().await;

    let summary = kiosk.await.unwrap();
    assert_eq!(summary.scanner_errors, 1);
    assert_eq!(
        notices.lock().clone(),
        vec![Notice::Alert("no cameras found".into())]
    );
}
