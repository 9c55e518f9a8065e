mod common;

use std::sync::atomic::Ordering;
use std::sync::Arc;

use tokio::sync::{mpsc, Notify};

use common::{domain_finding, session_as, upload, FakeBackend, ENGAGEMENT};
use taxops::errors::{ErrorKind, TaxopsError};
use taxops::findings::FindingFilter;
use taxops::models::{
    Domain, FindingSeverity, FindingStatus, ModuleStatus, Role, SeverityRank, UploadFile,
    UploadKind, UploadStatus,
};
use taxops::workflow::{ResourceKind, WorkflowController, WorkflowEvent};

async fn controller(backend: &Arc<FakeBackend>, role: Role) -> WorkflowController {
    let session = session_as(role).await;
    WorkflowController::new(ENGAGEMENT, backend.clone(), session)
}

fn csv() -> Option<UploadFile> {
    Some(UploadFile::new("gl.csv", b"account,amount\n1000,5\n".to_vec()))
}

#[tokio::test]
async fn test_load_workflow_populates_every_resource() {
    let backend = Arc::new(FakeBackend::new());
    let ctl = controller(&backend, Role::Manager).await;

    let report = ctl.load_workflow().await.unwrap();
    assert!(report.is_complete());
    assert_eq!(report.loaded.len(), 4);

    let state = ctl.snapshot().await;
    assert_eq!(state.engagement.data.as_ref().unwrap().id, ENGAGEMENT);
    assert_eq!(state.uploads.data.as_ref().unwrap().len(), 2);
    assert_eq!(state.modules.data.as_ref().unwrap().len(), 3);
    assert_eq!(state.findings.data.as_ref().unwrap().len(), 3);
    assert!(!state.modules.loading);
}

#[tokio::test]
async fn test_partial_load_failure_keeps_other_resources() {
    let backend = Arc::new(FakeBackend::new());
    backend.fail("uploads", 500);
    let ctl = controller(&backend, Role::Manager).await;

    let report = ctl.load_workflow().await.unwrap();
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].0, ResourceKind::Uploads);
    assert!(report.failed[0].1.retryable);

    let state = ctl.snapshot().await;
    assert!(state.uploads.data.is_none());
    assert_eq!(state.uploads.error.as_ref().unwrap().kind, ErrorKind::Api);
    assert!(state.modules.is_loaded());
    assert!(state.findings.is_loaded());
}

#[tokio::test]
async fn test_failed_refresh_keeps_previous_modules() {
    let backend = Arc::new(FakeBackend::new());
    let ctl = controller(&backend, Role::Manager).await;
    ctl.refresh_modules().await.unwrap();

    backend.fail("modules", 502);
    assert!(ctl.refresh_modules().await.is_err());

    let state = ctl.snapshot().await;
    assert_eq!(state.modules.data.as_ref().unwrap().len(), 3);
    assert!(state.modules.error.is_some());
}

#[tokio::test]
async fn test_run_module_reconciles_with_server_state() {
    let backend = Arc::new(FakeBackend::new());
    let ctl = controller(&backend, Role::Manager).await;
    ctl.refresh_modules().await.unwrap();
    let fetches_before = backend.module_fetches.load(Ordering::SeqCst);

    let outcome = ctl.run_module("m1").await.unwrap();
    assert_eq!(outcome.run_id, "run-m1");
    assert_eq!(outcome.module.as_ref().unwrap().status, ModuleStatus::Completed);
    assert!(outcome.reconcile_error.is_none());
    assert_eq!(backend.module_fetches.load(Ordering::SeqCst), fetches_before + 1);

    let state = ctl.snapshot().await;
    assert!(state.pending.is_empty());
    assert_eq!(state.module("m1").unwrap().status, ModuleStatus::Completed);
    assert!(!ctl.run_in_flight("m1"));
}

#[tokio::test]
async fn test_run_settling_in_error_is_reported_as_is() {
    let backend = Arc::new(FakeBackend::new());
    *backend.run_result.lock().unwrap() = ModuleStatus::Error;
    let ctl = controller(&backend, Role::Partner).await;
    ctl.refresh_modules().await.unwrap();

    let outcome = ctl.run_module("m1").await.unwrap();
    assert_eq!(outcome.module.unwrap().status, ModuleStatus::Error);

    // An errored module may be run again.
    let views = ctl.module_views().await;
    let m1 = views.iter().find(|v| v.id == "m1").unwrap();
    assert!(m1.run_enabled);
}

#[tokio::test]
async fn test_duplicate_run_rejected_while_in_flight() {
    let backend = Arc::new(FakeBackend::new());
    let gate = Arc::new(Notify::new());
    *backend.run_gate.lock().unwrap() = Some(gate.clone());
    let ctl = controller(&backend, Role::Owner).await;
    ctl.refresh_modules().await.unwrap();

    let (first, second, views) = tokio::join!(
        ctl.run_module("m1"),
        ctl.run_module("m1"),
        async {
            tokio::task::yield_now().await;
            let views = ctl.module_views().await;
            gate.notify_one();
            views
        }
    );

    assert!(first.is_ok());
    assert!(matches!(second, Err(TaxopsError::RunInFlight(_))));
    assert_eq!(backend.run_calls.load(Ordering::SeqCst), 1);

    let pending = views.iter().find(|v| v.id == "m1").unwrap();
    assert!(pending.pending);
    assert_eq!(pending.status, ModuleStatus::Running);
    assert!(!pending.run_enabled);
}

#[tokio::test]
async fn test_server_side_running_module_rejected_without_call() {
    let backend = Arc::new(FakeBackend::new());
    let ctl = controller(&backend, Role::Manager).await;
    ctl.refresh_modules().await.unwrap();

    let err = ctl.run_module("m3").await.unwrap_err();
    assert!(matches!(err, TaxopsError::RunInFlight(_)));
    assert_eq!(backend.run_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_senior_cannot_run_modules() {
    let backend = Arc::new(FakeBackend::new());
    let ctl = controller(&backend, Role::Senior).await;
    ctl.refresh_modules().await.unwrap();

    let err = ctl.run_module("m1").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Permission);
    assert_eq!(backend.run_calls.load(Ordering::SeqCst), 0);
    assert!(ctl.module_views().await.iter().all(|v| !v.run_enabled));
}

#[tokio::test]
async fn test_client_admin_can_upload_but_not_review() {
    let backend = Arc::new(FakeBackend::new());
    let ctl = controller(&backend, Role::ClientAdmin).await;
    ctl.refresh_uploads().await.unwrap();

    assert!(ctl.upload_file(UploadKind::GeneralLedger, csv(), None).await.is_ok());
    let err = ctl.update_finding_status("f1", FindingStatus::Closed).await.unwrap_err();
    assert!(matches!(err, TaxopsError::Permission(_)));
    assert_eq!(backend.call_count("update_finding"), 0);
}

#[tokio::test]
async fn test_blocked_module_runs_only_after_ingest() {
    let backend = Arc::new(FakeBackend::new());
    let ctl = controller(&backend, Role::Manager).await;
    ctl.refresh_modules().await.unwrap();
    ctl.refresh_uploads().await.unwrap();

    let err = ctl.run_module("m2").await.unwrap_err();
    assert!(matches!(err, TaxopsError::ModuleBlocked(_)));
    assert_eq!(backend.run_calls.load(Ordering::SeqCst), 0);
    let m2 = ctl.module_views().await.into_iter().find(|v| v.id == "m2").unwrap();
    assert!(!m2.run_enabled);

    ctl.upload_file(UploadKind::GeneralLedger, csv(), None).await.unwrap();
    let m2 = ctl.module_views().await.into_iter().find(|v| v.id == "m2").unwrap();
    assert!(m2.run_enabled);

    ctl.run_module("m2").await.unwrap();
    assert_eq!(backend.run_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_module_blocked_again_needs_another_ingest() {
    let backend = Arc::new(FakeBackend::new());
    *backend.run_result.lock().unwrap() = ModuleStatus::Blocked;
    let ctl = controller(&backend, Role::Partner).await;
    ctl.refresh_modules().await.unwrap();
    ctl.refresh_uploads().await.unwrap();

    ctl.upload_file(UploadKind::GeneralLedger, csv(), None).await.unwrap();
    let outcome = ctl.run_module("m2").await.unwrap();
    assert_eq!(outcome.module.unwrap().status, ModuleStatus::Blocked);

    let err = ctl.run_module("m2").await.unwrap_err();
    assert!(matches!(err, TaxopsError::ModuleBlocked(_)));
    assert_eq!(backend.run_calls.load(Ordering::SeqCst), 1);

    ctl.upload_file(UploadKind::GeneralLedger, csv(), None).await.unwrap();
    ctl.run_module("m2").await.unwrap();
    assert_eq!(backend.run_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_upload_not_yet_ingested_leaves_block_in_place() {
    let backend = Arc::new(FakeBackend::new());
    *backend.upload_record.lock().unwrap() = Some(upload("u2", "GL", UploadStatus::Uploaded));
    let ctl = controller(&backend, Role::Manager).await;
    ctl.refresh_modules().await.unwrap();
    ctl.refresh_uploads().await.unwrap();
    ctl.refresh_findings().await.unwrap();

    ctl.upload_file(UploadKind::GeneralLedger, csv(), None).await.unwrap();
    let state = ctl.snapshot().await;
    assert_eq!(state.ingest_epoch, 0);
    assert!(!state.findings.stale);

    let err = ctl.run_module("m2").await.unwrap_err();
    assert!(matches!(err, TaxopsError::ModuleBlocked(_)));
    assert_eq!(backend.run_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_upload_without_file_fails_locally() {
    let backend = Arc::new(FakeBackend::new());
    let ctl = controller(&backend, Role::Manager).await;

    let err = ctl.upload_file(UploadKind::TrialBalance, None, None).await.unwrap_err();
    assert!(matches!(err, TaxopsError::Validation(_)));

    let empty = Some(UploadFile::new("empty.csv", Vec::new()));
    let err = ctl.upload_file(UploadKind::TrialBalance, empty, None).await.unwrap_err();
    assert!(matches!(err, TaxopsError::Validation(_)));
    assert_eq!(backend.call_count("upload"), 0);
}

#[tokio::test]
async fn test_upload_updates_only_matching_record_and_marks_findings_stale() {
    let backend = Arc::new(FakeBackend::new());
    let (tx, mut rx) = mpsc::unbounded_channel();
    let session = session_as(Role::Senior).await;
    let ctl = WorkflowController::new(ENGAGEMENT, backend.clone(), session).with_event_channel(tx);
    ctl.refresh_uploads().await.unwrap();
    ctl.refresh_findings().await.unwrap();

    let summary = ctl.upload_file(UploadKind::GeneralLedger, csv(), None).await.unwrap();
    assert_eq!(summary.total_records(), 12);

    let state = ctl.snapshot().await;
    let uploads = state.uploads.data.as_ref().unwrap();
    assert_eq!(uploads[0].status, UploadStatus::Ingested);
    assert_eq!(uploads[0].updated_at, "1d ago");
    assert_eq!(uploads[1].status, UploadStatus::Ingested);
    assert_eq!(uploads[1].updated_at, "just now");
    assert!(state.findings.stale);
    assert_eq!(state.ingest_epoch, 1);
    assert!(ctl.findings_view(&FindingFilter::all()).await.stale);

    drop(ctl);
    let mut saw_stale = false;
    while let Some(event) = rx.recv().await {
        if matches!(event, WorkflowEvent::FindingsStale) {
            saw_stale = true;
        }
    }
    assert!(saw_stale);
}

#[tokio::test]
async fn test_upload_response_record_replaces_entry() {
    let backend = Arc::new(FakeBackend::new());
    *backend.upload_record.lock().unwrap() = Some(upload("u2", "GL", UploadStatus::Uploaded));
    let ctl = controller(&backend, Role::Manager).await;
    ctl.refresh_uploads().await.unwrap();

    ctl.upload_file(UploadKind::GeneralLedger, csv(), None).await.unwrap();
    let state = ctl.snapshot().await;
    let uploads = state.uploads.data.as_ref().unwrap();
    assert_eq!(uploads.len(), 2);
    assert_eq!(uploads[1].status, UploadStatus::Uploaded);
}

#[tokio::test]
async fn test_status_change_visible_after_refetch() {
    let backend = Arc::new(FakeBackend::new());
    let ctl = controller(&backend, Role::Senior).await;
    ctl.refresh_findings().await.unwrap();

    ctl.update_finding_status("f1", FindingStatus::InReview).await.unwrap();
    assert_eq!(backend.call_count("findings"), 2);

    let state = ctl.snapshot().await;
    let f1 = state.findings.data.as_ref().unwrap().iter().find(|f| f.id == "f1").unwrap();
    assert_eq!(f1.status, Some(FindingStatus::InReview));
}

#[tokio::test]
async fn test_unauthorized_response_signs_out() {
    let backend = Arc::new(FakeBackend::new());
    backend.fail("modules", 401);
    let session = session_as(Role::Manager).await;
    let ctl = WorkflowController::new(ENGAGEMENT, backend.clone(), session.clone());

    assert!(ctl.refresh_modules().await.is_err());
    assert!(!session.is_authenticated().await);

    let err = ctl.refresh_findings().await.unwrap_err();
    assert!(matches!(err, TaxopsError::AuthRequired(_)));
}

#[tokio::test]
async fn test_closed_view_applies_nothing() {
    let backend = Arc::new(FakeBackend::new());
    let ctl = controller(&backend, Role::Manager).await;
    ctl.close();

    let err = ctl.load_workflow().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Cancelled);
    assert!(!ctl.snapshot().await.modules.is_loaded());
    assert_eq!(backend.module_fetches.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_close_during_run_discards_result() {
    let backend = Arc::new(FakeBackend::new());
    let gate = Arc::new(Notify::new());
    *backend.run_gate.lock().unwrap() = Some(gate.clone());
    let ctl = controller(&backend, Role::Manager).await;
    ctl.refresh_modules().await.unwrap();

    let (result, _) = tokio::join!(ctl.run_module("m1"), async {
        tokio::task::yield_now().await;
        ctl.close();
    });
    assert!(matches!(result, Err(TaxopsError::Cancelled(_))));
    // The claim is released even though the view is gone.
    assert!(!ctl.run_in_flight("m1"));
    assert_eq!(ctl.snapshot().await.module("m1").unwrap().status, ModuleStatus::NotStarted);
}

#[tokio::test]
async fn test_domain_findings_isolate_failures() {
    let backend = Arc::new(FakeBackend::new());
    backend
        .domain_findings
        .lock()
        .unwrap()
        .insert(Domain::Bank, vec![domain_finding("b1", FindingSeverity::High)]);
    backend.fail("payroll", 500);
    let ctl = controller(&backend, Role::Manager).await;
    ctl.refresh_findings().await.unwrap();

    let report = ctl.load_domain_findings(&[Domain::Bank, Domain::Payroll]).await.unwrap();
    assert_eq!(report.loaded, vec![ResourceKind::DomainFindings(Domain::Bank)]);
    assert_eq!(report.failed[0].0, ResourceKind::DomainFindings(Domain::Payroll));

    let view = ctl.findings_view(&FindingFilter::all().with_domain("bank")).await;
    assert_eq!(view.findings.len(), 1);
    assert_eq!(view.findings[0].domain, "bank");
    assert_eq!(view.loaded, 4);
    assert_eq!(view.domain_options, vec!["Cash".to_string(), "bank".to_string()]);
}

#[tokio::test]
async fn test_findings_view_filters_by_rank() {
    let backend = Arc::new(FakeBackend::new());
    let ctl = controller(&backend, Role::Manager).await;
    ctl.refresh_findings().await.unwrap();

    let view = ctl.findings_view(&FindingFilter::all().with_severity(SeverityRank::High)).await;
    assert_eq!(view.findings.len(), 1);
    assert_eq!(view.findings[0].id, "f3");
    assert_eq!(view.overall.total, 3);
    assert_eq!(view.overall.open, 2);
}

#[tokio::test]
async fn test_summary_drift_detected() {
    let backend = Arc::new(FakeBackend::new());
    let ctl = controller(&backend, Role::Manager).await;
    ctl.load_workflow().await.unwrap();
    // Server says 2 open / 1 high; loaded findings agree.
    assert!(ctl.summary_drift().await.is_none());

    backend.engagement.lock().unwrap().summary.findings_open = 7;
    ctl.load_engagement().await.unwrap();
    let drift = ctl.summary_drift().await.unwrap();
    assert_eq!(drift.server_open, 7);
    assert_eq!(drift.computed_open, 2);
}
