//! Report loaders against the scriptable source

use compliance_core::{
    load_my_report, load_shared_dashboards, ComplianceConfig, ComplianceError, Destination,
    FetchError, MyReportLoad, ScientistStatus,
};
use compliance_model::{ArticleRecord, ComplianceRole, LinkedAccount, Scientist, SharedReport};
use compliance_test_utils::{
    lab_manager_user, scientist_user, unlinked_scientist_user, FakeSource, TestHarness,
    SCIENTIST_ORCID,
};
use pretty_assertions::assert_eq;
use std::time::Duration;

fn ada() -> Scientist {
    Scientist::new("s-ada", "Ada Lovelace", SCIENTIST_ORCID)
}

fn report(load: MyReportLoad) -> compliance_core::MyReport {
    match load {
        MyReportLoad::Report(report) => *report,
        MyReportLoad::Redirect(to) => panic!("unexpected redirect to {to:?}"),
    }
}

#[tokio::test]
async fn my_report_resolves_all_three_queries() {
    let source = FakeSource::new()
        .with_scientist(ada())
        .with_covered(
            SCIENTIST_ORCID,
            vec![ArticleRecord::new("a-1", true), ArticleRecord::new("a-2", false)],
        )
        .with_not_covered(SCIENTIST_ORCID, vec![ArticleRecord::new("a-3", true)]);
    let harness = TestHarness::with_source(source);
    let ctx = harness.context(scientist_user());

    let report = report(load_my_report(&ctx).unwrap());
    assert_eq!(report.orcid, SCIENTIST_ORCID);
    assert_eq!(report.role, Some(ComplianceRole::Scientist));
    assert!(!report.is_compliance_manager);
    assert!(!report.dashboard_requested);

    assert_eq!(report.covered.resolve().await.unwrap().len(), 2);
    assert_eq!(report.not_covered.resolve().await.unwrap().len(), 1);
    assert_eq!(
        ScientistStatus::classify(&report.scientist.resolve().await),
        ScientistStatus::Found(ada())
    );
    assert_eq!(harness.source.calls(), 3);
}

#[tokio::test]
async fn unknown_scientist_offers_dashboard_request() {
    let harness = TestHarness::new();
    let ctx = harness.context(scientist_user());

    let report = report(load_my_report(&ctx).unwrap());
    let status = ScientistStatus::classify(&report.scientist.resolve().await);
    assert_eq!(status, ScientistStatus::NotFound);
    assert!(status.offers_dashboard_request());
    assert_eq!(report.covered.resolve().await, Ok(vec![]));
}

#[tokio::test(start_paused = true)]
async fn slow_source_times_out() {
    let harness = TestHarness::with_source(
        FakeSource::new()
            .with_scientist(ada())
            .with_delay(Duration::from_secs(60)),
    )
    .with_config(
        ComplianceConfig::new()
            .with_public_base_url("https://example.org")
            .with_fetch_timeout(Duration::from_millis(500)),
    );
    let ctx = harness.context(scientist_user());

    let report = report(load_my_report(&ctx).unwrap());
    let outcome = report.scientist.resolve().await;
    assert_eq!(outcome, Err(FetchError::Timeout { after_ms: 500 }));
    assert_eq!(ScientistStatus::classify(&outcome), ScientistStatus::TimedOut);
    assert!(report.covered.resolve().await.unwrap_err().is_timeout());
}

#[tokio::test]
async fn upstream_failure_is_reported_per_query() {
    let harness = TestHarness::with_source(FakeSource::new().with_failing(SCIENTIST_ORCID));
    let ctx = harness.context(scientist_user());

    let report = report(load_my_report(&ctx).unwrap());
    assert!(matches!(
        ScientistStatus::classify(&report.scientist.resolve().await),
        ScientistStatus::Failed(_)
    ));
    assert!(matches!(
        report.not_covered.resolve().await,
        Err(FetchError::Upstream(_))
    ));
}

#[tokio::test]
async fn unlinked_scientist_is_sent_to_link_page() {
    let harness = TestHarness::new();
    let ctx = harness.context(unlinked_scientist_user());

    assert!(matches!(
        load_my_report(&ctx),
        Ok(MyReportLoad::Redirect(Destination::LinkOrcid))
    ));
    assert_eq!(harness.source.calls(), 0);
}

#[tokio::test]
async fn pending_orcid_counts_as_unlinked() {
    let harness = TestHarness::new();
    let user = unlinked_scientist_user()
        .with_linked_account(LinkedAccount::orcid(SCIENTIST_ORCID).pending());
    let ctx = harness.context(user);

    assert!(matches!(
        load_my_report(&ctx),
        Ok(MyReportLoad::Redirect(Destination::LinkOrcid))
    ));
}

#[tokio::test]
async fn blank_orcid_is_an_error() {
    let harness = TestHarness::new();
    let user = unlinked_scientist_user().with_linked_account(LinkedAccount::orcid("  "));
    let ctx = harness.context(user);

    assert!(matches!(
        load_my_report(&ctx),
        Err(ComplianceError::MissingOrcid)
    ));
}

#[tokio::test]
async fn shared_dashboards_skip_failures_and_keep_order() {
    let source = FakeSource::new()
        .with_scientist(Scientist::new("s-2", "Grace Hopper", "0000-2"))
        .with_scientist(Scientist::new("s-1", "Ada Lovelace", "0000-1"))
        .with_failing("0000-3");
    let harness = TestHarness::with_source(source);
    let manager = lab_manager_user();
    for orcid in ["0000-1", "0000-3", "0000-4", "0000-2"] {
        harness
            .access
            .share(manager.id.as_str(), SharedReport::new(format!("owner-{orcid}"), Some(orcid)));
    }
    harness
        .access
        .share(manager.id.as_str(), SharedReport::new("owner-none", None));
    let ctx = harness.context(manager);

    let dashboards = load_shared_dashboards(&ctx).await.unwrap();
    let names: Vec<&str> = dashboards
        .scientists
        .iter()
        .map(|s| s.full_name.as_str())
        .collect();
    assert_eq!(names, vec!["Ada Lovelace", "Grace Hopper"]);
    assert_eq!(dashboards.role, Some(ComplianceRole::LabManager));
    assert_eq!(harness.source.calls(), 4);
}

#[tokio::test]
async fn shared_dashboards_fail_when_access_store_fails() {
    let harness = TestHarness::new();
    harness
        .access
        .fail_with(Some(FetchError::upstream("access store down")));
    let ctx = harness.context(lab_manager_user());

    assert!(matches!(
        load_shared_dashboards(&ctx).await,
        Err(ComplianceError::Fetch(_))
    ));
}
