//! Feature layout loader feeding the menu reconciler

use compliance_core::{
    load_layout, FetchError, LayoutData, LayoutDecision, MenuReconciler, MenuSnapshot,
    ReconcilePhase,
};
use compliance_model::{LinkedAccount, Scientist, SharedReport, ORCID_PROVIDER};
use compliance_test_utils::{
    admin_user, lab_manager_user, scientist_user, unlinked_scientist_user, unqualified_user,
    FakeSource, TestHarness, SCIENTIST_ORCID,
};
use std::time::Duration;

fn rendered(decision: LayoutDecision) -> LayoutData {
    match decision {
        LayoutDecision::Render(layout) => *layout,
        LayoutDecision::Redirect(to) => panic!("unexpected redirect to {to}"),
    }
}

fn redirect(decision: LayoutDecision) -> String {
    match decision {
        LayoutDecision::Redirect(to) => to,
        LayoutDecision::Render(_) => panic!("expected a redirect"),
    }
}

async fn settle(reconciler: &MenuReconciler) -> MenuSnapshot {
    let mut updates = reconciler.subscribe();
    let snapshot = tokio::time::timeout(
        Duration::from_secs(5),
        updates.wait_for(|s| s.phase != ReconcilePhase::Resolving),
    )
    .await
    .expect("reconciler settled in time")
    .expect("reconciler alive")
    .clone();
    snapshot
}

#[tokio::test]
async fn redirect_table() {
    let harness = TestHarness::new();

    let ctx = harness.context(unqualified_user());
    assert_eq!(
        redirect(load_layout(&ctx, "/app/compliance/reports/me")),
        "/app/compliance/qualify"
    );

    let ctx = harness.context(scientist_user());
    assert_eq!(
        redirect(load_layout(&ctx, "/app/compliance")),
        "/app/compliance/reports/me"
    );

    let ctx = harness.context(unlinked_scientist_user());
    assert_eq!(
        redirect(load_layout(&ctx, "/app/compliance/reports/me")),
        "/app/compliance/reports/me/link"
    );

    let ctx = harness.context(lab_manager_user());
    assert_eq!(
        redirect(load_layout(&ctx, "/app/compliance/reports")),
        "/app/compliance/shared"
    );

    let ctx = harness.context(admin_user());
    assert_eq!(
        redirect(load_layout(&ctx, "/app/compliance/")),
        "/app/compliance/scientists"
    );

    assert_eq!(harness.source.calls(), 0);
}

#[tokio::test]
async fn existence_check_skipped_without_orcid() {
    let harness = TestHarness::new();
    let ctx = harness.context(unlinked_scientist_user());

    let layout = rendered(load_layout(&ctx, "/app/compliance/reports/me/link"));
    assert!(layout.show_secondary_nav);
    assert!(!layout.identity.orcid_linked());
    assert_eq!(layout.exists_in_source.resolve().await, Ok(false));
    assert_eq!(layout.shared_reports.resolve().await, Ok(vec![]));
    assert_eq!(harness.source.calls(), 0);
    assert!(layout.menu.entry("link-orcid").is_some());
}

#[tokio::test]
async fn confirmed_orcid_without_identifier_renders_my_report() {
    let harness = TestHarness::new();
    let user = unlinked_scientist_user().with_linked_account(LinkedAccount {
        provider: ORCID_PROVIDER.to_string(),
        id_at_provider: None,
        pending: false,
    });
    let ctx = harness.context(user);

    let layout = rendered(load_layout(&ctx, "/app/compliance/reports/me"));
    assert!(layout.identity.orcid_linked());
    assert!(layout.menu.entry("my-dashboard").is_some());
    assert!(layout.menu.entry("link-orcid").is_none());
    assert_eq!(layout.exists_in_source.resolve().await, Ok(false));
    assert_eq!(harness.source.calls(), 0);
}

#[tokio::test]
async fn qualify_page_has_no_secondary_nav() {
    let harness = TestHarness::new();
    let ctx = harness.context(unqualified_user());

    let layout = rendered(load_layout(&ctx, "/app/compliance/qualify"));
    assert!(!layout.show_secondary_nav);
    assert_eq!(layout.menu.entry("wizard").map(|e| e.url.as_str()), Some("/app/task/compliance-wizard"));
}

#[tokio::test]
async fn layout_inputs_drive_the_menu() {
    let harness = TestHarness::with_source(
        FakeSource::new().with_scientist(Scientist::new("s-ada", "Ada Lovelace", SCIENTIST_ORCID)),
    );
    let user = scientist_user();
    harness.access.share(
        user.id.as_str(),
        SharedReport::new("u-grace", Some("0000-2")).with_owner_name("Grace Hopper"),
    );
    let ctx = harness.context(user);

    let layout = rendered(load_layout(&ctx, "/app/compliance/reports/me"));
    assert!(layout.menu.entry("my-dashboard").is_some());
    assert!(layout.menu.entry("share").is_none());

    let reconciler = MenuReconciler::new(ctx.config());
    reconciler.submit(layout.into_inputs()).unwrap();
    let snapshot = settle(&reconciler).await;

    assert_eq!(snapshot.phase, ReconcilePhase::Committed);
    assert!(snapshot.menu.entry("share").is_some());
    assert_eq!(
        snapshot.menu.entry("shared-0000-2").map(|e| e.url.as_str()),
        Some("/app/compliance/shared/reports/0000-2")
    );
    assert_eq!(harness.source.calls(), 1);
}

#[tokio::test]
async fn renavigation_keeps_the_committed_menu() {
    let harness = TestHarness::with_source(
        FakeSource::new().with_scientist(Scientist::new("s-ada", "Ada Lovelace", SCIENTIST_ORCID)),
    );
    let ctx = harness.context(scientist_user());
    let reconciler = MenuReconciler::new(ctx.config());

    reconciler
        .submit(rendered(load_layout(&ctx, "/app/compliance/reports/me")).into_inputs())
        .unwrap();
    let first = settle(&reconciler).await;

    let token = reconciler
        .submit(rendered(load_layout(&ctx, "/app/compliance/shared/reports/0000-9")).into_inputs())
        .unwrap();
    assert!(!token.reset());
    assert!(!reconciler.snapshot().fallback);

    let second = settle(&reconciler).await;
    assert_eq!(second.generation, token.generation());
    assert_eq!(second.menu, first.menu);
}

#[tokio::test]
async fn access_store_failure_leaves_minimal_menu() {
    let harness = TestHarness::new();
    harness
        .access
        .fail_with(Some(FetchError::upstream("access store down")));
    let ctx = harness.context(lab_manager_user());

    let layout = rendered(load_layout(&ctx, "/app/compliance/shared"));
    let reconciler = MenuReconciler::new(ctx.config());
    reconciler.submit(layout.into_inputs()).unwrap();

    let snapshot = settle(&reconciler).await;
    assert_eq!(snapshot.phase, ReconcilePhase::Minimal);
    assert!(snapshot.fallback);
    assert!(snapshot.menu.entry("shared").is_some());
}
