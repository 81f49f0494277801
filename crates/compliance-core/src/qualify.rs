//! Role qualification form

use crate::analytics::{EventOptions, EventPayload, TrackEvent};
use crate::context::ComplianceContext;
use crate::error::ActionError;
use crate::routing::{landing_for, Destination};
use crate::source::update_compliance_metadata;
use compliance_model::{ComplianceMetadata, ComplianceRole};

/// Record the role chosen on the qualification form
///
/// Returns where the user goes next. Store failures are logged and do not
/// fail the action.
///
/// # Errors
/// 400 validation error when `form_role` is not a known role
pub async fn qualify(ctx: &ComplianceContext, form_role: &str) -> Result<Destination, ActionError> {
    let role: ComplianceRole = form_role
        .parse()
        .map_err(|_| ActionError::validation(format!("Invalid role: {}", form_role.trim())))?;
    let previous = ctx.user.role();

    update_compliance_metadata(
        ctx.services.users.as_ref(),
        &ctx.user.id,
        &ComplianceMetadata::role(role),
    )
    .await;

    let previous_value = previous.map_or(serde_json::Value::Null, |r| r.as_str().into());
    ctx.services.analytics.emit(
        TrackEvent::RoleQualified,
        EventPayload::new()
            .with("role", role.as_str())
            .with("userId", ctx.user.id.as_str())
            .with("autoSet", false)
            .with_compliance_role(Some(role))
            .with("previousComplianceRole", previous_value),
        EventOptions::default(),
    );

    tracing::info!(user_id = %ctx.user.id, %role, ?previous, "compliance role qualified");
    Ok(landing_for(role, ctx.user.is_compliance_admin()))
}
