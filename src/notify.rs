use tracing::info;

/// Template data for the approval mail sent to a leave request's approvers.
#[derive(Debug, Clone)]
pub struct ApprovalMail {
    pub employee_name: String,
    pub category: String,
    pub days: f64,
    pub start_date: String,
    pub end_date: String,
}

/// Best-effort notification collaborator. Delivery is fire-and-forget:
/// callers spawn this and a failure never rolls back the request it
/// announces. The actual mail transport lives outside this service; here
/// the hand-off is recorded in the log.
pub async fn send_approval_notification(
    recipients: Vec<String>,
    mail: ApprovalMail,
) -> anyhow::Result<()> {
    if recipients.is_empty() {
        anyhow::bail!("no recipients for approval notification");
    }

    info!(
        recipients = ?recipients,
        employee = %mail.employee_name,
        category = %mail.category,
        days = mail.days,
        start_date = %mail.start_date,
        end_date = %mail.end_date,
        "approval notification queued"
    );

    Ok(())
}
