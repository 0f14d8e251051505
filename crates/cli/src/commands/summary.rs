use rfqdesk_core::collaborators::ProjectDirectory;
use rfqdesk_core::domain::rfq::RfqId;
use rfqdesk_core::invitation::SummaryRenderer;
use rfqdesk_db::repositories::{SqlDirectory, SqlRfqRepository};
use rfqdesk_db::RfqRepository;

use crate::commands::{migrated_pool, prepare, CommandResult, StepFailure};

/// Prints the invitation text suppliers would receive for `rfq_id`, without
/// sending anything.
pub fn run(rfq_id: &str) -> CommandResult {
    let (config, runtime) = match prepare("summary") {
        Ok(prepared) => prepared,
        Err(failure) => return failure,
    };

    let result = runtime.block_on(async {
        let renderer = SummaryRenderer::new(&config.notifications.response_base_url)
            .map_err(|error| ("render", error.to_string(), 8u8))?;
        let pool = migrated_pool(&config).await?;
        let outcome = render(&pool, &renderer, &RfqId(rfq_id.trim().to_owned())).await;
        pool.close().await;
        outcome
    });

    match result {
        Ok(text) => CommandResult::success("summary", text),
        Err(failure) => CommandResult::from_step("summary", failure),
    }
}

async fn render(
    pool: &rfqdesk_db::DbPool,
    renderer: &SummaryRenderer,
    rfq_id: &RfqId,
) -> Result<String, StepFailure> {
    let rfq = SqlRfqRepository::new(pool.clone())
        .find_by_id(rfq_id)
        .await
        .map_err(|error| ("storage", error.to_string(), 4u8))?
        .ok_or_else(|| ("not_found", format!("rfq `{rfq_id}` was not found"), 7u8))?;

    let project = SqlDirectory::new(pool.clone())
        .get_project(&rfq.project_id)
        .await
        .map_err(|error| ("storage", error.to_string(), 4u8))?
        .ok_or_else(|| {
            ("not_found", format!("project `{}` was not found", rfq.project_id.0), 7u8)
        })?;

    let summary = renderer
        .compose_summary(&rfq, &project)
        .map_err(|error| ("render", error.to_string(), 8u8))?;

    Ok(format!("Subject: {}\n\n{}", summary.subject, summary.body))
}
