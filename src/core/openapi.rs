use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::features::classification::WasteLabel;
use crate::features::points::{dtos as points_dtos, handlers as points_handlers};
use crate::features::reports::{
    dtos as reports_dtos, handlers as reports_handlers, models as reports_models,
};
use crate::shared::types::Meta;

#[derive(OpenApi)]
#[openapi(
    paths(
        // Reports
        reports_handlers::submit_report,
        reports_handlers::list_my_reports,
        reports_handlers::list_reports,
        reports_handlers::get_report,
        reports_handlers::update_report_status,
        reports_handlers::upvote_report,
        // Points
        points_handlers::get_my_points,
        points_handlers::get_leaderboard,
        points_handlers::reconcile_user_points,
    ),
    components(
        schemas(
            // Shared
            Meta,
            WasteLabel,
            reports_models::ReportStatus,
            reports_dtos::ReportResponseDto,
            reports_dtos::ClassificationDto,
            reports_dtos::SubmitReportDto,
            reports_dtos::SubmitReportResponseDto,
            reports_dtos::UpdateReportStatusDto,
            points_dtos::PointsTotalDto,
            points_dtos::LeaderboardEntryDto,
        )
    ),
    tags(
        (name = "reports", description = "Waste report submission and moderation"),
        (name = "points", description = "Points totals and leaderboard"),
    ),
    modifiers(&SecurityAddon),
    info(
        title = "Wastewise API",
        version = "0.1.0",
        description = "Waste report submission, classification and points",
    )
)]
pub struct ApiDoc;

/// Adds Bearer JWT security scheme to OpenAPI spec
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// Modifier to override OpenAPI info from config
pub struct SwaggerInfoModifier {
    pub title: String,
    pub version: String,
    pub description: String,
}

impl Modify for SwaggerInfoModifier {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        openapi.info.title = self.title.clone();
        openapi.info.version = self.version.clone();
        openapi.info.description = Some(self.description.clone());
    }
}
