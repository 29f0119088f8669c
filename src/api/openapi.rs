//! OpenAPI documentation

use axum::Router;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{borrowers, catalog, copies, health, inventory, items, loans};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Bookbank API",
        version = "1.0.0",
        description = "School textbook lending pool REST API",
        license(name = "AGPL-3.0", url = "https://www.gnu.org/licenses/agpl-3.0.html")
    ),
    servers(
        (url = "/api/v1", description = "API v1")
    ),
    paths(
        // Health
        health::health_check,
        health::readiness_check,
        // Items
        items::list_items,
        items::get_item,
        items::create_item,
        items::update_item,
        items::delete_item,
        // Copies
        items::list_copies,
        items::mint_copies,
        copies::get_copy,
        copies::update_copy,
        // Loans
        loans::list_loans,
        loans::get_loan,
        loans::open_loan,
        loans::update_loan,
        // Inventory
        inventory::reconcile,
        inventory::get_stats,
        // Reference data
        catalog::list_subjects,
        catalog::get_checklist,
        // Borrowers
        borrowers::list_borrowers,
        borrowers::create_borrower,
    ),
    components(
        schemas(
            // Items
            crate::models::item::Item,
            crate::models::item::CreateItem,
            crate::models::item::UpdateItem,
            // Copies
            crate::models::copy::BookCopy,
            crate::models::copy::MintCopies,
            crate::models::copy::UpdateCopy,
            crate::models::condition::ConditionSnapshot,
            crate::models::condition::ChecklistPart,
            // Loans
            crate::models::loan::Loan,
            crate::models::loan::LoanStatus,
            crate::models::loan::LoanState,
            crate::models::loan::LoanDetails,
            crate::models::loan::OpenLoan,
            crate::models::loan::LoanPatch,
            // Inventory
            crate::models::inventory::CounterDrift,
            crate::models::inventory::ReconcileRequest,
            crate::models::inventory::ReconcileReport,
            crate::models::inventory::InventorySummary,
            // Reference data
            crate::models::subject::Subject,
            crate::models::borrower::Borrower,
            crate::models::borrower::CreateBorrower,
            // Health
            health::HealthResponse,
            // Errors
            crate::error::ErrorResponse,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "items", description = "Textbook titles"),
        (name = "copies", description = "Physical copies and their condition"),
        (name = "loans", description = "Hand-outs, returns and substitutions"),
        (name = "inventory", description = "Counter reconciliation and figures"),
        (name = "catalog", description = "Subjects and condition checklist"),
        (name = "borrowers", description = "Students copies are lent to")
    )
)]
pub struct ApiDoc;

/// Create the OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
