//! OpenAPI documentation

use axum::Router;
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{auth, books, borrows, health, notifications, payments, reports, students};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Libris API",
        version = "0.3.0",
        description = "Library management REST API: catalog, students, borrowing, fines and notifications"
    ),
    servers(
        (url = "/api/v1", description = "API v1")
    ),
    paths(
        // Health
        health::health_check,
        health::readiness_check,
        // Auth
        auth::login,
        auth::me,
        // Books
        books::list_books,
        books::get_book,
        books::create_book,
        books::update_book,
        books::delete_book,
        // Students
        students::list_students,
        students::get_student,
        students::create_student,
        students::update_student,
        students::delete_student,
        // Borrows
        borrows::list_borrows,
        borrows::list_student_borrows,
        borrows::get_borrow,
        borrows::create_borrow,
        borrows::return_borrow,
        // Payments
        payments::list_payments,
        payments::create_payment,
        payments::get_student_balance,
        // Notifications
        notifications::list_notifications,
        notifications::list_student_notifications,
        notifications::send_notification,
        notifications::mark_notification_read,
        // Reports
        reports::get_summary,
        reports::get_overdue,
    ),
    components(
        schemas(
            // Auth
            crate::models::user::LoginRequest,
            crate::models::user::LoginResponse,
            crate::models::user::User,
            crate::models::user::Identity,
            // Books
            crate::models::book::Book,
            crate::models::book::BookQuery,
            crate::models::book::CreateBook,
            crate::models::book::UpdateBook,
            // Students
            crate::models::student::Student,
            crate::models::student::StudentShort,
            crate::models::student::StudentQuery,
            crate::models::student::CreateStudent,
            crate::models::student::UpdateStudent,
            // Borrows
            crate::models::borrow::Borrow,
            crate::models::borrow::BorrowDetails,
            crate::models::borrow::BorrowQuery,
            crate::models::borrow::CreateBorrow,
            // Payments
            crate::models::payment::Payment,
            crate::models::payment::PaymentQuery,
            crate::models::payment::CreatePayment,
            crate::models::payment::StudentBalance,
            // Notifications
            crate::models::notification::Notification,
            crate::models::notification::CreateNotification,
            // Reports
            crate::models::report::SummaryReport,
            crate::models::report::BookTotals,
            crate::models::report::StudentTotals,
            crate::models::report::BorrowTotals,
            crate::models::report::FinanceTotals,
            // Health
            health::HealthResponse,
            // Errors
            crate::error::ErrorResponse,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "auth", description = "Authentication endpoints"),
        (name = "books", description = "Catalog management"),
        (name = "students", description = "Student accounts"),
        (name = "borrows", description = "Borrowing and returns"),
        (name = "payments", description = "Fine payments"),
        (name = "notifications", description = "Messages to students"),
        (name = "reports", description = "Library reports")
    )
)]
pub struct ApiDoc;

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

/// Create the OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
