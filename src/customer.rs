use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::Json;
use tracing::info;
use utoipa_axum::router::OpenApiRouter;
use utoipa_axum::routes;

use crate::auth::SessionClaims;
use crate::error::ApiError;
use crate::model::{
    CustomerCreated, CustomerSummary, ErrorBody, NewCustomer, NewCustomerForm, SearchQuery,
};
use crate::validate::ValidatedForm;
use crate::CUSTOMER_TAG;

/// expose the Customer OpenAPI to parent module
pub fn customer_router() -> OpenApiRouter<crate::State> {
    OpenApiRouter::new().routes(routes!(search_customers, create_customer))
}

/// Search customers by name
#[utoipa::path(
    get,
    path = "/customers",
    params(SearchQuery),
    responses(
        (status = OK, body = Vec<CustomerSummary>),
        (status = UNAUTHORIZED, body = ErrorBody)
    ),
    tag = CUSTOMER_TAG,
    security(("session_cookie" = []))
)]
async fn search_customers(
    claims: SessionClaims,
    State(crate::State {
        store, enforcer, ..
    }): State<crate::State>,
    Query(SearchQuery { q }): Query<SearchQuery>,
) -> Result<Json<Vec<CustomerSummary>>, ApiError> {
    claims.authorize(&enforcer, "customers", "read")?;
    let term = q.as_deref().map(str::trim).filter(|t| !t.is_empty());
    let customers = store.search_customers(term).await?;
    Ok(Json(
        customers.into_iter().map(CustomerSummary::from).collect(),
    ))
}

/// Register a customer
#[utoipa::path(
    post,
    path = "/customers",
    request_body = NewCustomerForm,
    responses(
        (status = CREATED, body = CustomerCreated),
        (status = BAD_REQUEST, body = ErrorBody),
        (status = FORBIDDEN, body = ErrorBody)
    ),
    tag = CUSTOMER_TAG,
    security(("session_cookie" = []))
)]
async fn create_customer(
    claims: SessionClaims,
    State(crate::State {
        store, enforcer, ..
    }): State<crate::State>,
    ValidatedForm(form): ValidatedForm<NewCustomerForm>,
) -> Result<(StatusCode, Json<CustomerCreated>), ApiError> {
    claims.authorize(&enforcer, "customers", "create")?;
    if store.customer_email_exists(&form.email).await? {
        return Err(ApiError::Validation("Email already exists.".to_string()));
    }
    let customer_id = store
        .insert_customer(NewCustomer {
            first_name: form.first_name,
            last_name: form.last_name,
            email: form.email,
            phone: form.phone.filter(|p| !p.trim().is_empty()),
        })
        .await?;
    info!(customer_id, created_by = claims.sub, "customer created");
    Ok((
        StatusCode::CREATED,
        Json(CustomerCreated {
            message: "Customer created successfully.".to_string(),
            customer_id,
        }),
    ))
}
