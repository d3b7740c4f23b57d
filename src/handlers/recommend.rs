use crate::{models::RecommendQuery, services::RecommendationService};
use actix_web::{get, web, HttpResponse};

/// Get a product recommendation for a free-text query.
///
/// Always answers 200: when nothing matched (or any upstream dependency
/// failed) the payload carries only the apology text, otherwise the
/// composed recommendation plus the matched products.
#[get("/recommend")]
pub async fn recommend(
    query: web::Query<RecommendQuery>,
    service: web::Data<RecommendationService>,
) -> HttpResponse {
    let result = service.recommend(&query.query).await;
    HttpResponse::Ok().json(result)
}
