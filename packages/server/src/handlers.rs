//! HTTP handler functions for the amenity map API.

use actix_web::{HttpResponse, web};
use amenity_map_aggregate::{aggregate, profile as build_profile};
use amenity_map_geo::Coordinate;
use amenity_map_server_models::{
    ApiAddress, ApiAmenities, ApiCategory, ApiError, ApiGeocodeResults, ApiHealth,
    CoordinateParams, GeocodeParams,
};

use crate::AppState;

/// Shortest query forwarded to the geocoder.
const MIN_GEOCODE_QUERY_CHARS: usize = 2;

/// `GET /api/health`
pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(ApiHealth {
        healthy: true,
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// `GET /api/categories`
///
/// Returns the scored categories with their weights and the provider ids
/// searched for each.
pub async fn categories(state: web::Data<AppState>) -> HttpResponse {
    let map = state.provider.category_map();
    let listing: Vec<ApiCategory> = state
        .scorer
        .weights()
        .entries()
        .iter()
        .map(|w| ApiCategory::new(w, map.ids_for(w.category)))
        .collect();

    HttpResponse::Ok().json(listing)
}

/// `GET /api/amenities?lat=..&lng=..`
///
/// Returns the deduplicated walking (1 mi) and driving (5 mi) sets.
pub async fn amenities(
    state: web::Data<AppState>,
    params: web::Query<CoordinateParams>,
) -> HttpResponse {
    let Some(center) = parse_coordinate(&params) else {
        return missing_coordinates();
    };

    let sets = aggregate(state.provider.as_ref(), center, &state.options).await;

    HttpResponse::Ok().json(ApiAmenities {
        walking: sets.walking,
        driving: sets.driving,
    })
}

/// `GET /api/profile?lat=..&lng=..`
///
/// Amenities plus walking score, driving score, urban index and the
/// per-category breakdown.
pub async fn profile(
    state: web::Data<AppState>,
    params: web::Query<CoordinateParams>,
) -> HttpResponse {
    let Some(center) = parse_coordinate(&params) else {
        return missing_coordinates();
    };

    let result = build_profile(
        state.provider.as_ref(),
        center,
        &state.options,
        &state.scorer,
    )
    .await;

    HttpResponse::Ok().json(result)
}

/// `GET /api/geocode?q=..`
///
/// The raw query is checked and forwarded as given; queries shorter than two
/// characters return no results without calling the provider.
pub async fn geocode(
    state: web::Data<AppState>,
    params: web::Query<GeocodeParams>,
) -> HttpResponse {
    let query = params.q.as_deref().unwrap_or_default();
    if query.chars().count() < MIN_GEOCODE_QUERY_CHARS {
        return HttpResponse::Ok().json(ApiGeocodeResults {
            results: Vec::new(),
        });
    }

    let results = state.provider.forward_geocode(query).await;
    HttpResponse::Ok().json(ApiGeocodeResults { results })
}

/// `GET /api/reverse-geocode?lat=..&lng=..`
pub async fn reverse_geocode(
    state: web::Data<AppState>,
    params: web::Query<CoordinateParams>,
) -> HttpResponse {
    let Some(at) = parse_coordinate(&params) else {
        return missing_coordinates();
    };

    let address = state.provider.reverse_geocode(at).await;
    HttpResponse::Ok().json(ApiAddress { address })
}

/// Parses `lat`/`lng` query values into a validated coordinate.
fn parse_coordinate(params: &CoordinateParams) -> Option<Coordinate> {
    let lat: f64 = params.lat.as_deref()?.trim().parse().ok()?;
    let lng: f64 = params.lng.as_deref()?.trim().parse().ok()?;
    Coordinate::new(lat, lng).ok()
}

fn missing_coordinates() -> HttpResponse {
    HttpResponse::BadRequest().json(ApiError {
        error: "lat and lng are required".to_string(),
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use actix_web::{App, test};
    use amenity_map_aggregate::AggregateOptions;
    use amenity_map_aggregate::test_support::{StubProvider, center, north_of};
    use amenity_map_amenity_models::GeoResult;
    use amenity_map_scoring::Scorer;

    use super::*;
    use crate::configure;

    fn state(provider: StubProvider) -> web::Data<AppState> {
        web::Data::new(AppState {
            provider: Arc::new(provider),
            options: AggregateOptions::default(),
            scorer: Scorer::default(),
        })
    }

    #[::core::prelude::v1::test]
    fn parse_coordinate_rejects_garbage_and_out_of_range() {
        let params = |lat: &str, lng: &str| CoordinateParams {
            lat: Some(lat.to_string()),
            lng: Some(lng.to_string()),
        };
        assert!(parse_coordinate(&params("40.7", "-74.0")).is_some());
        assert!(parse_coordinate(&params(" 40.7 ", "-74.0")).is_some());
        assert!(parse_coordinate(&params("abc", "-74.0")).is_none());
        assert!(parse_coordinate(&params("NaN", "-74.0")).is_none());
        assert!(parse_coordinate(&params("91", "0")).is_none());
        assert!(parse_coordinate(&params("0", "181")).is_none());
        assert!(parse_coordinate(&CoordinateParams::default()).is_none());
    }

    #[actix_web::test]
    async fn unparseable_latitude_is_a_bad_request() {
        let app = test::init_service(
            App::new()
                .app_data(state(StubProvider::new()))
                .configure(configure),
        )
        .await;
        let req = test::TestRequest::get()
            .uri("/api/amenities?lat=abc&lng=-74")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 400);
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body, serde_json::json!({ "error": "lat and lng are required" }));
    }

    #[actix_web::test]
    async fn missing_longitude_is_a_bad_request() {
        let app = test::init_service(
            App::new()
                .app_data(state(StubProvider::new()))
                .configure(configure),
        )
        .await;
        for uri in ["/api/profile?lat=40", "/api/reverse-geocode?lat=40"] {
            let req = test::TestRequest::get().uri(uri).to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), 400, "{uri}");
        }
    }

    #[actix_web::test]
    async fn amenities_returns_walking_and_driving_sets() {
        let c = center();
        let provider = StubProvider::new()
            .with_result("grocery", "Near Grocer", north_of(c, 0.5))
            .with_result("grocery", "Far Grocer", north_of(c, 3.0));
        let app = test::init_service(
            App::new()
                .app_data(state(provider))
                .configure(configure),
        )
        .await;
        let req = test::TestRequest::get()
            .uri("/api/amenities?lat=40&lng=-74")
            .to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;

        let walking = body["walking"].as_array().unwrap();
        let driving = body["driving"].as_array().unwrap();
        assert_eq!(walking.len(), 1);
        assert_eq!(walking[0]["name"], "Near Grocer");
        assert_eq!(walking[0]["category"], "grocery");
        assert_eq!(walking[0]["distance_mi"], 0.5);
        assert_eq!(driving.len(), 2);
    }

    #[actix_web::test]
    async fn profile_includes_scores() {
        let c = center();
        let provider = StubProvider::new().with_result("grocery", "Grocer", north_of(c, 0.0));
        let app = test::init_service(
            App::new()
                .app_data(state(provider))
                .configure(configure),
        )
        .await;
        let req = test::TestRequest::get()
            .uri("/api/profile?lat=40&lng=-74")
            .to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;

        // One grocery at the center: 1/2 of 15 walking, full 15 driving.
        assert_eq!(body["scores"]["walkingScore"], 8);
        assert_eq!(body["scores"]["drivingScore"], 15);
        assert_eq!(body["scores"]["urbanLabel"], "Rural");
    }

    #[actix_web::test]
    async fn short_geocode_query_returns_no_results() {
        let provider = StubProvider::new().with_geocode_results(vec![GeoResult {
            place_name: "Main St".to_string(),
            lat: 1.0,
            lng: 2.0,
        }]);
        let app = test::init_service(
            App::new()
                .app_data(state(provider))
                .configure(configure),
        )
        .await;

        for uri in ["/api/geocode", "/api/geocode?q=", "/api/geocode?q=a"] {
            let req = test::TestRequest::get().uri(uri).to_request();
            let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
            assert_eq!(body, serde_json::json!({ "results": [] }), "{uri}");
        }

        // Length is counted on the raw query, whitespace included.
        for uri in ["/api/geocode?q=main", "/api/geocode?q=%20a"] {
            let req = test::TestRequest::get().uri(uri).to_request();
            let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
            assert_eq!(body["results"].as_array().unwrap().len(), 1, "{uri}");
        }
    }

    #[actix_web::test]
    async fn reverse_geocode_falls_back_to_coordinates() {
        let app = test::init_service(
            App::new()
                .app_data(state(StubProvider::new()))
                .configure(configure),
        )
        .await;
        let req = test::TestRequest::get()
            .uri("/api/reverse-geocode?lat=40.5&lng=-74.25")
            .to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body, serde_json::json!({ "address": "40.5, -74.25" }));
    }

    #[actix_web::test]
    async fn reverse_geocode_returns_provider_address() {
        let provider = StubProvider::new().with_address("1 Main St, Springfield");
        let app = test::init_service(
            App::new()
                .app_data(state(provider))
                .configure(configure),
        )
        .await;
        let req = test::TestRequest::get()
            .uri("/api/reverse-geocode?lat=40&lng=-74")
            .to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["address"], "1 Main St, Springfield");
    }

    #[actix_web::test]
    async fn categories_lists_every_weighted_category() {
        let app = test::init_service(
            App::new()
                .app_data(state(StubProvider::new()))
                .configure(configure),
        )
        .await;
        let req = test::TestRequest::get().uri("/api/categories").to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;

        let listing = body.as_array().unwrap();
        assert_eq!(listing.len(), 13);
        let transit = listing
            .iter()
            .find(|c| c["category"] == "transit")
            .unwrap();
        assert_eq!(transit["providerIds"].as_array().unwrap().len(), 3);
    }

    #[actix_web::test]
    async fn health_reports_version() {
        let app = test::init_service(
            App::new()
                .app_data(state(StubProvider::new()))
                .configure(configure),
        )
        .await;
        let req = test::TestRequest::get().uri("/api/health").to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["healthy"], true);
    }
}
