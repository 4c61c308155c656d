//! Mapbox Search Box and Geocoding v6 client.
//!
//! - Category search: `GET /search/searchbox/v1/category/{id}`
//! - Forward geocoding: `GET /search/geocode/v6/forward`
//! - Reverse geocoding: `GET /search/geocode/v6/reverse`
//!
//! All three answer with a `GeoJSON`-like `features` array whose entries
//! carry a `properties` block and `geometry.coordinates` as `[lng, lat]`.
//!
//! Requires `MAPBOX_ACCESS_TOKEN`. See
//! <https://docs.mapbox.com/api/search/search-box/>

use amenity_map_amenity_models::{Amenity, Category, GeoResult};
use amenity_map_geo::Coordinate;
use async_trait::async_trait;

use crate::{
    CategoryFetch, CategoryMap, CategoryQuery, LocationProvider, ProviderError, ProviderSettings,
    fallback_address, retry,
};

/// Environment variable holding the Mapbox access token.
pub const ACCESS_TOKEN_ENV: &str = "MAPBOX_ACCESS_TOKEN";

/// Name given to POIs the provider returns without one.
pub const UNKNOWN_NAME: &str = "Unknown";

/// Mapbox-backed [`LocationProvider`].
#[derive(Debug, Clone)]
pub struct MapboxClient {
    client: reqwest::Client,
    settings: ProviderSettings,
    access_token: String,
    categories: CategoryMap,
}

impl MapboxClient {
    /// Creates a client with an HTTP timeout taken from `settings`.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::Config`] if the token is empty, or
    /// [`ProviderError::Http`] if the HTTP client cannot be built.
    pub fn new(
        settings: ProviderSettings,
        access_token: impl Into<String>,
        categories: CategoryMap,
    ) -> Result<Self, ProviderError> {
        let access_token = access_token.into();
        if access_token.trim().is_empty() {
            return Err(ProviderError::Config {
                message: format!("{ACCESS_TOKEN_ENV} is empty"),
            });
        }
        let client = reqwest::Client::builder()
            .timeout(settings.request_timeout())
            .build()?;
        Ok(Self {
            client,
            settings,
            access_token,
            categories,
        })
    }

    /// Creates a client from the bundled settings and category map plus
    /// `MAPBOX_ACCESS_TOKEN` (and optionally `MAPBOX_BASE_URL`).
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::Config`] if the token is unset or the
    /// bundled configuration is malformed.
    pub fn from_env() -> Result<Self, ProviderError> {
        let token = std::env::var(ACCESS_TOKEN_ENV).map_err(|_| ProviderError::Config {
            message: format!("{ACCESS_TOKEN_ENV} environment variable not set"),
        })?;
        let settings = ProviderSettings::bundled()?.with_env_overrides();
        Self::new(settings, token, CategoryMap::bundled()?)
    }

    /// Settings in use.
    #[must_use]
    pub const fn settings(&self) -> &ProviderSettings {
        &self.settings
    }

    /// Searches one provider category inside the query's bounding box.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError`] if the request fails after retries or the
    /// response is not JSON.
    pub async fn search_pois(&self, query: &CategoryQuery) -> Result<Vec<Amenity>, ProviderError> {
        let url = format!(
            "{}/search/searchbox/v1/category/{}",
            self.settings.base_url, query.provider_id
        );
        let proximity = query.center.to_lng_lat_string();
        let bbox = amenity_map_geo::bbox_param(&amenity_map_geo::bounding_box(
            query.center,
            query.radius_mi,
        ));
        let limit = self.settings.poi_limit.to_string();

        let body = retry::send_json(
            || {
                self.client.get(&url).query(&[
                    ("access_token", self.access_token.as_str()),
                    ("proximity", proximity.as_str()),
                    ("limit", limit.as_str()),
                    ("bbox", bbox.as_str()),
                ])
            },
            &self.settings.retry_policy(),
        )
        .await?;

        Ok(parse_poi_features(&body, query.center, query.category))
    }

    /// Forward geocodes free text into address matches.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError`] if the request fails or the response is
    /// not JSON.
    pub async fn try_forward_geocode(&self, query: &str) -> Result<Vec<GeoResult>, ProviderError> {
        let url = format!("{}/search/geocode/v6/forward", self.settings.base_url);
        let limit = self.settings.forward_limit.to_string();
        let resp = self
            .client
            .get(&url)
            .query(&[
                ("q", query),
                ("access_token", self.access_token.as_str()),
                ("limit", limit.as_str()),
                ("types", "address,place"),
            ])
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(ProviderError::Status {
                status: resp.status().as_u16(),
            });
        }

        let body: serde_json::Value = resp.json().await?;
        Ok(parse_forward_response(&body))
    }

    /// Reverse geocodes a coordinate into a full address, if one matches.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError`] if the request fails or the response is
    /// not JSON.
    pub async fn try_reverse_geocode(
        &self,
        at: Coordinate,
    ) -> Result<Option<String>, ProviderError> {
        let url = format!("{}/search/geocode/v6/reverse", self.settings.base_url);
        let resp = self
            .client
            .get(&url)
            .query(&[
                ("longitude", at.longitude.to_string()),
                ("latitude", at.latitude.to_string()),
                ("access_token", self.access_token.clone()),
                ("types", "address".to_string()),
            ])
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(ProviderError::Status {
                status: resp.status().as_u16(),
            });
        }

        let body: serde_json::Value = resp.json().await?;
        Ok(parse_reverse_response(&body))
    }
}

#[async_trait]
impl LocationProvider for MapboxClient {
    fn category_map(&self) -> &CategoryMap {
        &self.categories
    }

    async fn fetch_category(&self, query: &CategoryQuery) -> CategoryFetch {
        match self.search_pois(query).await {
            Ok(amenities) => {
                log::debug!(
                    "{} ({}) within {} mi: {} results",
                    query.category,
                    query.provider_id,
                    query.radius_mi,
                    amenities.len()
                );
                CategoryFetch::ok(query, amenities)
            }
            Err(e) => {
                log::warn!(
                    "{} ({}) within {} mi unavailable: {e}",
                    query.category,
                    query.provider_id,
                    query.radius_mi
                );
                CategoryFetch::degraded(query, e.to_string())
            }
        }
    }

    async fn forward_geocode(&self, query: &str) -> Vec<GeoResult> {
        self.try_forward_geocode(query).await.unwrap_or_else(|e| {
            log::warn!("Forward geocode failed: {e}");
            Vec::new()
        })
    }

    async fn reverse_geocode(&self, at: Coordinate) -> String {
        match self.try_reverse_geocode(at).await {
            Ok(Some(address)) => address,
            Ok(None) => fallback_address(at),
            Err(e) => {
                log::warn!("Reverse geocode failed: {e}");
                fallback_address(at)
            }
        }
    }
}

/// Reads `geometry.coordinates` (`[lng, lat]`) from a feature.
fn feature_position(feature: &serde_json::Value) -> Option<Coordinate> {
    let coords = feature
        .pointer("/geometry/coordinates")
        .and_then(serde_json::Value::as_array)?;
    if coords.len() < 2 {
        return None;
    }
    let lng = coords[0].as_f64()?;
    let lat = coords[1].as_f64()?;
    Coordinate::new(lat, lng).ok()
}

fn features(body: &serde_json::Value) -> &[serde_json::Value] {
    body.get("features")
        .and_then(serde_json::Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default()
}

/// Normalizes a category search response into amenities.
///
/// Missing `features` reads as no results. Features without a usable
/// coordinate pair are skipped.
fn parse_poi_features(
    body: &serde_json::Value,
    center: Coordinate,
    category: Category,
) -> Vec<Amenity> {
    features(body)
        .iter()
        .filter_map(|feature| {
            let Some(position) = feature_position(feature) else {
                log::debug!("Skipping {category} feature without coordinates");
                return None;
            };
            let name = feature
                .pointer("/properties/name")
                .and_then(serde_json::Value::as_str)
                .filter(|s| !s.is_empty())
                .unwrap_or(UNKNOWN_NAME);
            Some(Amenity::located(name, category, position, center))
        })
        .collect()
}

/// Parses a forward geocoding response.
fn parse_forward_response(body: &serde_json::Value) -> Vec<GeoResult> {
    features(body)
        .iter()
        .filter_map(|feature| {
            let position = feature_position(feature)?;
            let place_name = ["/properties/full_address", "/properties/name"]
                .iter()
                .find_map(|p| {
                    feature
                        .pointer(p)
                        .and_then(serde_json::Value::as_str)
                        .filter(|s| !s.is_empty())
                })
                .unwrap_or_default()
                .to_string();
            Some(GeoResult {
                place_name,
                lat: position.latitude,
                lng: position.longitude,
            })
        })
        .collect()
}

/// Parses a reverse geocoding response: the first feature's full address.
fn parse_reverse_response(body: &serde_json::Value) -> Option<String> {
    features(body)
        .first()?
        .pointer("/properties/full_address")
        .and_then(serde_json::Value::as_str)
        .filter(|s| !s.is_empty())
        .map(String::from)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use actix_web::{App, HttpRequest, HttpResponse, HttpServer, web};

    use super::*;

    fn center() -> Coordinate {
        Coordinate::new(40.0, -74.0).unwrap()
    }

    #[test]
    fn parses_poi_features() {
        let body = serde_json::json!({
            "type": "FeatureCollection",
            "features": [
                {
                    "type": "Feature",
                    "geometry": { "type": "Point", "coordinates": [-74.0, 40.01] },
                    "properties": { "name": "Fresh Market", "distance": 9999 }
                },
                {
                    "type": "Feature",
                    "geometry": { "type": "Point", "coordinates": [-74.0, 40.0] },
                    "properties": {}
                }
            ]
        });
        let amenities = parse_poi_features(&body, center(), Category::Grocery);
        assert_eq!(amenities.len(), 2);
        assert_eq!(amenities[0].name, "Fresh Market");
        assert_eq!(amenities[0].category, Category::Grocery);
        // Distance is recomputed, not taken from the provider.
        assert!((amenities[0].distance_mi - 0.69).abs() < 1e-12);
        assert_eq!(amenities[1].name, UNKNOWN_NAME);
        assert!(amenities[1].distance_mi.abs() < 1e-12);
    }

    #[test]
    fn skips_features_without_coordinates() {
        let body = serde_json::json!({
            "features": [
                { "properties": { "name": "Nowhere" } },
                { "geometry": { "coordinates": [-74.0] }, "properties": { "name": "Half" } },
                { "geometry": { "coordinates": [-200.0, 40.0] }, "properties": { "name": "Bad" } }
            ]
        });
        assert!(parse_poi_features(&body, center(), Category::Park).is_empty());
    }

    #[test]
    fn missing_features_reads_as_empty() {
        let body = serde_json::json!({ "message": "ok" });
        assert!(parse_poi_features(&body, center(), Category::Bar).is_empty());
        assert!(parse_forward_response(&body).is_empty());
        assert!(parse_reverse_response(&body).is_none());
    }

    #[test]
    fn parses_forward_results() {
        let body = serde_json::json!({
            "features": [
                {
                    "geometry": { "coordinates": [-77.0364, 38.8951] },
                    "properties": {
                        "full_address": "1600 Pennsylvania Ave NW, Washington, DC 20500",
                        "name": "1600 Pennsylvania Ave NW"
                    }
                },
                {
                    "geometry": { "coordinates": [-87.6278, 41.8827] },
                    "properties": { "name": "Chicago" }
                },
                {
                    "geometry": { "coordinates": [0.5, 0.25] },
                    "properties": {}
                }
            ]
        });
        let results = parse_forward_response(&body);
        assert_eq!(results.len(), 3);
        assert_eq!(
            results[0].place_name,
            "1600 Pennsylvania Ave NW, Washington, DC 20500"
        );
        assert!((results[0].lat - 38.8951).abs() < 1e-9);
        assert!((results[0].lng - -77.0364).abs() < 1e-9);
        assert_eq!(results[1].place_name, "Chicago");
        assert_eq!(results[2].place_name, "");
    }

    #[test]
    fn parses_reverse_full_address() {
        let body = serde_json::json!({
            "features": [
                { "properties": { "full_address": "100 N State St, Chicago, IL 60602" } },
                { "properties": { "full_address": "Ignored" } }
            ]
        });
        assert_eq!(
            parse_reverse_response(&body).as_deref(),
            Some("100 N State St, Chicago, IL 60602")
        );
    }

    #[test]
    fn from_env_requires_token() {
        // Safety: test-only; no other threads depend on this env var.
        unsafe {
            std::env::remove_var(ACCESS_TOKEN_ENV);
        }
        assert!(matches!(
            MapboxClient::from_env(),
            Err(ProviderError::Config { .. })
        ));
    }

    #[derive(Default)]
    struct Hits {
        limited_once: AtomicUsize,
        always_limited: AtomicUsize,
        broken: AtomicUsize,
        requests: Mutex<Vec<(String, String)>>,
    }

    impl Hits {
        fn record(&self, req: &HttpRequest) {
            self.requests
                .lock()
                .unwrap()
                .push((req.path().to_string(), req.query_string().to_string()));
        }

        /// Decoded query parameters of the last request to `path`.
        fn params_for(&self, path: &str) -> BTreeMap<String, String> {
            let requests = self.requests.lock().unwrap();
            let (_, query) = requests.iter().rev().find(|(p, _)| p == path).unwrap();
            web::Query::<BTreeMap<String, String>>::from_query(query)
                .unwrap()
                .into_inner()
        }
    }

    async fn category_handler(
        req: HttpRequest,
        path: web::Path<String>,
        hits: web::Data<Hits>,
    ) -> HttpResponse {
        hits.record(&req);
        let found = serde_json::json!({
            "features": [{
                "geometry": { "coordinates": [-74.0, 40.005] },
                "properties": { "name": "Stub Grocer" }
            }]
        });
        match path.as_str() {
            "grocery" => HttpResponse::Ok().json(found),
            "limited_once" => {
                if hits.limited_once.fetch_add(1, Ordering::SeqCst) < 2 {
                    HttpResponse::TooManyRequests().finish()
                } else {
                    HttpResponse::Ok().json(found)
                }
            }
            "always_limited" => {
                hits.always_limited.fetch_add(1, Ordering::SeqCst);
                HttpResponse::TooManyRequests().finish()
            }
            _ => {
                hits.broken.fetch_add(1, Ordering::SeqCst);
                HttpResponse::InternalServerError().finish()
            }
        }
    }

    async fn reverse_handler(req: HttpRequest, hits: web::Data<Hits>) -> HttpResponse {
        hits.record(&req);
        HttpResponse::Ok().json(serde_json::json!({ "features": [] }))
    }

    async fn forward_handler(req: HttpRequest, hits: web::Data<Hits>) -> HttpResponse {
        hits.record(&req);
        HttpResponse::Unauthorized().finish()
    }

    /// Starts a local stand-in for the Mapbox API and returns its base URL.
    fn start_stub(hits: web::Data<Hits>) -> (String, actix_web::dev::ServerHandle) {
        let server = HttpServer::new(move || {
            App::new()
                .app_data(hits.clone())
                .route(
                    "/search/searchbox/v1/category/{id}",
                    web::get().to(category_handler),
                )
                .route("/search/geocode/v6/reverse", web::get().to(reverse_handler))
                .route("/search/geocode/v6/forward", web::get().to(forward_handler))
        })
        .workers(1)
        .bind(("127.0.0.1", 0))
        .unwrap();
        let addr = server.addrs()[0];
        let server = server.run();
        let handle = server.handle();
        actix_web::rt::spawn(server);
        (format!("http://{addr}"), handle)
    }

    fn client_for(base_url: &str) -> MapboxClient {
        let settings = ProviderSettings::from_toml_str(&format!(
            r#"
            id = "stub"
            name = "Stub"
            base_url = "{base_url}"
            backoff_step_ms = 10
            request_timeout_ms = 2000
            "#
        ))
        .unwrap();
        MapboxClient::new(settings, "test-token", CategoryMap::bundled().unwrap()).unwrap()
    }

    fn query(provider_id: &str) -> CategoryQuery {
        CategoryQuery {
            center: center(),
            radius_mi: 1.0,
            category: Category::Grocery,
            provider_id: provider_id.to_string(),
        }
    }

    #[actix_web::test]
    async fn fetches_and_normalizes_category() {
        let hits = web::Data::new(Hits::default());
        let (base, handle) = start_stub(hits.clone());
        let client = client_for(&base);

        let fetch = client.fetch_category(&query("grocery")).await;
        assert!(fetch.is_ok());
        assert_eq!(fetch.amenities.len(), 1);
        assert_eq!(fetch.amenities[0].name, "Stub Grocer");
        assert!((fetch.amenities[0].distance_mi - 0.35).abs() < 1e-12);

        handle.stop(true).await;
    }

    #[actix_web::test]
    async fn category_search_sends_proximity_bbox_and_limit() {
        let hits = web::Data::new(Hits::default());
        let (base, handle) = start_stub(hits.clone());
        let client = client_for(&base);

        client.fetch_category(&query("grocery")).await;

        let params = hits.params_for("/search/searchbox/v1/category/grocery");
        let expected_bbox =
            amenity_map_geo::bbox_param(&amenity_map_geo::bounding_box(center(), 1.0));
        assert_eq!(params["access_token"], "test-token");
        assert_eq!(params["proximity"], "-74,40");
        assert_eq!(params["limit"], "25");
        assert_eq!(params["bbox"], expected_bbox);
        assert_eq!(params.len(), 4);

        let corners: Vec<f64> = params["bbox"]
            .split(',')
            .map(|v| v.parse().unwrap())
            .collect();
        assert_eq!(corners.len(), 4);
        // minLng, minLat, maxLng, maxLat around (40, -74).
        assert!(corners[0] < -74.0 && corners[2] > -74.0);
        assert!(corners[1] < 40.0 && corners[3] > 40.0);

        handle.stop(true).await;
    }

    #[actix_web::test]
    async fn geocode_requests_carry_expected_parameters() {
        let hits = web::Data::new(Hits::default());
        let (base, handle) = start_stub(hits.clone());
        let client = client_for(&base);

        client.forward_geocode("100 Main St").await;
        let forward = hits.params_for("/search/geocode/v6/forward");
        assert_eq!(forward["q"], "100 Main St");
        assert_eq!(forward["access_token"], "test-token");
        assert_eq!(forward["limit"], "5");
        assert_eq!(forward["types"], "address,place");

        client
            .reverse_geocode(Coordinate::new(41.5, -87.25).unwrap())
            .await;
        let reverse = hits.params_for("/search/geocode/v6/reverse");
        assert_eq!(reverse["longitude"], "-87.25");
        assert_eq!(reverse["latitude"], "41.5");
        assert_eq!(reverse["access_token"], "test-token");
        assert_eq!(reverse["types"], "address");

        handle.stop(true).await;
    }

    #[actix_web::test]
    async fn retries_rate_limited_requests() {
        let hits = web::Data::new(Hits::default());
        let (base, handle) = start_stub(hits.clone());
        let client = client_for(&base);

        let fetch = client.fetch_category(&query("limited_once")).await;
        assert!(fetch.is_ok());
        assert_eq!(fetch.amenities.len(), 1);
        assert_eq!(hits.limited_once.load(Ordering::SeqCst), 3);

        handle.stop(true).await;
    }

    #[actix_web::test]
    async fn gives_up_after_two_retries() {
        let hits = web::Data::new(Hits::default());
        let (base, handle) = start_stub(hits.clone());
        let client = client_for(&base);

        let fetch = client.fetch_category(&query("always_limited")).await;
        assert!(!fetch.is_ok());
        assert!(fetch.amenities.is_empty());
        assert_eq!(hits.always_limited.load(Ordering::SeqCst), 3);

        handle.stop(true).await;
    }

    #[actix_web::test]
    async fn does_not_retry_server_errors() {
        let hits = web::Data::new(Hits::default());
        let (base, handle) = start_stub(hits.clone());
        let client = client_for(&base);

        let fetch = client.fetch_category(&query("broken")).await;
        assert!(!fetch.is_ok());
        assert!(fetch.amenities.is_empty());
        assert_eq!(hits.broken.load(Ordering::SeqCst), 1);

        handle.stop(true).await;
    }

    #[actix_web::test]
    async fn unreachable_provider_degrades() {
        // Nothing listens on port 9 of localhost.
        let client = client_for("http://127.0.0.1:9");
        let fetch = client.fetch_category(&query("grocery")).await;
        assert!(!fetch.is_ok());
        assert!(client.forward_geocode("main st").await.is_empty());
    }

    #[actix_web::test]
    async fn geocode_failures_fall_back() {
        let hits = web::Data::new(Hits::default());
        let (base, handle) = start_stub(hits.clone());
        let client = client_for(&base);

        let at = Coordinate::new(41.5, -87.25).unwrap();
        assert_eq!(client.reverse_geocode(at).await, "41.5, -87.25");
        assert!(client.forward_geocode("100 Main St").await.is_empty());

        handle.stop(true).await;
    }
}
