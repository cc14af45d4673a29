//! Hosted backend adapter: PostgREST tables plus the auth `user` endpoint.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::entities::{Disease, DiseaseDrugLink, Drug};
use crate::error::FarmacoError;
use crate::sources::{IdentityProvider, RecordStore};

const SUPABASE_API: &str = "supabase";
pub const SUPABASE_URL_ENV: &str = "FARMACOHUB_SUPABASE_URL";
pub const SUPABASE_KEY_ENV: &str = "FARMACOHUB_SUPABASE_KEY";
pub const ACCESS_TOKEN_ENV: &str = "FARMACOHUB_ACCESS_TOKEN";

const DRUG_TABLE: &str = "farmaco";
const DISEASE_TABLE: &str = "malattia";
const LINK_TABLE: &str = "malattia_farmaco";

/// Service name and path checked by [`SupabaseClient::ping`].
const PING_PATHS: [(&str, &str); 2] = [("REST", "rest/v1/"), ("Auth", "auth/v1/health")];

#[derive(Debug, Clone)]
pub struct SupabaseConfig {
    pub url: String,
    pub anon_key: String,
    pub access_token: Option<String>,
}

impl SupabaseConfig {
    pub fn from_env() -> Result<Self, FarmacoError> {
        let url = crate::sources::env_value(SUPABASE_URL_ENV).ok_or_else(|| {
            FarmacoError::Configuration {
                env_var: SUPABASE_URL_ENV.into(),
                message: "Point it at the project URL or pass --fixtures <file>.".into(),
            }
        })?;
        let anon_key = crate::sources::env_value(SUPABASE_KEY_ENV).ok_or_else(|| {
            FarmacoError::Configuration {
                env_var: SUPABASE_KEY_ENV.into(),
                message: "Use the project's anon (public) key.".into(),
            }
        })?;
        Ok(Self {
            url,
            anon_key,
            access_token: crate::sources::env_value(ACCESS_TOKEN_ENV),
        })
    }
}

pub struct SupabaseClient {
    client: reqwest_middleware::ClientWithMiddleware,
    base: String,
    anon_key: String,
    access_token: Option<String>,
}

impl SupabaseClient {
    pub fn new(config: SupabaseConfig) -> Result<Self, FarmacoError> {
        Ok(Self {
            client: crate::sources::shared_client()?,
            base: config.url,
            anon_key: config.anon_key,
            access_token: config.access_token,
        })
    }

    #[cfg(test)]
    pub(crate) fn new_for_test(base: String, access_token: Option<&str>) -> Result<Self, FarmacoError> {
        Self::new(SupabaseConfig {
            url: base,
            anon_key: "anon-key".into(),
            access_token: access_token.map(str::to_string),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    fn bearer(&self) -> String {
        format!(
            "Bearer {}",
            self.access_token.as_deref().unwrap_or(&self.anon_key)
        )
    }

    fn authorized(
        &self,
        req: reqwest_middleware::RequestBuilder,
    ) -> reqwest_middleware::RequestBuilder {
        req.header("apikey", &self.anon_key)
            .header(AUTHORIZATION, self.bearer())
            .header(ACCEPT, "application/json")
    }

    /// Round-trip time to the REST root and the auth service, per service.
    pub async fn ping(&self) -> Vec<(&'static str, Result<Duration, FarmacoError>)> {
        let requests = PING_PATHS
            .iter()
            .map(|(service, path)| async move { (*service, self.ping_path(path).await) });
        futures::future::join_all(requests).await
    }

    async fn ping_path(&self, path: &str) -> Result<Duration, FarmacoError> {
        let start = Instant::now();
        let resp = self
            .authorized(self.client.get(self.endpoint(path)))
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(FarmacoError::Api {
                api: SUPABASE_API.to_string(),
                message: format!("HTTP {}", status.as_u16()),
            });
        }
        Ok(start.elapsed())
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        req: reqwest_middleware::RequestBuilder,
    ) -> Result<T, FarmacoError> {
        let resp = self.authorized(req).send().await?;
        let status = resp.status();
        let content_type = resp.headers().get(CONTENT_TYPE).cloned();
        let bytes = crate::sources::read_limited_body(resp, SUPABASE_API).await?;
        if !status.is_success() {
            let excerpt = crate::sources::body_excerpt(&bytes);
            return Err(FarmacoError::Api {
                api: SUPABASE_API.to_string(),
                message: format!("HTTP {status}: {excerpt}"),
            });
        }
        crate::sources::ensure_json_content_type(SUPABASE_API, content_type.as_ref(), &bytes)?;
        serde_json::from_slice(&bytes).map_err(|source| FarmacoError::ApiJson {
            api: SUPABASE_API.to_string(),
            source,
        })
    }

    fn table(&self, table: &str) -> String {
        self.endpoint(&format!("rest/v1/{table}"))
    }
}

#[derive(Debug, Deserialize)]
struct LinkRow {
    #[serde(
        default,
        deserialize_with = "crate::utils::serde::deserialize_optional_id"
    )]
    malattia_id: Option<String>,
    #[serde(
        default,
        deserialize_with = "crate::utils::serde::deserialize_optional_id"
    )]
    farmaco_id: Option<String>,
}

#[async_trait]
impl RecordStore for SupabaseClient {
    async fn fetch_drugs(&self) -> Result<Vec<Drug>, FarmacoError> {
        let url = self.table(DRUG_TABLE);
        let drugs: Vec<Drug> = self
            .get_json(self.client.get(&url).query(&[("select", "*")]))
            .await?;
        debug!(count = drugs.len(), "fetched drugs");
        Ok(drugs)
    }

    async fn fetch_diseases(&self) -> Result<Vec<Disease>, FarmacoError> {
        let url = self.table(DISEASE_TABLE);
        let diseases: Vec<Disease> = self
            .get_json(self.client.get(&url).query(&[
                ("select", "id,nome,codice_esenzione"),
                ("order", "nome.asc"),
            ]))
            .await?;
        debug!(count = diseases.len(), "fetched diseases");
        Ok(diseases)
    }

    async fn fetch_links(&self, disease_id: &str) -> Result<Vec<DiseaseDrugLink>, FarmacoError> {
        let disease_id = disease_id.trim();
        if disease_id.is_empty() {
            return Err(FarmacoError::InvalidArgument("Disease id is required".into()));
        }

        let url = self.table(LINK_TABLE);
        let filter = format!("eq.{disease_id}");
        let rows: Vec<LinkRow> = self
            .get_json(self.client.get(&url).query(&[
                ("select", "malattia_id,farmaco_id"),
                ("malattia_id", filter.as_str()),
            ]))
            .await?;

        let total = rows.len();
        let links: Vec<DiseaseDrugLink> = rows
            .into_iter()
            .filter_map(|row| {
                Some(DiseaseDrugLink {
                    disease_id: row.malattia_id.unwrap_or_else(|| disease_id.to_string()),
                    drug_id: row.farmaco_id?,
                })
            })
            .collect();
        if links.len() < total {
            warn!(
                disease_id,
                dropped = total - links.len(),
                "link rows without a drug id were ignored"
            );
        }
        Ok(links)
    }
}

#[async_trait]
impl IdentityProvider for SupabaseClient {
    async fn is_authenticated(&self) -> bool {
        let Some(token) = self.access_token.as_deref() else {
            debug!("no access token configured");
            return false;
        };

        let url = self.endpoint("auth/v1/user");
        let resp = self
            .client
            .get(&url)
            .header("apikey", &self.anon_key)
            .header(AUTHORIZATION, format!("Bearer {token}"))
            .send()
            .await;
        match resp {
            Ok(resp) if resp.status().is_success() => true,
            Ok(resp) => {
                debug!(status = %resp.status(), "access token rejected");
                false
            }
            Err(err) => {
                warn!(error = %err, "identity check failed");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn fetch_diseases_requests_ordered_columns() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/rest/v1/malattia"))
            .and(query_param("select", "id,nome,codice_esenzione"))
            .and(query_param("order", "nome.asc"))
            .and(header("apikey", "anon-key"))
            .and(header("Authorization", "Bearer anon-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {"id": 1, "nome": "Asma", "codice_esenzione": null},
                {"id": 2, "nome": "Emicrania", "codice_esenzione": "04"}
            ])))
            .mount(&server)
            .await;

        let client = SupabaseClient::new_for_test(server.uri(), None).unwrap();
        let diseases = client.fetch_diseases().await.unwrap();
        assert_eq!(diseases.len(), 2);
        assert_eq!(diseases[0].id, "1");
        assert_eq!(diseases[1].exemption(), Some("04"));
    }

    #[tokio::test]
    async fn fetch_drugs_uses_access_token_when_present() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/rest/v1/farmaco"))
            .and(query_param("select", "*"))
            .and(header("Authorization", "Bearer user-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {
                    "id": "a",
                    "nome": "Tachipirina",
                    "principio_attivo": "Paracetamolo",
                    "forma_farmaceutica": "Compresse",
                    "posologia": "500 mg ogni 6 ore",
                    "tipologia": "Analgesico"
                }
            ])))
            .mount(&server)
            .await;

        let client = SupabaseClient::new_for_test(server.uri(), Some("user-token")).unwrap();
        let drugs = client.fetch_drugs().await.unwrap();
        assert_eq!(drugs.len(), 1);
        assert_eq!(drugs[0].form(), Some("Compresse"));
        assert_eq!(drugs[0].category(), Some("Analgesico"));
    }

    #[tokio::test]
    async fn fetch_links_filters_by_disease_and_drops_null_drugs() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/rest/v1/malattia_farmaco"))
            .and(query_param("select", "malattia_id,farmaco_id"))
            .and(query_param("malattia_id", "eq.7"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {"malattia_id": 7, "farmaco_id": 10},
                {"malattia_id": 7, "farmaco_id": null},
                {"farmaco_id": "11"}
            ])))
            .mount(&server)
            .await;

        let client = SupabaseClient::new_for_test(server.uri(), None).unwrap();
        let links = client.fetch_links("7").await.unwrap();
        assert_eq!(
            links,
            vec![
                DiseaseDrugLink {
                    disease_id: "7".into(),
                    drug_id: "10".into()
                },
                DiseaseDrugLink {
                    disease_id: "7".into(),
                    drug_id: "11".into()
                },
            ]
        );
    }

    #[tokio::test]
    async fn fetch_links_rejects_blank_disease_id() {
        let client = SupabaseClient::new_for_test("http://127.0.0.1".into(), None).unwrap();
        let err = client.fetch_links("  ").await.unwrap_err();
        assert!(matches!(err, FarmacoError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn api_errors_carry_status_and_body() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/rest/v1/farmaco"))
            .respond_with(
                ResponseTemplate::new(401).set_body_string("{\"message\":\"JWT expired\"}"),
            )
            .mount(&server)
            .await;

        let client = SupabaseClient::new_for_test(server.uri(), Some("old")).unwrap();
        let err = client.fetch_drugs().await.unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("401"));
        assert!(msg.contains("JWT expired"));
    }

    #[tokio::test]
    async fn is_authenticated_requires_token_and_valid_user() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/auth/v1/user"))
            .and(header("Authorization", "Bearer good"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "u1"
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/auth/v1/user"))
            .and(header("Authorization", "Bearer bad"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let good = SupabaseClient::new_for_test(server.uri(), Some("good")).unwrap();
        assert!(good.is_authenticated().await);
        let bad = SupabaseClient::new_for_test(server.uri(), Some("bad")).unwrap();
        assert!(!bad.is_authenticated().await);
        let anonymous = SupabaseClient::new_for_test(server.uri(), None).unwrap();
        assert!(!anonymous.is_authenticated().await);
    }

    #[tokio::test]
    async fn ping_reports_each_service_with_the_anon_key() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/"))
            .and(header("apikey", "anon-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/auth/v1/health"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let client = SupabaseClient::new_for_test(server.uri(), None).unwrap();
        let results = client.ping().await;
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].0, "REST");
        assert!(results[0].1.is_ok());
        assert_eq!(results[1].0, "Auth");
        let err = results[1].1.as_ref().unwrap_err();
        assert!(err.to_string().contains("HTTP 401"));
    }
}
