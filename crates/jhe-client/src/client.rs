use std::pin::pin;

use futures_util::future;
use futures_util::stream::{self, Stream, StreamExt, TryStreamExt};
use jhe_core::{FlatRecord, RecordTable, Tidier};
use reqwest::Method;
use serde_json::Value;
use url::Url;

use crate::code::Code;
use crate::config::ClientConfig;
use crate::error::{ClientError, Result};
use crate::pagination::PageStyle;

const API_PREFIX: [&str; 2] = ["api", "v1"];
const FHIR_PREFIX: [&str; 2] = ["fhir", "r5"];

/// Filters for an Observation search.
#[derive(Debug, Clone, Default)]
pub struct ObservationQuery {
    pub patient_id: Option<i64>,
    pub study_id: Option<i64>,
    pub code: Option<Code>,
    /// Stop after this many observations.
    pub limit: Option<usize>,
}

impl ObservationQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn patient(mut self, patient_id: i64) -> Self {
        self.patient_id = Some(patient_id);
        self
    }

    pub fn study(mut self, study_id: i64) -> Self {
        self.study_id = Some(study_id);
        self
    }

    pub fn code(mut self, code: impl Into<Code>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    fn params(&self) -> Vec<(String, String)> {
        let mut params = Vec::new();
        if let Some(patient_id) = self.patient_id {
            params.push(("patient".to_string(), patient_id.to_string()));
        }
        if let Some(study_id) = self.study_id {
            params.push(("_has:Group:member:_id".to_string(), study_id.to_string()));
        }
        if let Some(code) = &self.code {
            params.push(("code".to_string(), code.search_token()));
        }
        params
    }
}

/// Where the next page comes from.
enum Cursor {
    First(Url, Vec<(String, String)>),
    Next(Url),
    Failed(ClientError),
    Done,
}

/// Client for a JupyterHealth Exchange instance.
///
/// Every request carries the configured bearer token. List operations return
/// streams that fetch one page at a time as they are polled.
pub struct JupyterHealthClient {
    http: reqwest::Client,
    base_url: Url,
    token: Option<String>,
    page_size: u32,
    tidier: Tidier,
}

impl JupyterHealthClient {
    pub fn new(config: ClientConfig) -> Result<Self> {
        let base_url = config.validate()?;
        let token = config.token.filter(|t| !t.is_empty());
        if token.is_none() {
            tracing::warn!(url = %base_url, "No JHE token configured; requests will be anonymous");
        }
        Ok(Self {
            http: reqwest::Client::new(),
            base_url,
            token,
            page_size: config.page_size,
            tidier: Tidier::new(),
        })
    }

    /// Build a client from `JHE_URL` / `JHE_TOKEN`.
    pub fn from_env() -> Result<Self> {
        Self::new(ClientConfig::from_env()?)
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Use a custom tidier for observation records.
    pub fn with_tidier(mut self, tidier: Tidier) -> Self {
        self.tidier = tidier;
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    pub fn has_token(&self) -> bool {
        self.token.is_some()
    }

    fn endpoint(&self, prefix: [&str; 2], path: &str) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| {
                ClientError::configuration(format!("cannot build URLs from {}", self.base_url))
            })?
            .pop_if_empty()
            .extend(prefix)
            .extend(path.split('/').filter(|segment| !segment.is_empty()));
        Ok(url)
    }

    /// `<base>/api/v1/<path>`
    pub fn api_url(&self, path: &str) -> Result<Url> {
        self.endpoint(API_PREFIX, path)
    }

    /// `<base>/fhir/r5/<path>`
    pub fn fhir_url(&self, path: &str) -> Result<Url> {
        self.endpoint(FHIR_PREFIX, path)
    }

    fn request(&self, method: Method, url: Url) -> reqwest::RequestBuilder {
        let mut req = self.http.request(method, url);
        if let Some(token) = &self.token {
            req = req.bearer_auth(token);
        }
        req.header("Accept", "application/json")
    }

    async fn get_json(&self, url: Url, params: &[(String, String)]) -> Result<Value> {
        tracing::debug!(url = %url, "GET");
        let resp = self.request(Method::GET, url).query(params).send().await?;
        handle_response(resp).await
    }

    async fn get_api(&self, path: &str) -> Result<Value> {
        self.get_json(self.api_url(path)?, &[]).await
    }

    /// Fetch one page; returns its items and the resolved next-page URL.
    async fn fetch_page(
        &self,
        url: Url,
        params: &[(String, String)],
        style: PageStyle,
    ) -> Result<(Vec<Value>, Option<Url>)> {
        let page = style.parse(self.get_json(url, params).await?)?;
        tracing::debug!(
            items = page.items.len(),
            has_next = page.next.is_some(),
            "fetched page"
        );
        let next = page
            .next
            .map(|next| self.base_url.join(&next))
            .transpose()?;
        Ok((page.items, next))
    }

    /// Stream every item of a paginated endpoint, following `next` links.
    fn paginate(
        &self,
        start: Result<Url>,
        mut params: Vec<(String, String)>,
        style: PageStyle,
        limit: Option<usize>,
    ) -> impl Stream<Item = Result<Value>> + '_ {
        params.push((style.page_size_param().to_string(), self.page_size.to_string()));
        let cursor = match start {
            Ok(url) => Cursor::First(url, params),
            Err(e) => Cursor::Failed(e),
        };

        stream::try_unfold(cursor, move |cursor| async move {
            let (items, next) = match cursor {
                Cursor::First(url, params) => self.fetch_page(url, &params, style).await?,
                Cursor::Next(url) => self.fetch_page(url, &[], style).await?,
                Cursor::Failed(e) => return Err(e),
                Cursor::Done => return Ok(None),
            };
            let cursor = next.map_or(Cursor::Done, Cursor::Next);
            Ok::<_, ClientError>(Some((items, cursor)))
        })
        .map_ok(|items| stream::iter(items.into_iter().map(Ok::<Value, ClientError>)))
        .try_flatten()
        .take(limit.unwrap_or(usize::MAX))
    }

    fn paginate_api(&self, path: &str) -> impl Stream<Item = Result<Value>> + '_ {
        self.paginate(self.api_url(path), Vec::new(), PageStyle::Rest, None)
    }

    /// The profile of the user owning the token.
    pub async fn get_user(&self) -> Result<Value> {
        self.get_api("users/profile").await
    }

    pub async fn get_organization(&self, organization_id: i64) -> Result<Value> {
        self.get_api(&format!("organizations/{organization_id}")).await
    }

    pub fn list_organizations(&self) -> impl Stream<Item = Result<Value>> + '_ {
        self.paginate_api("organizations")
    }

    pub async fn get_study(&self, study_id: i64) -> Result<Value> {
        self.get_api(&format!("studies/{study_id}")).await
    }

    /// List studies, optionally only those belonging to one organization.
    pub fn list_studies(
        &self,
        organization_id: Option<i64>,
    ) -> impl Stream<Item = Result<Value>> + '_ {
        self.paginate_api("studies").try_filter(move |study| {
            let owner = study.pointer("/organization/id").and_then(Value::as_i64);
            future::ready(organization_id.is_none_or(|id| owner == Some(id)))
        })
    }

    pub async fn get_patient(&self, patient_id: i64) -> Result<Value> {
        self.get_api(&format!("patients/{patient_id}")).await
    }

    pub fn list_patients(&self) -> impl Stream<Item = Result<Value>> + '_ {
        self.paginate_api("patients")
    }

    pub async fn get_patient_consents(&self, patient_id: i64) -> Result<Value> {
        self.get_api(&format!("patients/{patient_id}/consents")).await
    }

    /// Find the first patient matching every given criterion.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` when no criterion is given, `NotFound` when no
    /// patient matches.
    pub async fn lookup_patient(
        &self,
        email: Option<&str>,
        external_id: Option<&str>,
    ) -> Result<Value> {
        if email.is_none() && external_id.is_none() {
            return Err(ClientError::invalid_argument(
                "lookup_patient needs an email or an external_id",
            ));
        }

        let mut patients = pin!(self.list_patients());
        while let Some(patient) = patients.try_next().await? {
            let field = |name: &str| patient.get(name).and_then(Value::as_str);
            if email.is_none_or(|e| field("telecomEmail") == Some(e))
                && external_id.is_none_or(|x| field("identifier") == Some(x))
            {
                return Ok(patient);
            }
        }

        let mut criteria = Vec::new();
        if let Some(email) = email {
            criteria.push(format!("email={email}"));
        }
        if let Some(external_id) = external_id {
            criteria.push(format!("external_id={external_id}"));
        }
        Err(ClientError::not_found(format!(
            "no patient with {}",
            criteria.join(", ")
        )))
    }

    pub fn list_data_sources(&self) -> impl Stream<Item = Result<Value>> + '_ {
        self.paginate_api("data_sources")
    }

    /// Raw FHIR Observations matching `query`.
    pub fn list_observations(
        &self,
        query: ObservationQuery,
    ) -> impl Stream<Item = Result<Value>> + '_ {
        self.paginate(
            self.fhir_url("Observation"),
            query.params(),
            PageStyle::Fhir,
            query.limit,
        )
    }

    /// Observations matching `query`, each tidied into a flat record.
    pub fn list_observation_records(
        &self,
        query: ObservationQuery,
    ) -> impl Stream<Item = Result<FlatRecord>> + '_ {
        self.list_observations(query).and_then(move |observation| {
            future::ready(self.tidier.tidy(&observation).map_err(ClientError::from))
        })
    }

    /// All matching observations as one table; fails on the first bad record.
    pub async fn observations_table(&self, query: ObservationQuery) -> Result<RecordTable> {
        let records: Vec<FlatRecord> = self.list_observation_records(query).try_collect().await?;
        tracing::debug!(rows = records.len(), "assembled observation table");
        Ok(RecordTable::from_records(records))
    }
}

async fn handle_response(resp: reqwest::Response) -> Result<Value> {
    let status = resp.status();
    let url = resp.url().to_string();
    let body = resp.text().await?;

    if !status.is_success() {
        return Err(ClientError::Http {
            status: status.as_u16(),
            url,
            message: error_message(&body),
        });
    }

    if body.is_empty() {
        return Ok(Value::Null);
    }

    Ok(serde_json::from_str(&body)?)
}

/// Extract a readable message from an error body.
fn error_message(body: &str) -> String {
    if let Ok(json) = serde_json::from_str::<Value>(body) {
        if let Some(detail) = json.get("detail").and_then(Value::as_str) {
            return detail.to_string();
        }
        if json.get("resourceType").and_then(Value::as_str) == Some("OperationOutcome")
            && let Some(issues) = json.get("issue").and_then(Value::as_array)
        {
            let msgs: Vec<&str> = issues
                .iter()
                .filter_map(|i| i.get("diagnostics").and_then(Value::as_str))
                .collect();
            if !msgs.is_empty() {
                return msgs.join("; ");
            }
        }
    }

    if body.is_empty() {
        "(empty response)".to_string()
    } else {
        body.to_string()
    }
}
