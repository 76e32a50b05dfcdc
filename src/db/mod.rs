mod wire;

use std::sync::Arc;

use futures_util::stream::{self, BoxStream, StreamExt, TryStreamExt};
use gcp_auth::TokenProvider;
use reqwest::{Client, RequestBuilder, StatusCode};
use thiserror::Error;
use tracing::{debug, info};
use url::Url;

use crate::config::Config;
use crate::models::Record;
use wire::{ErrorResponse, ListDocumentsResponse};

const FIRESTORE_ENDPOINT: &str = "https://firestore.googleapis.com/";
const FIRESTORE_SCOPES: &[&str] = &["https://www.googleapis.com/auth/datastore"];
/// The emulator treats this bearer token as an admin and bypasses security rules
const EMULATOR_TOKEN: &str = "owner";

/// Failure to obtain a usable handle on the backend
#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("unable to resolve Google Cloud credentials: {0}")]
    Credentials(#[source] gcp_auth::Error),

    #[error("unable to build HTTP client: {0}")]
    Http(#[source] reqwest::Error),

    #[error("invalid Firestore endpoint: {0}")]
    Endpoint(#[from] url::ParseError),

    #[error("Firestore endpoint cannot hold a path: {0}")]
    NotABase(String),

    #[error("Firestore project is unreachable: {0}")]
    Unreachable(#[source] FetchError),
}

impl ConnectionError {
    /// Failures that re-authenticating would fix
    pub fn is_auth_failure(&self) -> bool {
        match self {
            ConnectionError::Credentials(_) => true,
            ConnectionError::Unreachable(error) => error.is_permission_denied(),
            _ => false,
        }
    }
}

/// Failure while scanning a collection
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("unable to refresh access token: {0}")]
    Token(#[source] gcp_auth::Error),

    #[error("request to Firestore failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("permission denied reading '{collection}': {message}")]
    PermissionDenied { collection: String, message: String },

    #[error("Firestore answered {status}: {message}")]
    Status { status: StatusCode, message: String },

    #[error("invalid Firestore response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("invalid collection path '{0}'")]
    InvalidCollection(String),
}

impl FetchError {
    pub fn is_permission_denied(&self) -> bool {
        matches!(self, FetchError::PermissionDenied { .. })
    }
}

/// Anything that can scan every document of a collection
pub trait DocumentStore {
    /// Lazy, forward-only scan in backend order
    fn scan<'a>(&'a self, collection: &'a str) -> BoxStream<'a, Result<Record, FetchError>>;
}

enum Auth {
    DefaultCredentials(Arc<dyn TokenProvider>),
    Emulator,
}

/// Where the next `documents.list` call resumes
enum PageCursor {
    First,
    Next(String),
    Done,
}

/// Firestore REST client bound to one project database
pub struct FirestoreClient {
    http: Client,
    auth: Auth,
    documents_url: Url,
    page_size: u32,
}

impl FirestoreClient {
    /// Resolve credentials, build a client for the configured project and check
    /// that the collection answers.
    ///
    /// A one-document request is made here so bad credentials or a wrong project
    /// surface before anything is printed.
    pub async fn connect(config: &Config) -> Result<Self, ConnectionError> {
        let client = Self::open(config).await?;
        client
            .list_page(&config.firestore_collection, None, 1)
            .await
            .map_err(ConnectionError::Unreachable)?;
        debug!(url = %client.documents_url, "connected");
        Ok(client)
    }

    /// Build the client without contacting the backend
    async fn open(config: &Config) -> Result<Self, ConnectionError> {
        let http = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(ConnectionError::Http)?;

        let (base, auth) = match config.emulator_host() {
            Some(host) => {
                info!(host, "using Firestore emulator");
                (Url::parse(&format!("http://{host}/"))?, Auth::Emulator)
            }
            None => {
                let provider = gcp_auth::provider()
                    .await
                    .map_err(ConnectionError::Credentials)?;
                provider
                    .token(FIRESTORE_SCOPES)
                    .await
                    .map_err(ConnectionError::Credentials)?;
                info!("using application default credentials");
                (Url::parse(FIRESTORE_ENDPOINT)?, Auth::DefaultCredentials(provider))
            }
        };

        let documents_url = documents_root(
            base,
            &config.firestore_project_id,
            &config.firestore_database,
        )?;

        Ok(Self {
            http,
            auth,
            documents_url,
            page_size: config.firestore_page_size,
        })
    }

    fn collection_url(&self, collection: &str) -> Result<Url, FetchError> {
        let invalid = || FetchError::InvalidCollection(collection.to_owned());
        if collection.split('/').any(str::is_empty) {
            return Err(invalid());
        }

        let mut url = self.documents_url.clone();
        url.path_segments_mut()
            .map_err(|()| invalid())?
            .extend(collection.split('/'));
        Ok(url)
    }

    async fn authorize(&self, request: RequestBuilder) -> Result<RequestBuilder, FetchError> {
        match &self.auth {
            Auth::Emulator => Ok(request.bearer_auth(EMULATOR_TOKEN)),
            Auth::DefaultCredentials(provider) => {
                let token = provider
                    .token(FIRESTORE_SCOPES)
                    .await
                    .map_err(FetchError::Token)?;
                Ok(request.bearer_auth(token.as_str()))
            }
        }
    }

    async fn list_page(
        &self,
        collection: &str,
        page_token: Option<&str>,
        page_size: u32,
    ) -> Result<ListDocumentsResponse, FetchError> {
        let url = self.collection_url(collection)?;
        let mut request = self.http.get(url).query(&[("pageSize", page_size)]);
        if let Some(token) = page_token {
            request = request.query(&[("pageToken", token)]);
        }

        let response = self.authorize(request).await?.send().await?;
        let status = response.status();
        let body = response.bytes().await?;
        if !status.is_success() {
            return Err(status_error(collection, status, &body));
        }

        Ok(serde_json::from_slice(&body)?)
    }

    async fn next_page(
        &self,
        collection: &str,
        cursor: PageCursor,
    ) -> Result<Option<(Vec<Record>, PageCursor)>, FetchError> {
        let page_token = match cursor {
            PageCursor::Done => return Ok(None),
            PageCursor::First => None,
            PageCursor::Next(token) => Some(token),
        };

        let page = self
            .list_page(collection, page_token.as_deref(), self.page_size)
            .await?;
        let next = match page.next_page() {
            Some(token) => PageCursor::Next(token.to_owned()),
            None => PageCursor::Done,
        };
        debug!(collection, documents = page.documents.len(), "fetched page");

        let records = page.documents.into_iter().map(Record::from).collect();
        Ok(Some((records, next)))
    }
}

impl DocumentStore for FirestoreClient {
    fn scan<'a>(&'a self, collection: &'a str) -> BoxStream<'a, Result<Record, FetchError>> {
        stream::try_unfold(PageCursor::First, move |cursor| {
            self.next_page(collection, cursor)
        })
        .map_ok(|records| stream::iter(records.into_iter().map(Ok::<_, FetchError>)))
        .try_flatten()
        .boxed()
    }
}

fn documents_root(mut base: Url, project: &str, database: &str) -> Result<Url, ConnectionError> {
    let not_a_base = base.to_string();
    base.path_segments_mut()
        .map_err(|()| ConnectionError::NotABase(not_a_base))?
        .pop_if_empty()
        .extend(["v1", "projects", project, "databases", database, "documents"]);
    Ok(base)
}

fn status_error(collection: &str, status: StatusCode, body: &[u8]) -> FetchError {
    let (message, denied) = match serde_json::from_slice::<ErrorResponse>(body) {
        Ok(parsed) => (
            parsed.error.message,
            parsed.error.status == "PERMISSION_DENIED",
        ),
        Err(_) => (String::from_utf8_lossy(body).trim().to_owned(), false),
    };

    if denied || status == StatusCode::FORBIDDEN {
        FetchError::PermissionDenied {
            collection: collection.to_owned(),
            message,
        }
    } else {
        FetchError::Status { status, message }
    }
}
