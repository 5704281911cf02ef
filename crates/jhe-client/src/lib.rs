//! Client for the JupyterHealth Exchange HTTP API.
//!
//! Covers organizations, studies, patients, data sources and FHIR
//! Observations. Requests carry a bearer token; list endpoints are exposed as
//! streams that follow the server's pagination links one page at a time.
//! Observations can be fetched raw or tidied into flat records with
//! [`jhe_core::Tidier`].
//!
//! # Example
//!
//! ```ignore
//! use futures_util::TryStreamExt;
//! use jhe_client::{Code, JupyterHealthClient, ObservationQuery};
//!
//! let client = JupyterHealthClient::from_env()?;
//! let table = client
//!     .observations_table(ObservationQuery::new().patient(40018).code(Code::HeartRate))
//!     .await?;
//! ```

mod client;
mod code;
mod config;
mod error;
mod pagination;

pub use client::{JupyterHealthClient, ObservationQuery};
pub use code::{Code, OPENMHEALTH_SYSTEM};
pub use config::{ClientConfig, ConfigOverrides, DEFAULT_PAGE_SIZE};
pub use error::{ClientError, Result};
pub use pagination::{Page, PageStyle};
