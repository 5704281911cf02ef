use anyhow::Result;
use futures_util::TryStreamExt;
use jhe_client::{JupyterHealthClient, ObservationQuery};
use serde_json::Value;

use crate::cli::{ObservationsArgs, OutputFormat};
use crate::output::{print_table, print_values};

fn query_from_args(args: &ObservationsArgs) -> ObservationQuery {
    let mut query = ObservationQuery::new();
    if let Some(patient_id) = args.patient_id {
        query = query.patient(patient_id);
    }
    if let Some(study_id) = args.study_id {
        query = query.study(study_id);
    }
    if let Some(code) = &args.code {
        query = query.code(code.as_str());
    }
    if let Some(limit) = args.limit {
        query = query.limit(limit);
    }
    query
}

pub async fn observations(
    client: &JupyterHealthClient,
    args: &ObservationsArgs,
    format: OutputFormat,
) -> Result<()> {
    if args.patient_id.is_none() && args.study_id.is_none() {
        tracing::info!("no patient or study filter; fetching every visible observation");
    }
    let query = query_from_args(args);

    if args.raw {
        let resources: Vec<Value> = client.list_observations(query).try_collect().await?;
        return print_values(&resources, format);
    }

    let table = client.observations_table(query).await?;
    print_table(&table, format)
}
