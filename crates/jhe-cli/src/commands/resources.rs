use anyhow::Result;
use futures_util::TryStreamExt;
use jhe_client::JupyterHealthClient;
use serde_json::Value;

use crate::cli::{OrganizationsArgs, OutputFormat, PatientsArgs, StudiesArgs};
use crate::output::{print_value, print_values};

pub async fn user(client: &JupyterHealthClient, format: OutputFormat) -> Result<()> {
    let user = client.get_user().await?;
    print_value(&user, format)
}

pub async fn organizations(
    client: &JupyterHealthClient,
    args: &OrganizationsArgs,
    format: OutputFormat,
) -> Result<()> {
    if let Some(id) = args.id {
        return print_value(&client.get_organization(id).await?, format);
    }
    let organizations: Vec<Value> = client.list_organizations().try_collect().await?;
    print_values(&organizations, format)
}

pub async fn studies(
    client: &JupyterHealthClient,
    args: &StudiesArgs,
    format: OutputFormat,
) -> Result<()> {
    if let Some(id) = args.id {
        return print_value(&client.get_study(id).await?, format);
    }
    let studies: Vec<Value> = client
        .list_studies(args.organization_id)
        .try_collect()
        .await?;
    print_values(&studies, format)
}

pub async fn patients(
    client: &JupyterHealthClient,
    args: &PatientsArgs,
    format: OutputFormat,
) -> Result<()> {
    match args.id {
        Some(id) if args.consents => print_value(&client.get_patient_consents(id).await?, format),
        Some(id) => print_value(&client.get_patient(id).await?, format),
        None if args.email.is_some() || args.external_id.is_some() => {
            let patient = client
                .lookup_patient(args.email.as_deref(), args.external_id.as_deref())
                .await?;
            print_value(&patient, format)
        }
        None => {
            let patients: Vec<Value> = client.list_patients().try_collect().await?;
            print_values(&patients, format)
        }
    }
}

pub async fn data_sources(client: &JupyterHealthClient, format: OutputFormat) -> Result<()> {
    let sources: Vec<Value> = client.list_data_sources().try_collect().await?;
    print_values(&sources, format)
}
