use std::{path::PathBuf, process::exit, sync::Arc, time::Duration};

use anyhow::Context;
use clap::Parser;
use kkp_core::{
    kubernetes::{operations::create_local_client, KubeObjectClient},
    pki::PemCaBundle,
    resources::DEFAULT_NODE_PORT_RANGE,
};
use kube::Client;

use crate::{
    controller::ClusterController,
    datacenter::load_datacenters_meta,
    options::{ControllerOptions, ControllerOptionsBuilder},
};

mod controller;
mod datacenter;
mod helpers;
mod options;
mod reconciler;

#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// external URL of the kubermatic dashboard
    #[arg(long, env = "KUBERMATIC_EXTERNAL_URL")]
    external_url: String,
    /// name of the seed datacenter this controller runs in
    #[arg(long, env = "DATACENTER_NAME")]
    datacenter_name: String,
    /// path to the datacenters YAML file
    #[arg(long, env = "DATACENTERS", default_value = "datacenters.yaml")]
    datacenters: PathBuf,
    /// registry replacing the registries of all control plane images
    #[arg(long, env = "OVERWRITE_REGISTRY", default_value = "")]
    overwrite_registry: String,
    /// node port range of user cluster apiservers
    #[arg(long, env = "NODEPORT_RANGE", default_value = DEFAULT_NODE_PORT_RANGE)]
    nodeport_range: String,
    /// network the worker nodes are reachable through from the control plane
    #[arg(long, env = "NODE_ACCESS_NETWORK", default_value = "10.254.0.0/16")]
    node_access_network: String,
    /// size of the etcd volumes of user clusters
    #[arg(long, env = "ETCD_DISK_SIZE", default_value = "5Gi")]
    etcd_disk_size: String,
    /// URL of the OpenID token issuer
    #[arg(long, env = "OIDC_ISSUER_URL", default_value = "")]
    oidc_issuer_url: String,
    /// client ID registered at the OpenID token issuer
    #[arg(long, env = "OIDC_ISSUER_CLIENT_ID", default_value = "")]
    oidc_issuer_client_id: String,
    /// docker config JSON used to pull control plane images
    #[arg(long, env = "DOCKER_PULL_CONFIG_JSON_FILE")]
    docker_pull_config_json_file: Option<PathBuf>,
    /// PEM file with the CA certificates trusted for outgoing connections
    #[arg(long, env = "CA_BUNDLE")]
    ca_bundle: Option<PathBuf>,
    #[arg(long, env = "KUBERMATIC_IMAGE", default_value = "quay.io/kubermatic/kubermatic")]
    kubermatic_image: String,
    #[arg(long, env = "ETCD_LAUNCHER_IMAGE", default_value = "quay.io/kubermatic/etcd-launcher")]
    etcd_launcher_image: String,
    #[arg(
        long,
        env = "DNATCONTROLLER_IMAGE",
        default_value = "quay.io/kubermatic/kubeletdnat-controller"
    )]
    dnat_controller_image: String,
    #[arg(long, env = "MACHINE_CONTROLLER_IMAGE_TAG", default_value = "")]
    machine_controller_image_tag: String,
    #[arg(long, env = "MACHINE_CONTROLLER_IMAGE_REPOSITORY", default_value = "")]
    machine_controller_image_repository: String,
    /// interval between etcd backups, in minutes
    #[arg(long, env = "BACKUP_PERIOD_MINUTES", default_value_t = 20)]
    backup_period_minutes: u64,
    /// deploy konnectivity instead of OpenVPN
    #[arg(long, env = "ENABLE_KONNECTIVITY")]
    enable_konnectivity: bool,
    /// enable monitoring, logging and alerting in user clusters
    #[arg(long, env = "ENABLE_USER_CLUSTER_MLA")]
    enable_user_cluster_mla: bool,
    /// spread control plane pods across failure domain zones
    #[arg(long, env = "FAILURE_DOMAIN_ZONE_ANTI_AFFINITY")]
    failure_domain_zone_anti_affinity: bool,
    /// override default kubeconfig
    #[arg(long)]
    kube_config: Option<String>,
    /// override default kubeconfig context
    #[arg(long)]
    kube_context: Option<String>,
    /// enable verbose output
    #[arg(short = 'v', long = "verbose")]
    verbose_logging: bool,
    /// enable trace output (more detailed than verbose, overrides it if present)
    #[arg(long = "trace")]
    trace_logging: bool,
}

#[tokio::main()]
async fn main() {
    let args = Args::parse();

    configure_logger(&args);

    let client = create_client(&args).await;
    let options = get_options(&args).await;

    let controller = match ClusterController::new(
        client.clone(),
        Arc::new(KubeObjectClient::new(client)),
        options,
    ) {
        Ok(controller) => controller,
        Err(error) => {
            log::error!("Couldn't create the cluster controller! {error}");
            exit(8)
        }
    };

    controller.run().await;
}

async fn create_client(args: &Args) -> Client {
    match create_local_client(&args.kube_config, &args.kube_context).await {
        Ok(client) => client,
        Err(error) => {
            log::error!("Couldn't create client! {error:?}");
            exit(6)
        }
    }
}

async fn get_options(args: &Args) -> ControllerOptions {
    match build_options(args).await {
        Ok(options) => options,
        Err(error) => {
            log::error!("Couldn't prepare the controller options! {error:#}");
            exit(7)
        }
    }
}

async fn build_options(args: &Args) -> anyhow::Result<ControllerOptions> {
    let datacenters = load_datacenters_meta(&args.datacenters)
        .await
        .context("Unable to load the datacenters!")?;

    let docker_pull_config_json = match &args.docker_pull_config_json_file {
        Some(path) => tokio::fs::read(path)
            .await
            .context(format!("Unable to read '{}'!", path.display()))?,
        None => vec![],
    };

    let mut builder = ControllerOptionsBuilder::default();
    builder
        .external_url(args.external_url.as_str())
        .datacenter_name(args.datacenter_name.as_str())
        .datacenters(datacenters)
        .overwrite_registry(args.overwrite_registry.as_str())
        .node_port_range(args.nodeport_range.as_str())
        .node_access_network(args.node_access_network.as_str())
        .etcd_disk_size(args.etcd_disk_size.as_str())
        .oidc_issuer_url(args.oidc_issuer_url.as_str())
        .oidc_issuer_client_id(args.oidc_issuer_client_id.as_str())
        .docker_pull_config_json(docker_pull_config_json)
        .kubermatic_image(args.kubermatic_image.as_str())
        .etcd_launcher_image(args.etcd_launcher_image.as_str())
        .dnat_controller_image(args.dnat_controller_image.as_str())
        .machine_controller_image_tag(args.machine_controller_image_tag.as_str())
        .machine_controller_image_repository(args.machine_controller_image_repository.as_str())
        .backup_schedule(backup_schedule(args.backup_period_minutes)?)
        .konnectivity_enabled(args.enable_konnectivity)
        .user_cluster_mla_enabled(args.enable_user_cluster_mla)
        .supports_failure_domain_zone_anti_affinity(args.failure_domain_zone_anti_affinity);

    if let Some(path) = &args.ca_bundle {
        let bundle = PemCaBundle::from_file(path)
            .context(format!("Unable to load the CA bundle from '{}'!", path.display()))?;
        builder.ca_bundle(Arc::new(bundle));
    }

    Ok(builder.build()?)
}

fn backup_schedule(minutes: u64) -> anyhow::Result<Duration> {
    minutes
        .checked_mul(60)
        .map(Duration::from_secs)
        .with_context(|| format!("Backup period of {minutes} minutes is too long!"))
}

fn configure_logger(args: &Args) {
    let level = if args.trace_logging {
        log::LevelFilter::Trace
    } else if args.verbose_logging {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    env_logger::builder()
        .default_format()
        .format_module_path(false)
        .filter_level(level)
        .init()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backup_schedule_is_given_in_minutes() {
        assert_eq!(backup_schedule(20).unwrap(), Duration::from_secs(1200));
        assert!(backup_schedule(u64::MAX).is_err());
    }
}
