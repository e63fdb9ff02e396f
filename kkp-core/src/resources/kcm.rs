use std::collections::BTreeSet;

use k8s_openapi::api::{apps::v1::Deployment, core::v1::Container};
use log::{debug, trace};
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DefaultOnNull};

use crate::{
    helpers::split_list,
    kubernetes::deployment::{get_container, is_deployment_rollout_complete},
};

use super::{cloud::CLOUD_PROVIDER_EXTERNAL_FLAG, CONTROLLER_MANAGER_DEPLOYMENT_NAME};

const COMMAND_ARG: &str = "-command";
const CLOUD_PROVIDER_ARG: &str = "--cloud-provider";
const CONTROLLERS_ARG: &str = "--controllers";

const DISABLED_CLOUD_CONTROLLERS: [&str; 3] = ["-cloud-node-lifecycle", "-route", "-service"];

/// Command wrapped by the http-prober, passed as JSON after `-command`.
#[serde_as]
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct Command {
    #[serde_as(deserialize_as = "DefaultOnNull")]
    #[serde(default)]
    pub command: String,
    #[serde_as(deserialize_as = "DefaultOnNull")]
    #[serde(default)]
    pub args: Vec<String>,
}

pub fn unwrap_command(container: &Container) -> Option<Command> {
    let args = container.args.as_deref().unwrap_or_default();

    args.iter()
        .position(|arg| {
            trace!("unwrap command processing arg: {arg}");
            arg == COMMAND_ARG
        })
        .and_then(|i| args.get(i + 1))
        .and_then(|raw| serde_json::from_str(raw).ok())
}

/// Value following `name`, `None` when the flag is absent or has no value.
pub fn get_arg_value<'a>(args: &'a [String], name: &str) -> Option<&'a str> {
    args.iter()
        .position(|arg| arg == name)
        .and_then(|i| args.get(i + 1))
        .map(String::as_str)
}

/// Whether the controller-manager finished rolling out with its cloud
/// controllers turned off, either by not running an in-tree provider at all
/// or by explicitly disabling them.
pub fn cloud_controllers_deactivated(kcm: &Deployment) -> bool {
    let ready = is_deployment_rollout_complete(kcm).unwrap_or(false);
    debug!("controller-manager deployment rollout complete: {ready}");

    let container = get_container(kcm, CONTROLLER_MANAGER_DEPLOYMENT_NAME);
    let Some(command) = container.and_then(unwrap_command) else {
        return false;
    };
    trace!("controller-manager command {:?} {}", command.args, command.args.len());

    match get_arg_value(&command.args, CLOUD_PROVIDER_ARG) {
        None | Some(CLOUD_PROVIDER_EXTERNAL_FLAG) => {
            debug!("in-tree cloud provider disabled in controller-manager deployment");
            return ready;
        }
        Some(_) => {}
    }

    match get_arg_value(&command.args, CONTROLLERS_ARG) {
        Some(controllers) => {
            let controllers = split_list(controllers).collect::<BTreeSet<_>>();
            debug!("cloud controllers disabled in controller-manager deployment {controllers:?}");

            ready
                && DISABLED_CLOUD_CONTROLLERS
                    .iter()
                    .all(|controller| controllers.contains(controller))
        }
        None => false,
    }
}
