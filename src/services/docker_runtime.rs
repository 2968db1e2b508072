//! Docker Engine implementation of [`ContainerRuntime`].

use crate::services::discovery::{
    ContainerRecord, ContainerRuntime, DiscoveryError, NetworkRecord,
};
use async_trait::async_trait;
use bollard::{
    Docker,
    container::{InspectContainerOptions, ListContainersOptions},
    network::ListNetworksOptions,
};
use std::collections::HashMap;
use tracing::debug;

pub struct DockerRuntime {
    client: Docker,
}

impl DockerRuntime {
    /// Connect using the platform defaults (`DOCKER_HOST` or the local socket).
    pub fn connect() -> Result<Self, DiscoveryError> {
        let client = Docker::connect_with_local_defaults()
            .map_err(|err| runtime_error("could not create docker client", err))?;
        Ok(Self { client })
    }
}

fn runtime_error(context: impl Into<String>, err: bollard::errors::Error) -> DiscoveryError {
    DiscoveryError::Runtime {
        context: context.into(),
        source: Box::new(err),
    }
}

fn filter(key: &str, value: &str) -> HashMap<String, Vec<String>> {
    HashMap::from([(key.to_string(), vec![value.to_string()])])
}

#[async_trait]
impl ContainerRuntime for DockerRuntime {
    async fn containers_with_label(
        &self,
        label: &str,
    ) -> Result<Vec<ContainerRecord>, DiscoveryError> {
        let options = ListContainersOptions {
            filters: filter("label", label),
            ..Default::default()
        };
        let summaries = self
            .client
            .list_containers(Some(options))
            .await
            .map_err(|err| runtime_error("could not list containers", err))?;

        let mut records = Vec::with_capacity(summaries.len());
        for id in summaries.into_iter().filter_map(|summary| summary.id) {
            debug!(container = %id, "inspecting container");
            let inspected = self
                .client
                .inspect_container(&id, None::<InspectContainerOptions>)
                .await
                .map_err(|err| runtime_error(format!("could not inspect container {id}"), err))?;

            let env = inspected
                .config
                .and_then(|config| config.env)
                .unwrap_or_default();
            let networks = inspected
                .network_settings
                .and_then(|settings| settings.networks)
                .unwrap_or_default()
                .into_iter()
                .filter_map(|(name, endpoint)| endpoint.ip_address.map(|ip| (name, ip)))
                .collect();

            records.push(ContainerRecord {
                id: inspected.id.unwrap_or(id),
                env,
                networks,
            });
        }
        Ok(records)
    }

    async fn networks_named(&self, name: &str) -> Result<Vec<NetworkRecord>, DiscoveryError> {
        let options = ListNetworksOptions {
            filters: filter("name", name),
        };
        let networks = self
            .client
            .list_networks(Some(options))
            .await
            .map_err(|err| runtime_error("could not list networks", err))?;

        Ok(networks
            .into_iter()
            .map(|network| NetworkRecord {
                id: network.id.unwrap_or_default(),
                name: network.name.unwrap_or_default(),
            })
            .collect())
    }
}
