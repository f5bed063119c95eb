use crate::docker::DockerRuntimeConfig;
use crate::domain::{AdapterLaunch, ContainerRuntime, DomainError, DomainResult};
use anyhow::{Context, Result};
use async_trait::async_trait;
use bollard::container::{
    Config, CreateContainerOptions, InspectContainerOptions, RemoveContainerOptions,
    StopContainerOptions,
};
use bollard::image::CreateImageOptions;
use bollard::models::{EndpointSettings, HostConfig, RestartPolicy, RestartPolicyNameEnum};
use bollard::network::ConnectNetworkOptions;
use bollard::Docker;
use futures::TryStreamExt;
use std::collections::{BTreeSet, HashMap};
use tracing::{debug, info, instrument, warn};

/// Returns true when the Docker API answered 404
fn is_not_found(err: &bollard::errors::Error) -> bool {
    matches!(
        err,
        bollard::errors::Error::DockerResponseServerError {
            status_code: 404,
            ..
        }
    )
}

/// First network becomes the container's network mode, the rest are joined after creation
fn split_networks(networks: &BTreeSet<String>) -> (Option<String>, Vec<String>) {
    let mut iter = networks.iter().cloned();
    let primary = iter.next();
    (primary, iter.collect())
}

/// Container runtime backed by the local Docker engine
pub struct DockerContainerRuntime {
    docker: Docker,
    config: DockerRuntimeConfig,
    /// Proxy network plus every network the orchestrator itself is attached to
    networks: BTreeSet<String>,
}

impl DockerContainerRuntime {
    /// Connect to the local engine and discover the orchestrator's own networks
    pub async fn connect(config: DockerRuntimeConfig) -> Result<Self> {
        let docker =
            Docker::connect_with_local_defaults().context("Failed to connect to Docker")?;
        docker
            .ping()
            .await
            .context("Docker engine did not answer ping")?;

        let mut networks = BTreeSet::new();
        if !config.proxy_network.is_empty() {
            networks.insert(config.proxy_network.clone());
        }

        let self_container = config
            .self_container
            .clone()
            .or_else(|| std::env::var("HOSTNAME").ok());
        if let Some(name) = self_container {
            match Self::own_networks(&docker, &name).await {
                Ok(own) => {
                    debug!(container = %name, count = own.len(), "discovered orchestrator networks");
                    networks.extend(own);
                }
                Err(e) => {
                    // Not running inside a container, or the engine hides it
                    warn!(container = %name, error = %e, "could not inspect orchestrator container, using proxy network only");
                }
            }
        }

        info!(networks = ?networks, "Docker container runtime ready");
        Ok(Self {
            docker,
            config,
            networks,
        })
    }

    async fn own_networks(docker: &Docker, container: &str) -> Result<Vec<String>> {
        let inspected = docker
            .inspect_container(container, None::<InspectContainerOptions>)
            .await
            .with_context(|| format!("Failed to inspect container {}", container))?;

        Ok(inspected
            .network_settings
            .and_then(|settings| settings.networks)
            .map(|networks| networks.into_keys().collect())
            .unwrap_or_default())
    }

    /// Pull the image; a failed pull is tolerated when the image is already local
    async fn pull_image(&self, image: &str) {
        let options = CreateImageOptions {
            from_image: image.to_string(),
            ..Default::default()
        };

        let pulled: Result<Vec<_>, _> = self
            .docker
            .create_image(Some(options), None, self.config.registry.credentials())
            .try_collect()
            .await;

        match pulled {
            Ok(_) => debug!(image = %image, "image pulled"),
            Err(e) => warn!(image = %image, error = %e, "image pull failed, relying on local copy"),
        }
    }

    async fn remove_quietly(&self, identifier: &str) -> Result<()> {
        let options = RemoveContainerOptions {
            force: true,
            ..Default::default()
        };
        match self.docker.remove_container(identifier, Some(options)).await {
            Ok(()) => Ok(()),
            Err(e) if is_not_found(&e) => Ok(()),
            Err(e) => Err(anyhow::Error::new(e).context("Failed to remove container")),
        }
    }

    async fn create_and_start(&self, launch: &AdapterLaunch) -> Result<String> {
        let (primary_network, extra_networks) = split_networks(&self.networks);

        let host_config = HostConfig {
            network_mode: primary_network,
            restart_policy: Some(RestartPolicy {
                name: Some(RestartPolicyNameEnum::UNLESS_STOPPED),
                ..Default::default()
            }),
            ..Default::default()
        };

        let labels: HashMap<String, String> = launch
            .labels
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        let container_config = Config {
            image: Some(launch.image.clone()),
            env: Some(launch.env_pairs()),
            labels: Some(labels),
            host_config: Some(host_config),
            ..Default::default()
        };

        let options = CreateContainerOptions {
            name: launch.container_name.clone(),
            ..Default::default()
        };

        let response = self
            .docker
            .create_container(Some(options), container_config)
            .await
            .context("Failed to create container")?;
        let container_id = response.id;

        if let Err(e) = self.start_and_attach(&container_id, &extra_networks).await {
            if let Err(cleanup) = self.remove_quietly(&container_id).await {
                warn!(container_id = %container_id, error = %cleanup, "failed to remove half-created container");
            }
            return Err(e);
        }

        Ok(container_id)
    }

    async fn start_and_attach(&self, container_id: &str, networks: &[String]) -> Result<()> {
        for network in networks {
            let options = ConnectNetworkOptions {
                container: container_id.to_string(),
                endpoint_config: EndpointSettings::default(),
            };
            self.docker
                .connect_network(network, options)
                .await
                .with_context(|| format!("Failed to join network {}", network))?;
        }

        self.docker
            .start_container::<String>(container_id, None)
            .await
            .context("Failed to start container")?;
        Ok(())
    }
}

#[async_trait]
impl ContainerRuntime for DockerContainerRuntime {
    #[instrument(skip(self, launch), fields(device_id = %launch.device_id, container = %launch.container_name, image = %launch.image))]
    async fn run_adapter(&self, launch: AdapterLaunch) -> DomainResult<String> {
        // A leftover container with the same name would make create fail
        self.remove_quietly(&launch.container_name)
            .await
            .map_err(DomainError::ContainerRuntimeError)?;

        self.pull_image(&launch.image).await;

        let container_id = self
            .create_and_start(&launch)
            .await
            .map_err(DomainError::ContainerRuntimeError)?;

        info!(container_id = %container_id, "adapter container started");
        Ok(container_id)
    }

    #[instrument(skip(self), fields(container = %identifier))]
    async fn stop_and_remove_container(&self, identifier: &str) -> DomainResult<()> {
        let stop = StopContainerOptions {
            t: self.config.stop_timeout_secs,
        };
        match self.docker.stop_container(identifier, Some(stop)).await {
            Ok(()) => debug!("container stopped"),
            Err(e) if is_not_found(&e) => {
                debug!("container already gone");
                return Ok(());
            }
            // 304 (already stopped) and friends: removal below still applies
            Err(e) => debug!(error = %e, "stop did not complete, forcing removal"),
        }

        self.remove_quietly(identifier)
            .await
            .map_err(DomainError::ContainerRuntimeError)?;

        info!("adapter container removed");
        Ok(())
    }
}
