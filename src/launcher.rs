use log::info;

use crate::{
    error::Result,
    models::{BuildPolicy, Configuration},
    services::ContainerBackend,
};

/// Drives one build-and-run cycle against a backend. Nothing here
/// outlives the invocation; the runtime owns all persistent state.
pub struct Launcher {
    backend: Box<dyn ContainerBackend>,
    configuration: Configuration,
}

impl Launcher {
    pub fn init<B>(backend: B, configuration: Configuration) -> Launcher
    where
        B: 'static + ContainerBackend,
    {
        Launcher {
            backend: Box::new(backend),
            configuration,
        }
    }

    pub fn configuration(&self) -> &Configuration {
        &self.configuration
    }

    /// Builds the image if the policy requires it. Returns whether a
    /// build actually ran.
    pub fn build_image(&mut self, policy: BuildPolicy) -> Result<bool> {
        if policy == BuildPolicy::IfMissing && self.backend.image_exists(&self.configuration.image)? {
            info!("image {:?} already present", self.configuration.image);
            return Ok(false);
        }

        self.backend
            .build_image(&self.configuration.image, &self.configuration.build)?;
        Ok(true)
    }

    pub fn run(&mut self, command: &[String]) -> Result<()> {
        self.backend.run_container(&self.configuration, command)
    }
}
