use std::path::Path;

use crate::{
    error::Result,
    models::{BuildSpec, Configuration, ImageName},
};

pub trait ConfigFrontend {
    fn configuration<P: AsRef<Path>>(
        &mut self,
        project_name: &str,
        config_path: P,
    ) -> Result<Configuration>;
}

pub trait ContainerBackend {
    fn image_exists(&mut self, image: &ImageName) -> Result<bool>;

    fn build_image(&mut self, image: &ImageName, build: &BuildSpec) -> Result<()>;

    fn run_container(&mut self, configuration: &Configuration, command: &[String]) -> Result<()>;
}
