use log::{debug, info};
use std::process::Command;

use crate::{
    error::{Error, Result},
    models::{BuildSpec, Configuration, ImageName},
    services::ContainerBackend,
};

/// Talks to the docker CLI. All interpretation of runtime failures is
/// out of scope; stderr is surfaced verbatim.
pub struct DockerBackend {
    program: String,
}

impl DockerBackend {
    pub fn connect() -> Result<DockerBackend> {
        let backend = DockerBackend {
            program: "docker".into(),
        };

        let output = Command::new(&backend.program)
            .arg("--version")
            .output()
            .map_err(|err| Error::ExternalTool {
                tool: backend.program.clone(),
                status: "unavailable".into(),
                stderr: err.to_string(),
            })?;
        if !output.status.success() {
            return Err(external(&backend.program, &output));
        }
        info!(
            "using {}",
            String::from_utf8_lossy(&output.stdout).trim()
        );

        Ok(backend)
    }
}

impl ContainerBackend for DockerBackend {
    fn image_exists(&mut self, image: &ImageName) -> Result<bool> {
        let output = Command::new(&self.program)
            .args(&["image", "inspect", &image.0])
            .output()
            .map_err(|err| Error::ExternalTool {
                tool: self.program.clone(),
                status: "unavailable".into(),
                stderr: err.to_string(),
            })?;

        Ok(output.status.success())
    }

    fn build_image(&mut self, image: &ImageName, build: &BuildSpec) -> Result<()> {
        if !build.dockerfile.exists() {
            return Err(Error::Validation(format!(
                "dockerfile {:?} does not exist",
                build.dockerfile
            )));
        }

        let args = build_command_args(image, build);
        debug!("docker {:?}", args);

        // Build logs stream straight through to the user.
        let status = Command::new(&self.program)
            .args(&args)
            .status()
            .map_err(|err| Error::ExternalTool {
                tool: self.program.clone(),
                status: "unavailable".into(),
                stderr: err.to_string(),
            })?;

        if status.success() {
            Ok(())
        } else {
            Err(streamed(format!("{} build", self.program), status.to_string()))
        }
    }

    fn run_container(&mut self, configuration: &Configuration, command: &[String]) -> Result<()> {
        let args = run_command_args(configuration, command);
        debug!("docker {:?}", args);

        // The container may be interactive, so stdio is inherited.
        let status = Command::new(&self.program)
            .args(&args)
            .status()
            .map_err(|err| Error::ExternalTool {
                tool: self.program.clone(),
                status: "unavailable".into(),
                stderr: err.to_string(),
            })?;

        if status.success() {
            Ok(())
        } else {
            Err(streamed(format!("{} run", self.program), status.to_string()))
        }
    }
}

/// Failure of a command whose stdio was inherited; there is no captured
/// stderr to attach, the user already saw it.
fn streamed(tool: String, status: String) -> Error {
    Error::ExternalTool {
        tool,
        status,
        stderr: "(output streamed above)".into(),
    }
}

fn external(tool: &str, output: &std::process::Output) -> Error {
    Error::ExternalTool {
        tool: tool.into(),
        status: output.status.to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    }
}

fn build_command_args(image: &ImageName, build: &BuildSpec) -> Vec<String> {
    let mut args = vec![
        "build".to_string(),
        "--file".to_string(),
        build.dockerfile.to_string_lossy().into_owned(),
        "--tag".to_string(),
        image.0.clone(),
    ];

    for (key, value) in build.args.iter() {
        args.push("--build-arg".to_string());
        args.push(format!("{}={}", key, value));
    }

    args.push(build.context.to_string_lossy().into_owned());
    args
}

fn run_command_args(configuration: &Configuration, command: &[String]) -> Vec<String> {
    let mut args = vec![
        "run".to_string(),
        "--name".to_string(),
        configuration.name.0.clone(),
    ];

    // User flags go first and verbatim; repeated flags are meaningful
    // to the runtime and must survive untouched.
    args.extend(configuration.run_args.iter().cloned());

    for (key, value) in configuration.remote_env.iter() {
        args.push("--env".to_string());
        args.push(format!("{}={}", key, value));
    }

    args.push("--mount".to_string());
    args.push(configuration.workspace.mount.to_string());

    for mount in configuration.mounts.iter() {
        args.push("--mount".to_string());
        args.push(mount.to_string());
    }

    args.push("--workdir".to_string());
    args.push(configuration.workspace.folder.clone());

    args.push(configuration.image.0.clone());
    args.extend(command.iter().cloned());

    args
}
