use anyhow::{anyhow, Result};
use crossterm::{
    style::{self, Colorize, Styler},
    QueueableCommand,
};
use log::info;
use std::{
    env,
    io::{stdout, Write},
    path::{Path, PathBuf},
};
use structopt::StructOpt;

use backends::DockerBackend;
use frontends::DevContainerFrontend;
use launcher::Launcher;
use models::BuildPolicy;
use placeholder::Placeholders;
use services::ConfigFrontend;

mod backends;
mod error;
mod frontends;
mod jsonc;
mod launcher;
mod models;
mod placeholder;
mod services;

#[derive(Debug, StructOpt)]
#[structopt(
    name = "devcon",
    about = "A devcontainer.json compatible tool for building and launching development containers with docker."
)]
enum Opt {
    /// Builds the development image without starting a container.
    Build {
        #[structopt(long)]
        /// Rebuild even if the image already exists.
        force: bool,
    },
    /// Finds a devcontainer.json file and launches the container defined in it.
    Up {
        #[structopt(long)]
        /// Build the image even if it already exists.
        build: bool,

        /// Command to run in the container instead of the image default.
        command: Vec<String>,
    },
    /// Prints the configuration after validation and placeholder resolution.
    Config,
}

fn find_config_file<P: AsRef<Path>>(path: P) -> Option<PathBuf> {
    for path in path.as_ref().ancestors() {
        let config_path = path.join(".devcontainer").join("devcontainer.json");
        if config_path.exists() {
            return Some(config_path);
        }

        let config_path = path.join(".devcontainer.json");
        if config_path.exists() {
            return Some(config_path);
        }
    }

    None
}

/// The workspace is the directory the configuration file belongs to,
/// one level up when the file lives in a .devcontainer directory.
fn workspace_root(config_path: &Path) -> Option<&Path> {
    let parent = config_path.parent()?;
    if parent.file_name() == Some(".devcontainer".as_ref()) {
        parent.parent()
    } else {
        Some(parent)
    }
}

fn main() -> Result<()> {
    pretty_env_logger::init_custom_env("LOG");

    let opt = Opt::from_args();

    let mut stdout = stdout();

    let current_dir = env::current_dir()?;
    let config_path = find_config_file(current_dir)
        .ok_or_else(|| anyhow!("Couldn't find a devcontainer.json file in the current working directory or any of its parents."))?;
    info!("found configuration file {:?}", config_path);

    let workspace = workspace_root(&config_path)
        .ok_or_else(|| anyhow!("Configuration file has no parent directory."))?
        .to_path_buf();
    info!("found workspace {:?}", workspace);

    let project_name = workspace
        .file_name()
        .and_then(|path| path.to_str())
        .ok_or_else(|| anyhow!("Couldn't determine the project name."))?;
    info!("project name {:?}", project_name);

    let mut frontend = DevContainerFrontend::new();
    let configuration = frontend.configuration(project_name, config_path.as_path())?;
    info!("validated configuration");

    // Substitution is deferred until here, the last moment before the
    // values are actually needed.
    let configuration = Placeholders::from_host(workspace).apply(&configuration)?;
    info!("resolved placeholders");

    match opt {
        Opt::Config => {
            println!("{}", serde_json::to_string_pretty(&configuration)?);
        }
        Opt::Build { force } => {
            let backend = DockerBackend::connect()?;
            info!("connected to docker");

            let policy = if force {
                BuildPolicy::Always
            } else {
                BuildPolicy::IfMissing
            };

            let mut launcher = Launcher::init(backend, configuration);
            build_step(&mut launcher, &mut stdout, policy)?;
        }
        Opt::Up { build, command } => {
            let backend = DockerBackend::connect()?;
            info!("connected to docker");

            let policy = if build {
                BuildPolicy::Always
            } else {
                BuildPolicy::IfMissing
            };

            let mut launcher = Launcher::init(backend, configuration);
            build_step(&mut launcher, &mut stdout, policy)?;

            stdout
                .queue(style::Print(format!(
                    "Starting {}\n",
                    launcher.configuration().name.0
                )))?
                .flush()?;
            launcher.run(&command)?;
        }
    }

    Ok(())
}

fn build_step(
    launcher: &mut Launcher,
    stdout: &mut impl Write,
    policy: BuildPolicy,
) -> Result<()> {
    stdout
        .queue(style::Print(format!(
            "Building {}\n",
            launcher.configuration().image.0
        )))?
        .flush()?;

    let built = launcher.build_image(policy)?;

    if built {
        stdout
            .queue(style::PrintStyledContent("done".green().bold()))?
            .queue(style::Print("\n"))?
            .flush()?;
    } else {
        stdout
            .queue(style::PrintStyledContent("INFO: ".cyan().bold()))?
            .queue(style::Print("image already exists, skipping build.\n"))?
            .flush()?;
    }

    Ok(())
}
