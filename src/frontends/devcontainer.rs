use serde::Deserialize;
use std::{
    collections::BTreeMap as Map,
    fs,
    path::{Path, PathBuf},
};

use crate::{
    error::{Error, Result},
    jsonc,
    models::{
        BuildSpec, Configuration, ContainerName, ImageName, MountSpec, MountType,
        WorkspaceBinding,
    },
    services::ConfigFrontend,
};

/// On-disk schema of devcontainer.json, before validation. Keys the
/// tool does not act on are tolerated and ignored.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DevContainerFile {
    pub name: Option<String>,

    pub docker_file: Option<String>,

    pub build: Option<Build>,

    #[serde(default)]
    pub run_args: Vec<String>,

    #[serde(default)]
    pub remote_env: Map<String, String>,

    pub workspace_mount: Option<String>,

    pub workspace_folder: Option<String>,

    #[serde(default)]
    pub mounts: Vec<String>,
}

#[derive(Clone, Debug, Deserialize)]
struct Build {
    #[serde(default)]
    pub args: Map<String, ArgValue>,

    pub context: Option<String>,
}

/// Build argument values are written both as strings and as bare
/// numbers; the runtime only ever sees strings.
#[derive(Clone, Debug, Deserialize)]
#[serde(untagged)]
enum ArgValue {
    Text(String),
    Number(serde_json::Number),
    Flag(bool),
}

impl ArgValue {
    fn into_string(self) -> String {
        match self {
            ArgValue::Text(text) => text,
            ArgValue::Number(number) => number.to_string(),
            ArgValue::Flag(flag) => flag.to_string(),
        }
    }
}

pub struct DevContainerFrontend;

impl DevContainerFrontend {
    pub fn new() -> DevContainerFrontend {
        DevContainerFrontend
    }
}

impl ConfigFrontend for DevContainerFrontend {
    fn configuration<P: AsRef<Path>>(
        &mut self,
        project_name: &str,
        config_path: P,
    ) -> Result<Configuration> {
        let config_path = config_path.as_ref();
        let text = fs::read_to_string(config_path).map_err(|err| Error::Parse {
            path: config_path.into(),
            message: format!("unable to read configuration: {}", err),
        })?;

        parse(project_name, config_path, &text)
    }
}

fn parse(project_name: &str, config_path: &Path, text: &str) -> Result<Configuration> {
    let strict = jsonc::strip(text);
    let file: DevContainerFile =
        serde_json::from_str(&strict).map_err(|err| Error::Parse {
            path: config_path.into(),
            message: err.to_string(),
        })?;

    validate(project_name, file)
}

fn validate(project_name: &str, file: DevContainerFile) -> Result<Configuration> {
    let dockerfile = file
        .docker_file
        .ok_or_else(|| Error::Validation("missing required field \"dockerFile\"".into()))?;
    if dockerfile.is_empty() {
        return Err(Error::Validation("\"dockerFile\" must not be empty".into()));
    }

    let name = file.name.unwrap_or_else(|| project_name.to_string());
    if name.is_empty() {
        return Err(Error::Validation("\"name\" must not be empty".into()));
    }

    let (args, context) = match file.build {
        Some(build) => (
            build
                .args
                .into_iter()
                .map(|(key, value)| (key, value.into_string()))
                .collect(),
            build.context,
        ),
        None => (Map::new(), None),
    };

    let build = BuildSpec {
        dockerfile: PathBuf::from(dockerfile),
        context: PathBuf::from(
            context.unwrap_or_else(|| "${localWorkspaceFolder}".to_string()),
        ),
        args,
    };

    let workspace_mount = match file.workspace_mount {
        Some(descriptor) => descriptor.parse()?,
        None => MountSpec {
            source: "${localWorkspaceFolder}".into(),
            target: "/workspaces/${localWorkspaceFolderBasename}".into(),
            kind: MountType::Bind,
        },
    };

    let workspace = WorkspaceBinding {
        folder: file
            .workspace_folder
            .unwrap_or_else(|| workspace_mount.target.clone()),
        mount: workspace_mount,
    };

    let mounts = file
        .mounts
        .iter()
        .map(|descriptor| descriptor.parse())
        .collect::<Result<Vec<MountSpec>>>()?;

    Ok(Configuration {
        image: ImageName(image_tag(&name)),
        name: ContainerName(name),
        build,
        run_args: file.run_args,
        remote_env: file.remote_env,
        workspace,
        mounts,
    })
}

/// Image tags are more restrictive than configuration names: lowercase
/// ascii, digits and separators only.
fn image_tag(name: &str) -> String {
    let tag = name
        .chars()
        .map(|c| match c {
            'a'..='z' | '0'..='9' | '-' | '_' | '.' => c,
            'A'..='Z' => c.to_ascii_lowercase(),
            _ => '-',
        })
        .collect::<String>();

    format!("devcon-{}", tag.trim_matches('-'))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = include_str!("../../demos/devcontainer.json");

    fn parse_sample() -> Configuration {
        parse("closure", Path::new("devcontainer.json"), SAMPLE).unwrap()
    }

    #[test]
    fn sample_document_validates() {
        let configuration = parse_sample();

        assert_eq!(configuration.name, ContainerName("closure".into()));
        assert_eq!(
            configuration.build.dockerfile,
            PathBuf::from("${localWorkspaceFolder}/docker/Dockerfile")
        );
    }

    #[test]
    fn sample_build_args() {
        let args = parse_sample().build.args;

        assert_eq!(args.len(), 3);
        assert_eq!(args.get("USERNAME"), Some(&"purse".to_string()));
        assert_eq!(args.get("USER_UID"), Some(&"1004".to_string()));
        assert_eq!(args.get("USER_GID"), Some(&"1004".to_string()));
    }

    #[test]
    fn sample_has_one_history_mount() {
        let mounts = parse_sample().mounts;

        assert_eq!(mounts.len(), 1);
        assert_eq!(mounts[0].target, "/home/purse/.zsh_history");
        assert_eq!(mounts[0].kind, MountType::Bind);
    }

    #[test]
    fn run_args_order_is_preserved() {
        let configuration = parse_sample();

        assert_eq!(
            configuration.run_args,
            vec![
                "--gpus",
                "all",
                "--net=host",
                "--volume=/tmp/.X11-unix:/tmp/.X11-unix",
            ]
        );
    }

    #[test]
    fn missing_docker_file_is_a_validation_error() {
        let result = parse(
            "closure",
            Path::new("devcontainer.json"),
            r#"{"name": "closure"}"#,
        );

        assert!(matches!(result, Err(Error::Validation(_))));
    }

    #[test]
    fn malformed_document_is_a_parse_error() {
        let result = parse(
            "closure",
            Path::new("devcontainer.json"),
            r#"{"name": "closure", "dockerFile":}"#,
        );

        assert!(matches!(result, Err(Error::Parse { .. })));
    }

    #[test]
    fn unresolved_placeholders_do_not_fail_at_parse_time() {
        // ${localEnv:HOME} stays verbatim until launch.
        let configuration = parse_sample();
        assert_eq!(
            configuration.mounts[0].source,
            "${localEnv:HOME}/.zsh_history"
        );
    }

    #[test]
    fn numeric_build_args_become_strings() {
        let configuration = parse(
            "closure",
            Path::new("devcontainer.json"),
            r#"{"dockerFile": "Dockerfile", "build": {"args": {"USER_UID": 1004}}}"#,
        )
        .unwrap();

        assert_eq!(
            configuration.build.args.get("USER_UID"),
            Some(&"1004".to_string())
        );
    }

    #[test]
    fn name_defaults_to_project_name() {
        let configuration = parse(
            "closure",
            Path::new("devcontainer.json"),
            r#"{"dockerFile": "Dockerfile"}"#,
        )
        .unwrap();

        assert_eq!(configuration.name, ContainerName("closure".into()));
    }

    #[test]
    fn workspace_defaults_when_omitted() {
        let configuration = parse(
            "closure",
            Path::new("devcontainer.json"),
            r#"{"dockerFile": "Dockerfile"}"#,
        )
        .unwrap();

        assert_eq!(
            configuration.workspace.folder,
            "/workspaces/${localWorkspaceFolderBasename}"
        );
        assert_eq!(configuration.workspace.mount.kind, MountType::Bind);
    }

    #[test]
    fn image_tag_is_sanitized() {
        assert_eq!(image_tag("Closure Dev"), "devcon-closure-dev");
        assert_eq!(image_tag("closure"), "devcon-closure");
    }

    #[test]
    fn configuration_roundtrips_through_strict_json() {
        let configuration = parse_sample();

        let strict = serde_json::to_string(&configuration).unwrap();
        let reparsed: Configuration = serde_json::from_str(&strict).unwrap();

        assert_eq!(reparsed, configuration);
    }
}
