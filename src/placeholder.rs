use std::{
    collections::BTreeMap as Map,
    env,
    path::{Path, PathBuf},
};

use crate::{
    error::{Error, Result},
    models::{BuildSpec, Configuration, MountSpec, WorkspaceBinding},
};

/// Substitution context for the deferred `${...}` placeholders. Values
/// stay verbatim through parsing and validation; substitution only
/// happens once a build or run is actually about to start.
///
/// Recognized forms: `${localWorkspaceFolder}`,
/// `${localWorkspaceFolderBasename}`, `${localEnv:VAR}` and
/// `${localEnv:VAR:default}`. A default may itself be a placeholder,
/// but a bare `}` inside a default ends the placeholder; there is no
/// escape for it.
pub struct Placeholders {
    workspace_folder: PathBuf,
    env: Map<String, String>,
}

impl Placeholders {
    pub fn new<P: Into<PathBuf>>(workspace_folder: P, env: Map<String, String>) -> Placeholders {
        Placeholders {
            workspace_folder: workspace_folder.into(),
            env,
        }
    }

    /// Builds a context from the invoking host's environment.
    pub fn from_host<P: Into<PathBuf>>(workspace_folder: P) -> Placeholders {
        Placeholders::new(workspace_folder, env::vars().collect())
    }

    /// Substitutes every placeholder in `value`, leaving literal text
    /// untouched.
    pub fn resolve(&self, value: &str) -> Result<String> {
        let mut output = String::with_capacity(value.len());
        let mut rest = value;

        while let Some(start) = rest.find("${") {
            output.push_str(&rest[..start]);
            let after = &rest[start + 2..];
            let end = matching_brace(after).ok_or_else(|| Error::UnresolvedVariable {
                value: value.into(),
                message: "unterminated placeholder".into(),
            })?;
            output.push_str(&self.lookup(&after[..end], value)?);
            rest = &after[end + 1..];
        }

        output.push_str(rest);
        Ok(output)
    }

    fn lookup(&self, name: &str, context: &str) -> Result<String> {
        match name {
            "localWorkspaceFolder" => Ok(self.workspace_folder.to_string_lossy().into_owned()),
            "localWorkspaceFolderBasename" => self
                .workspace_folder
                .file_name()
                .and_then(|name| name.to_str())
                .map(str::to_string)
                .ok_or_else(|| Error::UnresolvedVariable {
                    value: context.into(),
                    message: format!(
                        "workspace folder {:?} has no basename",
                        self.workspace_folder
                    ),
                }),
            _ => match name.strip_prefix("localEnv:") {
                Some(variable) => {
                    let (variable, default) = match variable.find(':') {
                        Some(index) => (&variable[..index], Some(&variable[index + 1..])),
                        None => (variable, None),
                    };

                    match (self.env.get(variable), default) {
                        (Some(value), _) => Ok(value.clone()),
                        // The default may contain placeholders of its own.
                        (None, Some(default)) => self.resolve(default),
                        (None, None) => Err(Error::UnresolvedVariable {
                            value: context.into(),
                            message: format!("environment variable {} is not set", variable),
                        }),
                    }
                }
                None => Err(Error::UnresolvedVariable {
                    value: context.into(),
                    message: format!("unrecognized placeholder ${{{}}}", name),
                }),
            },
        }
    }

    fn resolve_path(&self, path: &Path) -> Result<PathBuf> {
        Ok(PathBuf::from(
            self.resolve(&path.to_string_lossy())?,
        ))
    }

    fn resolve_values(&self, map: &Map<String, String>) -> Result<Map<String, String>> {
        map.iter()
            .map(|(key, value)| Ok((key.clone(), self.resolve(value)?)))
            .collect()
    }

    fn resolve_mount(&self, mount: &MountSpec) -> Result<MountSpec> {
        Ok(MountSpec {
            source: self.resolve(&mount.source)?,
            target: self.resolve(&mount.target)?,
            kind: mount.kind,
        })
    }

    /// Produces a copy of `configuration` with every placeholder
    /// substituted.
    pub fn apply(&self, configuration: &Configuration) -> Result<Configuration> {
        Ok(Configuration {
            name: configuration.name.clone(),
            image: configuration.image.clone(),
            build: BuildSpec {
                dockerfile: self.resolve_path(&configuration.build.dockerfile)?,
                context: self.resolve_path(&configuration.build.context)?,
                args: self.resolve_values(&configuration.build.args)?,
            },
            run_args: configuration
                .run_args
                .iter()
                .map(|arg| self.resolve(arg))
                .collect::<Result<_>>()?,
            remote_env: self.resolve_values(&configuration.remote_env)?,
            workspace: WorkspaceBinding {
                mount: self.resolve_mount(&configuration.workspace.mount)?,
                folder: self.resolve(&configuration.workspace.folder)?,
            },
            mounts: configuration
                .mounts
                .iter()
                .map(|mount| self.resolve_mount(mount))
                .collect::<Result<_>>()?,
        })
    }
}

/// Index of the `}` closing a placeholder whose `${` has already been
/// consumed, skipping over nested `${...}` pairs.
fn matching_brace(text: &str) -> Option<usize> {
    let bytes = text.as_bytes();
    let mut depth = 0usize;
    let mut index = 0;

    while index < bytes.len() {
        if bytes[index] == b'$' && bytes.get(index + 1) == Some(&b'{') {
            depth += 1;
            index += 2;
            continue;
        }
        if bytes[index] == b'}' {
            if depth == 0 {
                return Some(index);
            }
            depth -= 1;
        }
        index += 1;
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context() -> Placeholders {
        let mut env = Map::new();
        env.insert("DISPLAY".to_string(), ":0".to_string());
        Placeholders::new("/home/me/projects/closure", env)
    }

    #[test]
    fn literal_text_passes_through() {
        assert_eq!(context().resolve("--net=host").unwrap(), "--net=host");
    }

    #[test]
    fn workspace_folder_resolves() {
        assert_eq!(
            context()
                .resolve("${localWorkspaceFolder}/docker/Dockerfile")
                .unwrap(),
            "/home/me/projects/closure/docker/Dockerfile"
        );
    }

    #[test]
    fn workspace_basename_resolves() {
        assert_eq!(
            context()
                .resolve("/workspace/${localWorkspaceFolderBasename}")
                .unwrap(),
            "/workspace/closure"
        );
    }

    #[test]
    fn local_env_resolves() {
        assert_eq!(
            context().resolve("DISPLAY=${localEnv:DISPLAY}").unwrap(),
            "DISPLAY=:0"
        );
    }

    #[test]
    fn missing_env_with_default_uses_default() {
        assert_eq!(
            context().resolve("${localEnv:SHELL:/bin/bash}").unwrap(),
            "/bin/bash"
        );
    }

    #[test]
    fn missing_env_without_default_is_unresolved() {
        let result = context().resolve("${localEnv:HOME}/.zsh_history");
        assert!(matches!(result, Err(Error::UnresolvedVariable { .. })));
    }

    #[test]
    fn unrecognized_placeholder_is_unresolved() {
        let result = context().resolve("${containerEnv:PATH}");
        assert!(matches!(result, Err(Error::UnresolvedVariable { .. })));
    }

    #[test]
    fn unterminated_placeholder_is_unresolved() {
        let result = context().resolve("${localEnv:HOME");
        assert!(matches!(result, Err(Error::UnresolvedVariable { .. })));
    }

    #[test]
    fn placeholder_default_may_be_a_placeholder() {
        assert_eq!(
            context()
                .resolve("${localEnv:XAUTHORITY:${localEnv:DISPLAY}}")
                .unwrap(),
            ":0"
        );
    }

    #[test]
    fn nested_default_falls_through_to_its_own_default() {
        assert_eq!(
            context()
                .resolve("${localEnv:XAUTHORITY:${localEnv:MISSING:/tmp/xauth}}")
                .unwrap(),
            "/tmp/xauth"
        );
    }

    #[test]
    fn multiple_placeholders_in_one_value() {
        assert_eq!(
            context()
                .resolve("source=${localWorkspaceFolder},target=/workspace/${localWorkspaceFolderBasename}")
                .unwrap(),
            "source=/home/me/projects/closure,target=/workspace/closure"
        );
    }
}
