use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap as Map, fmt, path::PathBuf, str::FromStr};

use crate::error::Error;

#[derive(Clone, Debug, Hash, PartialOrd, Ord, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageName(pub String);

#[derive(Clone, Debug, Hash, PartialOrd, Ord, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerName(pub String);

/// How to produce the image the container runs from.
///
/// The dockerfile path must exist by the time the backend is asked to
/// build; the frontend only checks shape, not the filesystem.
#[derive(Clone, Debug, Hash, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildSpec {
    pub dockerfile: PathBuf,
    pub context: PathBuf,
    pub args: Map<String, String>,
}

#[derive(Copy, Clone, Debug, Hash, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MountType {
    Bind,
    Volume,
}

impl fmt::Display for MountType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            MountType::Bind => write!(f, "bind"),
            MountType::Volume => write!(f, "volume"),
        }
    }
}

/// A single mount, parsed from the `source=..,target=..,type=..`
/// descriptor string syntax.
#[derive(Clone, Debug, Hash, PartialEq, Eq, Serialize, Deserialize)]
pub struct MountSpec {
    pub source: String,
    pub target: String,
    #[serde(rename = "type")]
    pub kind: MountType,
}

impl FromStr for MountSpec {
    type Err = Error;

    fn from_str(descriptor: &str) -> Result<MountSpec, Error> {
        let mut source = None;
        let mut target = None;
        let mut kind = MountType::Bind;

        for part in descriptor.split(',') {
            let part = part.trim();
            if part.is_empty() {
                continue;
            }

            let (key, value) = match part.find('=') {
                Some(index) => (&part[..index], &part[index + 1..]),
                None => {
                    return Err(Error::Validation(format!(
                        "mount descriptor component {:?} is not key=value",
                        part
                    )))
                }
            };

            match key {
                "source" | "src" => source = Some(value.to_string()),
                "target" | "dst" | "destination" => target = Some(value.to_string()),
                "type" => {
                    kind = match value {
                        "bind" => MountType::Bind,
                        "volume" => MountType::Volume,
                        other => {
                            return Err(Error::Validation(format!(
                                "unknown mount type {:?}",
                                other
                            )))
                        }
                    }
                }
                other => {
                    return Err(Error::Validation(format!(
                        "unknown mount descriptor key {:?}",
                        other
                    )))
                }
            }
        }

        let source = source
            .ok_or_else(|| Error::Validation(format!("mount {:?} has no source", descriptor)))?;
        let target = target
            .ok_or_else(|| Error::Validation(format!("mount {:?} has no target", descriptor)))?;

        Ok(MountSpec {
            source,
            target,
            kind,
        })
    }
}

impl fmt::Display for MountSpec {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "source={},target={},type={}",
            self.source, self.target, self.kind
        )
    }
}

/// The workspace mount plus the directory a shell in the container
/// starts in.
#[derive(Clone, Debug, Hash, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkspaceBinding {
    pub mount: MountSpec,
    pub folder: String,
}

/// A fully validated configuration. Immutable once built; one of these
/// parameterizes exactly one build-and-run cycle.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Configuration {
    pub name: ContainerName,
    pub image: ImageName,
    pub build: BuildSpec,
    pub run_args: Vec<String>,
    pub remote_env: Map<String, String>,
    pub workspace: WorkspaceBinding,
    pub mounts: Vec<MountSpec>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BuildPolicy {
    IfMissing,
    Always,
}
