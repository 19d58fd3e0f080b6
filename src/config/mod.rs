//! Configuration file format: a tree of groups containing commands,
//! plus top-level scripts. Loaded via serde-derived structs and
//! `serde_yaml::from_reader`, in the same shape as the rest of the
//! file format.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::sheriff::error::SheriffError;
use crate::sheriff::Sheriff;
use crate::script::Script;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("error reading config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("error parsing config file: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Sheriff(#[from] SheriffError),
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigCommand {
    pub exec: String,
    pub host: String,
    pub nickname: String,
    #[serde(default)]
    pub auto_respawn: bool,
}

/// A group node. `name` is this group's own path segment (not the full
/// path); full group paths are built by concatenating ancestors' names
/// during load into a forward-slash-delimited path.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigGroup {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub commands: Vec<ConfigCommand>,
    #[serde(default)]
    pub groups: Vec<ConfigGroup>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    #[serde(default)]
    pub root: ConfigGroup,
    #[serde(default)]
    pub scripts: Vec<Script>,
}

pub fn load_config_file(path: &Path) -> Result<ConfigFile, ConfigError> {
    let f = std::fs::File::open(path)?;
    Ok(serde_yaml::from_reader(f)?)
}

pub fn save_config_file(path: &Path, config: &ConfigFile) -> Result<(), ConfigError> {
    let f = std::fs::File::create(path)?;
    serde_yaml::to_writer(f, config)?;
    Ok(())
}

fn command_signature(deputy: &str, exec: &str, nickname: &str, group: &str, auto_respawn: bool) -> String {
    format!("{}!{}!{}!{}!{}", deputy, exec, nickname, group, auto_respawn)
}

impl Sheriff {
    /// Populates this sheriff from a parsed config tree. Scripts are
    /// always replaced; commands are either merged with (when
    /// `merge_with_existing`) or wholesale replace the existing set.
    pub fn load_config(&mut self, config: &ConfigFile, merge_with_existing: bool) -> Result<(), ConfigError> {
        for script in self.get_scripts().to_vec() {
            self.remove_script(&script.name)?;
        }

        let mut existing: HashSet<String> = HashSet::new();
        if merge_with_existing {
            for deputy in self.deputies() {
                for cmd in deputy.commands() {
                    existing.insert(command_signature(
                        &deputy.name,
                        &cmd.name,
                        &cmd.nickname,
                        cmd.group(),
                        cmd.auto_respawn,
                    ));
                }
            }
        } else {
            let to_remove: Vec<u32> = self.get_all_commands().iter().map(|c| c.sheriff_id).collect();
            for sheriff_id in to_remove {
                self.schedule_command_for_removal(sheriff_id)?;
            }
        }

        let mut to_add = Vec::new();
        collect_group_commands(&config.root, "", merge_with_existing, &existing, &mut to_add);

        for (host, exec, nickname, group, auto_respawn) in to_add {
            self.add_command(&host, &exec, &nickname, &group, auto_respawn)?;
        }

        for script in &config.scripts {
            self.add_script(script.clone())?;
        }

        Ok(())
    }

    /// Builds a config tree reflecting this sheriff's current commands
    /// and scripts, suitable for `save_config_file`.
    pub fn save_config(&self) -> ConfigFile {
        let mut root = ConfigGroup::default();

        for deputy in self.deputies() {
            for cmd in deputy.commands() {
                let command = ConfigCommand {
                    exec: cmd.name.clone(),
                    host: deputy.name.clone(),
                    nickname: cmd.nickname.clone(),
                    auto_respawn: cmd.auto_respawn,
                };
                group_mut(&mut root, cmd.group()).commands.push(command);
            }
        }

        ConfigFile {
            root,
            scripts: self.get_scripts().to_vec(),
        }
    }
}

fn collect_group_commands(
    group: &ConfigGroup,
    name_prefix: &str,
    merge_with_existing: bool,
    existing: &HashSet<String>,
    out: &mut Vec<(String, String, String, String, bool)>,
) {
    let full_group = format!("{}{}", name_prefix, group.name);

    for cmd in &group.commands {
        let signature = command_signature(&cmd.host, &cmd.exec, &cmd.nickname, &full_group, cmd.auto_respawn);
        if merge_with_existing && existing.contains(&signature) {
            continue;
        }
        out.push((
            cmd.host.clone(),
            cmd.exec.clone(),
            cmd.nickname.clone(),
            full_group.clone(),
            cmd.auto_respawn,
        ));
    }

    let child_prefix = if group.name.is_empty() {
        name_prefix.to_string()
    } else {
        format!("{}/", full_group)
    };
    for subgroup in &group.groups {
        collect_group_commands(subgroup, &child_prefix, merge_with_existing, existing, out);
    }
}

/// Finds (creating along the way) the group node at `path`, a
/// `/`-joined sequence of segment names.
fn group_mut<'a>(root: &'a mut ConfigGroup, path: &str) -> &'a mut ConfigGroup {
    let mut node = root;
    if path.is_empty() {
        return node;
    }
    for segment in path.split('/') {
        let idx = match node.groups.iter().position(|g| g.name == segment) {
            Some(idx) => idx,
            None => {
                node.groups.push(ConfigGroup {
                    name: segment.to_string(),
                    ..Default::default()
                });
                node.groups.len() - 1
            }
        };
        node = &mut node.groups[idx];
    }
    node
}
