//! The operation kind declared by `rule` statements: operations that run a
//! shell command.

use crate::canon::{canon_path, relative_to};
use crate::error::{Error, Result};
use crate::eval::{self, Env};
use crate::fs::RealFileSystem;
use crate::graph::{Graph, Operation, TargetId};
use crate::kind::{OperationImpl, OperationKind};
use crate::settings::OperationSettings;
use crate::task;
use std::any::Any;
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommandSettings {
    pub command: Option<String>,
    pub description: Option<String>,
    /// Absolute include search directories, in search order.
    pub include_dirs: Vec<PathBuf>,
    /// Every other `key = value`, available to the command as `$key`.
    pub vars: BTreeMap<String, String>,
}

impl OperationSettings for CommandSettings {
    fn clone_settings(&self) -> Box<dyn OperationSettings> {
        Box::new(self.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn assign(&mut self, key: &str, value: &str, base: &Path) -> Result<()> {
        match key {
            "command" => self.command = Some(value.to_string()),
            "description" => self.description = Some(value.to_string()),
            "include_dirs" => {
                self.include_dirs = value
                    .split_whitespace()
                    .map(|dir| canon_path(base.join(dir)))
                    .collect()
            }
            _ => {
                self.vars.insert(key.to_string(), value.to_string());
            }
        }
        Ok(())
    }

    fn include_dirs(&self) -> &[PathBuf] {
        &self.include_dirs
    }
}

pub struct CommandKind {
    name: String,
    defaults: CommandSettings,
    /// Absolute project root; operations run in their buildfile's directory
    /// beneath it.
    root: PathBuf,
    /// `NAME=VALUE` settings from the command line.
    config: Arc<BTreeMap<String, String>>,
}

impl CommandKind {
    pub fn new(
        name: &str,
        defaults: CommandSettings,
        root: PathBuf,
        config: Arc<BTreeMap<String, String>>,
    ) -> Self {
        CommandKind {
            name: name.to_string(),
            defaults,
            root,
            config,
        }
    }
}

/// A variable lookup environment for magic $in/$out/$dir variables.
struct ImplicitVars<'a> {
    graph: &'a Graph,
    op: &'a Operation,
    /// Paths are given relative to this directory where possible.
    cwd: &'a Path,
}

impl<'a> ImplicitVars<'a> {
    fn file_list(&self, ids: &[TargetId], sep: char) -> String {
        let mut out = String::new();
        for &id in ids {
            if !out.is_empty() {
                out.push(sep);
            }
            let path = &self.graph.target(id).path;
            match relative_to(path, self.cwd) {
                Some(rel) => out.push_str(&rel.to_string_lossy()),
                None => out.push_str(&path.to_string_lossy()),
            }
        }
        out
    }
}

impl<'a> Env for ImplicitVars<'a> {
    fn get_var(&self, var: &str) -> Option<Cow<str>> {
        match var {
            "in" => Some(Cow::Owned(self.file_list(self.op.ins(), ' '))),
            "in_newline" => Some(Cow::Owned(self.file_list(self.op.ins(), '\n'))),
            "out" => Some(Cow::Owned(self.file_list(self.op.outs(), ' '))),
            "out_newline" => Some(Cow::Owned(self.file_list(self.op.outs(), '\n'))),
            "dir" => Some(self.op.dir.to_string_lossy()),
            _ => None,
        }
    }
}

impl OperationKind for CommandKind {
    fn name(&self) -> &str {
        &self.name
    }

    fn default_settings(&self) -> Box<dyn OperationSettings> {
        Box::new(self.defaults.clone())
    }

    /// The command is `command_PLATFORM` if set, else `command`.
    fn implementation<'a>(
        &self,
        platform: &str,
        graph: &'a Graph,
        op: &'a Operation,
    ) -> Result<Box<dyn OperationImpl + 'a>> {
        let settings = op
            .settings
            .as_any()
            .downcast_ref::<CommandSettings>()
            .ok_or_else(|| Error::SettingsShape(self.name.clone()))?;
        let template = settings
            .vars
            .get(&format!("command_{}", platform))
            .or(settings.command.as_ref())
            .ok_or_else(|| {
                Error::Validation(format!(
                    "operation kind {:?} has no command for {}",
                    self.name, platform
                ))
            })?;

        let cwd = self.root.join(&op.dir);
        let implicit = ImplicitVars {
            graph,
            op,
            cwd: &cwd,
        };
        // Settings variables may use the implicit variables and config
        // settings, but not each other.
        let outer: [&dyn Env; 2] = [&implicit, self.config.as_ref()];
        let vars: BTreeMap<String, String> = settings
            .vars
            .iter()
            .map(|(key, value)| (key.clone(), eval::expand(value, &outer)))
            .collect();
        let envs: [&dyn Env; 3] = [&implicit, &vars, self.config.as_ref()];
        let cmdline = eval::expand(template, &envs);
        let description = settings
            .description
            .as_ref()
            .map(|d| eval::expand(d, &envs));

        Ok(Box::new(CommandImpl {
            graph,
            op,
            cmdline,
            description,
            cwd,
        }))
    }
}

struct CommandImpl<'a> {
    graph: &'a Graph,
    op: &'a Operation,
    cmdline: String,
    description: Option<String>,
    cwd: PathBuf,
}

impl<'a> OperationImpl for CommandImpl<'a> {
    fn run(&self) -> anyhow::Result<Vec<u8>> {
        let fs = RealFileSystem::new();
        for &id in self.op.ins() {
            let target = self.graph.target(id);
            if target.operation.is_none() {
                target.validate(&fs)?;
            }
        }
        for &id in self.op.outs() {
            if let Some(parent) = self.graph.target(id).path.parent() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let result = task::run_command(&self.cmdline, &self.cwd)?;
        if !result.success {
            anyhow::bail!(
                "command failed: {}\n{}",
                self.cmdline,
                String::from_utf8_lossy(&result.output).trim_end()
            );
        }
        Ok(result.output)
    }

    fn clean(&self) -> anyhow::Result<Vec<u8>> {
        for &id in self.op.outs() {
            let path = &self.graph.target(id).path;
            match std::fs::remove_file(path) {
                Ok(()) => {}
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
                Err(err) => anyhow::bail!("remove {}: {}", path.display(), err),
            }
        }
        Ok(Vec::new())
    }

    fn message(&self) -> Option<String> {
        self.description.clone()
    }

    fn cmdline(&self) -> Option<String> {
        Some(self.cmdline.clone())
    }
}
