//! Buildfile loading: parses a directory's buildfile and declares its
//! targets, operations and settings in the project.

use crate::canon::canon_path;
use crate::command::{CommandKind, CommandSettings};
use crate::error::{Error, Result};
use crate::eval;
use crate::graph::{Operation, TargetId, TargetKind};
use crate::parse::{self, Binding, Decl, Statement};
use crate::project::{split_target, Evaluate, Project, BUILDFILE_MARKER};
use crate::settings::OperationSettings;
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Evaluates text buildfiles.
pub struct BuildfileLoader {
    /// `NAME=VALUE` settings from the command line, visible as `$NAME`.
    config: Arc<BTreeMap<String, String>>,
}

impl BuildfileLoader {
    pub fn new(config: BTreeMap<String, String>) -> Self {
        BuildfileLoader {
            config: Arc::new(config),
        }
    }
}

/// Internal state used while loading one buildfile.
struct Loader<'a> {
    project: &'a mut Project,
    config: &'a Arc<BTreeMap<String, String>>,
    /// Root-relative directory of the buildfile.
    dir: &'a Path,
    /// Absolute directory of the buildfile.
    abs_dir: PathBuf,
    /// Targets declared so far, in declaration order.
    declared: Vec<(String, TargetId)>,
    names: BTreeMap<String, TargetId>,
}

impl<'a> Loader<'a> {
    fn expand(&self, text: &str) -> String {
        eval::expand(text, &[self.config.as_ref()])
    }

    fn assign_all(&self, settings: &mut dyn OperationSettings, vars: &[Binding]) -> Result<()> {
        assign_bindings(settings, vars, self.config, &self.abs_dir)
    }

    fn declare(&mut self, decl: &Decl, kind: TargetKind) -> Result<TargetId> {
        if self.names.contains_key(decl.name) {
            return Err(Error::DuplicateTarget {
                dir: crate::error::dir_name(self.dir),
                name: decl.name.to_string(),
            });
        }
        let path = canon_path(self.abs_dir.join(self.expand(decl.path)));
        let id = self.project.add_target(self.dir, decl.name, path, kind);
        self.names.insert(decl.name.to_string(), id);
        self.declared.push((decl.name.to_string(), id));
        Ok(id)
    }

    /// Resolves `NAME` against this buildfile, or `DIR/NAME` against the
    /// buildfile of DIR.
    fn reference(&mut self, target: &str) -> Result<TargetId> {
        let target = self.expand(target);
        let (dir, name) = split_target(&target);
        let local = dir.is_empty()
            || self.project.relative(&canon_path(self.abs_dir.join(dir)))? == self.dir;
        if local {
            return self
                .names
                .get(name)
                .copied()
                .ok_or_else(|| Error::TargetNotFound(target.to_string()));
        }
        let abs_dir = self.abs_dir.clone();
        self.project.lookup_target(&abs_dir, &target)
    }

    fn statement(&mut self, stmt: Statement) -> Result<()> {
        match stmt {
            Statement::Depends(dir) => {
                let abs = canon_path(self.abs_dir.join(self.expand(dir)));
                self.project.resolve(&abs)?;
            }
            Statement::Rule { kind, vars } => {
                let mut defaults = CommandSettings::default();
                self.assign_all(&mut defaults, &vars)?;
                let root = self.project.root().to_path_buf();
                self.project.register_kind(Arc::new(CommandKind::new(
                    kind,
                    defaults,
                    root,
                    self.config.clone(),
                )))?;
            }
            Statement::Settings { kind, vars } => {
                let kind = self.project.kind(kind)?;
                let settings = self.project.settings.get_effective(self.dir, kind.as_ref());
                assign_bindings(settings, &vars, self.config, &self.abs_dir)?;
            }
            Statement::File(decl) => {
                self.declare(&decl, TargetKind::File)?;
            }
            Statement::Source(decl) => {
                self.declare(&decl, TargetKind::Source)?;
            }
            Statement::Build(build) => {
                let kind = self.project.kind(build.kind)?;
                let mut settings = self.project.settings.lookup(self.dir, kind.as_ref());
                self.assign_all(settings.as_mut(), &build.vars)?;
                let ins = build
                    .ins
                    .iter()
                    .map(|target| self.reference(target))
                    .collect::<Result<Vec<_>>>()?;

                let op = self.project.graph.add_operation(Operation::new(
                    kind,
                    self.dir.to_path_buf(),
                    settings,
                ));
                for decl in &build.outs {
                    let target = self.declare(decl, TargetKind::File)?;
                    self.project.graph.add_output(op, target)?;
                }
                for target in ins {
                    self.project.graph.add_input(op, target)?;
                }
            }
            Statement::Default(target) => {
                let target = self.reference(target)?;
                self.project.set_default_target(self.dir, target);
            }
        }
        Ok(())
    }
}

/// Applies `key = value` bindings written in the buildfile of `abs_dir`.
/// Include directories are paths and see config settings now; every other
/// value is a template, expanded per operation when it is bound.
fn assign_bindings(
    settings: &mut dyn OperationSettings,
    vars: &[Binding],
    config: &BTreeMap<String, String>,
    abs_dir: &Path,
) -> Result<()> {
    for var in vars {
        let value = match var.key {
            "include_dirs" => Cow::Owned(eval::expand(var.value, &[config])),
            _ => Cow::Borrowed(var.value),
        };
        settings.assign(var.key, &value, abs_dir)?;
    }
    Ok(())
}

impl Evaluate for BuildfileLoader {
    fn evaluate(&self, project: &mut Project, dir: &Path) -> Result<Vec<(String, TargetId)>> {
        let abs_dir = project.root().join(dir);
        let path = abs_dir.join(BUILDFILE_MARKER);
        let mut bytes = std::fs::read(&path).map_err(|source| Error::Read {
            path: path.clone(),
            source,
        })?;
        if std::str::from_utf8(&bytes).is_err() {
            return Err(Error::Parse(format!("{}: not valid UTF-8", path.display())));
        }
        bytes.push(0);

        let mut loader = Loader {
            project,
            config: &self.config,
            dir,
            abs_dir,
            declared: Vec::new(),
            names: BTreeMap::new(),
        };
        let mut parser = parse::Parser::new(&bytes);
        loop {
            let stmt = match parser.read() {
                Ok(None) => break,
                Ok(Some((_, stmt))) => stmt,
                Err(err) => return Err(Error::Parse(parser.format_parse_error(&path, err))),
            };
            loader.statement(stmt)?;
        }
        Ok(loader.declared)
    }
}
