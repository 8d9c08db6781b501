//! The declared build graph, a graph between targets and operations.

use crate::densemap::{self, DenseMap};
use crate::error::{Error, Result};
use crate::fs::{FileSystem, MTime};
use crate::kind::OperationKind;
use crate::settings::OperationSettings;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct TargetId(u32);
impl densemap::Index for TargetId {
    fn index(&self) -> usize {
        self.0 as usize
    }
}
impl From<usize> for TargetId {
    fn from(u: usize) -> TargetId {
        TargetId(u as u32)
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct OpId(u32);
impl densemap::Index for OpId {
    fn index(&self) -> usize {
        self.0 as usize
    }
}
impl From<usize> for OpId {
    fn from(u: usize) -> OpId {
        OpId(u as u32)
    }
}

/// How a target's modification time is computed.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum TargetKind {
    /// The file's own mtime.
    File,
    /// A compiled source: newest mtime of the file and everything it
    /// transitively #includes.
    Source,
}

#[derive(Debug)]
pub struct Target {
    /// Name as written by users, e.g. "lib/foo" for target "foo" in "lib".
    pub name: String,
    /// Absolute path of the backing file.
    pub path: PathBuf,
    pub kind: TargetKind,
    /// The operation that produces this target, if any.
    pub operation: Option<OpId>,
}

impl Target {
    /// Fails if the target cannot be used as is, i.e. its file is missing.
    pub fn validate(&self, fs: &dyn FileSystem) -> Result<()> {
        match fs.stat(&self.path) {
            Ok(MTime::Stamp(_)) => Ok(()),
            Ok(MTime::Missing) => Err(Error::Validation(format!(
                "the file {:?} does not exist",
                self.path.display().to_string()
            ))),
            Err(err) => Err(Error::Validation(format!(
                "stat {:?}: {}",
                self.path.display().to_string(),
                err
            ))),
        }
    }
}

pub struct Operation {
    pub kind: Arc<dyn OperationKind>,
    /// Root-relative directory of the buildfile that declared the operation.
    pub dir: PathBuf,
    pub settings: Box<dyn OperationSettings>,
    ins: Vec<TargetId>,
    outs: Vec<TargetId>,
}

impl Operation {
    pub fn new(
        kind: Arc<dyn OperationKind>,
        dir: PathBuf,
        settings: Box<dyn OperationSettings>,
    ) -> Self {
        Operation {
            kind,
            dir,
            settings,
            ins: Vec::new(),
            outs: Vec::new(),
        }
    }

    pub fn ins(&self) -> &[TargetId] {
        &self.ins
    }

    pub fn outs(&self) -> &[TargetId] {
        &self.outs
    }
}

impl std::fmt::Debug for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Operation")
            .field("kind", &self.kind.name())
            .field("dir", &self.dir)
            .field("settings", &self.settings)
            .field("ins", &self.ins)
            .field("outs", &self.outs)
            .finish()
    }
}

#[derive(Default, Debug)]
pub struct Graph {
    targets: DenseMap<TargetId, Target>,
    ops: DenseMap<OpId, Operation>,
}

impl Graph {
    pub fn new() -> Graph {
        Graph::default()
    }

    pub fn add_target(&mut self, name: String, path: PathBuf, kind: TargetKind) -> TargetId {
        self.targets.push(Target {
            name,
            path,
            kind,
            operation: None,
        })
    }

    pub fn target(&self, id: TargetId) -> &Target {
        &self.targets[id]
    }

    pub fn add_operation(&mut self, op: Operation) -> OpId {
        self.ops.push(op)
    }

    pub fn operation(&self, id: OpId) -> &Operation {
        &self.ops[id]
    }

    pub fn add_input(&mut self, op: OpId, target: TargetId) -> Result<()> {
        let kind = self.ops[op].kind.clone();
        kind.validate_input(&self.targets[target])?;
        self.ops[op].ins.push(target);
        Ok(())
    }

    /// Marks `target` as produced by `op`.  A target has at most one owner.
    pub fn add_output(&mut self, op: OpId, target: TargetId) -> Result<()> {
        let t = &self.targets[target];
        if t.operation.is_some() {
            return Err(Error::AlreadyOwned(t.name.clone()));
        }
        let kind = self.ops[op].kind.clone();
        kind.validate_output(t)?;
        self.targets[target].operation = Some(op);
        self.ops[op].outs.push(target);
        Ok(())
    }

    /// Human-readable name for an operation, from its outputs.
    pub fn op_name(&self, id: OpId) -> String {
        let op = &self.ops[id];
        let outs: Vec<&str> = op
            .outs
            .iter()
            .map(|&t| self.targets[t].name.as_str())
            .collect();
        format!("{} {}", op.kind.name(), outs.join(" "))
    }
}
