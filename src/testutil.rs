//! Operation kinds and graph helpers for unit tests.

use crate::error::{Error, Result};
use crate::graph::{Graph, OpId, Operation, TargetId, TargetKind};
use crate::kind::{OperationImpl, OperationKind};
use crate::settings::OperationSettings;
use std::any::Any;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TestSettings {
    pub level: i32,
    pub include_dirs: Vec<PathBuf>,
}

impl OperationSettings for TestSettings {
    fn clone_settings(&self) -> Box<dyn OperationSettings> {
        Box::new(self.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn assign(&mut self, key: &str, value: &str, base: &Path) -> Result<()> {
        match key {
            "level" => {
                self.level = value
                    .parse()
                    .map_err(|err| Error::Parse(format!("level: {}", err)))?
            }
            "include_dirs" => {
                self.include_dirs = value.split_whitespace().map(|d| base.join(d)).collect()
            }
            _ => {
                return Err(Error::UnknownSetting {
                    kind: "test".to_string(),
                    key: key.to_string(),
                })
            }
        }
        Ok(())
    }

    fn include_dirs(&self) -> &[PathBuf] {
        &self.include_dirs
    }
}

/// Records run()/clean() calls, by operation name, in call order.
#[derive(Default)]
pub struct Log(Mutex<Vec<String>>);

impl Log {
    pub fn push(&self, event: String) {
        self.0.lock().unwrap().push(event);
    }

    pub fn events(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    pub fn position(&self, event: &str) -> usize {
        self.events()
            .iter()
            .position(|e| e == event)
            .unwrap_or_else(|| panic!("{:?} not in {:?}", event, self.events()))
    }
}

pub struct TestKind {
    name: String,
    queried: AtomicUsize,
    pub log: Arc<Log>,
    /// Operations whose name contains this fail when run.
    pub fail: Option<String>,
    /// Whether run() rewrites the operation's output files.
    pub write_outputs: bool,
    /// Raised by every run(), as a Ctrl-C arriving mid-build would.
    pub interrupt: Option<Arc<AtomicBool>>,
}

impl TestKind {
    pub fn new(name: &str) -> Self {
        TestKind {
            name: name.to_string(),
            queried: AtomicUsize::new(0),
            log: Arc::new(Log::default()),
            fail: None,
            write_outputs: false,
            interrupt: None,
        }
    }

    pub fn defaults_queried(&self) -> usize {
        self.queried.load(Ordering::SeqCst)
    }
}

impl OperationKind for TestKind {
    fn name(&self) -> &str {
        &self.name
    }

    fn default_settings(&self) -> Box<dyn OperationSettings> {
        self.queried.fetch_add(1, Ordering::SeqCst);
        Box::new(TestSettings::default())
    }

    fn implementation<'a>(
        &self,
        _platform: &str,
        graph: &'a Graph,
        op: &'a Operation,
    ) -> Result<Box<dyn OperationImpl + 'a>> {
        let name = op
            .outs()
            .iter()
            .map(|&t| graph.target(t).name.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        let fail = self.fail.as_ref().map_or(false, |f| name.contains(f.as_str()));
        let outs = match self.write_outputs {
            true => op.outs().iter().map(|&t| graph.target(t).path.clone()).collect(),
            false => Vec::new(),
        };
        Ok(Box::new(TestImpl {
            name,
            fail,
            outs,
            interrupt: self.interrupt.clone(),
            log: self.log.clone(),
        }))
    }
}

struct TestImpl {
    name: String,
    fail: bool,
    outs: Vec<PathBuf>,
    interrupt: Option<Arc<AtomicBool>>,
    log: Arc<Log>,
}

impl OperationImpl for TestImpl {
    fn run(&self) -> anyhow::Result<Vec<u8>> {
        self.log.push(format!("run {}", self.name));
        if let Some(flag) = &self.interrupt {
            flag.store(true, Ordering::SeqCst);
        }
        if self.fail {
            anyhow::bail!("{} failed", self.name);
        }
        for out in &self.outs {
            std::fs::write(out, &self.name)?;
        }
        Ok(Vec::new())
    }

    fn clean(&self) -> anyhow::Result<Vec<u8>> {
        self.log.push(format!("clean {}", self.name));
        Ok(Vec::new())
    }
}

/// Builds graphs of TestKind operations over files in `dir`.
pub struct GraphBuilder {
    pub graph: Graph,
    pub kind: Arc<TestKind>,
    dir: PathBuf,
}

impl GraphBuilder {
    pub fn new(dir: &Path) -> Self {
        Self::with_kind(dir, TestKind::new("test"))
    }

    pub fn with_kind(dir: &Path, kind: TestKind) -> Self {
        GraphBuilder {
            graph: Graph::new(),
            kind: Arc::new(kind),
            dir: dir.to_path_buf(),
        }
    }

    pub fn file(&mut self, name: &str) -> TargetId {
        self.graph
            .add_target(name.to_string(), self.dir.join(name), TargetKind::File)
    }

    pub fn source(&mut self, name: &str) -> TargetId {
        self.graph
            .add_target(name.to_string(), self.dir.join(name), TargetKind::Source)
    }

    pub fn op(&mut self, outs: &[TargetId], ins: &[TargetId]) -> OpId {
        self.op_with(outs, ins, TestSettings::default())
    }

    pub fn op_with(&mut self, outs: &[TargetId], ins: &[TargetId], settings: TestSettings) -> OpId {
        let id = self.graph.add_operation(Operation::new(
            self.kind.clone(),
            PathBuf::new(),
            Box::new(settings),
        ));
        for &out in outs {
            self.graph.add_output(id, out).unwrap();
        }
        for &input in ins {
            self.graph.add_input(id, input).unwrap();
        }
        id
    }

    pub fn log(&self) -> Vec<String> {
        self.kind.log.events()
    }
}
