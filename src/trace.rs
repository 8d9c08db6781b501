//! Chrome trace output.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Instant;

static ENABLED: AtomicBool = AtomicBool::new(false);
static TRACE: Mutex<Option<Trace>> = Mutex::new(None);
static NEXT_TID: AtomicUsize = AtomicUsize::new(0);

thread_local! {
    /// Per-thread id, so parallel operations land on separate trace tracks.
    static TID: usize = NEXT_TID.fetch_add(1, Ordering::Relaxed);
}

struct Event<'a> {
    name: &'a str,
    tid: usize,
    start: Instant,
    end: Instant,
}

struct Trace {
    start: Instant,
    w: BufWriter<File>,
}

impl Trace {
    fn new(path: &str) -> std::io::Result<Self> {
        let mut w = BufWriter::new(File::create(path)?);
        writeln!(w, "[")?;
        Ok(Trace {
            start: Instant::now(),
            w,
        })
    }

    fn write_event(&mut self, event: &Event) -> std::io::Result<()> {
        write!(
            self.w,
            "{{ \"pid\": 0, \"tid\": {}, \"name\": {:?}, \"ts\": {}, \"ph\": \"X\", \"dur\": {} }}",
            event.tid,
            event.name,
            event.start.duration_since(self.start).as_micros(),
            event.end.duration_since(event.start).as_micros(),
        )
    }

    fn write(&mut self, event: &Event) -> std::io::Result<()> {
        self.write_event(event)?;
        writeln!(self.w, ",")
    }

    fn close(&mut self) -> std::io::Result<()> {
        let start = self.start;
        self.write_event(&Event {
            name: "main",
            tid: 0,
            start,
            end: Instant::now(),
        })?;
        writeln!(self.w, "]")?;
        self.w.flush()
    }
}

fn with_trace<T>(f: impl FnOnce(&mut Trace) -> T) -> Option<T> {
    let mut guard = TRACE.lock().unwrap_or_else(|e| e.into_inner());
    guard.as_mut().map(f)
}

pub fn open(path: &str) -> std::io::Result<()> {
    let trace = Trace::new(path)?;
    *TRACE.lock().unwrap_or_else(|e| e.into_inner()) = Some(trace);
    ENABLED.store(true, Ordering::Relaxed);
    Ok(())
}

/// Runs `f`, recording how long it took under `name` if tracing is on.
#[inline]
pub fn scope<T>(name: &str, f: impl FnOnce() -> T) -> T {
    if !ENABLED.load(Ordering::Relaxed) {
        return f();
    }
    let start = Instant::now();
    let result = f();
    let event = Event {
        name,
        tid: TID.with(|tid| *tid),
        start,
        end: Instant::now(),
    };
    // A failed trace write shouldn't fail the build.
    let _ = with_trace(|t| t.write(&event));
    result
}

pub fn close() -> std::io::Result<()> {
    ENABLED.store(false, Ordering::Relaxed);
    with_trace(|t| t.close()).unwrap_or(Ok(()))
}
