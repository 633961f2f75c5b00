//! The line reader: chunk ingestion and the emission loop
//!
//! A [`LineReader`] is driven by a single future ([`LineReader::run`]). Every
//! step of that future does one unit of work and then yields to the runtime:
//! open the source, ingest one chunk, or deliver one line. Yielding between
//! lines bounds the work done per poll on arbitrarily large files and lets
//! `pause`, `resume` and `close` calls land between two lines.
//!
//! Within a step the order of checks is fixed:
//!
//! 1. a pending `close` drops the source and marks end of input;
//! 2. while paused nothing happens until a handle changes the flags;
//! 3. with a line ready, the reader waits until every subscriber is asking
//!    for an event, then re-runs the checks above if it had to wait;
//! 4. a queued line is delivered;
//! 5. at end of input the non-empty fragment is delivered as the last line,
//!    and once nothing is left the reader finalizes;
//! 6. otherwise the next chunk is requested from the source.
//!
//! Finalizing happens in exactly one place, so `end` fires exactly once.

use std::path::Path;
use std::sync::Arc;

use linewise_core::{LineAssembler, TerminatorCounts};
use tokio::task::{self, JoinHandle};

use crate::config::ReaderOptions;
use crate::control::{Control, Phase, ReaderHandle};
use crate::error::ReaderError;
use crate::events::{Listeners, Subscription};
use crate::source::{ByteSource, FileSource};

/// Summary of a finished reader
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReaderStats {
    /// Chunks received from the source
    pub chunks_read: usize,
    /// `line` events emitted
    pub lines_emitted: usize,
    /// Empty lines suppressed by `skip_empty_lines`
    pub lines_skipped: usize,
    /// Terminators seen in the text that was read
    pub terminators: TerminatorCounts,
    /// `close()` stopped the source before it reached the end of its input
    pub closed_early: bool,
    /// The source reported an error
    pub source_failed: bool,
}

/// Event-driven reader delivering a text source one line at a time
///
/// Nothing happens until the reader is run; listeners are registered first:
///
/// ```no_run
/// use linewise_engine::{LineReader, ReaderOptions};
///
/// # async fn example() {
/// let mut reader = LineReader::open("server.log", ReaderOptions::default());
/// let handle = reader.handle();
/// reader
///     .on_line(move |line| {
///         if line.contains("FATAL") {
///             handle.close();
///         }
///     })
///     .on_error(|err| eprintln!("{err}"))
///     .on_end(|| println!("done"));
///
/// let stats = reader.run().await;
/// println!("{} lines", stats.lines_emitted);
/// # }
/// ```
pub struct LineReader<S = FileSource> {
    source: S,
    skip_empty_lines: bool,
    listeners: Listeners,
    control: Arc<Control>,
}

impl<S> std::fmt::Debug for LineReader<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LineReader")
            .field("skip_empty_lines", &self.skip_empty_lines)
            .field("listeners", &self.listeners)
            .field("state", &ReaderHandle::new(Arc::clone(&self.control)).state())
            .finish_non_exhaustive()
    }
}

impl LineReader<FileSource> {
    /// Create a reader for the file at `path`.
    ///
    /// The file is opened when the reader first runs; failures are reported
    /// through the `error` event, never returned from here.
    pub fn open(path: impl AsRef<Path>, options: ReaderOptions) -> Self {
        let source = FileSource::new(path, &options);
        Self::from_source(source, options)
    }
}

impl<S: ByteSource> LineReader<S> {
    /// Create a reader over any byte source.
    ///
    /// Only `skip_empty_lines` is taken from `options`; decoding and chunking
    /// belong to the source.
    pub fn from_source(source: S, options: ReaderOptions) -> Self {
        Self {
            source,
            skip_empty_lines: options.skip_empty_lines,
            listeners: Listeners::default(),
            control: Arc::new(Control::new()),
        }
    }

    /// Call `listener` once the source is open
    pub fn on_open(&mut self, listener: impl FnMut() + Send + 'static) -> &mut Self {
        self.listeners.on_open(listener);
        self
    }

    /// Call `listener` for every source failure
    pub fn on_error(&mut self, listener: impl FnMut(&ReaderError) + Send + 'static) -> &mut Self {
        self.listeners.on_error(listener);
        self
    }

    /// Call `listener` for every line, in file order
    pub fn on_line(&mut self, listener: impl FnMut(&str) + Send + 'static) -> &mut Self {
        self.listeners.on_line(listener);
        self
    }

    /// Call `listener` once no more lines will be emitted
    pub fn on_end(&mut self, listener: impl FnMut() + Send + 'static) -> &mut Self {
        self.listeners.on_end(listener);
        self
    }

    /// Receive every event on a channel.
    ///
    /// The reader waits for each subscriber to ask for its next event before
    /// delivering a line, so a subscriber that stops receiving holds the
    /// reader back. Dropping the [`Subscription`] releases it.
    pub fn subscribe(&mut self) -> Subscription {
        self.listeners.subscribe()
    }

    /// A handle for pausing, resuming or closing this reader
    pub fn handle(&self) -> ReaderHandle {
        ReaderHandle::new(Arc::clone(&self.control))
    }

    /// See [`ReaderHandle::pause`]
    pub fn pause(&self) {
        self.handle().pause();
    }

    /// See [`ReaderHandle::resume`]
    pub fn resume(&self) {
        self.handle().resume();
    }

    /// See [`ReaderHandle::close`]
    pub fn close(&self) {
        self.handle().close();
    }

    /// Read the source to the end (or until closed), emitting events.
    ///
    /// Resolves after `end` has been emitted. If the source fails, queued
    /// lines still drain and the reader then waits for `close()`.
    pub async fn run(self) -> ReaderStats {
        let mut scheduler = Scheduler {
            source: Some(self.source),
            assembler: LineAssembler::new(),
            listeners: self.listeners,
            control: self.control,
            skip_empty_lines: self.skip_empty_lines,
            end_of_input: false,
            stats: ReaderStats::default(),
        };

        // Nothing is opened before the first tick
        task::yield_now().await;
        scheduler.start().await;

        loop {
            task::yield_now().await;
            if let Step::Finished = scheduler.step().await {
                break;
            }
        }

        scheduler.finalize().await
    }
}

impl<S: ByteSource + 'static> LineReader<S> {
    /// Run the reader as a tokio task
    pub fn spawn(self) -> JoinHandle<ReaderStats> {
        tokio::spawn(self.run())
    }
}

enum Step {
    Continue,
    Finished,
}

/// State owned by the running reader future
struct Scheduler<S> {
    /// `None` once closed, exhausted or failed
    source: Option<S>,
    assembler: LineAssembler,
    listeners: Listeners,
    control: Arc<Control>,
    skip_empty_lines: bool,
    end_of_input: bool,
    stats: ReaderStats,
}

impl<S: ByteSource> Scheduler<S> {
    async fn start(&mut self) {
        self.control.set_phase(Phase::Streaming);

        if self.control.close_requested() {
            return;
        }

        let Some(source) = self.source.as_mut() else {
            return;
        };

        match source.open().await {
            Ok(()) => self.listeners.emit_open().await,
            Err(error) => self.fail(error).await,
        }
    }

    async fn step(&mut self) -> Step {
        if self.control.close_requested() && !self.end_of_input {
            if self.source.take().is_some() {
                tracing::debug!("source closed before end of input");
            }
            self.stats.closed_early = true;
            self.mark_end_of_input();
        }

        if self.control.is_paused() {
            self.control.changed().await;
            return Step::Continue;
        }

        // A pause may land while waiting for demand
        if self.has_line_ready() && !self.listeners.ready().await {
            return Step::Continue;
        }

        if let Some(line) = self.assembler.pop_line() {
            self.deliver(line).await;
            return Step::Continue;
        }

        if self.end_of_input {
            return match self.assembler.take_fragment() {
                Some(last) => {
                    self.deliver(last).await;
                    Step::Continue
                }
                None => Step::Finished,
            };
        }

        self.pull().await;
        Step::Continue
    }

    /// Request one chunk from the source
    async fn pull(&mut self) {
        let Some(source) = self.source.as_mut() else {
            // Failed source: idle until a handle changes something
            self.control.changed().await;
            return;
        };

        let outcome = tokio::select! {
            biased;
            () = self.control.closed() => None,
            chunk = source.next_chunk() => Some(chunk),
        };

        match outcome {
            // Abandon the read; the next step drops the source
            None => {}
            Some(Ok(Some(text))) => {
                self.stats.chunks_read += 1;
                let completed = self.assembler.ingest(&text);
                tracing::debug!(
                    bytes = text.len(),
                    completed,
                    pending = self.assembler.pending_len(),
                    "ingested chunk"
                );
            }
            Some(Ok(None)) => {
                tracing::debug!(chunks = self.stats.chunks_read, "end of input");
                self.source = None;
                self.mark_end_of_input();
            }
            Some(Err(error)) => self.fail(error).await,
        }
    }

    fn has_line_ready(&self) -> bool {
        self.assembler.has_pending()
            || (self.end_of_input && !self.assembler.fragment().is_empty())
    }

    async fn deliver(&mut self, line: String) {
        if self.skip_empty_lines && line.is_empty() {
            self.stats.lines_skipped += 1;
            return;
        }

        self.stats.lines_emitted += 1;
        self.listeners.emit_line(line).await;
    }

    async fn fail(&mut self, error: ReaderError) {
        tracing::debug!(%error, "source failed");
        self.stats.source_failed = true;
        self.source = None;
        self.listeners.emit_error(error).await;
    }

    fn mark_end_of_input(&mut self) {
        self.end_of_input = true;
        self.control.set_phase(Phase::EndOfInput);
    }

    async fn finalize(mut self) -> ReaderStats {
        self.control.set_phase(Phase::Closed);
        self.stats.terminators = self.assembler.terminator_counts();
        tracing::debug!(
            lines = self.stats.lines_emitted,
            skipped = self.stats.lines_skipped,
            "reader finished"
        );
        self.listeners.emit_end().await;
        self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::ReaderEvent;
    use std::collections::VecDeque;
    use std::io;
    use std::sync::Mutex;

    /// Source replaying a fixed script of chunk results
    struct ScriptedSource {
        script: VecDeque<crate::error::Result<Option<String>>>,
        open_error: Option<ReaderError>,
    }

    impl ScriptedSource {
        fn chunks(chunks: &[&str]) -> Self {
            Self {
                script: chunks.iter().map(|c| Ok(Some(c.to_string()))).collect(),
                open_error: None,
            }
        }

        fn then_fail(mut self) -> Self {
            self.script
                .push_back(Err(io::Error::new(io::ErrorKind::Other, "disk on fire").into()));
            self
        }
    }

    impl ByteSource for ScriptedSource {
        async fn open(&mut self) -> crate::error::Result<()> {
            match self.open_error.take() {
                Some(error) => Err(error),
                None => Ok(()),
            }
        }

        async fn next_chunk(&mut self) -> crate::error::Result<Option<String>> {
            self.script.pop_front().unwrap_or(Ok(None))
        }
    }

    type Log = Arc<Mutex<Vec<String>>>;

    fn record_all<S: ByteSource>(reader: &mut LineReader<S>) -> Log {
        let log: Log = Arc::default();
        let (open, error, line, end) = (log.clone(), log.clone(), log.clone(), log.clone());
        reader
            .on_open(move || open.lock().unwrap().push("open".to_string()))
            .on_error(move |err| error.lock().unwrap().push(format!("error:{err}")))
            .on_line(move |l| line.lock().unwrap().push(format!("line:{l}")))
            .on_end(move || end.lock().unwrap().push("end".to_string()));
        log
    }

    #[tokio::test]
    async fn test_lines_across_chunks() {
        let source = ScriptedSource::chunks(&["a\nb", "c\r", "\nd"]);
        let mut reader = LineReader::from_source(source, ReaderOptions::default());
        let log = record_all(&mut reader);

        let stats = reader.run().await;

        assert_eq!(
            *log.lock().unwrap(),
            vec!["open", "line:a", "line:bc", "line:d", "end"]
        );
        assert_eq!(stats.chunks_read, 3);
        assert_eq!(stats.lines_emitted, 3);
        assert_eq!(stats.terminators.crlf, 1);
        assert_eq!(stats.terminators.lf, 1);
    }

    #[tokio::test]
    async fn test_skip_empty_lines() {
        let source = ScriptedSource::chunks(&["a\n\n\nb\n"]);
        let options = ReaderOptions {
            skip_empty_lines: true,
            ..ReaderOptions::default()
        };
        let mut reader = LineReader::from_source(source, options);
        let log = record_all(&mut reader);

        let stats = reader.run().await;

        assert_eq!(*log.lock().unwrap(), vec!["open", "line:a", "line:b", "end"]);
        assert_eq!(stats.lines_skipped, 2);
    }

    #[tokio::test]
    async fn test_open_error_waits_for_close() {
        let source = ScriptedSource {
            script: VecDeque::new(),
            open_error: Some(ReaderError::Config("no way".to_string())),
        };
        let mut reader = LineReader::from_source(source, ReaderOptions::default());
        let log = record_all(&mut reader);
        let handle = reader.handle();
        let closer = handle.clone();
        reader.on_error(move |_| closer.close());

        let stats = reader.run().await;

        assert_eq!(
            *log.lock().unwrap(),
            vec!["error:invalid configuration: no way", "end"]
        );
        assert!(stats.source_failed);
        assert_eq!(handle.state(), crate::ReaderState::Closed);
    }

    #[tokio::test]
    async fn test_read_error_drains_queued_lines_then_idles() {
        let source = ScriptedSource::chunks(&["one\ntwo\nthr"]).then_fail();
        let mut reader = LineReader::from_source(source, ReaderOptions::default());
        let log = record_all(&mut reader);
        let handle = reader.handle();
        let task = reader.spawn();

        for _ in 0..50 {
            task::yield_now().await;
        }
        assert_eq!(
            *log.lock().unwrap(),
            vec!["open", "line:one", "line:two", "error:I/O error: disk on fire"]
        );
        assert!(!task.is_finished());

        handle.close();
        let stats = task.await.unwrap();

        // The fragment was read before the failure, so close delivers it
        assert_eq!(
            log.lock().unwrap()[4..],
            ["line:thr".to_string(), "end".to_string()]
        );
        assert!(stats.source_failed);
        assert!(stats.closed_early);
    }

    #[tokio::test]
    async fn test_close_before_run_skips_open() {
        let source = ScriptedSource::chunks(&["never\n"]);
        let mut reader = LineReader::from_source(source, ReaderOptions::default());
        let log = record_all(&mut reader);
        reader.close();
        reader.close();

        let stats = reader.run().await;

        assert_eq!(*log.lock().unwrap(), vec!["end"]);
        assert_eq!(stats.chunks_read, 0);
    }

    #[tokio::test]
    async fn test_pause_inside_listener_halts_before_next_line() {
        let source = ScriptedSource::chunks(&["1\n2\n3\n4\n"]);
        let mut reader = LineReader::from_source(source, ReaderOptions::default());
        let handle = reader.handle();
        let seen: Log = Arc::default();
        {
            let seen = seen.clone();
            let handle = handle.clone();
            reader.on_line(move |line| {
                seen.lock().unwrap().push(line.to_string());
                if line == "2" {
                    handle.pause();
                }
            });
        }
        let task = reader.spawn();

        for _ in 0..50 {
            task::yield_now().await;
        }
        assert_eq!(*seen.lock().unwrap(), vec!["1", "2"]);
        assert_eq!(handle.state(), crate::ReaderState::Paused);

        handle.resume();
        let stats = task.await.unwrap();
        assert_eq!(*seen.lock().unwrap(), vec!["1", "2", "3", "4"]);
        assert_eq!(stats.lines_emitted, 4);
    }

    #[tokio::test]
    async fn test_reader_pause_and_resume_before_run() {
        let source = ScriptedSource::chunks(&["x\n"]);
        let reader = LineReader::from_source(source, ReaderOptions::default());
        let handle = reader.handle();

        reader.pause();
        assert!(handle.is_paused());
        assert_eq!(handle.state(), crate::ReaderState::Paused);

        reader.resume();
        assert!(!handle.is_paused());
        assert_eq!(handle.state(), crate::ReaderState::NotStarted);

        let stats = reader.run().await;
        assert_eq!(stats.lines_emitted, 1);
        assert_eq!(handle.state(), crate::ReaderState::Closed);
    }

    #[tokio::test]
    async fn test_state_is_end_of_input_while_fragment_is_delivered() {
        let source = ScriptedSource::chunks(&["a\nb"]);
        let mut reader = LineReader::from_source(source, ReaderOptions::default());
        let handle = reader.handle();
        let states = Arc::new(Mutex::new(Vec::new()));
        {
            let states = states.clone();
            let handle = handle.clone();
            reader.on_line(move |line| {
                states.lock().unwrap().push((line.to_string(), handle.state()));
            });
        }

        reader.run().await;

        assert_eq!(
            *states.lock().unwrap(),
            vec![
                ("a".to_string(), crate::ReaderState::Streaming),
                ("b".to_string(), crate::ReaderState::EndOfInput),
            ]
        );
        assert_eq!(handle.state(), crate::ReaderState::Closed);
    }

    #[tokio::test]
    async fn test_subscriber_pause_lands_before_next_line() {
        let source = ScriptedSource::chunks(&["1\n2\n3\n"]);
        let mut reader = LineReader::from_source(source, ReaderOptions::default());
        let handle = reader.handle();
        let mut events = reader.subscribe();
        let task = reader.spawn();

        assert!(matches!(events.recv().await, Some(ReaderEvent::Open)));
        assert!(matches!(events.recv().await, Some(ReaderEvent::Line(ref l)) if l == "1"));
        handle.pause();

        let next = tokio::time::timeout(std::time::Duration::from_millis(50), events.recv()).await;
        assert!(next.is_err(), "line delivered while paused: {next:?}");
        assert_eq!(handle.state(), crate::ReaderState::Paused);

        handle.resume();
        let mut rest = Vec::new();
        while let Some(event) = events.recv().await {
            match event {
                ReaderEvent::Line(line) => rest.push(line),
                ReaderEvent::End => break,
                other => panic!("unexpected event {other:?}"),
            }
        }
        assert_eq!(rest, vec!["2", "3"]);
        assert_eq!(task.await.unwrap().lines_emitted, 3);
    }
}
