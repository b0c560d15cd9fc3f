//! Worker: one analyzer subprocess fed with an assigned task list
//!
//! Each worker owns three helper threads: a writer that feeds stdin and then
//! closes it, a reader that drains stdout and reports to the monitor, and a
//! reader that drains stderr so the analyzer never blocks on a full pipe.

use std::io::{self, Read, Write};
use std::process::{Child, ChildStdin, Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, Sender};
use log::debug;

use crate::error::{BatchError, Result};

use super::types::{OutputChunk, WorkerEvent, WorkerTask};

pub(crate) struct Worker {
    pub worker_id: usize,
    sequence_ids: Vec<u64>,
    child: Child,
    writer: Option<JoinHandle<io::Result<()>>>,
    stderr: Receiver<String>,
    stdout: Option<Vec<u8>>,
    status: Option<ExitStatus>,
}

impl Worker {
    /// Spawn the analyzer and start feeding it `task`.
    pub fn spawn(
        task: WorkerTask,
        program: &str,
        args: &[String],
        event_sender: Sender<WorkerEvent>,
    ) -> Result<Self> {
        let worker_id = task.worker_id;
        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| BatchError::Invocation {
                command: program.to_string(),
                source,
            })?;

        debug!(
            "worker {} spawned pid {} for {} sentences",
            worker_id,
            child.id(),
            task.len()
        );

        let stdin = child.stdin.take().ok_or_else(|| missing_pipe("stdin"))?;
        let mut stdout = child.stdout.take().ok_or_else(|| missing_pipe("stdout"))?;
        let mut stderr = child.stderr.take().ok_or_else(|| missing_pipe("stderr"))?;

        let input = task.input_bytes();
        let writer = thread::spawn(move || feed_stdin(stdin, &input));

        thread::spawn(move || {
            let mut buf = Vec::new();
            let output = stdout.read_to_end(&mut buf).map(|_| buf);
            // The monitor may already be gone after an abort
            let _ = event_sender.send(WorkerEvent::OutputClosed { worker_id, output });
        });

        let (stderr_sender, stderr_receiver) = bounded(1);
        thread::spawn(move || {
            let mut buf = Vec::new();
            let _ = stderr.read_to_end(&mut buf);
            let _ = stderr_sender.send(String::from_utf8_lossy(&buf).into_owned());
        });

        Ok(Self {
            worker_id,
            sequence_ids: task.sequence_ids(),
            child,
            writer: Some(writer),
            stderr: stderr_receiver,
            stdout: None,
            status: None,
        })
    }

    /// Record the analyzer's stdout once the reader thread reports it.
    pub fn set_output(&mut self, output: io::Result<Vec<u8>>) -> Result<()> {
        match output {
            Ok(bytes) => {
                self.stdout = Some(bytes);
                Ok(())
            }
            Err(source) => Err(BatchError::BrokenPipe {
                worker_id: self.worker_id,
                source,
            }),
        }
    }

    /// Non-blocking exit check. Returns an error as soon as the analyzer is
    /// seen to have terminated abnormally; its stderr is attached later with
    /// [`Worker::take_stderr`].
    pub fn poll_exit(&mut self) -> Result<()> {
        if self.status.is_some() {
            return Ok(());
        }
        if let Some(status) = self.child.try_wait()? {
            self.status = Some(status);
            if !status.success() {
                return Err(BatchError::WorkerFailure {
                    worker_id: self.worker_id,
                    status,
                    stderr: String::new(),
                });
            }
            self.check_writer()?;
        }
        Ok(())
    }

    /// Finished means the process exited cleanly and stdout was fully read.
    pub fn is_finished(&self) -> bool {
        self.status.is_some() && self.stdout.is_some()
    }

    pub fn into_chunk(mut self) -> OutputChunk {
        let bytes = self.stdout.take().unwrap_or_default();
        debug!(
            "worker {} finished: {} sentences, {} bytes",
            self.worker_id,
            self.sequence_ids.len(),
            bytes.len()
        );
        OutputChunk {
            worker_id: self.worker_id,
            sequence_ids: std::mem::take(&mut self.sequence_ids),
            bytes,
        }
    }

    /// Kill and reap the analyzer. Used when another worker has failed.
    pub fn abort(&mut self) {
        if self.status.is_none() {
            let _ = self.child.kill();
            self.status = self.child.wait().ok();
        }
    }

    fn check_writer(&mut self) -> Result<()> {
        if let Some(handle) = self.writer.take() {
            let written = handle
                .join()
                .unwrap_or_else(|_| Err(io::Error::other("stdin writer thread panicked")));
            if let Err(source) = written {
                return Err(BatchError::BrokenPipe {
                    worker_id: self.worker_id,
                    source,
                });
            }
        }
        Ok(())
    }

    /// Captured stderr, waiting at most `wait` for the pipe to close.
    ///
    /// A leftover grandchild can keep the pipe open; the text is dropped
    /// then.
    pub fn take_stderr(&self, wait: Duration) -> String {
        match self.stderr.recv_timeout(wait) {
            Ok(text) => text,
            Err(_) => {
                debug!("worker {} stderr still open after {:?}", self.worker_id, wait);
                String::new()
            }
        }
    }
}

fn feed_stdin(mut stdin: ChildStdin, input: &[u8]) -> io::Result<()> {
    stdin.write_all(input)?;
    stdin.flush()?;
    // Dropping stdin closes the pipe and lets the analyzer reach EOF
    drop(stdin);
    Ok(())
}

fn missing_pipe(name: &str) -> BatchError {
    BatchError::Io(io::Error::other(format!("analyzer {} was not captured", name)))
}
