use std::ffi::OsStr;
use std::io::{self, Read};
use std::os::unix::process::CommandExt;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;
use tracing::{debug, warn};

use crate::gateway::GatewayError;

const POLL_INTERVAL: Duration = Duration::from_millis(20);
const TERMINATE_GRACE: Duration = Duration::from_millis(500);

/// Runs external commands to completion, bounded by an optional deadline.
#[derive(Debug, Clone)]
pub struct Executor {
    timeout: Option<Duration>,
}

impl Executor {
    /// A zero `timeout` disables the deadline.
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout: (!timeout.is_zero()).then_some(timeout),
        }
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Runs `program` with `args` and returns its standard output.
    ///
    /// The deadline covers both the exit of the command and the close of its
    /// output streams, so processes left behind holding the streams open also
    /// count against it. On expiry the command's whole process group is
    /// terminated.
    ///
    /// A non-zero exit is reported with the captured standard output and
    /// standard error.
    pub fn run<P, S>(&self, program: P, args: &[S]) -> Result<String, GatewayError>
    where
        P: AsRef<OsStr>,
        S: AsRef<OsStr>,
    {
        let command = describe(program.as_ref(), args);
        debug!(command = %command, "running command");
        let deadline = self.timeout.map(|timeout| Instant::now() + timeout);

        // Spawn the child in its own process group with both output streams
        // captured.
        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .process_group(0)
            .spawn()
            .map_err(|source| GatewayError::Spawn {
                command: command.clone(),
                source,
            })?;

        // Drain the pipes so a chatty child never blocks on a full buffer.
        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());

        let status = match wait(&mut child, deadline) {
            Ok(Some(status)) => status,
            Ok(None) => return Err(self.expire(&mut child, command)),
            Err(source) => {
                terminate(&mut child);
                return Err(GatewayError::Io { command, source });
            }
        };

        let collected = (collect(&stdout, deadline), collect(&stderr, deadline));
        let (Some(stdout), Some(stderr)) = collected else {
            return Err(self.expire(&mut child, command));
        };
        if status.success() {
            return Ok(stdout);
        }

        let mut output = stdout;
        output.push_str(&stderr);
        Err(GatewayError::Failed {
            command,
            code: status.code(),
            output,
        })
    }

    fn expire(&self, child: &mut Child, command: String) -> GatewayError {
        let after = self.timeout.unwrap_or_default();
        warn!(command = %command, ?after, "command timed out, terminating");
        terminate(child);

        GatewayError::Timeout { command, after }
    }
}

fn wait(child: &mut Child, deadline: Option<Instant>) -> io::Result<Option<ExitStatus>> {
    let Some(deadline) = deadline else {
        return child.wait().map(Some);
    };

    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        if Instant::now() >= deadline {
            return Ok(None);
        }
        thread::sleep(POLL_INTERVAL);
    }
}

/// Asks the child's process group to stop with SIGTERM, then kills whatever
/// is left of it.
fn terminate(child: &mut Child) {
    let Ok(pid) = i32::try_from(child.id()) else {
        let _ = child.kill();
        let _ = child.wait();
        return;
    };
    // The child leads its own group.
    let group = Pid::from_raw(pid);

    if signal::killpg(group, Signal::SIGTERM).is_ok() {
        let deadline = Instant::now() + TERMINATE_GRACE;
        while Instant::now() < deadline {
            // Reap the leader so it does not keep the group alive as a zombie.
            let _ = child.try_wait();
            if signal::killpg(group, None::<Signal>).is_err() {
                return;
            }
            thread::sleep(POLL_INTERVAL);
        }
    }

    let _ = signal::killpg(group, Signal::SIGKILL);
    let _ = child.kill();
    let _ = child.wait();
}

fn drain<R>(pipe: Option<R>) -> Receiver<Vec<u8>>
where
    R: Read + Send + 'static,
{
    let (tx, rx) = mpsc::channel();
    if let Some(mut pipe) = pipe {
        thread::spawn(move || {
            let mut buf = Vec::new();
            let _ = pipe.read_to_end(&mut buf);
            let _ = tx.send(buf);
        });
    }

    rx
}

/// Waits for a drained stream until `deadline`. Returns `None` once the
/// deadline has passed with the stream still open.
fn collect(rx: &Receiver<Vec<u8>>, deadline: Option<Instant>) -> Option<String> {
    let received = match deadline {
        Some(deadline) => {
            match rx.recv_timeout(deadline.saturating_duration_since(Instant::now())) {
                Ok(buf) => Ok(buf),
                Err(RecvTimeoutError::Timeout) => return None,
                Err(RecvTimeoutError::Disconnected) => Err(()),
            }
        }
        None => rx.recv().map_err(drop),
    };

    Some(
        received
            .map(|buf| String::from_utf8_lossy(&buf).into_owned())
            .unwrap_or_default(),
    )
}

fn describe<S: AsRef<OsStr>>(program: &OsStr, args: &[S]) -> String {
    let mut command = program.to_string_lossy().into_owned();
    for arg in args {
        command.push(' ');
        command.push_str(&arg.as_ref().to_string_lossy());
    }

    command
}
