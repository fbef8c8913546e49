//! Deploy process launching and supervision

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use crate::deploy::output::OutputBuffer;

/// How a deploy process ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessOutcome {
    /// The process exited on its own. `code` is `None` when killed by a signal.
    Exited {
        code: Option<i32>,
        stdout: String,
        stderr: String,
    },

    /// The process was killed after running longer than `after`
    TimedOut {
        after: Duration,
        stdout: String,
        stderr: String,
    },
}

/// Starts deploy processes
#[async_trait]
pub trait DeployRunner: Send + Sync {
    /// Start one deploy process. Returns once the process is running.
    async fn launch(&self, deployment_id: u64) -> Result<Box<dyn DeployProcess>, std::io::Error>;
}

/// A running deploy process
#[async_trait]
pub trait DeployProcess: Send {
    /// Wait for the process to end and collect its output
    async fn wait(self: Box<Self>) -> ProcessOutcome;
}

/// Deploy script options
#[derive(Debug, Clone)]
pub struct ScriptOptions {
    /// Interpreter, e.g. `bash`
    pub shell: String,

    /// Script passed as the interpreter's only argument
    pub script: PathBuf,

    /// Working directory, defaults to the script's directory
    pub working_dir: Option<PathBuf>,

    /// Deadline after which the process is killed
    pub timeout: Option<Duration>,

    /// Captured bytes kept per stream
    pub max_output_bytes: usize,

    /// How long to keep draining output after the process has ended
    pub drain_grace: Duration,
}

impl Default for ScriptOptions {
    fn default() -> Self {
        Self {
            shell: "bash".to_string(),
            script: PathBuf::from("./deploy.sh"),
            working_dir: None,
            timeout: Some(Duration::from_secs(900)),
            max_output_bytes: 1024 * 1024,
            drain_grace: Duration::from_secs(5),
        }
    }
}

/// Runs the deploy script through a shell
#[derive(Debug, Clone)]
pub struct ScriptRunner {
    options: ScriptOptions,
}

impl ScriptRunner {
    pub fn new(options: ScriptOptions) -> Self {
        Self { options }
    }

    fn resolve_script(&self) -> Result<PathBuf, std::io::Error> {
        if self.options.script.is_absolute() {
            Ok(self.options.script.clone())
        } else {
            Ok(std::env::current_dir()?.join(&self.options.script))
        }
    }
}

fn script_dir(script: &Path) -> PathBuf {
    match script.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

#[async_trait]
impl DeployRunner for ScriptRunner {
    async fn launch(&self, deployment_id: u64) -> Result<Box<dyn DeployProcess>, std::io::Error> {
        let script = self.resolve_script()?;
        let working_dir = self
            .options
            .working_dir
            .clone()
            .unwrap_or_else(|| script_dir(&script));

        debug!(
            "Spawning {} {} in {}",
            self.options.shell,
            script.display(),
            working_dir.display()
        );

        let mut command = Command::new(&self.options.shell);
        command
            .arg(&script)
            .current_dir(&working_dir)
            .env("DEPLOYMENT_ID", deployment_id.to_string())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        // The script leads its own process group, so a timeout can stop
        // everything it started.
        #[cfg(unix)]
        command.process_group(0);

        let mut child = command.spawn()?;

        let stdout = Capture::spawn(child.stdout.take(), self.options.max_output_bytes);
        let stderr = Capture::spawn(child.stderr.take(), self.options.max_output_bytes);

        Ok(Box::new(ScriptProcess {
            child,
            stdout,
            stderr,
            timeout: self.options.timeout,
            drain_grace: self.options.drain_grace,
        }))
    }
}

struct ScriptProcess {
    child: Child,
    stdout: Capture,
    stderr: Capture,
    timeout: Option<Duration>,
    drain_grace: Duration,
}

#[async_trait]
impl DeployProcess for ScriptProcess {
    async fn wait(self: Box<Self>) -> ProcessOutcome {
        let ScriptProcess {
            mut child,
            stdout,
            stderr,
            timeout,
            drain_grace,
        } = *self;

        let status = match timeout {
            Some(limit) => match tokio::time::timeout(limit, child.wait()).await {
                Ok(status) => Some(status),
                Err(_) => {
                    warn!("Deploy process exceeded {:?}, killing it", limit);
                    kill_deployment(&mut child).await;
                    None
                }
            },
            None => Some(child.wait().await),
        };

        let stdout = stdout.finish(drain_grace).await;
        let stderr = stderr.finish(drain_grace).await;

        match (status, timeout) {
            (Some(Ok(status)), _) => ProcessOutcome::Exited {
                code: status.code(),
                stdout,
                stderr,
            },
            (Some(Err(e)), _) => {
                error!("Failed to wait for deploy process: {}", e);
                ProcessOutcome::Exited {
                    code: None,
                    stdout,
                    stderr,
                }
            }
            (None, limit) => ProcessOutcome::TimedOut {
                after: limit.unwrap_or_default(),
                stdout,
                stderr,
            },
        }
    }
}

/// Kill the deploy process and everything in its process group, then reap it.
async fn kill_deployment(child: &mut Child) {
    #[cfg(unix)]
    {
        if let Some(pid) = child.id() {
            // Group id equals the leader's pid
            if unsafe { libc::killpg(pid as libc::pid_t, libc::SIGKILL) } == -1 {
                error!(
                    "Failed to kill deploy process group {}: {}",
                    pid,
                    std::io::Error::last_os_error()
                );
            }
        }
    }

    if let Err(e) = child.kill().await {
        error!("Failed to kill deploy process: {}", e);
    }
}

/// Incremental reader for one output stream
struct Capture {
    buffer: Arc<Mutex<OutputBuffer>>,
    task: JoinHandle<()>,
}

impl Capture {
    fn spawn<R>(stream: Option<R>, max_bytes: usize) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        let buffer = Arc::new(Mutex::new(OutputBuffer::new(max_bytes)));
        let sink = buffer.clone();

        let task = tokio::spawn(async move {
            let Some(mut stream) = stream else {
                return;
            };
            let mut chunk = [0u8; 8192];
            loop {
                match stream.read(&mut chunk).await {
                    Ok(0) => break,
                    Ok(n) => sink.lock().await.push(&chunk[..n]),
                    Err(e) => {
                        debug!("Stopped reading deploy output: {}", e);
                        break;
                    }
                }
            }
        });

        Self { buffer, task }
    }

    /// Wait for end-of-stream, at most `grace`. A background child that
    /// inherited the pipe can keep it open indefinitely.
    async fn finish(mut self, grace: Duration) -> String {
        if tokio::time::timeout(grace, &mut self.task).await.is_err() {
            warn!("Deploy output still open after {:?}, detaching", grace);
            self.task.abort();
        }
        let buffer = self.buffer.lock().await;
        buffer.clone().into_string()
    }
}
