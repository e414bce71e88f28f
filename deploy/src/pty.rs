use std::{
    fs::File,
    io::{self, ErrorKind, Read},
    os::fd::{AsRawFd, OwnedFd},
    process::{ExitStatus, Stdio},
    time::Duration,
};

use anyhow::{Context, Result};
use nix::{
    errno::Errno,
    fcntl::{fcntl, FcntlArg, OFlag},
    pty::openpty,
};
use tokio::{
    io::unix::AsyncFd,
    process::{Child, Command},
    time::timeout,
};

const CHUNK_SIZE: usize = 4096;

/// How long the master may stay idle after the child exited before the
/// capture gives up waiting for end-of-stream.
pub const DRAIN_GRACE: Duration = Duration::from_millis(500);

pub struct Pty {
    master: OwnedFd,
    slave: OwnedFd,
}

pub struct Captured {
    pub status: ExitStatus,
    pub output: Vec<u8>,
}

impl Pty {
    pub fn open() -> Result<Self> {
        let pair = openpty(None, None).context("failed to allocate pseudo-terminal")?;
        fcntl(pair.master.as_raw_fd(), FcntlArg::F_SETFL(OFlag::O_NONBLOCK))
            .context("failed to make pty master non-blocking")?;
        Ok(Self {
            master: pair.master,
            slave: pair.slave,
        })
    }

    /// Runs `command` under `shell -c` with stdout and stderr on the slave
    /// end, and collects everything the child writes.
    pub async fn spawn_and_capture(self, shell: &str, command: &str) -> Result<Captured> {
        let Pty { master, slave } = self;

        // The parent's slave copies live in `cmd` and must be gone before
        // draining, otherwise the master never reports end-of-stream.
        let child = {
            let stdout = slave.try_clone().context("failed to duplicate pty slave")?;
            let mut cmd = Command::new(shell);
            cmd.arg("-c")
                .arg(command)
                .stdout(Stdio::from(stdout))
                .stderr(Stdio::from(slave));
            cmd.spawn()
                .with_context(|| format!("failed to spawn `{shell} -c {command}`"))?
        };
        log::debug!("spawned pid {:?} for `{}`", child.id(), command);

        let master = AsyncFd::new(File::from(master)).context("failed to register pty master")?;
        capture(master, child).await
    }
}

async fn capture(master: AsyncFd<File>, mut child: Child) -> Result<Captured> {
    let mut output = Vec::new();
    let mut open = true;

    let status = loop {
        tokio::select! {
            status = child.wait() => break status.context("failed to wait for child")?,
            eof = read_ready(&master, &mut output), if open => {
                open = !eof.context("failed to read pty master")?;
            }
        }
    };

    while open {
        match timeout(DRAIN_GRACE, read_ready(&master, &mut output)).await {
            Ok(eof) => open = !eof.context("failed to read pty master")?,
            Err(_) => {
                log::warn!(
                    "pty still open {:?} after child exited, keeping {} bytes",
                    DRAIN_GRACE,
                    output.len()
                );
                break;
            }
        }
    }

    log::debug!("captured {} bytes, {}", output.len(), status);
    Ok(Captured { status, output })
}

/// Appends one chunk to `output`. Returns `true` once the slave side is closed.
async fn read_ready(master: &AsyncFd<File>, output: &mut Vec<u8>) -> io::Result<bool> {
    let mut chunk = [0u8; CHUNK_SIZE];
    loop {
        let mut guard = master.readable().await?;
        match guard.try_io(|inner| read_chunk(inner.get_ref(), &mut chunk)) {
            Ok(Ok(Some(n))) => {
                output.extend_from_slice(&chunk[..n]);
                return Ok(false);
            }
            Ok(Ok(None)) => return Ok(true),
            Ok(Err(err)) => return Err(err),
            Err(_would_block) => continue,
        }
    }
}

fn read_chunk(mut file: &File, chunk: &mut [u8]) -> io::Result<Option<usize>> {
    loop {
        match file.read(chunk) {
            Ok(0) => return Ok(None),
            Ok(n) => return Ok(Some(n)),
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            // Linux reports a closed slave as EIO on the master.
            Err(err) if err.raw_os_error() == Some(Errno::EIO as i32) => return Ok(None),
            Err(err) => return Err(err),
        }
    }
}
