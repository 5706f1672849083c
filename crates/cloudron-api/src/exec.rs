//! Remote command execution over an upgraded HTTP connection.
//!
//! The exec endpoint answers `101 Switching Protocols` and from then on the
//! connection carries the raw bytes of the remote process. [`ExecSession`]
//! performs the handshake, puts the local terminal into raw mode and copies
//! bytes in both directions until the remote side closes the stream.
//!
//! ```text
//!   stdin ──raw bytes──►┌────────────┐──►  remote process
//!                       │ exec stream│
//!  stdout ◄─raw bytes───└────────────┘◄──  (101 Upgrade: tcp)
//! ```

use std::io::{self, IsTerminal};

use reqwest::StatusCode;
use reqwest::header::{CONNECTION, UPGRADE};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, warn};

use crate::client::{ApiClient, status_error};
use crate::error::{ApiError, Result};
use crate::transport::Transport;

/// Command run when none is given.
pub const DEFAULT_SHELL: &str = "/bin/bash";

/// Size of the copy buffers.
const CHUNK_SIZE: usize = 8 * 1024;

/// Local terminal operations needed by an exec session.
pub trait TerminalControl {
    /// Whether stdin is an interactive terminal.
    fn is_tty(&self) -> bool;

    /// Terminal size as `(rows, columns)`, if known.
    fn size(&self) -> Option<(u16, u16)>;

    /// Switch the terminal to raw mode.
    ///
    /// # Errors
    ///
    /// Returns an error if the terminal mode cannot be changed.
    fn enable_raw_mode(&self) -> io::Result<()>;

    /// Restore the terminal mode saved by [`enable_raw_mode`](Self::enable_raw_mode).
    ///
    /// # Errors
    ///
    /// Returns an error if the terminal mode cannot be changed.
    fn disable_raw_mode(&self) -> io::Result<()>;
}

/// The process' controlling terminal.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalTerminal;

impl TerminalControl for LocalTerminal {
    fn is_tty(&self) -> bool {
        io::stdin().is_terminal()
    }

    fn size(&self) -> Option<(u16, u16)> {
        crossterm::terminal::size().ok().map(|(cols, rows)| (rows, cols))
    }

    fn enable_raw_mode(&self) -> io::Result<()> {
        crossterm::terminal::enable_raw_mode()
    }

    fn disable_raw_mode(&self) -> io::Result<()> {
        crossterm::terminal::disable_raw_mode()
    }
}

/// Keeps a terminal in raw mode until dropped.
///
/// Restoring on drop covers early returns, errors and panics alike.
pub struct RawModeGuard<'a, C: TerminalControl> {
    terminal: &'a C,
}

impl<'a, C: TerminalControl> RawModeGuard<'a, C> {
    /// Enable raw mode on `terminal`.
    ///
    /// # Errors
    ///
    /// Returns an error if raw mode cannot be enabled.
    pub fn enter(terminal: &'a C) -> io::Result<Self> {
        terminal.enable_raw_mode()?;
        Ok(Self { terminal })
    }
}

impl<C: TerminalControl> Drop for RawModeGuard<'_, C> {
    fn drop(&mut self) {
        if let Err(e) = self.terminal.disable_raw_mode() {
            warn!(error = %e, "failed to restore terminal mode");
        }
    }
}

/// One remote command invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecRequest {
    /// Target app.
    pub app_id: String,
    /// Command and arguments.
    pub argv: Vec<String>,
    /// Terminal rows.
    pub rows: u16,
    /// Terminal columns.
    pub cols: u16,
}

impl ExecRequest {
    /// Build a request; an empty `argv` runs [`DEFAULT_SHELL`].
    #[must_use]
    pub fn new(app_id: impl Into<String>, argv: Vec<String>, rows: u16, cols: u16) -> Self {
        let argv = if argv.is_empty() {
            vec![DEFAULT_SHELL.to_string()]
        } else {
            argv
        };
        Self {
            app_id: app_id.into(),
            argv,
            rows,
            cols,
        }
    }

    /// Query parameters of the exec endpoint, without the access token.
    ///
    /// # Errors
    ///
    /// Returns an error if the command cannot be encoded.
    pub fn query(&self) -> Result<Vec<(&'static str, String)>> {
        Ok(vec![
            ("rows", self.rows.to_string()),
            ("columns", self.cols.to_string()),
            ("cmd", serde_json::to_string(&self.argv)?),
        ])
    }
}

/// How an exec session ended without an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecOutcome {
    /// The remote side closed the stream.
    Closed,
    /// The Cloudron has developer mode turned off.
    FeatureDisabled,
}

/// Runs commands inside an app.
#[derive(Debug)]
pub struct ExecSession<'a, T> {
    client: &'a ApiClient<T>,
}

impl<'a, T: Transport> ExecSession<'a, T> {
    /// Create a session using `client` for the handshake.
    #[must_use]
    pub fn new(client: &'a ApiClient<T>) -> Self {
        Self { client }
    }

    /// Run `request` wired to the process' stdin and stdout.
    ///
    /// # Errors
    ///
    /// Returns `NotATerminal` before any network activity if stdin is not a
    /// terminal, a `Status` error if the server refuses the upgrade, or a
    /// transport error if the stream breaks.
    pub async fn run<C: TerminalControl>(
        &self,
        terminal: &C,
        request: &ExecRequest,
    ) -> Result<ExecOutcome> {
        self.run_with_io(terminal, request, tokio::io::stdin(), tokio::io::stdout())
            .await
    }

    /// Like [`run`](Self::run) with explicit local input and output.
    ///
    /// # Errors
    ///
    /// See [`run`](Self::run).
    pub async fn run_with_io<C, I, O>(
        &self,
        terminal: &C,
        request: &ExecRequest,
        input: I,
        output: O,
    ) -> Result<ExecOutcome>
    where
        C: TerminalControl,
        I: AsyncRead + Unpin,
        O: AsyncWrite + Unpin,
    {
        if !terminal.is_tty() {
            return Err(ApiError::NotATerminal);
        }

        let query = request.query()?;
        let path = format!("/api/v1/apps/{}/exec", request.app_id);
        debug!(app_id = %request.app_id, argv = ?request.argv, "opening exec stream");

        let response = self
            .client
            .send(|ctx| {
                ctx.get(&path)
                    .query(&query)
                    .query(&[("access_token", ctx.token())])
                    .header(CONNECTION, "Upgrade")
                    .header(UPGRADE, "tcp")
            })
            .await?;

        match response.status() {
            StatusCode::SWITCHING_PROTOCOLS => {}
            StatusCode::PRECONDITION_FAILED => return Ok(ExecOutcome::FeatureDisabled),
            _ => return Err(status_error(response).await),
        }

        let stream = response
            .upgrade()
            .await
            .map_err(|e| ApiError::transport(format!("connection upgrade failed: {e}")))?;
        debug!("exec stream established");

        let _raw = RawModeGuard::enter(terminal)?;
        pump(stream, input, output).await?;
        Ok(ExecOutcome::Closed)
    }
}

/// Copy bytes between a duplex `stream` and local `input`/`output` unmodified.
///
/// Returns when the remote side ends the stream. When `input` ends first, the
/// write half of the stream is shut down and remote output is drained.
///
/// # Errors
///
/// Returns a transport error if reading or writing any side fails.
pub async fn pump<S, I, O>(stream: S, mut input: I, mut output: O) -> Result<()>
where
    S: AsyncRead + AsyncWrite,
    I: AsyncRead + Unpin,
    O: AsyncWrite + Unpin,
{
    let (mut remote_rx, mut remote_tx) = tokio::io::split(stream);

    let inbound = copy_chunks(&mut remote_rx, &mut output);
    let outbound = async {
        let sent = copy_chunks(&mut input, &mut remote_tx).await?;
        remote_tx.shutdown().await?;
        Ok::<_, io::Error>(sent)
    };
    tokio::pin!(inbound, outbound);

    let mut input_open = true;
    loop {
        tokio::select! {
            received = &mut inbound => {
                let received = received
                    .map_err(|e| ApiError::transport(format!("exec stream: {e}")))?;
                debug!(received, "remote closed exec stream");
                return Ok(());
            }
            sent = &mut outbound, if input_open => {
                let sent = sent
                    .map_err(|e| ApiError::transport(format!("exec stream: {e}")))?;
                debug!(sent, "local input closed");
                input_open = false;
            }
        }
    }
}

/// Copy until `reader` reaches end of stream, flushing after every chunk.
async fn copy_chunks<R, W>(reader: &mut R, writer: &mut W) -> io::Result<u64>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut buf = vec![0_u8; CHUNK_SIZE];
    let mut total = 0_u64;
    loop {
        let n = reader.read(&mut buf).await?;
        if n == 0 {
            return Ok(total);
        }
        writer.write_all(&buf[..n]).await?;
        writer.flush().await?;
        total += n as u64;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{ScriptedTransport, client_with};
    use std::cell::Cell;
    use std::sync::Arc;
    use tokio::io::{AsyncBufReadExt, BufReader};
    use tokio::net::TcpListener;

    #[derive(Default)]
    struct FakeTerminal {
        tty: bool,
        raw: Cell<bool>,
        toggles: Cell<u32>,
    }

    impl FakeTerminal {
        fn tty() -> Self {
            Self {
                tty: true,
                ..Self::default()
            }
        }
    }

    impl TerminalControl for FakeTerminal {
        fn is_tty(&self) -> bool {
            self.tty
        }

        fn size(&self) -> Option<(u16, u16)> {
            Some((24, 80))
        }

        fn enable_raw_mode(&self) -> io::Result<()> {
            self.raw.set(true);
            self.toggles.set(self.toggles.get() + 1);
            Ok(())
        }

        fn disable_raw_mode(&self) -> io::Result<()> {
            self.raw.set(false);
            self.toggles.set(self.toggles.get() + 1);
            Ok(())
        }
    }

    fn binary_payload() -> Vec<u8> {
        (0..=255_u8).cycle().take(20_000).collect()
    }

    #[test]
    fn test_empty_argv_defaults_to_shell() {
        let request = ExecRequest::new("app", Vec::new(), 24, 80);
        assert_eq!(request.argv, vec![DEFAULT_SHELL.to_string()]);
    }

    #[test]
    fn test_query_encodes_argv_as_json() {
        let request = ExecRequest::new("app", vec!["ls".into(), "-la".into()], 30, 100);
        let query = request.query().expect("query");
        assert_eq!(query[0], ("rows", "30".to_string()));
        assert_eq!(query[1], ("columns", "100".to_string()));
        assert_eq!(query[2], ("cmd", r#"["ls","-la"]"#.to_string()));
    }

    #[tokio::test]
    async fn test_non_tty_fails_without_network() {
        let dir = tempfile::tempdir().expect("tempdir");
        let transport = ScriptedTransport::new([]);
        let requests = Arc::clone(&transport.requests);
        let (client, _) = client_with(transport, &dir);
        let terminal = FakeTerminal::default();

        let err = ExecSession::new(&client)
            .run_with_io(
                &terminal,
                &ExecRequest::new("app", Vec::new(), 24, 80),
                &b""[..],
                Vec::new(),
            )
            .await
            .expect_err("should fail");

        assert!(matches!(err, ApiError::NotATerminal));
        assert!(requests.lock().is_empty());
        assert_eq!(terminal.toggles.get(), 0);
    }

    #[tokio::test]
    async fn test_feature_disabled_is_clean_exit() {
        let dir = tempfile::tempdir().expect("tempdir");
        let transport = ScriptedTransport::new([(412, "developer mode".into())]);
        let requests = Arc::clone(&transport.requests);
        let (client, _) = client_with(transport, &dir);
        let terminal = FakeTerminal::tty();

        let outcome = ExecSession::new(&client)
            .run_with_io(
                &terminal,
                &ExecRequest::new("app", vec!["ls".into()], 24, 80),
                &b""[..],
                Vec::new(),
            )
            .await
            .expect("clean exit");

        assert_eq!(outcome, ExecOutcome::FeatureDisabled);
        assert_eq!(terminal.toggles.get(), 0);
        let requests = requests.lock();
        assert_eq!(requests[0].path, "/api/v1/apps/app/exec");
        assert!(requests[0].query.contains("access_token=old-token"));
        assert!(requests[0].query.contains("rows=24"));
        assert!(requests[0].query.contains("columns=80"));
    }

    #[tokio::test]
    async fn test_other_status_is_error_with_body() {
        let dir = tempfile::tempdir().expect("tempdir");
        let transport = ScriptedTransport::new([(500, "container not running".into())]);
        let (client, _) = client_with(transport, &dir);

        let err = ExecSession::new(&client)
            .run_with_io(
                &FakeTerminal::tty(),
                &ExecRequest::new("app", Vec::new(), 24, 80),
                &b""[..],
                Vec::new(),
            )
            .await
            .expect_err("should fail");

        assert_eq!(err.status_code(), Some(500));
        assert!(err.to_string().contains("container not running"));
    }

    #[tokio::test]
    async fn test_pump_forwards_input_unmodified() {
        let (local, mut remote) = tokio::io::duplex(64);
        let payload = binary_payload();
        let mut output = Vec::new();

        let remote_side = async {
            let mut received = Vec::new();
            remote.read_to_end(&mut received).await.expect("read");
            remote.shutdown().await.expect("shutdown");
            received
        };

        let (result, received) =
            tokio::join!(pump(local, payload.as_slice(), &mut output), remote_side);
        result.expect("pump");

        assert_eq!(received, payload);
        assert!(received.contains(&0));
        assert!(output.is_empty());
    }

    #[tokio::test]
    async fn test_pump_delivers_remote_output_unmodified() {
        let (local, mut remote) = tokio::io::duplex(64);
        let payload = binary_payload();
        let mut output = Vec::new();

        let remote_side = async {
            remote.write_all(&payload).await.expect("write");
            remote.shutdown().await.expect("shutdown");
        };

        // Input that never ends, like an idle keyboard.
        let (idle_input, _keep_open) = tokio::io::duplex(8);
        let (result, ()) = tokio::join!(pump(local, idle_input, &mut output), remote_side);
        result.expect("pump");

        assert_eq!(output, payload);
    }

    #[tokio::test]
    async fn test_upgrade_handshake_end_to_end() {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("addr");

        let server = tokio::spawn(async move {
            let (socket, _) = listener.accept().await.expect("accept");
            let mut socket = BufReader::new(socket);
            let mut head = String::new();
            loop {
                let mut line = String::new();
                socket.read_line(&mut line).await.expect("read head");
                if line == "\r\n" || line.is_empty() {
                    break;
                }
                head.push_str(&line);
            }
            socket
                .get_mut()
                .write_all(
                    b"HTTP/1.1 101 Switching Protocols\r\nConnection: Upgrade\r\nUpgrade: tcp\r\n\r\n",
                )
                .await
                .expect("write head");

            let mut received = Vec::new();
            socket.read_to_end(&mut received).await.expect("read input");
            socket.get_mut().write_all(b"bye\0\xff").await.expect("write");
            socket.get_mut().shutdown().await.expect("shutdown");
            (head, received)
        });

        let dir = tempfile::tempdir().expect("tempdir");
        let mut config =
            cloudron_config::Config::load(dir.path().join("c.json")).expect("config");
        config.set_host(format!("http://{addr}")).expect("host");
        config.set_token("tok").expect("token");
        let client = ApiClient::new(
            crate::transport::HttpTransport::new().expect("transport"),
            Arc::new(parking_lot::Mutex::new(config)),
            Box::new(crate::testing::CountingPrompt::default()),
        );

        let terminal = FakeTerminal::tty();
        let input = b"echo hi\n\0\x01binary".to_vec();
        let mut output = Vec::new();
        let outcome = ExecSession::new(&client)
            .run_with_io(
                &terminal,
                &ExecRequest::new("app-1", Vec::new(), 24, 80),
                input.as_slice(),
                &mut output,
            )
            .await
            .expect("exec");

        let (head, received) = server.await.expect("server");
        assert_eq!(outcome, ExecOutcome::Closed);
        assert!(head.starts_with("GET /api/v1/apps/app-1/exec?"));
        assert!(head.contains("access_token=tok"));
        assert!(head.to_ascii_lowercase().contains("upgrade: tcp"));
        assert_eq!(received, input);
        assert_eq!(output, b"bye\0\xff");
        assert!(!terminal.raw.get());
        assert_eq!(terminal.toggles.get(), 2);
    }

    #[tokio::test]
    async fn test_connection_reset_restores_terminal() {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("addr");

        let server = tokio::spawn(async move {
            let (socket, _) = listener.accept().await.expect("accept");
            let mut socket = BufReader::new(socket);
            loop {
                let mut line = String::new();
                socket.read_line(&mut line).await.expect("read head");
                if line == "\r\n" || line.is_empty() {
                    break;
                }
            }
            socket
                .get_mut()
                .write_all(
                    b"HTTP/1.1 101 Switching Protocols\r\nConnection: Upgrade\r\nUpgrade: tcp\r\n\r\npartial",
                )
                .await
                .expect("write head");
            tokio::time::sleep(std::time::Duration::from_millis(100)).await;
            let socket = socket.into_inner();
            socket
                .set_linger(Some(std::time::Duration::ZERO))
                .expect("linger");
            drop(socket);
        });

        let dir = tempfile::tempdir().expect("tempdir");
        let mut config =
            cloudron_config::Config::load(dir.path().join("c.json")).expect("config");
        config.set_host(format!("http://{addr}")).expect("host");
        config.set_token("tok").expect("token");
        let client = ApiClient::new(
            crate::transport::HttpTransport::new().expect("transport"),
            Arc::new(parking_lot::Mutex::new(config)),
            Box::new(crate::testing::CountingPrompt::default()),
        );

        let terminal = FakeTerminal::tty();
        let mut output = Vec::new();
        let result = ExecSession::new(&client)
            .run_with_io(
                &terminal,
                &ExecRequest::new("app-1", Vec::new(), 24, 80),
                tokio::io::empty(),
                &mut output,
            )
            .await;

        server.await.expect("server");
        assert!(matches!(result, Err(ApiError::Transport { .. })), "{result:?}");
        assert!(!terminal.raw.get());
        assert_eq!(terminal.toggles.get(), 2);
        assert_eq!(output, b"partial");
    }
}
