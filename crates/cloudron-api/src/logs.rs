//! App logs, one shot or followed.

use std::io::Write;

use reqwest::StatusCode;
use reqwest::header::ACCEPT;

use crate::client::{ApiClient, expect_status};
use crate::error::Result;
use crate::stream::{EventStream, print_log_events};
use crate::transport::Transport;

/// Lines requested when the caller does not say.
pub const DEFAULT_LINES: u32 = 100;

impl<T: Transport> ApiClient<T> {
    /// Copy the last `lines` log lines of an app to `out`.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn print_logs<W: Write>(&self, app_id: &str, lines: u32, out: &mut W) -> Result<()> {
        let path = format!("/api/v1/apps/{app_id}/logs");
        let response = self
            .send(|ctx| ctx.get(&path).query(&[("lines", lines)]))
            .await?;
        let body = expect_status(response, StatusCode::OK).await?.bytes().await?;
        out.write_all(&body)?;
        out.flush()?;
        Ok(())
    }

    /// Print the last `lines` log lines of an app, then keep printing new ones
    /// until the server closes the stream.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the stream breaks.
    pub async fn follow_logs<W: Write>(&self, app_id: &str, lines: u32, out: &mut W) -> Result<()> {
        let path = format!("/api/v1/apps/{app_id}/logstream");
        let response = self
            .send(|ctx| {
                ctx.get(&path)
                    .query(&[("lines", lines)])
                    .header(ACCEPT, "text/event-stream")
            })
            .await?;
        let response = expect_status(response, StatusCode::OK).await?;
        let mut events = EventStream::new(response.bytes_stream());
        print_log_events(&mut events, out).await
    }
}

#[cfg(test)]
mod tests {
    use crate::error::ApiError;
    use crate::testing::{ScriptedTransport, client_with, ok};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_print_logs_copies_body() {
        let dir = tempfile::tempdir().expect("tempdir");
        let transport = ScriptedTransport::new([ok("one\ntwo\n")]);
        let requests = Arc::clone(&transport.requests);
        let (client, _) = client_with(transport, &dir);
        let mut out = Vec::new();

        client.print_logs("app1", 20, &mut out).await.expect("logs");
        assert_eq!(out, b"one\ntwo\n");
        let recorded = &requests.lock()[0];
        assert_eq!(recorded.path, "/api/v1/apps/app1/logs");
        assert_eq!(recorded.query, "lines=20");
    }

    #[tokio::test]
    async fn test_follow_logs_prints_messages() {
        let dir = tempfile::tempdir().expect("tempdir");
        let transport = ScriptedTransport::new([ok(
            "data: {\"message\":\"started\\n\",\"source\":\"app\"}\n\ndata: not json\n\n",
        )]);
        let (client, _) = client_with(transport, &dir);
        let mut out = Vec::new();

        client.follow_logs("app1", 10, &mut out).await.expect("follow");
        assert_eq!(String::from_utf8(out).expect("utf8"), "started\nnot json\n");
    }

    #[tokio::test]
    async fn test_missing_app_is_status_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let transport = ScriptedTransport::new([(404, r#"{"message":"No such app"}"#.into())]);
        let (client, _) = client_with(transport, &dir);

        let err = client
            .follow_logs("nope", 10, &mut Vec::new())
            .await
            .expect_err("404");
        assert!(matches!(err, ApiError::Status { code: 404, ref message } if message == "No such app"));
    }
}
