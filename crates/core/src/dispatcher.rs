//! Read-eval-print loop over the session gateway.
//!
//! Reads one command per line, answers with exactly one JSON line. The loop is
//! strictly sequential: each platform call is awaited before the next line is
//! read.

use crate::command::{Command, SEEK_SCALE, parse_seek_position};
use crate::models::SessionSnapshot;
use crate::resolver::{SessionGateway, fetch_snapshot};
use crate::response::{MetadataResponse, Response, SEEK_PROMPT};
use crate::traits::MediaSession;
use anyhow::Result;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, error, warn};

/// What the loop does after a line has been handled
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Step {
    Continue,
    Exit,
}

pub struct Repl<R, W> {
    gateway: SessionGateway,
    input: R,
    output: W,
    seek_scale: i64,
}

impl<R, W> Repl<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    pub fn new(gateway: SessionGateway, input: R, output: W) -> Self {
        Self {
            gateway,
            input,
            output,
            seek_scale: SEEK_SCALE,
        }
    }

    /// Override the multiplier applied to `-seek` input
    pub fn with_seek_scale(mut self, seek_scale: i64) -> Self {
        self.seek_scale = seek_scale;
        self
    }

    /// Run until an empty line, `exit` or end of input.
    ///
    /// Only I/O failures on the REPL's own streams end the loop with an error;
    /// platform failures are reported as JSON and the loop carries on.
    pub async fn run(&mut self) -> Result<()> {
        while self.step().await? == Step::Continue {}
        debug!("REPL finished");
        Ok(())
    }

    /// Handle a single input line
    pub async fn step(&mut self) -> Result<Step> {
        let Some(line) = self.read_line().await? else {
            debug!("End of input");
            return Ok(Step::Exit);
        };

        let command = Command::parse(&line);
        if command == Command::Exit {
            return Ok(Step::Exit);
        }

        debug!("Dispatching {:?}", command);
        let response = match self.dispatch(&command).await {
            Ok(response) => response,
            Err(e) => {
                error!("Command {:?} failed: {:#}", command, e);
                Response::error(e.to_string())
            }
        };

        self.write_response(&response).await?;
        Ok(Step::Continue)
    }

    async fn dispatch(&mut self, command: &Command) -> Result<Response> {
        let Some(session) = self.gateway.resolve_session().await? else {
            return Ok(Response::no_active_session());
        };

        if command.needs_snapshot() {
            let snapshot = fetch_snapshot(session.as_ref()).await?;
            return query(command, &snapshot).await;
        }

        let response = match command {
            Command::Skip => {
                report_transport("skip_next", session.skip_next().await?);
                Response::status("Skipped")
            }
            Command::Back => {
                report_transport("skip_previous", session.skip_previous().await?);
                Response::status("Previous track")
            }
            Command::Pause => {
                report_transport("toggle_play_pause", session.toggle_play_pause().await?);
                Response::status("Toggled pause")
            }
            Command::Seek => self.seek(session.as_ref()).await?,
            Command::Sessions => Response::count(self.gateway.session_count().await?),
            Command::Help => Response::help(),
            _ => Response::unknown_command(),
        };
        Ok(response)
    }

    async fn seek(&mut self, session: &dyn MediaSession) -> Result<Response> {
        self.write_line(SEEK_PROMPT).await?;
        let input = self.read_line().await?.unwrap_or_default();

        match parse_seek_position(&input, self.seek_scale) {
            Ok(position) => {
                report_transport("seek_to", session.seek_to(position).await?);
                Ok(Response::seeked(position))
            }
            Err(e) => {
                debug!("Rejected seek input {:?}", input.trim());
                Ok(Response::error(e.to_string()))
            }
        }
    }

    /// `None` at end of input. Invalid UTF-8 is replaced, not rejected.
    async fn read_line(&mut self) -> Result<Option<String>> {
        let mut buf = Vec::new();
        if self.input.read_until(b'\n', &mut buf).await? == 0 {
            return Ok(None);
        }
        Ok(Some(String::from_utf8_lossy(&buf).into_owned()))
    }

    async fn write_response(&mut self, response: &Response) -> Result<()> {
        let json = response.to_json_line()?;
        self.write_line(&json).await
    }

    async fn write_line(&mut self, line: &str) -> Result<()> {
        self.output.write_all(line.as_bytes()).await?;
        self.output.write_all(b"\n").await?;
        self.output.flush().await?;
        Ok(())
    }
}

async fn query(command: &Command, snapshot: &SessionSnapshot) -> Result<Response> {
    let response = match command {
        Command::All => MetadataResponse::full(snapshot).await?,
        Command::Cover => MetadataResponse::cover(snapshot).await?,
        Command::Name => MetadataResponse::title(snapshot),
        Command::Artist => MetadataResponse::artist(snapshot),
        Command::Album => MetadataResponse::album(snapshot),
        Command::Timeline => MetadataResponse::timeline(snapshot),
        _ => return Ok(Response::unknown_command()),
    };
    Ok(response.into())
}

fn report_transport(action: &str, accepted: bool) {
    if accepted {
        debug!("{} accepted", action);
    } else {
        warn!("{} was not accepted by the player", action);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockManager, MockSession};

    async fn run_script(manager: MockManager, script: &str) -> String {
        let gateway = SessionGateway::new(Box::new(manager));
        let mut output = Vec::new();
        let mut repl = Repl::new(gateway, script.as_bytes(), &mut output);
        repl.run().await.unwrap();
        drop(repl);
        String::from_utf8(output).unwrap()
    }

    #[tokio::test]
    async fn test_step_reports_exit() {
        let gateway = SessionGateway::new(Box::new(MockManager::new()));
        let mut output = Vec::new();
        let mut repl = Repl::new(gateway, "-help\nexit\n".as_bytes(), &mut output);

        assert_eq!(repl.step().await.unwrap(), Step::Continue);
        assert_eq!(repl.step().await.unwrap(), Step::Exit);
    }

    #[tokio::test]
    async fn test_transport_commands() {
        let session = MockSession::new("spotify");
        let calls = session.calls();
        let output = run_script(
            MockManager::new().with_current(session),
            "-skip\n-back\n-PAUSE\n",
        )
        .await;

        assert_eq!(
            output,
            "{\"status\":\"Skipped\"}\n{\"status\":\"Previous track\"}\n{\"status\":\"Toggled pause\"}\n"
        );
        assert_eq!(calls.calls(), vec!["skip_next", "skip_previous", "toggle_play_pause"]);
    }

    #[tokio::test]
    async fn test_transport_commands_skip_snapshot() {
        let session = MockSession::new("spotify");
        let calls = session.calls();
        run_script(MockManager::new().with_current(session), "-skip\n").await;
        assert!(!calls.contains("media_properties"));
    }

    #[tokio::test]
    async fn test_seek_with_custom_scale() {
        let session = MockSession::new("spotify");
        let calls = session.calls();
        let gateway = SessionGateway::new(Box::new(MockManager::new().with_current(session)));
        let mut output = Vec::new();
        let mut repl =
            Repl::new(gateway, "-seek\n3\n".as_bytes(), &mut output).with_seek_scale(10_000_000);
        repl.run().await.unwrap();
        drop(repl);

        assert_eq!(
            String::from_utf8(output).unwrap(),
            "Enter Time\n{\"status\":\"Seeked\",\"position\":30000000}\n"
        );
        assert!(calls.contains("seek_to(30000000)"));
    }

    #[tokio::test]
    async fn test_seek_at_end_of_input() {
        let session = MockSession::new("spotify");
        let calls = session.calls();
        let output = run_script(MockManager::new().with_current(session), "-seek\n").await;

        assert_eq!(output, "Enter Time\n{\"error\":\"Not a Correct input\"}\n");
        assert!(!calls.calls().iter().any(|c| c.starts_with("seek_to")));
    }
}
