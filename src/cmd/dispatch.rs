/*!
dispatch.rs

Runs one selected `Operation` against a `Transport` and turns the reply into
output lines.

Flow:
  execute(op, config, options)       (sync entry; owns the Tokio runtime)
    -> Tile38Client::connect
    -> run_operation(op, transport)   (one request, then close exactly once)
    -> report_lines(op, reply, options)

Informational outcomes (empty scan / nearby, no stats) are ordinary output
lines, not errors.
*/

use std::iter;

use anyhow::Context;

use super::error::ToolError;
use super::operation::Operation;
use super::options::Options;
use super::render::{no_stats_line, render};
use crate::tile38::{
    QueryResult, ResultKind, ServerConfig, Tile38Client, Transport, TransportError,
};
use crate::{log_debug, log_info};

/// A validated reply: the JSON text as received plus its typed form.
#[derive(Debug, Clone)]
pub struct Reply {
    pub raw: String,
    pub payload: QueryResult,
}

/// Connect, run `op`, and return the lines to print.
pub fn execute(
    op: &Operation,
    config: &ServerConfig,
    options: &Options,
) -> Result<Vec<String>, ToolError> {
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to create Tokio runtime")?;

    let reply = rt.block_on(connect_and_run(op, config))?;
    Ok(report_lines(op, &reply, options))
}

async fn connect_and_run(op: &Operation, config: &ServerConfig) -> Result<Reply, ToolError> {
    let mut client = Tile38Client::connect(config).await?;
    run_operation(op, &mut client).await
}

/// Send the single request for `op`, then close the transport.
///
/// The transport is closed whether or not the request succeeded; a failure
/// while closing is logged and does not mask the request's outcome.
pub async fn run_operation<T: Transport>(
    op: &Operation,
    transport: &mut T,
) -> Result<Reply, ToolError> {
    if op.kind().is_destructive() {
        log_info!("{} modifies data on the server", op.kind().flag());
    }

    let outcome = send(op, transport).await;

    if let Err(e) = transport.close().await {
        log_debug!("error while closing connection: {e}");
    }

    let raw = outcome?;
    let payload = QueryResult::parse(result_kind(op), &raw)?;
    Ok(Reply { raw, payload })
}

async fn send<T: Transport>(op: &Operation, transport: &mut T) -> Result<String, TransportError> {
    log_debug!("running {}", op.kind());
    match op {
        Operation::Scan { key } => transport.send_command("SCAN", &[key.clone()]).await,
        Operation::Search { pattern } => transport.send_command("KEYS", &[pattern.clone()]).await,
        Operation::Stats { key } => {
            let args: Vec<String> = key.iter().cloned().collect();
            transport.send_command("STATS", &args).await
        }
        Operation::Delete { key, id } => transport.delete(key, id.as_deref()).await,
        Operation::SetPoint { key, id, point } => transport.set_point(key, id, point).await,
        Operation::Nearby { key, point, radius } => {
            let mut args = vec![key.clone(), "POINT".to_string()];
            args.extend(point.point_args());
            if let Some(r) = radius {
                args.push(r.clone());
            }
            transport.send_command("NEARBY", &args).await
        }
    }
}

fn result_kind(op: &Operation) -> ResultKind {
    match op {
        Operation::Scan { .. } | Operation::Nearby { .. } => ResultKind::Objects,
        Operation::Search { .. } => ResultKind::Keys,
        Operation::Stats { .. } => ResultKind::Stats,
        Operation::Delete { .. } | Operation::SetPoint { .. } => ResultKind::Ack,
    }
}

/// Key a stats lookup was made for, `*` when none was given.
fn stats_term(op: &Operation) -> &str {
    match op {
        Operation::Stats { key: Some(key) } => key.as_str(),
        _ => "*",
    }
}

/// Informational message for an empty reply, if the operation has one.
fn notice(op: &Operation, payload: &QueryResult) -> Option<String> {
    if !payload.is_empty() {
        return None;
    }
    match op {
        Operation::Scan { key } => Some(format!("Nothing found for key {key}.")),
        Operation::Nearby { .. } => Some("No items found.".to_string()),
        Operation::Stats { .. } => Some(no_stats_line(stats_term(op))),
        _ => None,
    }
}

/// Output lines for a reply.
///
/// Human mode prints the notice alone when there is one, else the rendered
/// payload. `--json` prints the notice (if any) followed by the raw JSON.
pub fn report_lines(op: &Operation, reply: &Reply, options: &Options) -> Vec<String> {
    let notice = notice(op, &reply.payload);
    if options.json {
        let pretty = serde_json::from_str::<serde_json::Value>(&reply.raw)
            .and_then(|v| serde_json::to_string_pretty(&v))
            .unwrap_or_else(|_| reply.raw.clone());
        return notice.into_iter().chain(iter::once(pretty)).collect();
    }
    match notice {
        Some(n) => vec![n],
        None => render(&reply.payload, options.mode, stats_term(op)).collect(),
    }
}

/* --------------------------------- Tests ---------------------------------- */

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cmd::coords::Coordinate;
    use crate::cmd::options::DisplayMode;

    /// Records every call; answers with a canned reply.
    struct SpyTransport {
        calls: Vec<String>,
        reply: Result<String, String>,
        closed: usize,
    }

    impl SpyTransport {
        fn replying(json: &str) -> Self {
            Self {
                calls: Vec::new(),
                reply: Ok(json.to_string()),
                closed: 0,
            }
        }

        fn failing(msg: &str) -> Self {
            Self {
                calls: Vec::new(),
                reply: Err(msg.to_string()),
                closed: 0,
            }
        }

        fn answer(&self) -> Result<String, TransportError> {
            self.reply.clone().map_err(TransportError::Server)
        }
    }

    impl Transport for SpyTransport {
        async fn send_command(
            &mut self,
            name: &str,
            args: &[String],
        ) -> Result<String, TransportError> {
            let mut call = vec![name.to_string()];
            call.extend(args.iter().cloned());
            self.calls.push(call.join(" "));
            self.answer()
        }

        async fn set_point(
            &mut self,
            key: &str,
            id: &str,
            point: &Coordinate,
        ) -> Result<String, TransportError> {
            self.calls.push(format!("set {key} {id} {point}"));
            self.answer()
        }

        async fn delete(
            &mut self,
            key: &str,
            id: Option<&str>,
        ) -> Result<String, TransportError> {
            match id {
                Some(id) => self.calls.push(format!("del {key} {id}")),
                None => self.calls.push(format!("drop {key}")),
            }
            self.answer()
        }

        async fn close(&mut self) -> Result<(), TransportError> {
            self.closed += 1;
            Ok(())
        }
    }

    const ACK: &str = r#"{"ok":true,"elapsed":"5µs"}"#;
    const NO_OBJECTS: &str = r#"{"ok":true,"objects":[],"count":0,"cursor":0}"#;

    fn point(raw: &str) -> Coordinate {
        Coordinate::parse(raw).unwrap()
    }

    #[tokio::test]
    async fn search_sends_pattern() {
        let mut spy = SpyTransport::replying(r#"{"ok":true,"keys":["fleet"]}"#);
        let op = Operation::Search {
            pattern: "*".into(),
        };
        let reply = run_operation(&op, &mut spy).await.unwrap();
        assert_eq!(spy.calls, vec!["KEYS *"]);
        assert_eq!(reply.payload, QueryResult::Keys(vec!["fleet".into()]));
    }

    #[tokio::test]
    async fn delete_with_and_without_id_differ() {
        let mut spy = SpyTransport::replying(ACK);
        let one = Operation::Delete {
            key: "fleet".into(),
            id: Some("truck1".into()),
        };
        run_operation(&one, &mut spy).await.unwrap();

        let all = Operation::Delete {
            key: "fleet".into(),
            id: None,
        };
        run_operation(&all, &mut spy).await.unwrap();

        assert_eq!(spy.calls, vec!["del fleet truck1", "drop fleet"]);
    }

    #[tokio::test]
    async fn nearby_omits_absent_radius() {
        let mut spy = SpyTransport::replying(NO_OBJECTS);
        let op = Operation::Nearby {
            key: "fleet".into(),
            point: point("-112.26,33.46"),
            radius: None,
        };
        run_operation(&op, &mut spy).await.unwrap();
        assert_eq!(spy.calls, vec!["NEARBY fleet POINT 33.46 -112.26"]);
    }

    #[tokio::test]
    async fn nearby_appends_radius() {
        let mut spy = SpyTransport::replying(NO_OBJECTS);
        let op = Operation::Nearby {
            key: "fleet".into(),
            point: point("1,2"),
            radius: Some("5000".into()),
        };
        run_operation(&op, &mut spy).await.unwrap();
        assert_eq!(spy.calls, vec!["NEARBY fleet POINT 2 1 5000"]);
    }

    #[tokio::test]
    async fn setpoint_uses_structured_call() {
        let mut spy = SpyTransport::replying(ACK);
        let op = Operation::SetPoint {
            key: "fleet".into(),
            id: "truck1".into(),
            point: point("1.5,2.5"),
        };
        let reply = run_operation(&op, &mut spy).await.unwrap();
        assert_eq!(spy.calls, vec!["set fleet truck1 1.5,2.5"]);
        assert!(matches!(reply.payload, QueryResult::Ack { .. }));
    }

    #[tokio::test]
    async fn stats_without_key_sends_no_args() {
        let mut spy = SpyTransport::replying(r#"{"ok":true,"stats":[null]}"#);
        let op = Operation::Stats { key: None };
        run_operation(&op, &mut spy).await.unwrap();
        assert_eq!(spy.calls, vec!["STATS"]);
    }

    #[tokio::test]
    async fn closes_once_even_on_failure() {
        let mut spy = SpyTransport::failing("ERR boom");
        let op = Operation::Scan { key: "fleet".into() };
        let err = run_operation(&op, &mut spy).await.unwrap_err();
        assert_eq!(spy.closed, 1);
        assert!(matches!(err, ToolError::Transport(TransportError::Server(_))));
        assert_eq!(err.to_string(), "ERR boom");
    }

    #[tokio::test]
    async fn closes_once_on_success() {
        let mut spy = SpyTransport::replying(NO_OBJECTS);
        let op = Operation::Scan { key: "fleet".into() };
        run_operation(&op, &mut spy).await.unwrap();
        assert_eq!(spy.closed, 1);
    }

    fn reply_for(op: &Operation, raw: &str) -> Reply {
        Reply {
            raw: raw.to_string(),
            payload: QueryResult::parse(result_kind(op), raw).unwrap(),
        }
    }

    #[test]
    fn empty_scan_is_informational() {
        let op = Operation::Scan { key: "fleet".into() };
        let lines = report_lines(&op, &reply_for(&op, NO_OBJECTS), &Options::default());
        assert_eq!(lines, vec!["Nothing found for key fleet."]);
    }

    #[test]
    fn empty_nearby_is_informational() {
        let op = Operation::Nearby {
            key: "fleet".into(),
            point: point("1,2"),
            radius: None,
        };
        let lines = report_lines(&op, &reply_for(&op, NO_OBJECTS), &Options::default());
        assert_eq!(lines, vec!["No items found."]);
    }

    #[test]
    fn null_stats_names_the_term() {
        let op = Operation::Stats {
            key: Some("fleet".into()),
        };
        let raw = r#"{"ok":true,"stats":[null]}"#;
        let lines = report_lines(&op, &reply_for(&op, raw), &Options::default());
        assert_eq!(lines, vec!["No objects found for term fleet."]);
    }

    #[test]
    fn scan_respects_display_mode() {
        let op = Operation::Scan { key: "fleet".into() };
        let raw = r#"{"ok":true,"objects":[{"id":"a","object":{"type":"Point","coordinates":[1,2]}}]}"#;
        let reply = reply_for(&op, raw);

        let shown = report_lines(&op, &reply, &Options::default());
        assert_eq!(shown, vec!["a 1 2"]);

        let hidden = Options {
            mode: DisplayMode { coordinates: false },
            ..Options::default()
        };
        assert_eq!(report_lines(&op, &reply, &hidden), vec!["a"]);
    }

    #[test]
    fn json_mode_pretty_prints_raw() {
        let op = Operation::Search {
            pattern: "*".into(),
        };
        let raw = r#"{"ok":true,"keys":["fleet"]}"#;
        let opts = Options {
            json: true,
            ..Options::default()
        };
        let lines = report_lines(&op, &reply_for(&op, raw), &opts);
        assert_eq!(lines.len(), 1);
        assert!(lines[0].contains("\"keys\": ["));
    }

    fn json_options() -> Options {
        Options {
            json: true,
            ..Options::default()
        }
    }

    #[test]
    fn json_mode_keeps_notice_for_empty_scan() {
        let op = Operation::Scan { key: "fleet".into() };
        let lines = report_lines(&op, &reply_for(&op, NO_OBJECTS), &json_options());
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], "Nothing found for key fleet.");
        assert!(lines[1].contains("\"objects\": []"));
    }

    #[test]
    fn json_mode_keeps_notice_for_null_stats() {
        let op = Operation::Stats { key: None };
        let raw = r#"{"ok":true,"stats":[null]}"#;
        let lines = report_lines(&op, &reply_for(&op, raw), &json_options());
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], "No objects found for term *.");
        assert!(lines[1].contains("\"stats\": ["));
    }

    #[test]
    fn stats_notice_matches_renderer() {
        let op = Operation::Stats {
            key: Some("fleet".into()),
        };
        let reply = reply_for(&op, r#"{"ok":true,"stats":[null]}"#);
        let rendered: Vec<String> =
            render(&reply.payload, DisplayMode::default(), "fleet").collect();
        assert_eq!(report_lines(&op, &reply, &Options::default()), rendered);
    }
}
