/*!
client.rs

`Tile38Client`: a `Transport` over any byte stream speaking RESP (a TCP socket
in practice; an in-memory duplex in tests).

Connection lifecycle:
  1. `connect` opens the socket and runs the handshake
     (`AUTH <password>` when configured, then `OUTPUT json`)
  2. exactly one command is sent by the dispatcher
  3. `close` sends `QUIT` and shuts the write side down

Every reply is returned as JSON text; `"ok": false` replies and RESP error
frames surface as `TransportError::Server`.
*/

use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, BufStream};
use tokio::net::TcpStream;

use super::payload::check_envelope;
use super::resp::{self, Frame};
use super::{ServerConfig, Transport, TransportError};
use crate::cmd::coords::Coordinate;
use crate::{log_debug, log_trace};

pub struct Tile38Client<S = TcpStream> {
    stream: BufStream<S>,
    open: bool,
}

impl Tile38Client<TcpStream> {
    /// Open a TCP connection to the configured server and run the handshake.
    pub async fn connect(config: &ServerConfig) -> Result<Self, TransportError> {
        let endpoint = config.endpoint();
        log_debug!("connecting to {endpoint}");
        let stream = TcpStream::connect((config.host.as_str(), config.port))
            .await
            .map_err(|source| TransportError::Connect {
                endpoint: endpoint.clone(),
                source,
            })?;
        let client = Self::handshake(stream, config.password.as_deref()).await?;
        log_debug!("connected to {endpoint}");
        Ok(client)
    }
}

impl<S> Tile38Client<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Authenticate (if a password is given) and switch the session to JSON output.
    pub async fn handshake(stream: S, password: Option<&str>) -> Result<Self, TransportError> {
        let mut client = Tile38Client {
            stream: BufStream::new(stream),
            open: true,
        };
        if let Some(pw) = password {
            client.call(&["AUTH", pw]).await?.into_text()?;
        }
        client.call_json(&["OUTPUT", "json"]).await?;
        Ok(client)
    }

    async fn call(&mut self, parts: &[&str]) -> Result<Frame, TransportError> {
        if !self.open {
            return Err(TransportError::Closed);
        }
        match parts.first() {
            Some(&"AUTH") => log_trace!("> AUTH ****"),
            _ => log_trace!("> {}", parts.join(" ")),
        }
        resp::write_command(&mut self.stream, parts).await?;
        let frame = resp::read_frame(&mut self.stream).await?;
        log_trace!("< {frame:?}");
        Ok(frame)
    }

    /// Send a command and return its JSON reply after checking `ok`.
    async fn call_json(&mut self, parts: &[&str]) -> Result<String, TransportError> {
        let text = self.call(parts).await?.into_text()?;
        check_envelope(&text)?;
        Ok(text)
    }
}

impl<S> Transport for Tile38Client<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    async fn send_command(
        &mut self,
        name: &str,
        args: &[String],
    ) -> Result<String, TransportError> {
        let mut parts: Vec<&str> = Vec::with_capacity(args.len() + 1);
        parts.push(name);
        parts.extend(args.iter().map(String::as_str));
        self.call_json(&parts).await
    }

    async fn set_point(
        &mut self,
        key: &str,
        id: &str,
        point: &Coordinate,
    ) -> Result<String, TransportError> {
        let [lat, lon] = point.point_args();
        self.call_json(&["SET", key, id, "POINT", lat.as_str(), lon.as_str()])
            .await
    }

    async fn delete(&mut self, key: &str, id: Option<&str>) -> Result<String, TransportError> {
        match id {
            Some(id) => self.call_json(&["DEL", key, id]).await,
            None => self.call_json(&["DROP", key]).await,
        }
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        if !self.open {
            return Ok(());
        }
        // QUIT reply is irrelevant; the server hangs up either way
        let quit = self.call(&["QUIT"]).await;
        self.open = false;
        if let Err(e) = quit {
            log_debug!("QUIT failed: {e}");
        }
        self.stream.shutdown().await?;
        log_debug!("connection closed");
        Ok(())
    }
}
