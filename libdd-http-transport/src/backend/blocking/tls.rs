// Copyright 2026-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Blocking HTTPS stack over `std::net` sockets and rustls.

use super::http1::{self, BodyDecoder};
use super::native::BlockingStack;
use crate::error::InitError;
use crate::HttpMethod;
use rustls::pki_types::ServerName;
use rustls::{ClientConfig, ClientConnection, RootCertStore, StreamOwned};
use std::io::{self, BufReader, Write};
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::sync::Arc;
use tracing::debug;

type TlsStream = BufReader<StreamOwned<ClientConnection, TcpStream>>;

/// The blocking native stack used in production.
///
/// `connect` only resolves the target, the TCP connection and TLS handshake
/// happen when the request is sent.
#[derive(Debug, Default, Clone, Copy)]
pub struct TlsStack;

/// Session handle: the TLS client configuration shared by all calls.
#[derive(Debug)]
pub struct TlsSession {
    config: Arc<ClientConfig>,
    user_agent: String,
}

/// Connection handle: a resolved target host.
#[derive(Debug)]
pub struct TlsConnection {
    config: Arc<ClientConfig>,
    user_agent: String,
    hostname: String,
    server_name: ServerName<'static>,
    addrs: Vec<SocketAddr>,
}

/// Request handle: owns the socket once the request has been sent.
pub struct TlsRequest {
    method: HttpMethod,
    path: String,
    hostname: String,
    user_agent: String,
    addrs: Vec<SocketAddr>,
    tls: Option<ClientConnection>,
    stream: Option<TlsStream>,
    status: Option<u16>,
    body: Option<BodyDecoder>,
}

impl TlsRequest {
    fn stream(&mut self) -> io::Result<&mut TlsStream> {
        self.stream
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotConnected, "request was not sent"))
    }
}

impl Drop for TlsRequest {
    fn drop(&mut self) {
        if let Some(stream) = self.stream.as_mut() {
            let stream = stream.get_mut();
            stream.conn.send_close_notify();
            let _ = stream.flush();
        }
    }
}

fn load_root_certs() -> Result<RootCertStore, InitError> {
    let mut roots = RootCertStore::empty();
    let loaded = rustls_native_certs::load_native_certs();
    for err in &loaded.errors {
        debug!(error = %err, "Skipping unreadable certificate source");
    }
    for cert in loaded.certs {
        if let Err(e) = roots.add(cert) {
            debug!(error = %e, "Skipping invalid root certificate");
        }
    }
    if roots.is_empty() {
        return Err(InitError::RootCertificates(
            "native certificate store is empty".to_owned(),
        ));
    }
    Ok(roots)
}

fn client_config(roots: RootCertStore) -> Result<ClientConfig, InitError> {
    Ok(
        ClientConfig::builder_with_provider(Arc::new(rustls::crypto::ring::default_provider()))
            .with_safe_default_protocol_versions()
            .map_err(|e| InitError::Session(e.to_string()))?
            .with_root_certificates(roots)
            .with_no_client_auth(),
    )
}

impl BlockingStack for TlsStack {
    type Session = TlsSession;
    type Connection = TlsConnection;
    type Request = TlsRequest;

    fn open_session(&self, user_agent: &str) -> Result<TlsSession, InitError> {
        let config = client_config(load_root_certs()?)?;
        Ok(TlsSession {
            config: Arc::new(config),
            user_agent: user_agent.to_owned(),
        })
    }

    fn connect(&self, session: &TlsSession, hostname: &str, port: u16) -> io::Result<TlsConnection> {
        let server_name = ServerName::try_from(hostname.to_owned())
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
        let addrs: Vec<SocketAddr> = (hostname, port).to_socket_addrs()?.collect();
        if addrs.is_empty() {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("no address found for {hostname}"),
            ));
        }
        Ok(TlsConnection {
            config: session.config.clone(),
            user_agent: session.user_agent.clone(),
            hostname: hostname.to_owned(),
            server_name,
            addrs,
        })
    }

    fn open_request(
        &self,
        connection: &mut TlsConnection,
        method: HttpMethod,
        path: &str,
    ) -> io::Result<TlsRequest> {
        let tls = ClientConnection::new(connection.config.clone(), connection.server_name.clone())
            .map_err(io::Error::other)?;
        Ok(TlsRequest {
            method,
            path: path.to_owned(),
            hostname: connection.hostname.clone(),
            user_agent: connection.user_agent.clone(),
            addrs: connection.addrs.clone(),
            tls: Some(tls),
            stream: None,
            status: None,
            body: None,
        })
    }

    fn send_request(&self, request: &mut TlsRequest, headers: &str, body: &[u8]) -> io::Result<()> {
        let tls = request.tls.take().ok_or_else(|| {
            io::Error::new(io::ErrorKind::AlreadyExists, "request was already sent")
        })?;
        let socket = TcpStream::connect(&request.addrs[..])?;
        socket.set_nodelay(true)?;
        let mut stream = StreamOwned::new(tls, socket);
        http1::write_request(
            &mut stream,
            request.method.as_str(),
            &request.path,
            &request.hostname,
            &request.user_agent,
            headers,
            body,
        )?;
        request.stream = Some(BufReader::new(stream));
        Ok(())
    }

    fn receive_response(&self, request: &mut TlsRequest) -> io::Result<()> {
        let head = http1::read_head(request.stream()?)?;
        request.status = Some(head.status);
        request.body = Some(BodyDecoder::new(head.framing));
        Ok(())
    }

    fn query_status_code(&self, request: &mut TlsRequest) -> io::Result<u16> {
        request
            .status
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotConnected, "no response received"))
    }

    fn query_data_available(&self, request: &mut TlsRequest) -> io::Result<usize> {
        let stream = request
            .stream
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotConnected, "request was not sent"))?;
        match request.body.as_mut() {
            Some(body) => body.available(stream),
            None => Err(io::Error::new(
                io::ErrorKind::NotConnected,
                "no response received",
            )),
        }
    }

    fn read_data(&self, request: &mut TlsRequest, buf: &mut [u8]) -> io::Result<usize> {
        let stream = request
            .stream
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotConnected, "request was not sent"))?;
        match request.body.as_mut() {
            Some(body) => body.read(stream, buf),
            None => Err(io::Error::new(
                io::ErrorKind::NotConnected,
                "no response received",
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::blocking::{BlockingBackend, HTTPS_PORT};
    use crate::backend::TransportBackend;
    use crate::completion::{Completion, Outcome};
    use crate::config::TransportConfig;
    use crate::error::{NativeOp, TransportError};
    use crate::{Request, Response};
    use rcgen::CertifiedKey;
    use rustls::pki_types::PrivatePkcs8KeyDer;
    use rustls::{ServerConfig, ServerConnection};
    use std::io::{BufRead, Read};
    use std::net::TcpListener;
    use std::sync::mpsc;
    use std::thread;

    fn session() -> TlsSession {
        TlsSession {
            config: Arc::new(client_config(RootCertStore::empty()).unwrap()),
            user_agent: "test".to_owned(),
        }
    }

    /// One-shot HTTPS server on a loopback port, trusted through `roots`.
    struct LocalServer {
        port: u16,
        roots: RootCertStore,
        served: thread::JoinHandle<String>,
    }

    impl LocalServer {
        /// Answer the first request with `response`, then close. Without
        /// `close_notify` the socket is dropped abruptly.
        fn start(response: &'static [u8], close_notify: bool) -> Self {
            let CertifiedKey { cert, key_pair } =
                rcgen::generate_simple_self_signed(vec!["localhost".to_owned()]).unwrap();
            let cert_der = cert.der().clone();
            let key = PrivatePkcs8KeyDer::from(key_pair.serialize_der());

            let mut roots = RootCertStore::empty();
            roots.add(cert_der.clone()).unwrap();
            let config = ServerConfig::builder_with_provider(Arc::new(
                rustls::crypto::ring::default_provider(),
            ))
            .with_safe_default_protocol_versions()
            .unwrap()
            .with_no_client_auth()
            .with_single_cert(vec![cert_der], key.into())
            .unwrap();

            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            let port = listener.local_addr().unwrap().port();
            let served = thread::spawn(move || {
                let (socket, _) = listener.accept().unwrap();
                let conn = ServerConnection::new(Arc::new(config)).unwrap();
                let mut stream = BufReader::new(StreamOwned::new(conn, socket));

                let mut received = String::new();
                let mut body_len = 0;
                loop {
                    let mut line = String::new();
                    let read = stream.read_line(&mut line).unwrap();
                    assert_ne!(read, 0, "closed before the end of the request head");
                    if let Some(len) = line.strip_prefix("Content-Length: ") {
                        body_len = len.trim().parse().unwrap();
                    }
                    received.push_str(&line);
                    if line == "\r\n" {
                        break;
                    }
                }
                let mut body = vec![0; body_len];
                stream.read_exact(&mut body).unwrap();
                received.push_str(std::str::from_utf8(&body).unwrap());

                let stream = stream.get_mut();
                stream.write_all(response).unwrap();
                if close_notify {
                    stream.conn.send_close_notify();
                }
                stream.flush().unwrap();
                received
            });
            Self {
                port,
                roots,
                served,
            }
        }

        fn stack(&self) -> LocalTls {
            LocalTls {
                port: self.port,
                roots: self.roots.clone(),
            }
        }

        fn received(self) -> String {
            self.served.join().unwrap()
        }
    }

    /// `TlsStack` trusting the local server and redirected to its port.
    struct LocalTls {
        port: u16,
        roots: RootCertStore,
    }

    impl BlockingStack for LocalTls {
        type Session = TlsSession;
        type Connection = TlsConnection;
        type Request = TlsRequest;

        fn open_session(&self, user_agent: &str) -> Result<TlsSession, InitError> {
            Ok(TlsSession {
                config: Arc::new(client_config(self.roots.clone())?),
                user_agent: user_agent.to_owned(),
            })
        }

        fn connect(
            &self,
            session: &TlsSession,
            hostname: &str,
            _port: u16,
        ) -> io::Result<TlsConnection> {
            TlsStack.connect(session, hostname, self.port)
        }

        fn open_request(
            &self,
            connection: &mut TlsConnection,
            method: HttpMethod,
            path: &str,
        ) -> io::Result<TlsRequest> {
            TlsStack.open_request(connection, method, path)
        }

        fn send_request(
            &self,
            request: &mut TlsRequest,
            headers: &str,
            body: &[u8],
        ) -> io::Result<()> {
            TlsStack.send_request(request, headers, body)
        }

        fn receive_response(&self, request: &mut TlsRequest) -> io::Result<()> {
            TlsStack.receive_response(request)
        }

        fn query_status_code(&self, request: &mut TlsRequest) -> io::Result<u16> {
            TlsStack.query_status_code(request)
        }

        fn query_data_available(&self, request: &mut TlsRequest) -> io::Result<usize> {
            TlsStack.query_data_available(request)
        }

        fn read_data(&self, request: &mut TlsRequest, buf: &mut [u8]) -> io::Result<usize> {
            TlsStack.read_data(request, buf)
        }
    }

    fn round_trip(server: &LocalServer, request: Request) -> Outcome {
        let mut backend = BlockingBackend::new(server.stack(), &TransportConfig::default());
        backend.init().unwrap();
        let (tx, rx) = mpsc::channel();
        let completion = Completion::new(move |outcome| tx.send(outcome).unwrap());
        let sent = backend.send(request, completion);
        let outcome = rx.try_recv().unwrap();
        assert_eq!(sent.is_ok(), outcome.is_ok());
        outcome
    }

    #[test]
    #[cfg_attr(miri, ignore)]
    fn post_over_local_tls_server() {
        let server = LocalServer::start(
            b"HTTP/1.1 202 Accepted\r\nContent-Length: 11\r\n\r\n{\"ok\":true}",
            true,
        );
        let request = Request::post("localhost", "/ingest", "{\"a\":1}")
            .with_header("Content-Type", "application/json")
            .with_header("Content-Length", "99");

        assert_eq!(
            round_trip(&server, request),
            Ok(Response::new(202, "{\"ok\":true}"))
        );

        let received = server.received();
        assert!(received.starts_with("POST /ingest HTTP/1.1\r\nHost: localhost\r\n"));
        assert_eq!(received.matches("Content-Length").count(), 1);
        assert!(received.contains("Content-Length: 7\r\n"));
        assert!(received.contains("Content-Type: application/json\r\n"));
        assert!(received.ends_with("\r\n\r\n{\"a\":1}"));
    }

    #[test]
    #[cfg_attr(miri, ignore)]
    fn close_delimited_body_without_close_notify() {
        let server = LocalServer::start(
            b"HTTP/1.1 200 OK\r\n\r\nuntil the socket closes",
            false,
        );

        assert_eq!(
            round_trip(&server, Request::get("localhost", "/status")),
            Ok(Response::new(200, "until the socket closes"))
        );
        assert!(server.received().starts_with("GET /status HTTP/1.1\r\n"));
    }

    #[test]
    #[cfg_attr(miri, ignore)]
    fn chunked_body_over_local_tls_server() {
        let server = LocalServer::start(
            b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n3\r\nabc\r\n2\r\nde\r\n0\r\n\r\n",
            true,
        );

        assert_eq!(
            round_trip(&server, Request::get("localhost", "/")),
            Ok(Response::new(200, "abcde"))
        );
        server.received();
    }

    #[test]
    #[cfg_attr(miri, ignore)]
    fn untrusted_certificate_fails_at_send() {
        let server = LocalServer::start(b"HTTP/1.1 200 OK\r\n\r\n", true);
        let stack = LocalTls {
            port: server.port,
            roots: RootCertStore::empty(),
        };
        let mut backend = BlockingBackend::new(stack, &TransportConfig::default());
        // An empty root store is accepted by the config builder.
        backend.init().unwrap();

        let (tx, rx) = mpsc::channel();
        let err = backend
            .send(
                Request::get("localhost", "/"),
                Completion::new(move |outcome| tx.send(outcome).unwrap()),
            )
            .unwrap_err();
        assert!(matches!(
            err,
            TransportError::NativeCall {
                op: NativeOp::SendRequest,
                ..
            }
        ));
        assert!(rx.try_recv().unwrap().is_err());
        // The server side sees the handshake fail.
        assert!(server.served.join().is_err());
    }

    #[test]
    fn connect_rejects_invalid_server_name() {
        let err = TlsStack
            .connect(&session(), "not a hostname", HTTPS_PORT)
            .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
    }

    #[test]
    fn request_is_not_readable_before_send() {
        let stack = TlsStack;
        let mut connection = stack.connect(&session(), "127.0.0.1", HTTPS_PORT).unwrap();
        let mut request = stack
            .open_request(&mut connection, HttpMethod::Get, "/")
            .unwrap();
        assert!(stack.receive_response(&mut request).is_err());
        assert!(stack.query_status_code(&mut request).is_err());
        assert!(stack.query_data_available(&mut request).is_err());
    }

    #[test]
    #[cfg_attr(miri, ignore)]
    fn send_to_closed_port_fails_at_send() {
        let stack = TlsStack;
        let mut connection = stack.connect(&session(), "127.0.0.1", 1).unwrap();
        let mut request = stack
            .open_request(&mut connection, HttpMethod::Get, "/")
            .unwrap();
        let err = stack.send_request(&mut request, "", b"").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::ConnectionRefused);
    }
}
