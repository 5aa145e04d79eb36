//! # Network Module
//!
//! This module provides the request-reply link to the simulator bridge over ZMQ, the networking
//! library chosen for the software. Requests and responses are exchanged as JSON strings, one
//! response per request.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::trace;
use serde::{Serialize, Deserialize, de::DeserializeOwned};
use zmq::{Socket, Context};

// Export zmq
pub use zmq;

// ------------------------------------------------------------------------------------------------
// MACROS
// ------------------------------------------------------------------------------------------------

macro_rules! set_sockopts {
    ($socket:expr, $(($opt:ident, $val:expr)),+) => {
        $(
            $socket.$opt($val)
                .map_err(|e| SimLinkError::SocketOptionError(stringify!($opt).into(), e))?;
        )+
    };
}

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Network parameters, loaded from `net.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetParams {
    /// Endpoint of the bridge's flight and race server
    pub control_endpoint: String,

    /// Endpoint of the bridge's gate detector server
    pub perception_endpoint: String,

    /// Options for both links
    pub link: LinkOptions,

    /// Receive timeout in milliseconds for requests which only complete once the vehicle has
    /// finished moving, such as takeoff
    pub blocking_timeout: i32,
}

/// Options applied to the socket of a [`SimLink`].
///
/// Values are in milliseconds and correspond to those found in the
/// [`zmq_setsockopt`](http://api.zeromq.org/4-2:zmq-setsockopt) documentation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct LinkOptions {
    /// `ZMQ_CONNECT_TIMEOUT`
    pub connect_timeout: i32,

    /// `ZMQ_RCVTIMEO`: Maximum time before a recv operation returns with `EAGAIN`
    pub recv_timeout: i32,

    /// `ZMQ_SNDTIMEO`: Maximum time before a send operation returns with `EAGAIN`
    pub send_timeout: i32,

    /// `ZMQ_LINGER`
    pub linger: i32,
}

/// A request-reply link to one server of the simulator bridge.
///
/// The link is a ZMQ `REQ` socket with relaxed and correlated request-reply alternation, so a
/// request that timed out doesn't leave the socket unusable. Sockets are not thread safe, a
/// thread that needs to talk to the bridge must own its own link.
pub struct SimLink {
    socket: Socket,

    endpoint: String,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(thiserror::Error, Debug)]
pub enum SimLinkError {
    #[error("Error creating the socket: {0}")]
    CreateSocketError(zmq::Error),

    #[error("Could not set the {0} socket option: {1}")]
    SocketOptionError(String, zmq::Error),

    #[error("Could not connect the socket to {0}: {1}")]
    CouldNotConnect(String, zmq::Error),

    #[error("Could not serialize the request: {0}")]
    SerializationError(serde_json::Error),

    #[error("Could not send the request: {0}")]
    SendError(zmq::Error),

    #[error("No response from the server before the timeout expired")]
    Timeout,

    #[error("Could not recieve the response: {0}")]
    RecvError(zmq::Error),

    #[error("The server responded with a message which was not valid UTF-8")]
    NonUtf8Response,

    #[error("Could not deserialize the response from the server: {0}")]
    DeserializeError(serde_json::Error),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl SimLink {
    /// Connect a new link to the given endpoint, such as `"tcp://localhost:5555"`.
    ///
    /// ZMQ connections are asynchronous, a server that isn't running yet is only detected when the
    /// first request times out.
    pub fn connect(
        ctx: &Context,
        endpoint: &str,
        options: &LinkOptions
    ) -> Result<Self, SimLinkError> {
        let socket = ctx.socket(zmq::REQ)
            .map_err(SimLinkError::CreateSocketError)?;

        set_sockopts!(
            socket,
            (set_connect_timeout, options.connect_timeout),
            (set_rcvtimeo, options.recv_timeout),
            (set_sndtimeo, options.send_timeout),
            (set_linger, options.linger),
            (set_req_correlate, true),
            (set_req_relaxed, true)
        );

        socket.connect(endpoint)
            .map_err(|e| SimLinkError::CouldNotConnect(endpoint.into(), e))?;

        Ok(Self {
            socket,
            endpoint: endpoint.into()
        })
    }

    /// Send a request and wait for the server's response.
    pub fn request<Req, Rep>(&self, request: &Req) -> Result<Rep, SimLinkError>
    where
        Req: Serialize,
        Rep: DeserializeOwned
    {
        let request_str = serde_json::to_string(request)
            .map_err(SimLinkError::SerializationError)?;

        trace!("{} <- {}", self.endpoint, request_str);

        self.socket.send(&request_str, 0)
            .map_err(|e| match e {
                zmq::Error::EAGAIN => SimLinkError::Timeout,
                e => SimLinkError::SendError(e)
            })?;

        let response_str = match self.socket.recv_string(0) {
            Ok(Ok(s)) => s,
            Ok(Err(_)) => return Err(SimLinkError::NonUtf8Response),
            Err(zmq::Error::EAGAIN) => return Err(SimLinkError::Timeout),
            Err(e) => return Err(SimLinkError::RecvError(e))
        };

        trace!("{} -> {}", self.endpoint, response_str);

        serde_json::from_str(&response_str)
            .map_err(SimLinkError::DeserializeError)
    }

    /// Send a request with a different receive timeout to the one the link was connected with.
    ///
    /// The link's own timeout is restored afterwards, whether the request succeeded or not.
    pub fn request_with_timeout<Req, Rep>(
        &self,
        request: &Req,
        recv_timeout: i32
    ) -> Result<Rep, SimLinkError>
    where
        Req: Serialize,
        Rep: DeserializeOwned
    {
        let default_timeout = self.socket.get_rcvtimeo()
            .map_err(|e| SimLinkError::SocketOptionError("get_rcvtimeo".into(), e))?;

        set_sockopts!(self.socket, (set_rcvtimeo, recv_timeout));
        let response = self.request(request);
        set_sockopts!(self.socket, (set_rcvtimeo, default_timeout));

        response
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl Default for LinkOptions {
    fn default() -> Self {
        Self {
            connect_timeout: 1000,
            recv_timeout: 1000,
            send_timeout: 100,
            linger: 1,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::thread;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    enum Echo {
        Ping(u32),
        Pong(u32),
    }

    #[test]
    fn test_request_reply() {
        let ctx = Context::new();
        let endpoint = "inproc://test_sim_link";

        let server = ctx.socket(zmq::REP).unwrap();
        server.bind(endpoint).unwrap();

        let jh = thread::spawn(move || {
            let msg = server.recv_string(0).unwrap().unwrap();
            let req: Echo = serde_json::from_str(&msg).unwrap();
            let rep = match req {
                Echo::Ping(n) => Echo::Pong(n + 1),
                other => other,
            };
            server.send(&serde_json::to_string(&rep).unwrap(), 0).unwrap();
        });

        let link = SimLink::connect(&ctx, endpoint, &LinkOptions::default()).unwrap();
        let rep: Echo = link.request(&Echo::Ping(41)).unwrap();

        assert_eq!(rep, Echo::Pong(42));
        jh.join().unwrap();
    }

    #[test]
    fn test_timeout() {
        let ctx = Context::new();
        let endpoint = "inproc://test_sim_link_timeout";

        // Server binds but never answers
        let server = ctx.socket(zmq::REP).unwrap();
        server.bind(endpoint).unwrap();

        let options = LinkOptions {
            recv_timeout: 50,
            ..Default::default()
        };
        let link = SimLink::connect(&ctx, endpoint, &options).unwrap();

        match link.request::<Echo, Echo>(&Echo::Ping(0)) {
            Err(SimLinkError::Timeout) => (),
            r => panic!("Expected a timeout, got {:?}", r),
        }

        match link.request_with_timeout::<Echo, Echo>(&Echo::Ping(1), 20) {
            Err(SimLinkError::Timeout) => (),
            r => panic!("Expected a timeout, got {:?}", r),
        }
        assert_eq!(link.socket.get_rcvtimeo().unwrap(), 50);
    }
}
