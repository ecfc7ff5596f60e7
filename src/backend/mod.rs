//! # Backend Module
//!
//! Owns everything that talks to the gRPC Greeter service: the protocol
//! stubs, the pooled connection, and the `GreeterBackend` trait that the
//! four bridges program against.
//!
//! The trait seam exists so bridges hold an `Arc<dyn GreeterBackend>`
//! instead of a concrete tonic client: production wires in the pooled
//! channel, tests wire in mocks that record calls and cancellation.

pub mod connection;
pub mod greeter;

use std::pin::Pin;
use std::task::{Context, Poll};

use async_trait::async_trait;
use futures::Stream;
use tonic::transport::Channel;
use tonic::Status;

pub use connection::{BackendConnection, GrpcBackend};
pub use greeter::{greeter_client::GreeterClient, HelloReply, HelloRequest};

/// Stream of replies from the backend, as produced by the server-stream
/// and bidirectional call shapes.
pub type ReplyStream = Pin<Box<dyn Stream<Item = Result<HelloReply, Status>> + Send>>;

/// Stream of requests to the backend, as consumed by the client-stream
/// and bidirectional call shapes.
pub type RequestStream = Pin<Box<dyn Stream<Item = HelloRequest> + Send>>;

/// The four gRPC call shapes of the Greeter service.
///
/// Cancellation contract: dropping a returned `ReplyStream` (or the
/// future of an in-flight call) must cancel the underlying RPC so the
/// backend stops producing. The tonic implementation gets this for free
/// from HTTP/2 stream reset; mock implementations record it explicitly.
#[async_trait]
pub trait GreeterBackend: Send + Sync {
    /// Unary: one request, one reply.
    async fn say_hello(&self, request: HelloRequest) -> Result<HelloReply, Status>;

    /// Server streaming: one request, a stream of replies.
    async fn say_hello_server_stream(
        &self,
        request: HelloRequest,
    ) -> Result<ReplyStream, Status>;

    /// Client streaming: a stream of requests, one aggregated reply.
    async fn say_hello_client_stream(
        &self,
        requests: RequestStream,
    ) -> Result<HelloReply, Status>;

    /// Bidirectional streaming: both sides stream independently.
    async fn say_hello_bidirectional(
        &self,
        requests: RequestStream,
    ) -> Result<ReplyStream, Status>;
}

/// Nominal wrapper handed to tonic's generic streaming calls.
///
/// The generated client takes `impl IntoStreamingRequest`; handing it
/// the boxed `RequestStream` trait object directly trips a
/// higher-ranked lifetime error inside the async trait expansion, so
/// the outbound stream crosses that boundary under a named type.
struct OutboundRequests(RequestStream);

impl Stream for OutboundRequests {
    type Item = HelloRequest;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.get_mut().0.as_mut().poll_next(cx)
    }
}

#[async_trait]
impl GreeterBackend for GrpcBackend {
    async fn say_hello(&self, request: HelloRequest) -> Result<HelloReply, Status> {
        let mut client = self.client();
        let response = client.say_hello(request).await?;
        Ok(response.into_inner())
    }

    async fn say_hello_server_stream(
        &self,
        request: HelloRequest,
    ) -> Result<ReplyStream, Status> {
        let mut client = self.client();
        let response = client.say_hello_server_stream(request).await?;
        Ok(Box::pin(response.into_inner()))
    }

    async fn say_hello_client_stream(
        &self,
        requests: RequestStream,
    ) -> Result<HelloReply, Status> {
        let mut client = self.client();
        let response = client
            .say_hello_client_stream(OutboundRequests(requests))
            .await?;
        Ok(response.into_inner())
    }

    async fn say_hello_bidirectional(
        &self,
        requests: RequestStream,
    ) -> Result<ReplyStream, Status> {
        let mut client = self.client();
        let response = client
            .say_hello_bidirectional(OutboundRequests(requests))
            .await?;
        Ok(Box::pin(response.into_inner()))
    }
}

impl GrpcBackend {
    /// Build a fresh stub over the shared channel with the configured
    /// message size caps. Cloning a `Channel` is cheap; the underlying
    /// connection multiplexes all in-flight streams.
    fn client(&self) -> GreeterClient<Channel> {
        GreeterClient::new(self.channel())
            .max_decoding_message_size(self.max_message_size())
            .max_encoding_message_size(self.max_message_size())
    }
}
