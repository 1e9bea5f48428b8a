//! Transport seam
//!
//! The remote call itself is an external collaborator. [`Transport`] carries
//! typed envelopes; [`JsonTransport`] adapts any string-in/string-out
//! [`JsonChannel`] (HTTP, IPC, a host bridge) through the wire codec.

use crate::error::{Error, Result};
use async_trait::async_trait;
use holons_wire::{decode_response, encode_request, DanceRequest, DanceResponse};
use std::sync::Arc;

/// Delivers one dance request and returns the server's response
#[async_trait]
pub trait Transport: Send + Sync {
    /// Perform the remote call
    async fn call(&self, request: DanceRequest) -> Result<DanceResponse>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn call(&self, request: DanceRequest) -> Result<DanceResponse> {
        (**self).call(request).await
    }
}

/// A channel that exchanges encoded envelopes
#[async_trait]
pub trait JsonChannel: Send + Sync {
    /// Send an encoded request, receive an encoded response
    async fn exchange(&self, request: String) -> Result<String>;
}

#[async_trait]
impl<C: JsonChannel + ?Sized> JsonChannel for Arc<C> {
    async fn exchange(&self, request: String) -> Result<String> {
        (**self).exchange(request).await
    }
}

/// [`Transport`] over a [`JsonChannel`]
pub struct JsonTransport<C> {
    channel: C,
}

impl<C: JsonChannel> JsonTransport<C> {
    /// Wrap `channel`
    pub fn new(channel: C) -> Self {
        JsonTransport { channel }
    }

    /// The wrapped channel
    pub fn channel(&self) -> &C {
        &self.channel
    }
}

#[async_trait]
impl<C: JsonChannel> Transport for JsonTransport<C> {
    async fn call(&self, request: DanceRequest) -> Result<DanceResponse> {
        let encoded = encode_request(&request)?;
        let reply = self.channel.exchange(encoded).await?;
        decode_response(&reply).map_err(Error::from)
    }
}
