//! Channel abstraction over the remote endpoint.
//!
//! A [`Channel`] is the RPC seam: it carries one serialised envelope to the
//! service and returns the serialised response. [`ChannelGuard`] owns a
//! channel and releases it exactly once, on drop at the latest.

use crate::config::ServiceBinding;
use crate::credential::TransportCredential;
use crate::error::{BoxError, HiError};
use crate::parser::SoapFault;
use reqwest::Url;
use thiserror::Error;
use tracing::{debug, warn};

/// Lifecycle state of a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    Created,
    Opened,
    Closed,
    /// A transport failure left the channel unusable
    Faulted,
}

/// Failure raised by a channel invocation.
#[derive(Error, Debug)]
pub enum ChannelError {
    /// The service answered with a SOAP fault.
    #[error("SOAP fault {0}")]
    Fault(SoapFault),

    /// Network or protocol failure.
    #[error("{message}")]
    Transport {
        message: String,
        #[source]
        source: BoxError,
    },
}

impl ChannelError {
    pub fn transport(message: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::Transport {
            message: message.into(),
            source: source.into(),
        }
    }
}

/// An open connection to the service endpoint.
pub trait Channel {
    fn state(&self) -> ChannelState;

    fn open(&mut self) -> Result<(), ChannelError>;

    /// Send one envelope for `action` and return the response envelope.
    fn invoke(&mut self, action: &str, envelope: &str) -> Result<String, ChannelError>;

    /// Close gracefully.
    fn close(&mut self) -> Result<(), ChannelError>;

    /// Abandon the channel without a graceful close. Must not fail.
    fn abort(&mut self);
}

/// Creates channels for clients.
pub trait ChannelFactory {
    type Channel: Channel;

    /// Channel for an explicit endpoint and binding.
    fn create(
        &self,
        endpoint: &Url,
        binding: &ServiceBinding,
        tls: &TransportCredential,
    ) -> Result<Self::Channel, HiError>;

    /// Channel for a named profile; endpoint and binding are resolved by the factory.
    fn create_for_profile(
        &self,
        profile: &str,
        tls: &TransportCredential,
    ) -> Result<Self::Channel, HiError>;
}

/// Owns a channel and guarantees it is released once.
#[derive(Debug)]
pub struct ChannelGuard<C: Channel> {
    channel: C,
    disposed: bool,
}

impl<C: Channel> ChannelGuard<C> {
    pub fn new(channel: C) -> Self {
        Self {
            channel,
            disposed: false,
        }
    }

    pub fn channel(&self) -> &C {
        &self.channel
    }

    pub fn channel_mut(&mut self) -> &mut C {
        &mut self.channel
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// Release the channel. Idempotent and infallible.
    ///
    /// Open channels are closed; faulted channels are aborted, never closed.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;

        match self.channel.state() {
            ChannelState::Created | ChannelState::Opened => {
                if let Err(e) = self.channel.close() {
                    warn!(error = %e, "Channel close failed, aborting");
                    self.channel.abort();
                }
            }
            ChannelState::Faulted => {
                debug!("Channel faulted, aborting");
                self.channel.abort();
            }
            ChannelState::Closed => {}
        }
    }
}

impl<C: Channel> Drop for ChannelGuard<C> {
    fn drop(&mut self) {
        self.dispose();
    }
}
