//! Promise-style settlement of backchannel calls.

use crate::registry::channel::ChannelKey;
use crate::rpc::error::CallError;
use futures::channel::oneshot;
use serde_json::Value;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

/// Future returned by [`crate::RpcClient::call_async`].
///
/// Dispatch already happened when this value exists. It resolves with the
/// value the host delivers, fails immediately when the name did not resolve,
/// and fails with [`CallError::Cancelled`] when its channel is released.
/// Without delivery or cancellation it stays pending.
#[must_use = "a pending call does nothing unless awaited"]
pub struct PendingCall {
    state: PendingState,
}

enum PendingState {
    Failed(CallError),
    Waiting {
        channel: ChannelKey,
        receiver: oneshot::Receiver<Value>,
    },
    Done,
}

impl PendingCall {
    pub(crate) fn failed(err: CallError) -> Self {
        Self {
            state: PendingState::Failed(err),
        }
    }

    pub(crate) fn waiting(channel: ChannelKey, receiver: oneshot::Receiver<Value>) -> Self {
        Self {
            state: PendingState::Waiting { channel, receiver },
        }
    }

    /// Channel carrying the answer, while one is awaited.
    pub fn channel(&self) -> Option<ChannelKey> {
        match &self.state {
            PendingState::Waiting { channel, .. } => Some(*channel),
            _ => None,
        }
    }
}

impl Future for PendingCall {
    type Output = Result<Value, CallError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        match std::mem::replace(&mut this.state, PendingState::Done) {
            PendingState::Failed(err) => Poll::Ready(Err(err)),
            PendingState::Waiting {
                channel,
                mut receiver,
            } => match Pin::new(&mut receiver).poll(cx) {
                Poll::Ready(Ok(value)) => Poll::Ready(Ok(value)),
                Poll::Ready(Err(oneshot::Canceled)) => {
                    Poll::Ready(Err(CallError::Cancelled(channel)))
                }
                Poll::Pending => {
                    this.state = PendingState::Waiting { channel, receiver };
                    Poll::Pending
                }
            },
            PendingState::Done => panic!("PendingCall polled after completion"),
        }
    }
}
