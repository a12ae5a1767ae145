//! Inbound and outbound wire event type definitions.
//!
//! Every event is a tagged variant of a closed enum rather than a free-form
//! name/payload pair, so the protocol is exhaustively checkable. The serde
//! renames reproduce the event names the Shrimple web client speaks.
//!
//! Signaling payloads (`signal_data`, `candidate`, answers) are opaque
//! blobs: the relay forwards them without inspecting their contents.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use shrimple_core::types::id::UserId;

/// Events sent by a client to the server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum ClientEvent {
    /// Initiate a call to another user, carrying the WebRTC offer.
    #[serde(rename = "callUser")]
    CallUser {
        /// Callee identity.
        #[serde(rename = "userToCall")]
        user_to_call: UserId,
        /// Opaque offer description.
        #[serde(rename = "signalData")]
        signal_data: Value,
        /// Caller identity as claimed by the client. The bound connection
        /// identity is authoritative; this field is kept for wire
        /// compatibility only.
        from: UserId,
        /// Caller display name, echoed to the callee.
        name: String,
        /// Whether the call carries video.
        #[serde(rename = "isVideo")]
        is_video: bool,
    },
    /// Accept a ringing call, carrying the WebRTC answer.
    #[serde(rename = "answerCall")]
    AnswerCall {
        /// Opaque answer description.
        signal: Value,
        /// The caller being answered.
        to: UserId,
    },
    /// Forward an ICE candidate to the other call party.
    #[serde(rename = "ice-candidate")]
    IceCandidate {
        /// Opaque candidate blob.
        candidate: Value,
        /// The other party.
        to: UserId,
    },
    /// Hang up, cancel, or reject a call.
    #[serde(rename = "endCall")]
    EndCall {
        /// The other party.
        to: UserId,
    },
}

/// Events sent by the server to a client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum ServerEvent {
    /// Full presence snapshot, sent on every connect and disconnect.
    #[serde(rename = "getOnlineUsers")]
    OnlineUsers(Vec<UserId>),
    /// A chat message pushed on behalf of the persistence layer. The
    /// message object is opaque to the realtime core.
    #[serde(rename = "newMessage")]
    NewMessage(Value),
    /// Incoming call notification to the callee.
    #[serde(rename = "callUser")]
    IncomingCall {
        /// Opaque offer description.
        signal: Value,
        /// Caller identity.
        from: UserId,
        /// Caller display name.
        name: String,
        /// Whether the call carries video.
        #[serde(rename = "isVideo")]
        is_video: bool,
    },
    /// The callee is unreachable; no call session was created.
    #[serde(rename = "callUserOffline")]
    CallUserOffline {
        /// The unreachable callee.
        #[serde(rename = "userId")]
        user_id: UserId,
    },
    /// Relayed answer to the caller.
    #[serde(rename = "callAccepted")]
    CallAccepted(Value),
    /// Relayed ICE candidate.
    #[serde(rename = "ice-candidate")]
    IceCandidate(Value),
    /// The call was terminated (hung up, rejected, timed out, or the other
    /// party disconnected).
    #[serde(rename = "endCall")]
    EndCall,
    /// A client-visible error for a dropped inbound event.
    #[serde(rename = "error")]
    Error {
        /// Stable error code.
        code: String,
        /// Human-readable description.
        message: String,
    },
}
