//! Frame Protocol
//!
//! Wire format for backend/map traffic: one JSON object per line.
//!
//! # Frame Shapes
//!
//! ```text
//! inbound   {"signal": "add-marker", "args": [10.0, 20.0, "ONUNode", "m1", "icon.png"]}
//!           {"reply": 7, "value": 100}
//!           {"interaction": {"kind": "click", "position": {...}, "layer": 3}}
//! outbound  {"call": "map-click", "args": [1.0, 2.0]}
//!           {"call": "get-bandwidth", "seq": 7, "args": ["m1"]}
//! ```
//!
//! Signal payloads are positional, exactly as the backend emits them. Arity
//! and argument types are checked here so the controller only ever sees
//! well-formed signals.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;

use crate::events::{BackendSignal, SurfaceInteraction};
use crate::geo::LatLng;
use crate::messages::{BackendCall, EntityId};

/// Maximum line size (1 MB)
pub const MAX_LINE_SIZE: usize = 1024 * 1024;

/// Wire name of the bandwidth query
pub const GET_BANDWIDTH: &str = "get-bandwidth";

/// Frame decoding errors
#[derive(Debug, Error)]
pub enum WireError {
    /// Line is not valid JSON or has no recognizable shape
    #[error("Malformed frame: {0}")]
    Json(#[from] serde_json::Error),

    /// Line exceeds [`MAX_LINE_SIZE`]
    #[error("Frame too large: {size} bytes (max: {max})")]
    TooLarge {
        /// Actual size
        size: usize,
        /// Allowed size
        max: usize,
    },

    /// Signal name is not part of the protocol
    #[error("Unknown signal: {0}")]
    UnknownSignal(String),

    /// Wrong number of positional arguments
    #[error("Signal {signal} expects {expected} arguments, got {actual}")]
    Arity {
        /// Signal name
        signal: &'static str,
        /// Expected argument count
        expected: usize,
        /// Received argument count
        actual: usize,
    },

    /// Positional argument has the wrong JSON type
    #[error("Argument {index} of {signal} must be {expected}")]
    ArgumentType {
        /// Signal name
        signal: &'static str,
        /// Zero-based argument position
        index: usize,
        /// Expected type
        expected: &'static str,
    },
}

/// A decoded inbound line
#[derive(Clone, Debug, PartialEq)]
pub enum InboundFrame {
    /// Backend signal
    Signal(BackendSignal),
    /// Answer to a query; `None` means the backend had no value
    Reply {
        /// Sequence number of the query
        seq: u64,
        /// Returned value
        value: Option<f64>,
    },
    /// Interaction reported by a headless surface driver
    Interaction(SurfaceInteraction),
}

/// A line to send to the backend
#[derive(Clone, Debug, PartialEq)]
pub enum OutboundFrame {
    /// Fire-and-forget call
    Call(BackendCall),
    /// Bandwidth query awaiting a reply with the same `seq`
    Query {
        /// Correlation number
        seq: u64,
        /// Node being queried
        id: EntityId,
    },
}

impl From<BackendCall> for OutboundFrame {
    fn from(call: BackendCall) -> Self {
        Self::Call(call)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawInbound {
    Signal {
        signal: String,
        #[serde(default)]
        args: Vec<Value>,
    },
    Reply {
        reply: u64,
        value: Option<f64>,
    },
    Interaction {
        interaction: SurfaceInteraction,
    },
}

#[derive(Serialize)]
struct RawOutbound<'a> {
    call: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    seq: Option<u64>,
    args: Vec<Value>,
}

/// Encode an outbound frame as a single line (no trailing newline)
pub fn encode(frame: &OutboundFrame) -> Result<String, WireError> {
    let raw = match frame {
        OutboundFrame::Call(call) => RawOutbound {
            call: call.name(),
            seq: None,
            args: call_args(call),
        },
        OutboundFrame::Query { seq, id } => RawOutbound {
            call: GET_BANDWIDTH,
            seq: Some(*seq),
            args: vec![json!(id.as_str())],
        },
    };
    Ok(serde_json::to_string(&raw)?)
}

fn call_args(call: &BackendCall) -> Vec<Value> {
    match call {
        BackendCall::MapClick { position } => vec![json!(position.lat), json!(position.lng)],
        BackendCall::MarkerClick { id } | BackendCall::RemoveComponent { id } => {
            vec![json!(id.as_str())]
        }
        BackendCall::Log { message } => vec![json!(message)],
    }
}

/// Decode one inbound line
pub fn decode_inbound(line: &str) -> Result<InboundFrame, WireError> {
    if line.len() > MAX_LINE_SIZE {
        return Err(WireError::TooLarge {
            size: line.len(),
            max: MAX_LINE_SIZE,
        });
    }

    match serde_json::from_str::<RawInbound>(line)? {
        RawInbound::Signal { signal, args } => decode_signal(&signal, &args).map(InboundFrame::Signal),
        RawInbound::Reply { reply, value } => Ok(InboundFrame::Reply { seq: reply, value }),
        RawInbound::Interaction { interaction } => Ok(InboundFrame::Interaction(interaction)),
    }
}

/// Build a signal from its wire name and positional arguments
pub fn decode_signal(name: &str, args: &[Value]) -> Result<BackendSignal, WireError> {
    let signal = match name {
        "add-marker" => {
            let a = Args::expect("add-marker", args, 5)?;
            BackendSignal::AddMarker {
                position: LatLng::new(a.number(0)?, a.number(1)?),
                component_type: a.string(2)?,
                id: a.id(3)?,
                icon_ref: a.string(4)?,
            }
        }
        "add-connection" => {
            let a = Args::expect("add-connection", args, 6)?;
            BackendSignal::AddConnection {
                from: LatLng::new(a.number(0)?, a.number(1)?),
                to: LatLng::new(a.number(2)?, a.number(3)?),
                id: a.id(4)?,
                color: a.string(5)?,
            }
        }
        "highlight-connections" => {
            let a = Args::expect("highlight-connections", args, 3)?;
            BackendSignal::HighlightConnections {
                ids_csv: a.string(0)?,
                highlight_color: a.string(1)?,
                normal_color: a.string(2)?,
            }
        }
        "recolor-connection" => {
            let a = Args::expect("recolor-connection", args, 2)?;
            BackendSignal::RecolorConnection {
                id: a.id(0)?,
                color: a.string(1)?,
            }
        }
        "clean-map" => {
            Args::expect("clean-map", args, 0)?;
            BackendSignal::CleanMap
        }
        // The value may be omitted when the host reads it from shared state
        "selected-type-changed" => match args {
            [] => BackendSignal::SelectedTypeChanged {
                selected_type: None,
            },
            _ => {
                let a = Args::expect("selected-type-changed", args, 1)?;
                BackendSignal::SelectedTypeChanged {
                    selected_type: a.optional_string(0)?,
                }
            }
        },
        other => return Err(WireError::UnknownSignal(other.to_string())),
    };
    Ok(signal)
}

/// Positional argument reader for one signal
struct Args<'a> {
    signal: &'static str,
    values: &'a [Value],
}

impl<'a> Args<'a> {
    fn expect(signal: &'static str, values: &'a [Value], expected: usize) -> Result<Self, WireError> {
        if values.len() != expected {
            return Err(WireError::Arity {
                signal,
                expected,
                actual: values.len(),
            });
        }
        Ok(Self { signal, values })
    }

    fn mismatch(&self, index: usize, expected: &'static str) -> WireError {
        WireError::ArgumentType {
            signal: self.signal,
            index,
            expected,
        }
    }

    fn number(&self, index: usize) -> Result<f64, WireError> {
        self.values[index]
            .as_f64()
            .ok_or_else(|| self.mismatch(index, "a number"))
    }

    fn string(&self, index: usize) -> Result<String, WireError> {
        self.values[index]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| self.mismatch(index, "a string"))
    }

    fn optional_string(&self, index: usize) -> Result<Option<String>, WireError> {
        match &self.values[index] {
            Value::Null => Ok(None),
            Value::String(s) => Ok(Some(s.clone())),
            _ => Err(self.mismatch(index, "a string or null")),
        }
    }

    /// Identifiers may arrive as strings or integers
    fn id(&self, index: usize) -> Result<EntityId, WireError> {
        match &self.values[index] {
            Value::String(s) => Ok(EntityId::new(s.as_str())),
            Value::Number(n) if n.is_i64() || n.is_u64() => Ok(EntityId::new(n.to_string())),
            _ => Err(self.mismatch(index, "an identifier")),
        }
    }
}
