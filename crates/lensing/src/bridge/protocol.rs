//! Wire types for the command layer.
//!
//! A request is decoded once, at the boundary, into the closed [`Request`]
//! enum; everything past that point matches on variants instead of method
//! strings.

use glam::DVec3;
use serde::{Deserialize, Serialize};

use crate::error::{ErrorCode, RenderError};
use crate::types::{CameraParams, RendererHandle};

/// Method names accepted on the wire, in declaration order of [`Request`].
pub const METHODS: [&str; 5] = ["create", "setBackground", "render", "dispose", "probe"];

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(
    tag = "method",
    content = "args",
    rename_all = "camelCase",
    rename_all_fields = "camelCase"
)]
pub enum Request {
    Create {
        width: i64,
        height: i64,
    },
    SetBackground {
        handle: RendererHandle,
        width: i64,
        height: i64,
        rgba: Vec<u8>,
    },
    Render(RenderArgs),
    Dispose {
        handle: RendererHandle,
    },
    /// Reports whether a compute-capable GPU is reachable.
    Probe,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderArgs {
    pub handle: RendererHandle,
    pub pos: [f64; 3],
    pub target: [f64; 3],
    pub up: [f64; 3],
    pub fov_y: f64,
    pub r_s: f64,
    pub cube_half_size: f64,
    pub max_steps: i64,
    pub d_lambda: f64,
    pub width: i64,
    pub height: i64,
}

#[derive(Deserialize)]
struct Envelope {
    method: String,
}

impl Request {
    /// Decodes one JSON request. Unknown methods map to `not_implemented`,
    /// anything else that fails to parse to `bad_args`.
    pub fn decode(payload: &str) -> Result<Self, BridgeError> {
        serde_json::from_str(payload).map_err(|err| {
            match serde_json::from_str::<Envelope>(payload) {
                Ok(envelope) if !METHODS.contains(&envelope.method.as_str()) => BridgeError {
                    code: ErrorCode::NotImplemented,
                    message: format!("unknown method '{}'", envelope.method),
                },
                _ => BridgeError {
                    code: ErrorCode::BadArgs,
                    message: format!("malformed request: {err}"),
                },
            }
        })
    }

    pub fn method(&self) -> &'static str {
        match self {
            Request::Create { .. } => METHODS[0],
            Request::SetBackground { .. } => METHODS[1],
            Request::Render(_) => METHODS[2],
            Request::Dispose { .. } => METHODS[3],
            Request::Probe => METHODS[4],
        }
    }
}

impl RenderArgs {
    /// Validated camera parameters for the uniform builder.
    pub fn camera(&self) -> Result<CameraParams, RenderError> {
        let max_steps = u32::try_from(self.max_steps)
            .ok()
            .filter(|steps| *steps > 0)
            .ok_or_else(|| {
                RenderError::invalid(format!("maxSteps must be positive, got {}", self.max_steps))
            })?;
        let camera = CameraParams {
            position: DVec3::from_array(self.pos),
            look_target: DVec3::from_array(self.target),
            up_hint: DVec3::from_array(self.up),
            fov_y: self.fov_y,
            r_s: self.r_s,
            cube_half_size: self.cube_half_size,
            max_steps,
            d_lambda: self.d_lambda,
        };
        if !camera.is_finite() {
            return Err(RenderError::invalid("camera parameters must be finite"));
        }
        Ok(camera)
    }

    pub fn extent(&self) -> Result<(u32, u32), RenderError> {
        surface_extent(self.width, self.height)
    }
}

/// Converts caller-supplied dimensions, rejecting zero, negative and
/// out-of-range values before they reach the surface manager.
pub fn surface_extent(width: i64, height: i64) -> Result<(u32, u32), RenderError> {
    let convert = |value: i64| u32::try_from(value).ok().filter(|value| *value > 0);
    match (convert(width), convert(height)) {
        (Some(width), Some(height)) => Ok((width, height)),
        _ => Err(RenderError::invalid(format!(
            "surface dimensions must be positive, got {width}x{height}"
        ))),
    }
}

/// Structured failure returned for a request.
#[derive(Debug, Clone, PartialEq, Serialize, thiserror::Error)]
#[error("{code}: {message}")]
pub struct BridgeError {
    pub code: ErrorCode,
    pub message: String,
}

impl From<RenderError> for BridgeError {
    fn from(err: RenderError) -> Self {
        Self {
            code: err.code(),
            message: err.to_string(),
        }
    }
}

/// Success payload of a request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Reply {
    Handle(RendererHandle),
    Available(bool),
    Unit,
}

/// Serialises as `{"ok": ...}` or `{"error": {"code": ..., "message": ...}}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Response {
    Ok(Reply),
    Error(BridgeError),
}

impl From<Result<Reply, BridgeError>> for Response {
    fn from(result: Result<Reply, BridgeError>) -> Self {
        match result {
            Ok(reply) => Response::Ok(reply),
            Err(err) => Response::Error(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RENDER: &str = r#"{
        "method": "render",
        "args": {
            "handle": 3,
            "pos": [0.0, 0.0, 5.0],
            "target": [0.0, 0.0, 0.0],
            "up": [0.0, 1.0, 0.0],
            "fovY": 1.0,
            "rS": 1.0,
            "cubeHalfSize": 10.0,
            "maxSteps": 200,
            "dLambda": 0.05,
            "width": 256,
            "height": 256
        }
    }"#;

    #[test]
    fn decodes_every_method() {
        let create = Request::decode(r#"{"method":"create","args":{"width":256,"height":128}}"#);
        assert_eq!(
            create.unwrap(),
            Request::Create {
                width: 256,
                height: 128
            }
        );

        let background = Request::decode(
            r#"{"method":"setBackground","args":{"handle":1,"width":1,"height":1,"rgba":[1,2,3,4]}}"#,
        )
        .unwrap();
        assert_eq!(background.method(), "setBackground");

        let Request::Render(args) = Request::decode(RENDER).unwrap() else {
            panic!("expected render request");
        };
        assert_eq!(args.handle, RendererHandle(3));
        assert_eq!(args.max_steps, 200);
        assert!((args.d_lambda - 0.05).abs() < 1e-12);

        let dispose = Request::decode(r#"{"method":"dispose","args":{"handle":3}}"#).unwrap();
        assert_eq!(
            dispose,
            Request::Dispose {
                handle: RendererHandle(3)
            }
        );

        assert_eq!(Request::decode(r#"{"method":"probe"}"#).unwrap(), Request::Probe);
    }

    #[test]
    fn unknown_method_is_not_implemented() {
        let err = Request::decode(r#"{"method":"snapshot","args":{}}"#).unwrap_err();
        assert_eq!(err.code, ErrorCode::NotImplemented);
    }

    #[test]
    fn missing_arguments_are_bad_args() {
        let err = Request::decode(r#"{"method":"render","args":{"handle":1}}"#).unwrap_err();
        assert_eq!(err.code, ErrorCode::BadArgs);

        let err = Request::decode("not json").unwrap_err();
        assert_eq!(err.code, ErrorCode::BadArgs);
    }

    #[test]
    fn render_args_validate_camera_and_extent() {
        let Request::Render(mut args) = Request::decode(RENDER).unwrap() else {
            panic!("expected render request");
        };
        assert_eq!(args.extent().unwrap(), (256, 256));
        assert_eq!(args.camera().unwrap().max_steps, 200);

        args.max_steps = 0;
        assert_eq!(args.camera().unwrap_err().code(), ErrorCode::BadArgs);

        args.max_steps = 10;
        args.fov_y = f64::NAN;
        assert_eq!(args.camera().unwrap_err().code(), ErrorCode::BadArgs);

        args.width = -4;
        assert_eq!(args.extent().unwrap_err().code(), ErrorCode::BadArgs);
    }

    #[test]
    fn extent_rejects_zero_and_overflow() {
        assert!(surface_extent(0, 10).is_err());
        assert!(surface_extent(10, -1).is_err());
        assert!(surface_extent(i64::from(u32::MAX) + 1, 10).is_err());
        assert_eq!(surface_extent(1, 1).unwrap(), (1, 1));
    }

    #[test]
    fn responses_serialise_with_ok_or_error_keys() {
        let ok = serde_json::to_string(&Response::Ok(Reply::Handle(RendererHandle(5)))).unwrap();
        assert_eq!(ok, r#"{"ok":5}"#);

        let unit = serde_json::to_string(&Response::Ok(Reply::Unit)).unwrap();
        assert_eq!(unit, r#"{"ok":null}"#);

        let err = Response::from(Err::<Reply, _>(BridgeError::from(RenderError::NotInitialized(
            RendererHandle(5),
        ))));
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["error"]["code"], "no_tex");
    }
}
