// Copyright @yucwang 2026

//! Request codes of the introspection protocol. Every client request is a
//! single i16 code, optionally followed by a payload owned by the handler.
//! Codes that match a registered plugin id are routed to that plugin.

pub const RENDERER_INFO: i16 = 0x0001;
pub const CAMERA_DATA: i16 = 0x0002;
pub const MESH_DATA: i16 = 0x0003;
pub const RENDER_IMAGE: i16 = 0x0004;
pub const RENDER_PIXEL: i16 = 0x0005;
pub const SAMPLE_DATA: i16 = 0x0006;
pub const HEATMAP_DATA: i16 = 0x0007;
pub const SET_SAMPLE_COUNT: i16 = 0x0008;

pub const UNSUPPORTED: i16 = 0x00EE;
pub const DISCONNECT: i16 = 0x00FE;
pub const QUIT: i16 = 0x00FF;
