//! Built-in GLSL shaders
//!
//! Both passes share the quad vertex stage. The quad carries the row flip:
//! texcoord (0,0) sits at the top-left corner, so window pixmaps (row 0 on
//! top) draw upright and effects treat `v_texcoord` as top-left origin.

/// Full-screen quad vertex stage
pub const QUAD_VERT: &str = r#"#version 330 core
layout(location = 0) in vec2 a_position;
layout(location = 1) in vec2 a_texcoord;
out vec2 v_texcoord;

void main() {
    v_texcoord = a_texcoord;
    gl_Position = vec4(a_position, 0.0, 1.0);
}
"#;

/// Per-window composite stage
pub const COMPOSITE_FRAG: &str = r#"#version 330 core
in vec2 v_texcoord;
out vec4 frag_color;
uniform sampler2D u_texture;

void main() {
    frag_color = texture(u_texture, v_texcoord);
}
"#;

/// Label used in compile errors for the vertex stage
pub const QUAD_VERT_LABEL: &str = "quad.vert";

/// Label used in compile errors for the composite stage
pub const COMPOSITE_FRAG_LABEL: &str = "composite.frag";

/// Triangle strip: position xy, texcoord uv with v = 0 at the top edge
pub const QUAD_VERTICES: [f32; 16] = [
    -1.0, -1.0, 0.0, 1.0, //
    1.0, -1.0, 1.0, 1.0, //
    -1.0, 1.0, 0.0, 0.0, //
    1.0, 1.0, 1.0, 0.0, //
];

/// Floats per vertex in [`QUAD_VERTICES`]
pub const QUAD_STRIDE: usize = 4;

/// Vertices drawn per quad
pub const QUAD_VERTEX_COUNT: i32 = 4;

/// Standard post-process uniform names
pub mod uniforms {
    pub const SCREEN: &str = "u_screen";
    pub const RESOLUTION: &str = "u_resolution";
    pub const TIME: &str = "u_time";
    pub const TEXTURE: &str = "u_texture";
}
