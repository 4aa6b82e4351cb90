//! The textured-quad demo.
//!
//! A 2x2 palette texture is uploaded the ordinary way, exposed as an
//! EGLImage, and targeted into a second texture object; the second texture is
//! what the quad samples. [`Demo`] owns every GPU object involved and guards
//! the setup → draw → teardown ordering with an explicit state machine
//! instead of relying on call order.

use std::ffi::c_void;
use std::sync::Arc;

use glam::{Vec2, Vec3, vec2, vec3};
use glow::HasContext;

use crate::abs::{App, EglImageExt, Mesh, Shader, ShaderProgram, SharedImage, Texture, Vertex};
use crate::error::DemoError;

const VERT_SRC: &str = include_str!("shaders/quad/vert.glsl");
const FRAG_SRC: &str = include_str!("shaders/quad/frag.glsl");

/// Side length of the square palette texture, in texels.
pub const TEXTURE_SIZE: u32 = 2;

/// The 2x2 RGB palette, tightly packed, row-major.
pub const PALETTE: [u8; 12] = [
    255, 0, 0, // red
    0, 255, 0, // green
    0, 0, 255, // blue
    255, 255, 0, // yellow
];

/// Two triangles sharing the edge between corners 0 and 2.
pub const QUAD_INDICES: [u32; 6] = [0, 1, 2, 0, 2, 3];

/// A quad corner: position and texture coordinate, interleaved.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuadVertex {
    pub position: Vec3,
    pub tex_coord: Vec2,
}

impl Vertex for QuadVertex {
    /// `locations[0]` is the position attribute, `locations[1]` the texture
    /// coordinate.
    fn vertex_attribs(gl: &glow::Context, locations: &[u32]) {
        let stride = std::mem::size_of::<QuadVertex>() as i32;
        unsafe {
            gl.enable_vertex_attrib_array(locations[0]);
            gl.vertex_attrib_pointer_f32(locations[0], 3, glow::FLOAT, false, stride, 0);
            gl.enable_vertex_attrib_array(locations[1]);
            gl.vertex_attrib_pointer_f32(
                locations[1],
                2,
                glow::FLOAT,
                false,
                stride,
                std::mem::size_of::<Vec3>() as i32,
            );
        }
    }
}

/// The unit quad centered at the origin. Corner (-0.5, 0.5) carries texcoord
/// (0, 0) and corner (0.5, -0.5) carries (1, 1).
pub fn quad_vertices() -> [QuadVertex; 4] {
    [
        QuadVertex {
            position: vec3(-0.5, 0.5, 0.0),
            tex_coord: vec2(0.0, 0.0),
        },
        QuadVertex {
            position: vec3(-0.5, -0.5, 0.0),
            tex_coord: vec2(0.0, 1.0),
        },
        QuadVertex {
            position: vec3(0.5, -0.5, 0.0),
            tex_coord: vec2(1.0, 1.0),
        },
        QuadVertex {
            position: vec3(0.5, 0.5, 0.0),
            tex_coord: vec2(1.0, 0.0),
        },
    ]
}

/// Lifecycle of the demo. Strictly linear; there is no way back from
/// `Destroyed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DemoState {
    Uninitialized,
    Ready,
    Destroyed,
}

impl DemoState {
    pub(crate) fn begin_setup(self) -> Result<DemoState, DemoError> {
        match self {
            DemoState::Uninitialized => Ok(DemoState::Ready),
            state => Err(DemoError::InvalidState {
                operation: "setup",
                state,
            }),
        }
    }

    pub(crate) fn check_draw(self) -> Result<(), DemoError> {
        match self {
            DemoState::Ready => Ok(()),
            state => Err(DemoError::InvalidState {
                operation: "draw",
                state,
            }),
        }
    }

    pub(crate) fn begin_teardown(self) -> Result<DemoState, DemoError> {
        match self {
            DemoState::Ready => Ok(DemoState::Destroyed),
            state => Err(DemoError::InvalidState {
                operation: "teardown",
                state,
            }),
        }
    }
}

/// Everything setup creates. Dropping this releases each GPU object once.
struct Resources {
    program: ShaderProgram,
    mesh: Mesh,
    // The palette texture is the EGLImage's backing store and must outlive
    // the image and the texture aliasing it.
    _palette_texture: Texture,
    shared_texture: Texture,
    _shared_image: SharedImage,
}

/// The demo itself: one shader program, two textures sharing storage through
/// an EGLImage, one quad.
pub struct Demo {
    gl: Arc<glow::Context>,
    state: DemoState,
    resources: Option<Resources>,
}

impl Demo {
    pub fn new(gl: Arc<glow::Context>) -> Self {
        Self {
            gl,
            state: DemoState::Uninitialized,
            resources: None,
        }
    }

    /// Compiles the shaders, uploads the palette, wires the shared image and
    /// builds the quad mesh. Legal exactly once, from `Uninitialized`.
    pub fn setup(&mut self, app: &App) -> Result<(), DemoError> {
        let ready = self.state.begin_setup()?;
        let gl = &self.gl;

        let ext = EglImageExt::load(|name| {
            app.video_subsystem.gl_get_proc_address(name) as *const c_void
        })?;

        let vert = Shader::new(gl, glow::VERTEX_SHADER, VERT_SRC)?;
        let frag = Shader::new(gl, glow::FRAGMENT_SHADER, FRAG_SRC)?;
        let program = ShaderProgram::new(gl, &[&vert, &frag])?;

        let position_loc = program.attrib_location("a_position")?;
        let tex_coord_loc = program.attrib_location("a_tex_coord")?;
        program.require_uniform("s_texture")?;

        let palette_texture = Texture::from_rgb(gl, TEXTURE_SIZE, TEXTURE_SIZE, &PALETTE)?;

        let shared_image = ext.create_from_texture(palette_texture.raw())?;
        let shared_texture = Texture::new_unbacked(gl)?;
        shared_image.bind_to_texture(gl, shared_texture.raw());

        let mesh = Mesh::new(
            gl,
            &quad_vertices(),
            &QUAD_INDICES,
            &[position_loc, tex_coord_loc],
            glow::TRIANGLES,
        )?;

        unsafe {
            gl.clear_color(0.0, 0.0, 0.0, 0.0);
        }

        self.resources = Some(Resources {
            program,
            mesh,
            _palette_texture: palette_texture,
            shared_texture,
            _shared_image: shared_image,
        });
        self.state = ready;
        log::info!(
            "demo ready: {}x{} palette shared into texture via EGLImage",
            TEXTURE_SIZE,
            TEXTURE_SIZE
        );
        Ok(())
    }

    /// Draws one frame. The quad geometry is re-uploaded from the literals
    /// every call; there is deliberately no dirty tracking here.
    pub fn draw(&mut self, width: u32, height: u32) -> Result<(), DemoError> {
        self.state.check_draw()?;
        let Some(resources) = self.resources.as_mut() else {
            return Err(DemoError::InvalidState {
                operation: "draw",
                state: self.state,
            });
        };

        unsafe {
            self.gl.viewport(0, 0, width as i32, height as i32);
            self.gl.clear(glow::COLOR_BUFFER_BIT);
        }

        resources.program.use_program();
        resources.mesh.update(&quad_vertices(), &QUAD_INDICES);
        resources.shared_texture.bind(0);
        resources.program.set_uniform("s_texture", 0i32);
        resources.mesh.draw();
        Ok(())
    }

    /// Releases every GPU object setup created, exactly once. Legal only from
    /// `Ready`; the demo cannot be set up again afterwards.
    pub fn teardown(&mut self) -> Result<(), DemoError> {
        let destroyed = self.state.begin_teardown()?;
        self.resources = None;
        self.state = destroyed;
        log::info!("demo torn down");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn palette_is_red_green_blue_yellow_row_major() {
        let texels: Vec<&[u8]> = PALETTE.chunks(3).collect();
        assert_eq!(texels.len(), (TEXTURE_SIZE * TEXTURE_SIZE) as usize);
        assert_eq!(texels[0], &[255, 0, 0]);
        assert_eq!(texels[1], &[0, 255, 0]);
        assert_eq!(texels[2], &[0, 0, 255]);
        assert_eq!(texels[3], &[255, 255, 0]);
    }

    #[test]
    fn quad_is_a_unit_square_centered_at_origin() {
        let vertices = quad_vertices();
        for vertex in &vertices {
            assert_eq!(vertex.position.x.abs(), 0.5);
            assert_eq!(vertex.position.y.abs(), 0.5);
            assert_eq!(vertex.position.z, 0.0);
        }
        assert_eq!(vertices[0].position, vec3(-0.5, 0.5, 0.0));
        assert_eq!(vertices[0].tex_coord, vec2(0.0, 0.0));
        assert_eq!(vertices[2].position, vec3(0.5, -0.5, 0.0));
        assert_eq!(vertices[2].tex_coord, vec2(1.0, 1.0));
    }

    #[test]
    fn indices_describe_two_triangles_sharing_the_0_2_edge() {
        let triangles: Vec<&[u32]> = QUAD_INDICES.chunks(3).collect();
        assert_eq!(triangles.len(), 2);
        for triangle in &triangles {
            assert_eq!(triangle.len(), 3);
            assert!(triangle.iter().all(|&i| i < 4));
        }
        let shared: Vec<u32> = triangles[0]
            .iter()
            .filter(|i| triangles[1].contains(i))
            .copied()
            .collect();
        assert_eq!(shared, vec![0, 2]);
    }

    #[test]
    fn vertex_layout_is_tightly_interleaved() {
        assert_eq!(std::mem::size_of::<QuadVertex>(), 20);
        assert_eq!(std::mem::offset_of!(QuadVertex, position), 0);
        assert_eq!(std::mem::offset_of!(QuadVertex, tex_coord), 12);
    }

    #[test]
    fn lifecycle_is_strictly_linear() {
        assert_eq!(
            DemoState::Uninitialized.begin_setup().unwrap(),
            DemoState::Ready
        );
        assert!(DemoState::Ready.begin_setup().is_err());
        assert!(DemoState::Destroyed.begin_setup().is_err());

        assert!(DemoState::Uninitialized.check_draw().is_err());
        assert!(DemoState::Ready.check_draw().is_ok());
        assert!(DemoState::Destroyed.check_draw().is_err());

        assert!(DemoState::Uninitialized.begin_teardown().is_err());
        assert_eq!(
            DemoState::Ready.begin_teardown().unwrap(),
            DemoState::Destroyed
        );
        assert!(DemoState::Destroyed.begin_teardown().is_err());
    }

    #[test]
    fn draw_before_setup_is_a_state_error() {
        let err = DemoState::Uninitialized.check_draw().unwrap_err();
        match err {
            DemoError::InvalidState { operation, state } => {
                assert_eq!(operation, "draw");
                assert_eq!(state, DemoState::Uninitialized);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
