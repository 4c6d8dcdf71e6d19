use std::fmt;
use std::str::FromStr;

use glshader::{GlDriver, ShaderProgram};

/// Static geometry uploaded once per lesson.
#[derive(Debug, Clone, Copy)]
pub struct MeshData {
    pub vertices: &'static [f32],
    pub indices: Option<&'static [u32]>,
    /// Component count of each attribute, in location order.
    pub layout: &'static [i32],
}

impl MeshData {
    pub fn stride_floats(&self) -> i32 {
        self.layout.iter().sum()
    }

    /// Number of elements `glDraw*` should consume.
    pub fn draw_count(&self) -> i32 {
        match self.indices {
            Some(indices) => indices.len() as i32,
            None => self.vertices.len() as i32 / self.stride_floats().max(1),
        }
    }
}

#[rustfmt::skip]
const QUAD: [f32; 12] = [
     0.5,  0.5, 0.0, // top right
     0.5, -0.5, 0.0, // bottom right
    -0.5, -0.5, 0.0, // bottom left
    -0.5,  0.5, 0.0, // top left
];

#[rustfmt::skip]
const QUAD_INDICES: [u32; 6] = [
    0, 1, 2,
    0, 2, 3,
];

#[rustfmt::skip]
const LEFT_TRIANGLE: [f32; 9] = [
     0.0,  0.5, 0.0,
     0.0, -0.5, 0.0,
    -1.0, -0.5, 0.0,
];

#[rustfmt::skip]
const RIGHT_TRIANGLE: [f32; 9] = [
    1.0,  0.5, 0.0,
    1.0, -0.5, 0.0,
    0.0, -0.5, 0.0,
];

#[rustfmt::skip]
const TRIANGLE: [f32; 9] = [
    -0.5, -0.5, 0.0,
     0.5, -0.5, 0.0,
     0.0,  0.5, 0.0,
];

#[rustfmt::skip]
const COLORED_TRIANGLE: [f32; 18] = [
    // positions      // colors
     0.0,  0.5, 0.0,  1.0, 0.0, 0.0,
     0.5, -0.5, 0.0,  0.0, 1.0, 0.0,
    -0.5, -0.5, 0.0,  0.0, 0.0, 1.0,
];

const POSITIONS: &[i32] = &[3];
const POSITIONS_COLORS: &[i32] = &[3, 3];

const FIRST_TRIANGLE_VS: &str = include_str!("../shaders/first_triangle.vs");
const FIRST_TRIANGLE_FS: &str = include_str!("../shaders/first_triangle.fs");
const VERTEX_COLORS_VS: &str = include_str!("../shaders/vertex_colors.vs");
const VERTEX_COLORS_FS: &str = include_str!("../shaders/vertex_colors.fs");
const OFFSET_VS: &str = include_str!("../shaders/offset.vs");
const PULSE_FS: &str = include_str!("../shaders/pulse.fs");

/// Horizontal shift applied by the `offset` lesson every frame.
pub const H_OFFSET: f32 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lesson {
    /// Indexed quad in a constant colour.
    FirstTriangle,
    /// Two triangles from two separate vertex arrays, one program.
    TwoTriangles,
    /// Per-vertex colour interpolated across a triangle.
    VertexColors,
    /// Constant-colour triangle whose green channel follows time.
    Pulse,
    /// Vertex colours shifted right by a uniform.
    Offset,
}

impl Lesson {
    pub const ALL: [Lesson; 5] = [
        Lesson::FirstTriangle,
        Lesson::TwoTriangles,
        Lesson::VertexColors,
        Lesson::Pulse,
        Lesson::Offset,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Lesson::FirstTriangle => "first-triangle",
            Lesson::TwoTriangles => "two-triangles",
            Lesson::VertexColors => "vertex-colors",
            Lesson::Pulse => "pulse",
            Lesson::Offset => "offset",
        }
    }

    pub fn summary(self) -> &'static str {
        match self {
            Lesson::FirstTriangle => "indexed quad drawn in constant orange",
            Lesson::TwoTriangles => "two vertex arrays sharing one program",
            Lesson::VertexColors => "colour attribute passed from vertex to fragment stage",
            Lesson::Pulse => "float uniform updated from the clock each frame",
            Lesson::Offset => "vertex colours moved right by the hOffset uniform",
        }
    }

    pub fn vertex_source(self) -> &'static str {
        match self {
            Lesson::FirstTriangle | Lesson::TwoTriangles | Lesson::Pulse => FIRST_TRIANGLE_VS,
            Lesson::VertexColors => VERTEX_COLORS_VS,
            Lesson::Offset => OFFSET_VS,
        }
    }

    pub fn fragment_source(self) -> &'static str {
        match self {
            Lesson::FirstTriangle | Lesson::TwoTriangles => FIRST_TRIANGLE_FS,
            Lesson::VertexColors | Lesson::Offset => VERTEX_COLORS_FS,
            Lesson::Pulse => PULSE_FS,
        }
    }

    pub fn meshes(self) -> Vec<MeshData> {
        match self {
            Lesson::FirstTriangle => vec![MeshData {
                vertices: &QUAD,
                indices: Some(&QUAD_INDICES),
                layout: POSITIONS,
            }],
            Lesson::TwoTriangles => vec![
                MeshData {
                    vertices: &LEFT_TRIANGLE,
                    indices: None,
                    layout: POSITIONS,
                },
                MeshData {
                    vertices: &RIGHT_TRIANGLE,
                    indices: None,
                    layout: POSITIONS,
                },
            ],
            Lesson::Pulse => vec![MeshData {
                vertices: &TRIANGLE,
                indices: None,
                layout: POSITIONS,
            }],
            Lesson::VertexColors | Lesson::Offset => vec![MeshData {
                vertices: &COLORED_TRIANGLE,
                indices: None,
                layout: POSITIONS_COLORS,
            }],
        }
    }

    /// Per-frame uniform writes. `program` must already be active.
    pub fn update_uniforms<D: GlDriver>(self, program: &ShaderProgram<D>, elapsed_seconds: f32) {
        match self {
            Lesson::Pulse => program.set_float("greenValue", elapsed_seconds.sin() / 2.0 + 0.5),
            Lesson::Offset => program.set_float("hOffset", H_OFFSET),
            Lesson::FirstTriangle | Lesson::TwoTriangles | Lesson::VertexColors => {}
        }
    }
}

impl fmt::Display for Lesson {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Lesson {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase().replace('_', "-");
        Lesson::ALL
            .into_iter()
            .find(|lesson| lesson.name() == normalized)
            .ok_or_else(|| {
                let known: Vec<&str> = Lesson::ALL.iter().map(|lesson| lesson.name()).collect();
                format!("unknown lesson '{value}'; expected one of {}", known.join(", "))
            })
    }
}
