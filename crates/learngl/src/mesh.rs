use std::mem::size_of;

use anyhow::{anyhow, bail, Result};
use glow::HasContext;

use crate::lessons::MeshData;

const FLOAT_BYTES: i32 = size_of::<f32>() as i32;

/// Vertex array plus the buffers it reads from.
pub(crate) struct GpuMesh {
    vao: glow::VertexArray,
    vbo: glow::Buffer,
    ebo: Option<glow::Buffer>,
    draw_count: i32,
}

impl GpuMesh {
    /// Uploads `mesh` into static buffers and records its attribute layout.
    ///
    /// # Safety
    ///
    /// `gl` must be current on the calling thread.
    pub(crate) unsafe fn upload(gl: &glow::Context, mesh: &MeshData) -> Result<Self> {
        let vao = gl
            .create_vertex_array()
            .map_err(|err| anyhow!("failed to create vertex array: {err}"))?;
        let vbo = match gl.create_buffer() {
            Ok(vbo) => vbo,
            Err(err) => {
                gl.delete_vertex_array(vao);
                bail!("failed to create vertex buffer: {err}");
            }
        };
        let ebo = match mesh.indices.map(|_| gl.create_buffer()).transpose() {
            Ok(ebo) => ebo,
            Err(err) => {
                gl.delete_buffer(vbo);
                gl.delete_vertex_array(vao);
                bail!("failed to create index buffer: {err}");
            }
        };

        gl.bind_vertex_array(Some(vao));
        gl.bind_buffer(glow::ARRAY_BUFFER, Some(vbo));
        gl.buffer_data_u8_slice(
            glow::ARRAY_BUFFER,
            bytemuck::cast_slice(mesh.vertices),
            glow::STATIC_DRAW,
        );
        if let (Some(ebo), Some(indices)) = (ebo, mesh.indices) {
            gl.bind_buffer(glow::ELEMENT_ARRAY_BUFFER, Some(ebo));
            gl.buffer_data_u8_slice(
                glow::ELEMENT_ARRAY_BUFFER,
                bytemuck::cast_slice(indices),
                glow::STATIC_DRAW,
            );
        }

        let stride = mesh.stride_floats() * FLOAT_BYTES;
        let mut offset = 0;
        for (location, components) in mesh.layout.iter().enumerate() {
            let location = location as u32;
            gl.vertex_attrib_pointer_f32(location, *components, glow::FLOAT, false, stride, offset);
            gl.enable_vertex_attrib_array(location);
            offset += components * FLOAT_BYTES;
        }

        // The element buffer binding is VAO state; unbind the VAO first.
        gl.bind_vertex_array(None);
        gl.bind_buffer(glow::ARRAY_BUFFER, None);

        Ok(Self {
            vao,
            vbo,
            ebo,
            draw_count: mesh.draw_count(),
        })
    }

    /// # Safety
    ///
    /// `gl` must be current and be the context the mesh was uploaded with.
    pub(crate) unsafe fn draw(&self, gl: &glow::Context) {
        gl.bind_vertex_array(Some(self.vao));
        if self.ebo.is_some() {
            gl.draw_elements(glow::TRIANGLES, self.draw_count, glow::UNSIGNED_INT, 0);
        } else {
            gl.draw_arrays(glow::TRIANGLES, 0, self.draw_count);
        }
    }

    /// # Safety
    ///
    /// `gl` must be current and be the context the mesh was uploaded with.
    pub(crate) unsafe fn destroy(self, gl: &glow::Context) {
        gl.delete_vertex_array(self.vao);
        gl.delete_buffer(self.vbo);
        if let Some(ebo) = self.ebo {
            gl.delete_buffer(ebo);
        }
    }
}
