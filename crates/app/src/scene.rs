//! Builds the mesh, texture and shader program from the command line.
//! Load failures are logged and replaced by a built-in fallback.

use anyhow::{Context, Result};
use asset::{Mesh, TextureData};
use renderer::{SceneAssets, ShaderProgram};

use crate::cli::{Args, Shape};

const FALLBACK_TEXTURE_SIZE: u32 = 64;

pub fn build(args: &Args) -> Result<SceneAssets> {
    let mesh = build_mesh(args);
    if args.info {
        for line in mesh.info().to_string().lines() {
            log::info!("{line}");
        }
    }
    if args.dump_mesh {
        mesh.log_contents();
    }

    Ok(SceneAssets {
        mesh,
        texture: build_texture(args),
        program: build_program(args)?,
    })
}

pub fn build_mesh(args: &Args) -> Mesh {
    if let Some(path) = &args.model {
        let mut mesh = Mesh::new();
        match mesh.read_obj(path) {
            Ok(()) => return mesh,
            Err(e) => log::error!("Failed to load model {:?}: {e}; using a triangle", path),
        }
        return Mesh::triangle();
    }

    match args.shape {
        Shape::Triangle => Mesh::triangle(),
        Shape::Box => {
            let [x, y, z] = args.box_size;
            Mesh::cuboid(x, y, z)
        }
        Shape::Sphere => Mesh::sphere(args.radius, args.segments).unwrap_or_else(|e| {
            log::error!("Failed to generate sphere: {e}; using a triangle");
            Mesh::triangle()
        }),
    }
}

pub fn build_texture(args: &Args) -> TextureData {
    let Some(path) = &args.texture else {
        return TextureData::create_test_texture(FALLBACK_TEXTURE_SIZE);
    };
    TextureData::load_tga(path).unwrap_or_else(|e| {
        log::warn!("Failed to load texture {:?}: {e}; using a checkerboard", path);
        TextureData::create_test_texture(FALLBACK_TEXTURE_SIZE)
    })
}

pub fn build_program(args: &Args) -> Result<ShaderProgram> {
    if let (Some(vs), Some(fs)) = (&args.vertex_shader, &args.fragment_shader) {
        match ShaderProgram::from_files(vs, fs) {
            Ok(program) => return Ok(program),
            Err(e) => log::error!("{e}\nUsing the built-in shaders"),
        }
    }
    ShaderProgram::builtin().context("Built-in shaders failed to compile")
}
