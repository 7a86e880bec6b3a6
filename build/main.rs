extern crate gl_generator;

use gl_generator::{Api, Fallbacks, Profile, Registry};
use std::env;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

fn main() {
    let dest = env::var("OUT_DIR").unwrap();
    let dest = Path::new(&dest);

    let mut file_output = BufWriter::new(File::create(dest.join("gl_bindings.rs")).unwrap());
    generate_gl_bindings(&mut file_output);

    println!("cargo:rerun-if-changed=build/main.rs");
}

fn generate_gl_bindings<W>(dest: &mut W) where W: Write {
    // the compatibility profile is a superset of core; the extensions below are the ones whose
    // entry points are commonly looked up under a suffixed name
    let gl_registry = Registry::new(Api::Gl, (4, 6), Profile::Compatibility, Fallbacks::All,
        [
            "GL_APPLE_vertex_array_object",
            "GL_ARB_debug_output",
            "GL_ARB_framebuffer_object",
            "GL_ARB_vertex_array_object",
            "GL_ARB_vertex_buffer_object",
            "GL_EXT_framebuffer_blit",
            "GL_EXT_framebuffer_object",
            "GL_KHR_debug",
            "GL_NV_vertex_array_range",
        ]
    );

    gl_registry.write_bindings(gl_generator::StructGenerator, dest).unwrap();
}
