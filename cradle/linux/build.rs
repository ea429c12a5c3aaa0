use std::path::{Path, PathBuf};
use std::process::Command;

const SHADERS: &[&str] = &["fan.vert", "curve.vert", "curve.frag", "fill.frag"];

fn compile(glslc: &str, src: &Path, dst: &Path) -> bool {
    match Command::new(glslc).arg(src).arg("-o").arg(dst).status() {
        Ok(s) if s.success() => true,
        Ok(s) => {
            println!("cargo:warning=glslc failed for {} ({s})", src.display());
            false
        }
        Err(e) => {
            println!("cargo:warning=glslc unavailable ({e}); compile shaders/ manually");
            false
        }
    }
}

fn main() {
    let shader_src = PathBuf::from(std::env::var("CARGO_MANIFEST_DIR").unwrap())
        .join("../../shaders");
    let out_dir = PathBuf::from(std::env::var("OUT_DIR").unwrap()).join("shaders");
    std::fs::create_dir_all(&out_dir).unwrap();
    let glslc = std::env::var("GLSLC").unwrap_or_else(|_| String::from("glslc"));

    println!("cargo:rerun-if-env-changed=GLSLC");
    for s in SHADERS {
        let src = shader_src.join(s);
        println!("cargo:rerun-if-changed={}", src.display());
        if !compile(&glslc, &src, &out_dir.join(format!("{s}.spv"))) {
            break;
        }
    }

    println!(
        "cargo:rustc-env=GLYPH_VIEWER_SHADER_DIR={}",
        out_dir.display()
    );
}
