use std::path::PathBuf;

fn main() {
    println!("cargo:rerun-if-changed=src");

    let Ok(crate_dir) = std::env::var("CARGO_MANIFEST_DIR") else {
        return;
    };
    let include_dir = PathBuf::from(&crate_dir).join("include");

    let bindings = cbindgen::Builder::new()
        .with_crate(&crate_dir)
        .with_language(cbindgen::Language::C)
        .with_include_guard("SANITY_FFI_H")
        .generate();

    // Header generation is a convenience for C hosts; never fail the build on it.
    match bindings {
        Ok(bindings) => {
            if std::fs::create_dir_all(&include_dir).is_ok() {
                bindings.write_to_file(include_dir.join("sanity.h"));
            }
        }
        Err(e) => println!("cargo:warning=cbindgen could not generate sanity.h: {e}"),
    }
}
