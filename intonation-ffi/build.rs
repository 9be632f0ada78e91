// Build script that tries to regenerate the C header with `cbindgen`.
// If `cbindgen` is not available, it copies the checked-in
// `include/intonation.h` to $OUT_DIR instead.
//
// Either way, consumers can include the header from:
//   - <repo>/intonation-ffi/include/intonation.h   (checked-in)
//   - $OUT_DIR/intonation.h

use std::{env, fs, path::PathBuf, process::Command};

fn main() {
    println!("cargo:rerun-if-changed=src/lib.rs");
    println!("cargo:rerun-if-changed=include/intonation.h");

    let (Ok(crate_dir), Ok(out_dir)) = (env::var("CARGO_MANIFEST_DIR"), env::var("OUT_DIR")) else {
        println!("cargo:warning=intonation-ffi: cargo did not set the manifest/out dirs; skipping header");
        return;
    };
    let crate_dir = PathBuf::from(crate_dir);
    let header_repo = crate_dir.join("include").join("intonation.h");
    let header_out = PathBuf::from(out_dir).join("intonation.h");

    let cbindgen_ok = Command::new("cbindgen")
        .arg("--version")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false);

    if cbindgen_ok {
        let generated = Command::new("cbindgen")
            .args(["--crate", "intonation-ffi", "--lang", "C", "--output"])
            .arg(&header_out)
            .current_dir(&crate_dir)
            .status()
            .map(|s| s.success())
            .unwrap_or(false);
        if generated {
            println!("cargo:warning=intonation-ffi: generated header with cbindgen -> {}", header_out.display());
            return;
        }
        println!("cargo:warning=intonation-ffi: cbindgen failed; using checked-in header");
    }

    if let Err(e) = fs::copy(&header_repo, &header_out) {
        println!("cargo:warning=intonation-ffi: could not copy include/intonation.h: {e}");
    }
}
