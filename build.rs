use std::env;

fn main() {
    // Without an explicit LAPACK backend feature, link macOS targets
    // against the Accelerate framework for BLAS/LAPACK.
    let target_os = env::var("CARGO_CFG_TARGET_OS").unwrap_or_default();
    let has_backend = ["OPENBLAS_STATIC", "OPENBLAS_SYSTEM", "NETLIB_SYSTEM"]
        .iter()
        .any(|feature| env::var(format!("CARGO_FEATURE_{feature}")).is_ok());

    if target_os == "macos" && !has_backend {
        println!("cargo:rustc-link-lib=framework=Accelerate");
    }
    println!("cargo:rerun-if-changed=build.rs");
}
