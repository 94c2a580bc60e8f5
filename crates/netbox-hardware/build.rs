//! Build script for the vendor driver bindings.
//!
//! With the `vendor-sdk` feature the crate links against the encoder
//! (`eib7`) and load-cell (`ClipXApi`) shared libraries. Their location is
//! taken from `NETBOX_VENDOR_LIB_DIR`, falling back to the usual system
//! library paths.

fn main() {
    println!("cargo:rerun-if-env-changed=NETBOX_VENDOR_LIB_DIR");

    #[cfg(feature = "vendor-sdk")]
    {
        if let Ok(dir) = std::env::var("NETBOX_VENDOR_LIB_DIR") {
            println!("cargo:rustc-link-search=native={dir}");
            return;
        }

        let lib_paths = ["/usr/local/lib", "/usr/lib", "/usr/lib/x86_64-linux-gnu"];
        for path in lib_paths {
            if std::path::Path::new(path).join("libeib7.so").exists() {
                println!("cargo:rustc-link-search=native={path}");
                break;
            }
        }
    }
}
