// build.rs

fn has_feature(name: &str) -> bool {
    std::env::var(format!("CARGO_FEATURE_{}", name)).is_ok()
}

fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-env-changed=DISPLAY_DRIVER");

    // Declare custom cfg names to avoid warnings
    println!("cargo::rustc-check-cfg=cfg(use_x11_display)");
    println!("cargo::rustc-check-cfg=cfg(use_win32_display)");
    println!("cargo::rustc-check-cfg=cfg(use_web_display)");
    println!("cargo::rustc-check-cfg=cfg(use_headless_display)");

    let target_os = std::env::var("CARGO_CFG_TARGET_OS").unwrap_or_default();
    let target_arch = std::env::var("CARGO_CFG_TARGET_ARCH").unwrap_or_default();

    let display_driver = determine_display_driver(&target_os, &target_arch);

    match display_driver.as_str() {
        "x11" => {
            println!("cargo:rustc-cfg=use_x11_display");
            if pkg_config::probe_library("x11").is_err() {
                eprintln!("Warning: X11 libraries not found. Install libx11-dev (Debian/Ubuntu) or libx11-devel (RHEL/Fedora).");
            }
        }
        "win32" => {
            println!("cargo:rustc-cfg=use_win32_display");
        }
        "web" => {
            println!("cargo:rustc-cfg=use_web_display");
        }
        "headless" => {
            println!("cargo:rustc-cfg=use_headless_display");
        }
        other => {
            panic!("Unknown display driver: {}", other);
        }
    }
}

fn determine_display_driver(target_os: &str, target_arch: &str) -> String {
    if let Ok(driver) = std::env::var("DISPLAY_DRIVER") {
        let driver = driver.to_lowercase();
        // An override is only honoured when its bindings are in the target's
        // dependency tables.
        let requirement = match driver.as_str() {
            "x11" if target_os != "linux" => Some("a linux target"),
            "x11" if !has_feature("DISPLAY_X11") => Some("the display_x11 feature"),
            "win32" if target_os != "windows" => Some("a windows target"),
            "web" if target_arch != "wasm32" => Some("a wasm32 target"),
            _ => None,
        };
        let Some(requirement) = requirement else {
            return driver;
        };
        println!(
            "cargo:warning=DISPLAY_DRIVER={} requires {}; using headless.",
            driver, requirement
        );
        return "headless".to_string();
    }

    if has_feature("DISPLAY_HEADLESS") {
        return "headless".to_string();
    }

    if target_arch == "wasm32" {
        return "web".to_string();
    }

    match target_os {
        "windows" => "win32".to_string(),
        "linux" if has_feature("DISPLAY_X11") => "x11".to_string(),
        _ => "headless".to_string(),
    }
}
