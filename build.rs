fn main() {
    // Tell Cargo to rerun this build script if app.rc or app.manifest changes.
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-changed=app.rc");
    println!("cargo:rerun-if-changed=app.manifest");

    // The manifest opts into XAML islands (maxversiontested) and per-monitor DPI.
    #[cfg(windows)]
    {
        let _ = embed_resource::compile("app.rc", embed_resource::NONE);
        generate_xaml_bindings();
    }
}

/*
 * The `windows` crate does not cover `Windows.UI.Xaml`, so the island classes
 * are generated from the bundled metadata. Their dependencies are generated
 * alongside, which keeps the output independent of the `windows` features.
 */
#[cfg(windows)]
fn generate_xaml_bindings() {
    use std::path::PathBuf;

    let Some(out_dir) = std::env::var_os("OUT_DIR").map(PathBuf::from) else {
        return;
    };
    let out_file = out_dir.join("xaml_bindings.rs");
    let out_path = out_file.to_string_lossy().into_owned();

    let _ = windows_bindgen::bindgen([
        "--in",
        "default",
        "--out",
        out_path.as_str(),
        "--filter",
        "Windows.UI.Xaml.Hosting.WindowsXamlManager",
        "Windows.UI.Xaml.Hosting.DesktopWindowXamlSource",
        "Windows.UI.Xaml.Controls.Grid",
        "Windows.UI.Xaml.Controls.MenuFlyout",
        "Windows.UI.Xaml.Controls.MenuFlyoutItem",
        "Windows.UI.Xaml.Controls.MenuFlyoutItemBase",
        "Windows.UI.Xaml.Controls.MenuFlyoutSeparator",
        "Windows.UI.Xaml.Controls.MenuFlyoutSubItem",
        "Windows.UI.Xaml.Controls.ToggleMenuFlyoutItem",
        "Windows.UI.Xaml.RoutedEventHandler",
    ]);

    // The output is included inside a module, where inner attributes are not allowed.
    match std::fs::read_to_string(&out_file) {
        Ok(generated) => {
            let stripped = strip_inner_attributes(&generated);
            if let Err(e) = std::fs::write(&out_file, stripped) {
                panic!("Failed to rewrite {out_path}: {e}");
            }
        }
        Err(e) => panic!("Failed to read generated XAML bindings {out_path}: {e}"),
    }
}

/// Drops `#![...]` attributes, including ones spanning several lines.
#[cfg(windows)]
fn strip_inner_attributes(source: &str) -> String {
    let mut kept = String::with_capacity(source.len());
    let mut depth = 0usize;
    for line in source.lines() {
        let trimmed = line.trim_start();
        if depth == 0 && !trimmed.starts_with("#![") {
            kept.push_str(line);
            kept.push('\n');
            continue;
        }
        for c in trimmed.chars() {
            match c {
                '[' => depth += 1,
                ']' => depth = depth.saturating_sub(1),
                _ => {}
            }
        }
    }
    kept
}
