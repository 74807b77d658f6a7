//! Assets bundled into the binary at compile time.

use include_dir::{Dir, include_dir};

static THEME_ASSETS: Dir<'_> = include_dir!("$CARGO_MANIFEST_DIR/assets/themes");

const AGGREGATE_PAGE: &[u8] = include_bytes!("../../assets/all.html");
const DEFAULT_THEME: &[u8] = include_bytes!("../../assets/themes/default.css");

/// Template for the aggregate documentation landing page.
pub fn aggregate_page() -> &'static [u8] {
    AGGREGATE_PAGE
}

/// Stylesheet seeded into builds that do not carry their own theme.
pub fn default_theme_css() -> &'static [u8] {
    DEFAULT_THEME
}

/// Look up a bundled theme by name. Builds published before a theme was
/// added to their themes directory still resolve it from the bundle.
pub fn bundled_theme(name: &str) -> Option<&'static [u8]> {
    THEME_ASSETS
        .get_file(format!("{name}.css"))
        .map(|file| file.contents())
}
