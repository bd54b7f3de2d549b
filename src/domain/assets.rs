//! The catalog of assets and branding strings that published pages use.
//!
//! Nothing here performs I/O. CDN references are embedded into the output as
//! static strings and are never fetched.

/// A stylesheet or script served from a CDN, pinned by a subresource
/// integrity hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CdnAsset {
    /// Absolute URL of the asset.
    pub url: &'static str,

    /// The `integrity` attribute value (e.g. `sha384-...`).
    pub integrity: &'static str,
}

impl CdnAsset {
    /// Renders the asset as a `<link rel="stylesheet">` tag.
    #[must_use]
    pub fn stylesheet_tag(&self) -> String {
        format!(
            r#"<link rel="stylesheet" href="{}" integrity="{}" crossorigin="anonymous">"#,
            self.url, self.integrity
        )
    }

    /// Renders the asset as a `<script src>` tag.
    #[must_use]
    pub fn script_tag(&self) -> String {
        format!(
            r#"<script src="{}" integrity="{}" crossorigin="anonymous"></script>"#,
            self.url, self.integrity
        )
    }
}

const BOOTSTRAP_CSS: CdnAsset = CdnAsset {
    url: "https://cdn.jsdelivr.net/npm/bootstrap@5.3.3/dist/css/bootstrap.min.css",
    integrity: "sha384-QWTKZyjpPEjISv5WaRU9OFeRpok6YcnS/S7cOl+1QRLI0jaPJSKyIp6s0GOuQ24p",
};

const BOOTSTRAP_JS: CdnAsset = CdnAsset {
    url: "https://cdn.jsdelivr.net/npm/bootstrap@5.3.3/dist/js/bootstrap.bundle.min.js",
    integrity: "sha384-YvpcrYf0tY3lHB60NNkmXc5s9fDVZLESaAA55NDzOxhy9GkcIdslK1eN7N6jIeHz",
};

// Replaces Doorstop's general.css and doorstop.css.
const INLINE_CSS: &str = r#"<style>
  section > * { margin-left: 30px; }
  section > :first-child { margin-left: 0; }

  .caption { text-align: center; font-size: 15px; }
  #img { width: 100%; }

  [data-bs-theme="dark"] .table { --bs-table-bg: transparent; }
  [data-bs-theme="dark"] a { color: #6ea8fe; }
  [data-bs-theme="dark"] a:hover { color: #9ec5fe; }
  [data-bs-theme="dark"] .navbar { border-bottom: 1px solid rgba(255,255,255,0.1); }
  [data-bs-theme="dark"] section { border-color: rgba(255,255,255,0.1); }
  [data-bs-theme="dark"] .dropdown-menu { --bs-dropdown-bg: #2b3035; }
</style>"#;

const COLOR_SCHEME_JS: &str = r"<script>
(function() {
  var dark = window.matchMedia('(prefers-color-scheme: dark)').matches;
  document.documentElement.setAttribute('data-bs-theme', dark ? 'dark' : 'light');
})();
</script>";

const SKIP_LINK: &str = concat!(
    r##"<a href="#main-content" "##,
    r#"class="visually-hidden-focusable position-absolute top-0 start-0 p-2 m-1 bg-primary text-white rounded">"#,
    "Skip to main content</a>"
);

/// Immutable set of assets injected into every published page.
///
/// Construct it once (usually via [`AssetCatalog::default`], which pins
/// Bootstrap 5.3.3 on jsDelivr) and hand it to a
/// [`Transformer`](crate::Transformer).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssetCatalog {
    /// CSS framework stylesheet.
    pub stylesheet: CdnAsset,

    /// CSS framework script bundle.
    pub script: CdnAsset,

    /// `<style>` block with theme, indentation, and caption rules.
    pub inline_css: &'static str,

    /// `<script>` block applying the system colour scheme at load time.
    pub color_scheme_js: &'static str,

    /// Skip-to-content anchor pointing at `#main-content`.
    pub skip_link: &'static str,

    /// Value of the root `lang` attribute.
    pub locale: &'static str,

    /// Value of the root `data-bs-theme` attribute before the script runs.
    pub default_theme: &'static str,

    /// Caption added to the traceability table.
    pub traceability_caption: &'static str,
}

impl Default for AssetCatalog {
    fn default() -> Self {
        Self {
            stylesheet: BOOTSTRAP_CSS,
            script: BOOTSTRAP_JS,
            inline_css: INLINE_CSS,
            color_scheme_js: COLOR_SCHEME_JS,
            skip_link: SKIP_LINK,
            locale: "en",
            default_theme: "light",
            traceability_caption: "Requirements traceability matrix",
        }
    }
}

/// Headings and navigation labels derived from the project name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Branding {
    project_name: String,
}

impl Branding {
    /// Creates the branding for a project.
    ///
    /// Surrounding whitespace is trimmed; a blank name yields the generic,
    /// unbranded strings.
    #[must_use]
    pub fn new(project_name: &str) -> Self {
        Self {
            project_name: project_name.trim().to_string(),
        }
    }

    /// Navbar brand text. Identical to the index heading.
    #[must_use]
    pub fn brand(&self) -> String {
        self.index_heading()
    }

    /// Heading for the document index page.
    #[must_use]
    pub fn index_heading(&self) -> String {
        self.prefixed("Requirements")
    }

    /// Heading for the traceability matrix page.
    #[must_use]
    pub fn traceability_heading(&self) -> String {
        self.prefixed("Traceability Matrix")
    }

    fn prefixed(&self, label: &str) -> String {
        if self.project_name.is_empty() {
            label.to_string()
        } else {
            format!("{} {label}", self.project_name)
        }
    }
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;

    #[test_case("Acme", "Acme Requirements", "Acme Traceability Matrix"; "named")]
    #[test_case("", "Requirements", "Traceability Matrix"; "unnamed")]
    #[test_case("   ", "Requirements", "Traceability Matrix"; "blank")]
    #[test_case(" Acme ", "Acme Requirements", "Acme Traceability Matrix"; "padded")]
    fn headings(name: &str, index: &str, traceability: &str) {
        let branding = Branding::new(name);
        assert_eq!(branding.index_heading(), index);
        assert_eq!(branding.brand(), index);
        assert_eq!(branding.traceability_heading(), traceability);
    }

    #[test]
    fn cdn_tags_carry_integrity_and_crossorigin() {
        let catalog = AssetCatalog::default();

        let link = catalog.stylesheet.stylesheet_tag();
        assert!(link.starts_with(r#"<link rel="stylesheet" href="https://cdn.jsdelivr.net/"#));
        assert!(link.contains(r#"integrity="sha384-"#));
        assert!(link.contains(r#"crossorigin="anonymous""#));

        let script = catalog.script.script_tag();
        assert!(script.contains("bootstrap.bundle.min.js"));
        assert!(script.contains(r#"integrity="sha384-"#));
        assert!(script.ends_with("></script>"));
    }

    #[test]
    fn color_scheme_script_sets_theme_attribute() {
        let catalog = AssetCatalog::default();
        assert!(catalog.color_scheme_js.contains("prefers-color-scheme: dark"));
        assert!(catalog.color_scheme_js.contains("data-bs-theme"));
    }
}
