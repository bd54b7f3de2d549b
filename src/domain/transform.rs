//! Rewriting of a single Doorstop HTML document.
//!
//! Every rule targets markup that Doorstop emits in its default theme, and
//! none of them matches its own output. A rule whose target is absent is a
//! no-op, so documents from other Doorstop versions are transformed as far as
//! they can be and otherwise passed through byte for byte.

use std::sync::LazyLock;

use regex::{Captures, NoExpand, Regex};

use crate::domain::{AssetCatalog, Branding};

static LOCAL_BOOTSTRAP_CSS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<link[^>]*href="([^"]*)bootstrap\.min\.css"[^>]*/?>"#).unwrap()
});

static LOCAL_BOOTSTRAP_JS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<script[^>]*src="([^"]*)bootstrap\.bundle\.min\.js"[^>]*>\s*</script>"#).unwrap()
});

static DOORSTOP_STYLESHEETS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<link[^>]*href="[^"]*(?:general|doorstop)\.css"[^>]*/?>[\r\n]*"#).unwrap()
});

static MATHJAX_SCRIPT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<script[^>]*id="MathJax-script"[^>]*>\s*</script>[\r\n]*"#).unwrap()
});

static MATHJAX_CONFIG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)<script type="text/x-mathjax-config">.*?</script>[\r\n]*"#).unwrap()
});

static HEAD_CLOSE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)</head\s*>").unwrap());

static HEAD_OPEN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)<head\b[^>]*>").unwrap());

static HTML_OPEN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)<html\b[^>]*>").unwrap());

static META_CHARSET: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<meta\s+charset\s*=[^>]*>").unwrap());

// Only the first header is replaced; Doorstop emits one per page.
static HEADER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<header\b[^>]*>.*?</header\s*>").unwrap());

static CONTENTS_DROPDOWN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?s)<a class="nav-link dropdown-toggle"[^>]*>\s*Contents\s*</a>\s*<ul class="dropdown-menu">(.*?)</ul>\s*</li>"#,
    )
    .unwrap()
});

static BODY_OPEN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)<body\b[^>]*>").unwrap());

static MAIN_OPEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<main\b([^>]*)>").unwrap());

static INDEX_HEADING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<h1>\s*Doorstop index\s*</h1>").unwrap());

static TRACEABILITY_HEADING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<h1>\s*Doorstop traceability matrix\s*</h1>").unwrap());

static INDEX_TITLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<title>\s*Doorstop index\s*</title>").unwrap());

static TRACEABILITY_TITLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)<title>\s*Doorstop traceability matrix\s*</title>").unwrap()
});

static UNCAPTIONED_TABLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"<table class="table">\s*<thead>"#).unwrap());

/// Present on the branded navbar only; Doorstop's own header never carries it.
const BRANDED_NAV_MARKER: &str = r#"aria-label="Main navigation""#;

const SKIP_TARGET: &str = "main-content";

/// Applies the publishing rules to Doorstop HTML documents.
///
/// The transformer is built once per run and reused for every file.
#[derive(Debug, Clone)]
pub struct Transformer {
    catalog: AssetCatalog,
    branding: Branding,
    stylesheet_tag: String,
    script_tag: String,
}

impl Transformer {
    /// Creates a transformer for the given assets and branding.
    #[must_use]
    pub fn new(catalog: AssetCatalog, branding: Branding) -> Self {
        Self {
            stylesheet_tag: catalog.stylesheet.stylesheet_tag(),
            script_tag: catalog.script.script_tag(),
            catalog,
            branding,
        }
    }

    /// Creates a transformer using the default asset catalog.
    #[must_use]
    pub fn for_project(project_name: &str) -> Self {
        Self::new(AssetCatalog::default(), Branding::new(project_name))
    }

    /// Transforms one document.
    ///
    /// Never fails: rules whose markers are missing leave the document as it
    /// is. Applying the transformation to its own output returns that output
    /// unchanged.
    #[must_use]
    pub fn transform(&self, document: &str) -> String {
        let nav_prefix = nav_prefix(document);

        let html = self.use_cdn_assets(document);
        let html = remove_bundled_assets(&html);
        let html = self.insert_inline_css(html);
        let html = self.set_root_attributes(&html);
        let html = insert_viewport(html);
        let html = self.replace_navbar(html, nav_prefix);
        let html = self.insert_skip_link(html);
        let html = self.replace_headings(&html);
        let html = self.caption_tables(&html);
        self.insert_color_scheme_script(html)
    }

    fn use_cdn_assets(&self, html: &str) -> String {
        let html = LOCAL_BOOTSTRAP_CSS.replace_all(html, |caps: &Captures<'_>| {
            if is_remote(&caps[1]) {
                caps[0].to_string()
            } else {
                self.stylesheet_tag.clone()
            }
        });
        LOCAL_BOOTSTRAP_JS
            .replace_all(&html, |caps: &Captures<'_>| {
                if is_remote(&caps[1]) {
                    caps[0].to_string()
                } else {
                    self.script_tag.clone()
                }
            })
            .into_owned()
    }

    fn insert_inline_css(&self, html: String) -> String {
        let css = self.catalog.inline_css;
        if html.contains(css) {
            return html;
        }
        if html.contains(&self.stylesheet_tag) {
            let with_css = format!("{}\n  {css}", self.stylesheet_tag);
            return html.replacen(&self.stylesheet_tag, &with_css, 1);
        }
        insert_before(html, &HEAD_CLOSE, &format!("{css}\n"))
    }

    fn set_root_attributes(&self, html: &str) -> String {
        let root = format!(
            r#"<html lang="{}" data-bs-theme="{}">"#,
            self.catalog.locale, self.catalog.default_theme
        );
        HTML_OPEN.replacen(html, 1, NoExpand(&root)).into_owned()
    }

    fn replace_navbar(&self, html: String, nav_prefix: &str) -> String {
        if html.contains(BRANDED_NAV_MARKER) {
            return html;
        }
        let Some(header) = HEADER.find(&html) else {
            return html;
        };

        let contents = CONTENTS_DROPDOWN
            .captures(header.as_str())
            .map(|caps| caps[1].trim().to_string());
        let navbar = self.navbar(nav_prefix, contents.as_deref());
        tracing::trace!(has_contents = contents.is_some(), "replacing navbar");

        format!("{}{navbar}{}", &html[..header.start()], &html[header.end()..])
    }

    fn navbar(&self, nav_prefix: &str, contents: Option<&str>) -> String {
        let brand = escape_html(&self.branding.brand());
        let docs_href = format!("{nav_prefix}index.html");
        let trace_href = format!("{nav_prefix}traceability.html");

        let contents_section = contents
            .filter(|items| !items.is_empty())
            .map(|items| {
                format!(
                    r##"
          <li class="nav-item dropdown">
            <a class="nav-link dropdown-toggle" href="#" role="button" data-bs-toggle="dropdown" aria-expanded="false">
              Contents
            </a>
            <ul class="dropdown-menu">
{items}
            </ul>
          </li>"##
                )
            })
            .unwrap_or_default();

        format!(
            r##"<header>
  <nav class="navbar navbar-expand-lg sticky-top bg-body-tertiary" {BRANDED_NAV_MARKER}>
    <div class="container-xxl">
      <a class="navbar-brand fw-bold" href="{docs_href}">{brand}</a>
      <button class="navbar-toggler" type="button" data-bs-toggle="collapse" data-bs-target="#navbarNav" aria-controls="navbarNav" aria-expanded="false" aria-label="Toggle navigation">
        <span class="navbar-toggler-icon"></span>
      </button>
      <div class="collapse navbar-collapse" id="navbarNav">
        <ul class="navbar-nav">
          <li class="nav-item">
            <a class="nav-link" href="{docs_href}">Documents</a>
          </li>
          <li class="nav-item">
            <a class="nav-link" href="{trace_href}">Traceability</a>
          </li>{contents_section}
        </ul>
      </div>
    </div>
  </nav>
</header>"##
        )
    }

    fn insert_skip_link(&self, html: String) -> String {
        let html = if html.contains(&format!(r##"href="#{SKIP_TARGET}""##)) {
            html
        } else {
            insert_after(html, &BODY_OPEN, &format!("\n{}", self.catalog.skip_link))
        };

        MAIN_OPEN
            .replacen(&html, 1, |caps: &Captures<'_>| {
                let attributes = &caps[1];
                if attributes.split_whitespace().any(|a| a.starts_with("id=")) {
                    caps[0].to_string()
                } else {
                    format!(r#"<main id="{SKIP_TARGET}"{attributes}>"#)
                }
            })
            .into_owned()
    }

    fn replace_headings(&self, html: &str) -> String {
        let index = escape_html(&self.branding.index_heading());
        let traceability = escape_html(&self.branding.traceability_heading());

        let html = INDEX_HEADING.replace_all(html, NoExpand(&format!("<h1>{index}</h1>")));
        let html = TRACEABILITY_HEADING
            .replace_all(&html, NoExpand(&format!("<h1>{traceability}</h1>")));
        let html = INDEX_TITLE.replace_all(&html, NoExpand(&format!("<title>{index}</title>")));
        TRACEABILITY_TITLE
            .replace_all(&html, NoExpand(&format!("<title>{traceability}</title>")))
            .into_owned()
    }

    fn caption_tables(&self, html: &str) -> String {
        let captioned = format!(
            "<table class=\"table\">\n<caption>{}</caption>\n<thead>",
            self.catalog.traceability_caption
        );
        UNCAPTIONED_TABLE
            .replace_all(html, NoExpand(&captioned))
            .into_owned()
    }

    fn insert_color_scheme_script(&self, html: String) -> String {
        let script = self.catalog.color_scheme_js;
        if html.contains(script) {
            return html;
        }
        // ASCII lowercasing keeps byte offsets intact.
        match html.to_ascii_lowercase().rfind("</body>") {
            Some(at) => format!("{}{script}\n{}", &html[..at], &html[at..]),
            None => html,
        }
    }
}

/// Transforms one document with the default asset catalog.
///
/// Convenience wrapper around [`Transformer::transform`]; prefer building a
/// [`Transformer`] once when processing many documents.
#[must_use]
pub fn transform(document: &str, project_name: &str) -> String {
    Transformer::for_project(project_name).transform(document)
}

/// Documents published under `documents/` reach the shared pages via `../`.
fn nav_prefix(html: &str) -> &'static str {
    if html.contains("../template/") || html.contains("../index.html") {
        "../"
    } else {
        ""
    }
}

fn is_remote(href: &str) -> bool {
    href.starts_with("https://") || href.starts_with("http://") || href.starts_with("//")
}

fn remove_bundled_assets(html: &str) -> String {
    let html = DOORSTOP_STYLESHEETS.replace_all(html, "");
    let html = MATHJAX_SCRIPT.replace_all(&html, "");
    MATHJAX_CONFIG.replace_all(&html, "").into_owned()
}

fn insert_viewport(html: String) -> String {
    const VIEWPORT: &str =
        r#"<meta name="viewport" content="width=device-width, initial-scale=1">"#;

    if html.contains(r#"name="viewport""#) {
        return html;
    }
    let anchor = if META_CHARSET.is_match(&html) {
        &*META_CHARSET
    } else {
        &*HEAD_OPEN
    };
    insert_after(html, anchor, &format!("\n  {VIEWPORT}"))
}

fn insert_after(html: String, anchor: &Regex, snippet: &str) -> String {
    match anchor.find(&html) {
        Some(m) => format!("{}{snippet}{}", &html[..m.end()], &html[m.end()..]),
        None => html,
    }
}

fn insert_before(html: String, anchor: &Regex, snippet: &str) -> String {
    match anchor.find(&html) {
        Some(m) => format!("{}{snippet}{}", &html[..m.start()], &html[m.start()..]),
        None => html,
    }
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
