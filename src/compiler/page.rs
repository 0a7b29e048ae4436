//! Rendering a single page.

use super::{CompileError, Compiler, TemplateScan, scan::Scanner};
use serde_json::{Map, Value};
use std::{
    fs, io,
    path::{Path, PathBuf},
};
use tera::{Context, Tera};

/// Name the page itself is registered under in its template set.
///
/// `@` never appears in a template-root-relative file name, so the entry
/// can't collide with a fragment.
pub const PAGE_TEMPLATE: &str = "@page";

/// Templates whose names end with one of these are autoescaped.
const AUTOESCAPE_SUFFIXES: &[&str] = &[PAGE_TEMPLATE, ".html", ".htm", ".xml"];

impl Compiler {
    /// Render `page` and return the output bytes.
    ///
    /// Every call re-reads the page, its fragments and its sidecar from disk
    /// and refreshes the page's edges in the dependency graph, including when
    /// rendering later fails on a syntax or data error.
    pub fn compile(&mut self, page: &Path) -> Result<Vec<u8>, CompileError> {
        let scan = Scanner::new(&self.config.templates).scan(page)?;
        self.record_scan(page, &scan);

        // Tracked even while absent so creating it later rebuilds the page.
        let data_path = self.data_path(page);
        self.graph.record(page, [&data_path]);

        let tera = template_set(page, &scan)?;

        let context = match read_data(&data_path)? {
            Some(raw) => {
                let data = parse_data(&data_path, &raw)?;
                Context::from_value(Value::Object(data))
                    .map_err(|err| CompileError::Render(page.to_path_buf(), err))?
            }
            None => Context::new(),
        };

        let rendered = tera
            .render(PAGE_TEMPLATE, &context)
            .map_err(|err| CompileError::Render(page.to_path_buf(), err))?;

        Ok(rendered.into_bytes())
    }

    /// Drop every edge `page` holds, for pages that only ever exist once.
    pub fn forget(&mut self, page: &Path) {
        self.graph.replace(page, std::iter::empty::<&Path>());
    }

    /// Page depends on every fragment it reaches; each fragment depends on
    /// the fragments it references directly.
    fn record_scan(&mut self, page: &Path, scan: &TemplateScan) {
        self.graph.replace(page, scan.fragment_paths());
        for fragment in &scan.fragments {
            self.graph.replace(&fragment.path, &fragment.references);
        }
    }
}

/// Build one template set from the page and all of its fragments.
fn template_set(page: &Path, scan: &TemplateScan) -> Result<Tera, CompileError> {
    let mut tera = Tera::default();
    tera.autoescape_on(AUTOESCAPE_SUFFIXES.to_vec());

    let templates = std::iter::once((PAGE_TEMPLATE, scan.source.as_str())).chain(
        scan.fragments
            .iter()
            .map(|f| (f.name.as_str(), f.source.as_str())),
    );
    tera.add_raw_templates(templates)
        .map_err(|err| CompileError::Template(page.to_path_buf(), err))?;

    Ok(tera)
}

/// Read the sidecar file. A missing sidecar is not an error.
fn read_data(path: &Path) -> Result<Option<String>, CompileError> {
    match fs::read_to_string(path) {
        Ok(raw) => Ok(Some(raw)),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(err) => Err(CompileError::Read(path.to_path_buf(), err)),
    }
}

/// Sidecar data must be a JSON object; its keys become template variables.
pub fn parse_data(path: &Path, raw: &str) -> Result<Map<String, Value>, CompileError> {
    serde_json::from_str(raw).map_err(|err| CompileError::Data(PathBuf::from(path), err))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BuildConfig;
    use tempfile::TempDir;

    struct Site {
        dir: TempDir,
        compiler: Compiler,
    }

    impl Site {
        fn new() -> Self {
            let dir = TempDir::new().unwrap();
            let compiler = Compiler::new(BuildConfig::for_root(dir.path()));
            Self { dir, compiler }
        }

        fn write(&self, rel: &str, content: &str) -> PathBuf {
            let path = self.dir.path().join(rel);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(&path, content).unwrap();
            path
        }

        fn path(&self, rel: &str) -> PathBuf {
            self.dir.path().join(rel)
        }

        fn compile(&mut self, rel: &str) -> Result<String, CompileError> {
            let page = self.path(rel);
            self.compiler
                .compile(&page)
                .map(|bytes| String::from_utf8(bytes).unwrap())
        }
    }

    #[test]
    fn test_compile_plain_page_is_idempotent() {
        let mut site = Site::new();
        site.write("index.html", "<h1>Hello</h1>\n");

        let first = site.compile("index.html").unwrap();
        let second = site.compile("index.html").unwrap();
        assert_eq!(first, "<h1>Hello</h1>\n");
        assert_eq!(first, second);
    }

    #[test]
    fn test_compile_with_fragments() {
        let mut site = Site::new();
        site.write(".templates/head.html", "<head><title>{{ title }}</title></head>");
        site.write(
            ".templates/layout.html",
            r#"<html>{% include "head.html" %}<body>{{ body }}</body></html>"#,
        );
        site.write("index.html", r#"{% include "layout.html" %}"#);
        site.write("index_meta.json", r#"{"title": "Home", "body": "Welcome"}"#);

        assert_eq!(
            site.compile("index.html").unwrap(),
            "<html><head><title>Home</title></head><body>Welcome</body></html>"
        );
    }

    #[test]
    fn test_compile_with_extends_and_nested_names() {
        let mut site = Site::new();
        site.write(
            ".templates/layouts/base.html",
            "<main>{% block content %}{% endblock content %}</main>",
        );
        site.write(
            "about.html",
            r#"{% extends "layouts/base.html" %}{% block content %}About{% endblock content %}"#,
        );

        assert_eq!(site.compile("about.html").unwrap(), "<main>About</main>");
    }

    #[test]
    fn test_compile_registers_transitive_dependencies() {
        let mut site = Site::new();
        site.write(".templates/g.html", "g");
        site.write(".templates/f.html", r#"f{% include "g.html" %}"#);
        site.write("index.html", r#"{% include "f.html" %}"#);

        site.compile("index.html").unwrap();

        let graph = site.compiler.graph();
        let g = site.path(".templates/g.html");
        let mut dependents = graph.dependents(&g);
        dependents.sort();
        assert_eq!(
            dependents,
            vec![site.path(".templates/f.html").as_path(), site.path("index.html").as_path()]
        );
        assert!(graph.affected(&g).contains(&site.path("index.html")));
    }

    #[test]
    fn test_recompile_does_not_duplicate_edges() {
        let mut site = Site::new();
        site.write(".templates/head.html", "h");
        site.write("index.html", r#"{% include "head.html" %}"#);

        site.compile("index.html").unwrap();
        site.compile("index.html").unwrap();

        let head = site.path(".templates/head.html");
        assert_eq!(site.compiler.graph().dependents(&head).len(), 1);
    }

    #[test]
    fn test_recompile_retracts_removed_reference() {
        let mut site = Site::new();
        site.write(".templates/old.html", "old");
        site.write(".templates/new.html", "new");
        site.write("index.html", r#"{% include "old.html" %}"#);
        site.compile("index.html").unwrap();

        site.write("index.html", r#"{% include "new.html" %}"#);
        site.compile("index.html").unwrap();

        let graph = site.compiler.graph();
        assert!(graph.dependents(&site.path(".templates/old.html")).is_empty());
        assert_eq!(graph.dependents(&site.path(".templates/new.html")).len(), 1);
    }

    #[test]
    fn test_sidecar_is_dependency() {
        let mut site = Site::new();
        site.write("index.html", "{{ title }}");
        site.write("index_meta.json", r#"{"title": "Data"}"#);

        assert_eq!(site.compile("index.html").unwrap(), "Data");
        assert_eq!(
            site.compiler.graph().dependents(&site.path("index_meta.json")),
            vec![site.path("index.html").as_path()]
        );
    }

    #[test]
    fn test_no_sidecar_renders_without_context() {
        let mut site = Site::new();
        site.write("index.html", "{% if title is defined %}{{ title }}{% else %}untitled{% endif %}");
        assert_eq!(site.compile("index.html").unwrap(), "untitled");
        // the absent sidecar is still watched for
        assert_eq!(
            site.compiler.graph().dependencies(&site.path("index.html")),
            vec![site.path("index_meta.json").as_path()]
        );
    }

    #[test]
    fn test_compile_with_each_quote_style() {
        let mut site = Site::new();
        site.write(".templates/a.html", "A");
        site.write(".templates/b.html", "B");
        site.write(".templates/c.html", "C");
        site.write(
            "index.html",
            "{% include \"a.html\" %}{% include 'b.html' %}{% include `c.html` %}",
        );

        assert_eq!(site.compile("index.html").unwrap(), "ABC");
        for name in ["a.html", "b.html", "c.html"] {
            let fragment = site.path(&format!(".templates/{name}"));
            assert_eq!(site.compiler.graph().dependents(&fragment).len(), 1);
        }
    }

    #[test]
    fn test_ignore_missing_fragment_renders_nothing() {
        let mut site = Site::new();
        site.write("index.html", r#"a{% include "footer.html" ignore missing %}b"#);

        assert_eq!(site.compile("index.html").unwrap(), "ab");
        // creating the fragment later must reach the page
        assert!(
            site.compiler
                .graph()
                .affected(&site.path(".templates/footer.html"))
                .contains(&site.path("index.html"))
        );

        site.write(".templates/footer.html", "-");
        assert_eq!(site.compile("index.html").unwrap(), "a-b");
    }

    #[test]
    fn test_forget_drops_page_edges() {
        let mut site = Site::new();
        site.write(".templates/head.html", "h");
        site.write("index.html", r#"{% include "head.html" %}"#);
        site.compile("index.html").unwrap();

        site.compiler.forget(&site.path("index.html"));
        let graph = site.compiler.graph();
        assert!(graph.dependents(&site.path(".templates/head.html")).is_empty());
        assert!(graph.dependents(&site.path("index_meta.json")).is_empty());
    }

    #[test]
    fn test_sidecar_values_are_escaped() {
        let mut site = Site::new();
        site.write("index.html", "{{ snippet }}|{{ snippet | safe }}");
        site.write("index_meta.json", r#"{"snippet": "<b>"}"#);
        assert_eq!(site.compile("index.html").unwrap(), "&lt;b&gt;|<b>");
    }

    #[test]
    fn test_undefined_variable_is_render_error() {
        let mut site = Site::new();
        site.write("index.html", "{{ nothing.here }}");
        assert!(matches!(site.compile("index.html"), Err(CompileError::Render(..))));
    }

    #[test]
    fn test_malformed_sidecar_is_data_error_but_still_tracked() {
        let mut site = Site::new();
        site.write("index.html", "{{ title }}");
        site.write("index_meta.json", r#"{"title": "#);

        assert!(matches!(site.compile("index.html"), Err(CompileError::Data(..))));
        // fixing the data file alone must be able to trigger a rebuild
        assert_eq!(
            site.compiler.graph().dependents(&site.path("index_meta.json")).len(),
            1
        );
    }

    #[test]
    fn test_non_object_sidecar_is_data_error() {
        let mut site = Site::new();
        site.write("index.html", "x");
        site.write("index_meta.json", "[1, 2, 3]");
        assert!(matches!(site.compile("index.html"), Err(CompileError::Data(..))));
    }

    #[test]
    fn test_syntax_error_in_fragment() {
        let mut site = Site::new();
        site.write(".templates/broken.html", "{% if %}");
        site.write("index.html", r#"{% include "broken.html" %}"#);

        assert!(matches!(site.compile("index.html"), Err(CompileError::Template(..))));
        // edges exist so fixing the fragment rebuilds the page
        assert_eq!(
            site.compiler.graph().dependents(&site.path(".templates/broken.html")).len(),
            1
        );
    }

    #[test]
    fn test_missing_page() {
        let mut site = Site::new();
        assert!(matches!(site.compile("ghost.html"), Err(CompileError::Read(..))));
    }

    #[test]
    fn test_parse_data_object() {
        let data = parse_data(Path::new("x_meta.json"), r#"{"n": 1, "tags": ["a"]}"#).unwrap();
        assert_eq!(data["n"], 1);
        assert_eq!(data["tags"][0], "a");
    }
}
