// tests/pipeline_build.rs

use std::error::Error;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use tempfile::tempdir;

use assetpipe::errors::PipelineError;
use assetpipe::fs::RealFileSystem;
use assetpipe::pipeline::Orchestrator;
use assetpipe::pipeline::capability::{
    GrassCompiler, OxcMinifier, ScriptMinifier, ScriptOptions, StyleCompileOptions, StyleCompiler,
};
use assetpipe::types::{StageName, StyleOutput};
use assetpipe_test_utils::builders::ConfigFileBuilder;
use assetpipe_test_utils::init_tracing;

type TestResult = Result<(), Box<dyn Error>>;

fn write(root: &Path, rel: &str, contents: &str) -> std::io::Result<()> {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, contents)
}

fn scaffold(root: &Path) -> std::io::Result<()> {
    write(root, "components/scripts/b.js", "function greet(name) {\n  return 'hi ' + name;\n}\n")?;
    write(root, "components/scripts/a.js", "var greeting = 'hello';\n")?;
    write(root, "components/scss/_colors.scss", "$brand: #336699;\n")?;
    write(
        root,
        "components/scss/styles.scss",
        "@import 'colors';\nbody { color: $brand; .note { user-select: none; } }\n",
    )
}

#[test]
fn default_build_writes_every_output() -> TestResult {
    init_tracing();
    let dir = tempdir()?;
    let root = dir.path();
    scaffold(root)?;

    let cfg = ConfigFileBuilder::new().build();
    let orchestrator = Orchestrator::from_config(&cfg, root, Arc::new(RealFileSystem));
    let report = orchestrator.run_all(cfg.task_graph())?;

    assert_eq!(report.stages_run(), StageName::ALL.to_vec());

    // Sorted by name: a.js before b.js, joined with the default "\n".
    let concat = fs::read_to_string(root.join("dist/js/scripts.js"))?;
    assert!(concat.starts_with("var greeting = 'hello';\n\nfunction greet"));

    let min = fs::read_to_string(root.join("dist/js/scripts.min.js"))?;
    assert!(min.ends_with("//# sourceMappingURL=scripts.min.js.map"));
    // Sources are resolved relative to the map file.
    let map = fs::read_to_string(root.join("dist/js/scripts.min.js.map"))?;
    assert!(map.contains(r#""sources":["scripts.js"]"#), "{map}");

    let css = fs::read_to_string(root.join("dist/css/styles.min.css"))?;
    assert!(css.contains("#369"));
    assert!(css.ends_with("/*# sourceMappingURL=styles.min.css.map */"));
    assert!(root.join("dist/css/styles.min.css.map").is_file());
    Ok(())
}

#[test]
fn missing_stylesheet_fails_before_any_output() -> TestResult {
    init_tracing();
    let dir = tempdir()?;
    let root = dir.path();
    write(root, "components/scripts/a.js", "var a = 1;\n")?;

    let cfg = ConfigFileBuilder::new().build();
    let orchestrator = Orchestrator::from_config(&cfg, root, Arc::new(RealFileSystem));
    let err = orchestrator.run_all(cfg.task_graph()).unwrap_err();

    match err {
        PipelineError::NoMatch { pattern } => assert_eq!(pattern, "components/scss/styles.scss"),
        other => panic!("expected NoMatch, got {other:?}"),
    }
    assert!(!root.join("dist").exists());
    Ok(())
}

#[test]
fn plain_css_survives_compile_and_prefix_unchanged() -> TestResult {
    init_tracing();
    let dir = tempdir()?;
    let root = dir.path();
    write(root, "components/scripts/a.js", "var a = 1;\n")?;
    write(root, "components/scss/styles.scss", "body{color:red}")?;

    let cfg = ConfigFileBuilder::new().with_style_map(false).build();
    Orchestrator::from_config(&cfg, root, Arc::new(RealFileSystem)).run_all(cfg.task_graph())?;

    let css = fs::read_to_string(root.join("dist/css/styles.min.css"))?;
    assert_eq!(css.trim(), "body{color:red}");
    assert!(!root.join("dist/css/styles.min.css.map").exists());
    Ok(())
}

#[test]
fn prefixing_keeps_rules_that_need_no_prefix() -> TestResult {
    init_tracing();
    let dir = tempdir()?;
    let root = dir.path();
    let scss = "body{color:#ff0000;margin:0 0 0 0}.b{color:red}.c{color:red}";
    write(root, "components/scripts/a.js", "var a = 1;\n")?;
    write(root, "components/scss/styles.scss", scss)?;

    let cfg = ConfigFileBuilder::new().with_style_map(false).build();
    Orchestrator::from_config(&cfg, root, Arc::new(RealFileSystem)).run_all(cfg.task_graph())?;

    let compiled = GrassCompiler.compile(
        scss,
        &StyleCompileOptions {
            style: StyleOutput::Compressed,
            load_paths: Vec::new(),
        },
    )?;
    let css = fs::read_to_string(root.join("dist/css/styles.min.css"))?;
    // No merged selectors, no collapsed shorthands.
    assert_eq!(css, compiled);
    assert!(css.contains("margin:0 0 0 0"));
    Ok(())
}

#[test]
fn old_browsers_get_vendor_prefixes() -> TestResult {
    init_tracing();
    let dir = tempdir()?;
    let root = dir.path();
    write(root, "components/scripts/a.js", "var a = 1;\n")?;
    write(
        root,
        "components/scss/styles.scss",
        ".a { user-select: none; margin: 0 0 0 0; }\n.b { color: red; }\n.c { color: red; }\n",
    )?;

    let cfg = ConfigFileBuilder::new()
        .with_prefix(&["dist/css/*.css"], &["safari 8"])
        .with_style_map(false)
        .build();
    Orchestrator::from_config(&cfg, root, Arc::new(RealFileSystem)).run_all(cfg.task_graph())?;

    let css = fs::read_to_string(root.join("dist/css/styles.min.css"))?;
    assert!(css.contains("-webkit-user-select:none;user-select:none"), "{css}");
    assert!(css.contains("margin:0 0 0 0"), "{css}");
    assert!(css.contains(".b{color:red}.c{color:red}"), "{css}");
    Ok(())
}

#[test]
fn script_syntax_error_names_the_stage() -> TestResult {
    init_tracing();
    let dir = tempdir()?;
    let root = dir.path();
    scaffold(root)?;
    write(root, "components/scripts/c.js", "function (\n")?;

    let cfg = ConfigFileBuilder::new().build();
    let err = Orchestrator::from_config(&cfg, root, Arc::new(RealFileSystem))
        .run_all(cfg.task_graph())
        .unwrap_err();

    assert_eq!(err.failed_stage(), Some(StageName::Minify));
    // Concat already ran; styles never did.
    assert!(root.join("dist/js/scripts.js").is_file());
    assert!(!root.join("dist/css/styles.min.css").exists());
    Ok(())
}

#[test]
fn minifying_twice_never_grows() -> TestResult {
    let source = "function add(first, second) {\n  var total = first + second;\n  return total;\n}\nconsole.log(add(1, 2));\n";
    let options = ScriptOptions {
        mangle: true,
        compress: true,
        source_map: false,
    };

    let once = OxcMinifier.minify(source, "a.js", options)?;
    let twice = OxcMinifier.minify(&once.code, "a.js", options)?;

    assert!(once.code.len() < source.len());
    assert!(twice.code.len() <= once.code.len());
    Ok(())
}
