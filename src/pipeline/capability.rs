// src/pipeline/capability.rs

//! Seams between the pipeline stages and the external transformers.
//!
//! Stages only see the traits here. The default implementations wrap oxc
//! (scripts), grass (SCSS) and lightningcss (vendor prefixes); tests swap in
//! their own.

use std::fmt::Debug;
use std::path::PathBuf;

use anyhow::{Result, anyhow, bail};
use lightningcss::stylesheet::{MinifyOptions, ParserOptions, PrinterOptions, StyleAttribute};
use lightningcss::targets::{Browsers, Targets};
use oxc_allocator::Allocator;
use oxc_codegen::{Codegen, CodegenOptions};
use oxc_minifier::{Minifier, MinifierOptions};
use oxc_parser::Parser;
use oxc_span::SourceType;
use parcel_sourcemap::{OriginalLocation, SourceMap};
use tracing::debug;

use crate::pipeline::css_scan::declaration_spans;
use crate::types::StyleOutput;

/// Options for one script minification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScriptOptions {
    pub mangle: bool,
    pub compress: bool,
    pub source_map: bool,
}

/// Minified code plus an optional source map (JSON).
#[derive(Debug, Clone)]
pub struct Transformed {
    pub code: String,
    pub map: Option<String>,
}

pub trait ScriptMinifier: Send + Sync + Debug {
    /// `file_name` is recorded in the source map and in error messages.
    fn minify(&self, source: &str, file_name: &str, options: ScriptOptions) -> Result<Transformed>;
}

#[derive(Debug, Clone)]
pub struct StyleCompileOptions {
    pub style: StyleOutput,
    /// Directories searched for `@use` / `@import`, in order.
    pub load_paths: Vec<PathBuf>,
}

pub trait StyleCompiler: Send + Sync + Debug {
    fn compile(&self, source: &str, options: &StyleCompileOptions) -> Result<String>;
}

pub trait StylePrefixer: Send + Sync + Debug {
    /// Add the vendor prefixes `browsers` still needs. `None` means no
    /// target restriction, which leaves the stylesheet unchanged.
    fn prefix(
        &self,
        css: &str,
        file_name: &str,
        browsers: Option<Browsers>,
        source_map: bool,
    ) -> Result<Transformed>;
}

/// Source of the browser support targets used for prefixing.
pub trait TargetPolicy: Send + Sync + Debug {
    fn targets(&self) -> Result<Option<Browsers>>;
}

/// Scripts through oxc: parse, minify, print.
#[derive(Debug, Clone, Copy, Default)]
pub struct OxcMinifier;

impl ScriptMinifier for OxcMinifier {
    fn minify(&self, source: &str, file_name: &str, options: ScriptOptions) -> Result<Transformed> {
        let allocator = Allocator::default();
        // Browser scripts, not modules.
        let parsed = Parser::new(&allocator, source, SourceType::cjs()).parse();
        if parsed.panicked || !parsed.errors.is_empty() {
            let first = parsed
                .errors
                .first()
                .map(|e| e.to_string())
                .unwrap_or_else(|| "parser aborted".to_string());
            bail!("{file_name}: {first}");
        }
        let mut program = parsed.program;

        let mut minifier_options = MinifierOptions::default();
        if !options.mangle {
            minifier_options.mangle = None;
        }
        if !options.compress {
            minifier_options.compress = None;
        }
        let minified = Minifier::new(minifier_options).minify(&allocator, &mut program);

        let mut codegen_options = CodegenOptions::minify();
        if options.source_map {
            codegen_options.source_map_path = Some(PathBuf::from(file_name));
        }
        let printed = Codegen::new()
            .with_options(codegen_options)
            .with_scoping(minified.scoping)
            .build(&program);

        Ok(Transformed {
            code: printed.code,
            map: printed.map.map(|m| m.to_json_string()),
        })
    }
}

/// SCSS through grass.
#[derive(Debug, Clone, Copy, Default)]
pub struct GrassCompiler;

impl StyleCompiler for GrassCompiler {
    fn compile(&self, source: &str, options: &StyleCompileOptions) -> Result<String> {
        let style = match options.style {
            StyleOutput::Compressed => grass::OutputStyle::Compressed,
            StyleOutput::Expanded => grass::OutputStyle::Expanded,
        };
        let mut grass_options = grass::Options::default().style(style);
        for dir in &options.load_paths {
            grass_options = grass_options.load_path(dir);
        }
        grass::from_string(source.to_string(), &grass_options).map_err(|e| anyhow!("{e}"))
    }
}

/// Vendor prefixing through lightningcss.
///
/// Only declarations lightningcss prints differently for the targets than
/// for no targets at all are replaced; every other byte of the input is
/// kept as is, so a stylesheet that needs no prefixes comes out unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct LightningPrefixer;

impl StylePrefixer for LightningPrefixer {
    fn prefix(
        &self,
        css: &str,
        file_name: &str,
        browsers: Option<Browsers>,
        source_map: bool,
    ) -> Result<Transformed> {
        let mut code = String::with_capacity(css.len());
        // (output offset, input offset) pairs that line up.
        let mut anchors = vec![(0, 0)];
        let mut copied = 0;

        if let Some(browsers) = browsers {
            let targets = Targets::from(browsers);
            for span in declaration_spans(css) {
                anchors.push((code.len() + span.start - copied, span.start));
                let Some(prefixed) = prefixed_declaration(&css[span.clone()], file_name, targets)?
                else {
                    continue;
                };
                code.push_str(&css[copied..span.start]);
                code.push_str(&prefixed);
                copied = span.end;
                anchors.push((code.len(), span.end));
            }
        }
        code.push_str(&css[copied..]);

        let map = if source_map {
            Some(passthrough_map(css, &code, file_name, &anchors)?)
        } else {
            None
        };
        Ok(Transformed { code, map })
    }
}

/// How lightningcss prints `declaration` for `targets`, when that differs
/// from how it prints it without targets.
fn prefixed_declaration(declaration: &str, file_name: &str, targets: Targets) -> Result<Option<String>> {
    let Some(with_targets) = print_declaration(declaration, file_name, targets)? else {
        return Ok(None);
    };
    let Some(without) = print_declaration(declaration, file_name, Targets::default())? else {
        return Ok(None);
    };
    Ok((with_targets != without).then_some(with_targets))
}

/// `None` when lightningcss cannot parse the declaration; such declarations
/// are left alone.
fn print_declaration(declaration: &str, file_name: &str, targets: Targets) -> Result<Option<String>> {
    let mut block = match StyleAttribute::parse(
        declaration,
        ParserOptions {
            filename: file_name.to_string(),
            ..Default::default()
        },
    ) {
        Ok(block) => block,
        Err(err) => {
            debug!(file = file_name, declaration, error = %err, "leaving unparsed declaration as is");
            return Ok(None);
        }
    };

    block.minify(MinifyOptions {
        targets,
        ..Default::default()
    });
    let printed = block
        .to_css(PrinterOptions {
            minify: true,
            targets,
            ..Default::default()
        })
        .map_err(|e| anyhow!("failed to print `{declaration}` in {file_name}: {e}"))?;
    Ok(Some(printed.code))
}

/// Source map from `output` back to `input`, which differ only where
/// declarations were replaced.
fn passthrough_map(
    input: &str,
    output: &str,
    file_name: &str,
    anchors: &[(usize, usize)],
) -> Result<String> {
    let mut map = SourceMap::new("/");
    let source = map.add_source(file_name);
    map.set_source_content(source as usize, input)
        .map_err(|e| anyhow!("source map for {file_name}: {e:?}"))?;

    let mut generated = TextPosition::new(output);
    let mut original = TextPosition::new(input);
    for &(output_at, input_at) in anchors {
        let (line, column) = generated.advance(output_at);
        let (original_line, original_column) = original.advance(input_at);
        map.add_mapping(
            line,
            column,
            Some(OriginalLocation::new(original_line, original_column, source, None)),
        );
    }

    map.to_json(None)
        .map_err(|e| anyhow!("source map for {file_name}: {e:?}"))
}

/// Line and UTF-16 column of a forward-moving byte offset.
struct TextPosition<'a> {
    text: &'a str,
    offset: usize,
    line: u32,
    column: u32,
}

impl<'a> TextPosition<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            text,
            offset: 0,
            line: 0,
            column: 0,
        }
    }

    fn advance(&mut self, to: usize) -> (u32, u32) {
        let to = to.clamp(self.offset, self.text.len());
        for ch in self.text[self.offset..to].chars() {
            if ch == '\n' {
                self.line += 1;
                self.column = 0;
            } else {
                self.column += ch.len_utf16() as u32;
            }
        }
        self.offset = to;
        (self.line, self.column)
    }
}

/// Targets from browserslist queries such as `"last 4 versions"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrowserslistPolicy {
    queries: Vec<String>,
}

impl BrowserslistPolicy {
    pub fn new(queries: Vec<String>) -> Self {
        Self { queries }
    }
}

impl TargetPolicy for BrowserslistPolicy {
    fn targets(&self) -> Result<Option<Browsers>> {
        Browsers::from_browserslist(self.queries.iter().map(String::as_str))
            .map_err(|e| anyhow!("invalid browser query {:?}: {e}", self.queries))
    }
}

/// A fixed set of targets, independent of any query data.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedTargets(pub Option<Browsers>);

impl TargetPolicy for FixedTargets {
    fn targets(&self) -> Result<Option<Browsers>> {
        Ok(self.0)
    }
}
