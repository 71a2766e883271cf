//! Source analysis: turning one source file into module definitions
//!
//! The build pipeline only depends on the [`SourceAnalyzer`] trait. Any
//! analyzer that can report which module ids a file declares, together with
//! their dependency lists and the transformed output, can be plugged in.
//!
//! [`DefineAnalyzer`] is the default implementation for AMD-style sources:
//!
//! ```text
//! define('app/list', ['app/item', './util'], function (item, util) {
//!     require(['app/detail'], function (detail) { ... });   // async dep
//!     var fmt = require('lib/fmt');                          // sync dep
//! });
//! ```
//!
//! Anonymous `define([...], fn)` calls are named after the file's base id.

use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::BuildFailure;

/// Options forwarded to the analyzer for one file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnalyzeOptions {
    /// Keep formatting (blank lines, trailing whitespace) intact
    pub beautify: bool,
    /// Wrap files without any `define` call into one named after the base id
    pub amd_wrapper: bool,
    /// Name recorded as the source in the generated source map
    pub source_name: String,
}

/// Dependencies declared by one module
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleDefinition {
    pub sync_deps: Vec<String>,
    pub async_deps: Vec<String>,
}

/// Result of analyzing one source file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Analysis {
    /// Transformed code
    pub output: String,
    /// Source map (JSON, revision 3) for `output`
    pub source_map: String,
    /// Module id -> dependencies
    pub definitions: BTreeMap<String, ModuleDefinition>,
}

/// Extracts module definitions from source text.
///
/// Implementations must be deterministic: identical input and options must
/// produce byte-identical output, since artifact paths are derived from it.
pub trait SourceAnalyzer: Send + Sync {
    fn analyze(
        &self,
        source: &str,
        base_id: &str,
        options: &AnalyzeOptions,
    ) -> std::result::Result<Analysis, BuildFailure>;
}

static DEFINE_CALL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:^|[^.\w$])define\s*\(").expect("valid define regex"));
static SYNC_REQUIRE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?:^|[^.\w$])require\s*\(\s*['"]([^'"]+)['"]\s*\)"#).expect("valid require regex")
});
static ASYNC_REQUIRE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:^|[^.\w$])require\s*\(\s*\[([^\]]*)\]").expect("valid require regex")
});
static STRING_LITERAL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"['"]([^'"]*)['"]"#).expect("valid string regex"));

const RESERVED_DEPS: [&str; 3] = ["require", "exports", "module"];

/// Default analyzer for AMD `define` sources
#[derive(Debug, Clone, Copy, Default)]
pub struct DefineAnalyzer;

impl DefineAnalyzer {
    pub fn new() -> Self {
        Self
    }
}

/// One `define(...)` call found in the source
struct DefineCall {
    /// Byte offset just past the opening parenthesis
    args_start: usize,
    /// Byte offset of the matching closing parenthesis
    args_end: usize,
    id: Option<String>,
    deps: Vec<String>,
}

impl SourceAnalyzer for DefineAnalyzer {
    fn analyze(
        &self,
        source: &str,
        base_id: &str,
        options: &AnalyzeOptions,
    ) -> std::result::Result<Analysis, BuildFailure> {
        let masked = mask_comments(source);
        let calls = find_define_calls(source, &masked)
            .map_err(|f| f.with_filename(options.source_name.clone()))?;

        let mut definitions = BTreeMap::new();
        let mut anonymous_at: Option<usize> = None;
        let mut insertions: Vec<(usize, String)> = Vec::new();

        for call in &calls {
            let id = match &call.id {
                Some(id) => resolve_relative(base_id, id),
                None => {
                    if anonymous_at.is_some() {
                        let (line, column) = line_col(source, call.args_start);
                        return Err(BuildFailure::new("multiple anonymous define calls")
                            .with_code("E_ANONYMOUS_DEFINE")
                            .with_filename(options.source_name.clone())
                            .at(line, column));
                    }
                    anonymous_at = Some(call.args_start);
                    insertions.push((call.args_start, format!("'{}', ", base_id)));
                    base_id.to_string()
                }
            };

            let body = &masked[call.args_start..call.args_end];
            let mut definition = collect_requires(body, &id);
            let mut sync_deps: Vec<String> = call
                .deps
                .iter()
                .filter(|d| !RESERVED_DEPS.contains(&d.as_str()))
                .map(|d| resolve_relative(&id, d))
                .collect();
            sync_deps.append(&mut definition.sync_deps);
            definition.sync_deps = dedup(sync_deps);
            definitions.insert(id, definition);
        }

        let mut code = source.to_string();
        for (offset, text) in insertions.into_iter().rev() {
            code.insert_str(offset, &text);
        }

        let mut lines: Vec<(String, Option<usize>)> = code
            .lines()
            .enumerate()
            .map(|(idx, line)| (line.to_string(), Some(idx)))
            .collect();

        if calls.is_empty() && options.amd_wrapper {
            let definition = collect_requires(&masked, base_id);
            lines.insert(
                0,
                (
                    format!("define('{}', function (require, exports, module) {{", base_id),
                    None,
                ),
            );
            lines.push(("});".to_string(), None));
            definitions.insert(base_id.to_string(), definition);
        }

        if !options.beautify {
            lines = lines
                .into_iter()
                .map(|(line, src)| (line.trim_end().to_string(), src))
                .filter(|(line, _)| !line.is_empty())
                .collect();
        }

        let mut output = lines
            .iter()
            .map(|(line, _)| line.as_str())
            .collect::<Vec<_>>()
            .join("\n");
        output.push('\n');

        let source_map = build_source_map(&options.source_name, &lines);

        Ok(Analysis {
            output,
            source_map,
            definitions,
        })
    }
}

/// Replace comment bodies with spaces, keeping newlines and byte offsets
fn mask_comments(source: &str) -> String {
    let bytes = source.as_bytes();
    let mut out = bytes.to_vec();
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'\'' | b'"' | b'`' => {
                i = skip_string(bytes, i);
            }
            b'/' if bytes.get(i + 1) == Some(&b'/') => {
                while i < bytes.len() && bytes[i] != b'\n' {
                    out[i] = b' ';
                    i += 1;
                }
            }
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                let start = i;
                i += 2;
                while i < bytes.len() && !(bytes[i] == b'*' && bytes.get(i + 1) == Some(&b'/')) {
                    i += 1;
                }
                let end = (i + 2).min(bytes.len());
                for b in out.iter_mut().take(end).skip(start) {
                    if *b != b'\n' {
                        *b = b' ';
                    }
                }
                i = end;
            }
            _ => i += 1,
        }
    }
    // Comments start and end on ASCII bytes, so whole characters were blanked.
    String::from_utf8(out).unwrap_or_else(|e| String::from_utf8_lossy(e.as_bytes()).into_owned())
}

/// Index just past the string literal starting at `start`
fn skip_string(bytes: &[u8], start: usize) -> usize {
    let quote = bytes[start];
    let mut i = start + 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b if b == quote => return i + 1,
            b'\n' if quote != b'`' => return i + 1,
            _ => i += 1,
        }
    }
    bytes.len()
}

fn find_define_calls(source: &str, masked: &str) -> std::result::Result<Vec<DefineCall>, BuildFailure> {
    let mut calls = Vec::new();
    let bytes = masked.as_bytes();

    for m in DEFINE_CALL.find_iter(masked) {
        let args_start = m.end();
        let args_end = match matching_paren(bytes, args_start) {
            Some(end) => end,
            None => {
                let (line, column) = line_col(source, m.start());
                return Err(BuildFailure::new("unterminated define call")
                    .with_code("E_UNBALANCED")
                    .at(line, column));
            }
        };

        let args = &masked[args_start..args_end];
        let mut rest = args.trim_start();
        let mut id = None;
        if rest.starts_with('\'') || rest.starts_with('"') {
            if let Some(caps) = STRING_LITERAL.captures(rest) {
                if let Some(whole) = caps.get(0) {
                    if whole.start() == 0 {
                        id = Some(caps[1].to_string());
                        rest = rest[whole.end()..].trim_start();
                        rest = rest.strip_prefix(',').unwrap_or(rest).trim_start();
                    }
                }
            }
        }

        let mut deps = Vec::new();
        if rest.starts_with('[') {
            if let Some(close) = rest.find(']') {
                deps = STRING_LITERAL
                    .captures_iter(&rest[..close])
                    .map(|c| c[1].to_string())
                    .collect();
            }
        }

        calls.push(DefineCall {
            args_start,
            args_end,
            id,
            deps,
        });
    }

    Ok(calls)
}

/// Offset of the `)` closing the call whose arguments start at `start`
fn matching_paren(bytes: &[u8], start: usize) -> Option<usize> {
    let mut depth = 1usize;
    let mut i = start;
    while i < bytes.len() {
        match bytes[i] {
            b'\'' | b'"' | b'`' => {
                i = skip_string(bytes, i);
                continue;
            }
            b'(' | b'[' | b'{' => depth += 1,
            b')' | b']' | b'}' => {
                depth -= 1;
                if depth == 0 {
                    return (bytes[i] == b')').then_some(i);
                }
            }
            _ => {}
        }
        i += 1;
    }
    None
}

fn collect_requires(body: &str, module_id: &str) -> ModuleDefinition {
    let sync_deps = SYNC_REQUIRE
        .captures_iter(body)
        .map(|c| c[1].to_string())
        .filter(|d| !RESERVED_DEPS.contains(&d.as_str()))
        .map(|d| resolve_relative(module_id, &d))
        .collect();

    let async_deps = ASYNC_REQUIRE
        .captures_iter(body)
        .flat_map(|c| {
            STRING_LITERAL
                .captures_iter(&c[1])
                .map(|s| s[1].to_string())
                .collect::<Vec<_>>()
        })
        .filter(|d| !RESERVED_DEPS.contains(&d.as_str()))
        .map(|d| resolve_relative(module_id, &d))
        .collect();

    ModuleDefinition {
        sync_deps: dedup(sync_deps),
        async_deps: dedup(async_deps),
    }
}

/// Resolve `./x` and `../x` against the directory of `module_id`
pub fn resolve_relative(module_id: &str, dep: &str) -> String {
    if !dep.starts_with("./") && !dep.starts_with("../") {
        return dep.to_string();
    }

    let mut segments: Vec<&str> = module_id.split('/').collect();
    segments.pop();
    for part in dep.split('/') {
        match part {
            "." | "" => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    segments.join("/")
}

fn dedup(items: Vec<String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    items.into_iter().filter(|i| seen.insert(i.clone())).collect()
}

/// 1-based line and column of a byte offset
fn line_col(source: &str, offset: usize) -> (u32, u32) {
    let before = &source[..offset.min(source.len())];
    let line = before.matches('\n').count() + 1;
    let column = before.len() - before.rfind('\n').map(|p| p + 1).unwrap_or(0) + 1;
    (line as u32, column as u32)
}

const VLQ_CHARS: &[u8; 64] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";

fn encode_vlq(value: i64, out: &mut String) {
    let mut v = if value < 0 { ((-value) << 1) | 1 } else { value << 1 };
    loop {
        let mut digit = (v & 31) as usize;
        v >>= 5;
        if v > 0 {
            digit |= 32;
        }
        out.push(VLQ_CHARS[digit] as char);
        if v == 0 {
            break;
        }
    }
}

/// Line-granular source map: each output line maps column 0 to column 0 of
/// the source line it came from.
fn build_source_map(source_name: &str, lines: &[(String, Option<usize>)]) -> String {
    let mut mappings = String::new();
    let mut prev_src_line: i64 = 0;
    for (idx, (_, src_line)) in lines.iter().enumerate() {
        if idx > 0 {
            mappings.push(';');
        }
        if let Some(src_line) = src_line {
            let src_line = *src_line as i64;
            mappings.push_str("AA");
            encode_vlq(src_line - prev_src_line, &mut mappings);
            mappings.push('A');
            prev_src_line = src_line;
        }
    }

    serde_json::json!({
        "version": 3,
        "file": source_name,
        "sources": [source_name],
        "names": [],
        "mappings": mappings,
    })
    .to_string()
}
