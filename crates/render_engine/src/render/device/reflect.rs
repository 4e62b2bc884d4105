//! GLSL uniform reflection
//!
//! Produces the set of uniform names a linked program would accept for
//! location lookup: structs are flattened with `.`, arrays are expanded with
//! `[i]`, and an array of a basic type also answers to its bare name (element 0).
//! Interface blocks are skipped since their members are not addressable by
//! name lookup. Array sizes may be integer literals or `#define` constants.

use std::collections::{HashMap, HashSet};

const MAX_STRUCT_DEPTH: usize = 8;

#[derive(Debug, Clone)]
struct Declarator {
    ty: String,
    name: String,
    array_len: Option<usize>,
}

/// Collect every addressable uniform name declared across `sources`
///
/// Names are returned in declaration order without duplicates.
pub fn uniform_names(sources: &[&str]) -> Vec<String> {
    let mut names = Vec::new();
    let mut seen = HashSet::new();
    for source in sources {
        let parsed = Parser::new(source).parse();
        for decl in &parsed.uniforms {
            let mut expanded = Vec::new();
            expand(decl, &parsed.structs, "", &mut expanded, 0);
            for name in expanded {
                if seen.insert(name.clone()) {
                    names.push(name);
                }
            }
        }
    }
    names
}

fn expand(
    decl: &Declarator,
    structs: &HashMap<String, Vec<Declarator>>,
    prefix: &str,
    out: &mut Vec<String>,
    depth: usize,
) {
    let base = if prefix.is_empty() {
        decl.name.clone()
    } else {
        format!("{prefix}.{}", decl.name)
    };
    let fields = structs.get(&decl.ty);
    match decl.array_len {
        Some(len) => {
            if fields.is_none() {
                out.push(base.clone());
            }
            for i in 0..len {
                expand_single(fields, structs, format!("{base}[{i}]"), out, depth);
            }
        }
        None => expand_single(fields, structs, base, out, depth),
    }
}

fn expand_single(
    fields: Option<&Vec<Declarator>>,
    structs: &HashMap<String, Vec<Declarator>>,
    name: String,
    out: &mut Vec<String>,
    depth: usize,
) {
    match fields {
        Some(fields) if depth < MAX_STRUCT_DEPTH => {
            for field in fields {
                expand(field, structs, &name, out, depth + 1);
            }
        }
        Some(_) => log::warn!("Struct nesting too deep while reflecting '{name}'"),
        None => out.push(name),
    }
}

#[derive(Default)]
struct Parsed {
    structs: HashMap<String, Vec<Declarator>>,
    uniforms: Vec<Declarator>,
}

struct Parser {
    tokens: Vec<String>,
    defines: HashMap<String, usize>,
    pos: usize,
}

impl Parser {
    fn new(source: &str) -> Self {
        let mut defines = HashMap::new();
        let mut code = String::new();
        for line in strip_comments(source).lines() {
            let trimmed = line.trim_start();
            if let Some(directive) = trimmed.strip_prefix('#') {
                let mut parts = directive.split_whitespace();
                if parts.next() == Some("define") {
                    if let (Some(name), Some(value)) = (parts.next(), parts.next()) {
                        if let Ok(value) = value.parse::<usize>() {
                            defines.insert(name.to_string(), value);
                        }
                    }
                }
                continue;
            }
            code.push_str(line);
            code.push('\n');
        }
        Self {
            tokens: tokenize(&code),
            defines,
            pos: 0,
        }
    }

    fn peek(&self) -> Option<&str> {
        self.tokens.get(self.pos).map(String::as_str)
    }

    fn next(&mut self) -> Option<String> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    fn parse(mut self) -> Parsed {
        let mut parsed = Parsed::default();
        let mut depth = 0usize;
        while let Some(token) = self.next() {
            match token.as_str() {
                "{" => depth += 1,
                "}" => depth = depth.saturating_sub(1),
                "struct" if depth == 0 => {
                    if let Some((name, fields)) = self.parse_struct() {
                        parsed.structs.insert(name, fields);
                    }
                }
                "uniform" if depth == 0 => {
                    let decls = self.parse_uniform();
                    parsed.uniforms.extend(decls);
                }
                _ => {}
            }
        }
        parsed
    }

    fn parse_struct(&mut self) -> Option<(String, Vec<Declarator>)> {
        let name = self.next()?;
        if self.next()? != "{" {
            return None;
        }
        let mut fields = Vec::new();
        while self.peek()? != "}" {
            let ty = self.skip_qualifiers()?;
            fields.extend(self.parse_declarators(&ty)?);
        }
        self.next();
        Some((name, fields))
    }

    fn parse_uniform(&mut self) -> Vec<Declarator> {
        let Some(ty) = self.skip_qualifiers() else {
            return Vec::new();
        };
        if self.peek() == Some("{") {
            self.skip_block();
            return Vec::new();
        }
        self.parse_declarators(&ty).unwrap_or_default()
    }

    /// Returns the type token after any precision or layout qualifiers
    fn skip_qualifiers(&mut self) -> Option<String> {
        loop {
            let token = self.next()?;
            match token.as_str() {
                "lowp" | "mediump" | "highp" | "const" | "flat" => continue,
                "layout" => {
                    if self.peek() == Some("(") {
                        while self.next()? != ")" {}
                    }
                }
                _ => return Some(token),
            }
        }
    }

    /// Parses `name [N] , name ... ;` and consumes the terminating `;`
    fn parse_declarators(&mut self, ty: &str) -> Option<Vec<Declarator>> {
        let mut decls = Vec::new();
        loop {
            let name = self.next()?;
            let mut array_len = None;
            if self.peek() == Some("[") {
                self.next();
                let size = self.next()?;
                array_len = Some(self.resolve_size(&size));
                while self.next()? != "]" {}
            }
            decls.push(Declarator {
                ty: ty.to_string(),
                name,
                array_len,
            });
            match self.next()?.as_str() {
                "," => continue,
                ";" => return Some(decls),
                _ => {
                    // Initialisers and other trailing syntax: skip to the end of the statement
                    while self.next()? != ";" {}
                    return Some(decls);
                }
            }
        }
    }

    fn resolve_size(&self, token: &str) -> usize {
        token
            .parse()
            .ok()
            .or_else(|| self.defines.get(token).copied())
            .unwrap_or(1)
    }

    fn skip_block(&mut self) {
        let mut depth = 0usize;
        while let Some(token) = self.next() {
            match token.as_str() {
                "{" => depth += 1,
                "}" => {
                    depth = depth.saturating_sub(1);
                    if depth == 0 {
                        break;
                    }
                }
                _ => {}
            }
        }
        while let Some(token) = self.next() {
            if token == ";" {
                break;
            }
        }
    }
}

fn strip_comments(source: &str) -> String {
    let mut out = String::with_capacity(source.len());
    let mut chars = source.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '/' {
            match chars.peek() {
                Some('/') => {
                    for c in chars.by_ref() {
                        if c == '\n' {
                            out.push('\n');
                            break;
                        }
                    }
                    continue;
                }
                Some('*') => {
                    chars.next();
                    let mut prev = '\0';
                    for c in chars.by_ref() {
                        if c == '\n' {
                            out.push('\n');
                        }
                        if prev == '*' && c == '/' {
                            break;
                        }
                        prev = c;
                    }
                    out.push(' ');
                    continue;
                }
                _ => {}
            }
        }
        out.push(c);
    }
    out
}

fn tokenize(code: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut word = String::new();
    for c in code.chars() {
        if c.is_ascii_alphanumeric() || c == '_' {
            word.push(c);
            continue;
        }
        if !word.is_empty() {
            tokens.push(std::mem::take(&mut word));
        }
        if !c.is_whitespace() {
            tokens.push(c.to_string());
        }
    }
    if !word.is_empty() {
        tokens.push(word);
    }
    tokens
}
