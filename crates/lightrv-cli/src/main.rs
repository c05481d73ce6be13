//! The `lightrv` compiler driver.
//!
//! Threads a source file (or every `.src` file in a directory) through the
//! pipeline: scan, parse, build the AST, type check, lower to IR, allocate
//! registers, emit assembly. Each stage's artifact is written as a sidecar
//! next to the input (`.tokens`, `.cst`, `.ast`, `.ir`, `.alloc`, `.s`)
//! unless `--check` is given; a failing stage writes its diagnostics to
//! `.err` and stops the pipeline for that input.
//!
//! Exit code 0 covers every completed run, including runs that produced
//! `.err` files; 1 means initialisation failed (bad grammar or DFA table,
//! unreadable input).

use std::fmt::Display;
use std::fs;
use std::path::{Path, PathBuf};
use std::process;

use clap::Parser as ClapParser;

use lightrv_codegen::IrProgram;
use lightrv_core::Diagnostic;
use lightrv_syntax::{Dfa, Grammar, Lexer, LrParser, ParseTable};

/// Sidecar extensions deleted before recompiling a directory.
const SIDECAR_EXTENSIONS: &[&str] = &["tokens", "cst", "ast", "ir", "alloc", "s", "err"];

/// Ahead-of-time compiler for a small imperative language, targeting RV32.
#[derive(ClapParser)]
#[command(name = "lightrv", about = "Compile .src files to RV32 assembly")]
struct Cli {
    /// A source file, or a directory whose .src files are all compiled.
    path: PathBuf,

    /// Only report errors; do not write auxiliary sidecar files.
    #[arg(long)]
    check: bool,

    /// Grammar table file.
    #[arg(long, default_value = "grammar.txt")]
    grammar: PathBuf,

    /// Scanner DFA table file.
    #[arg(long, default_value = "dfa.txt")]
    dfa: PathBuf,
}

fn main() {
    let cli = Cli::parse();

    let dfa = match Dfa::load(&cli.dfa) {
        Ok(dfa) => dfa,
        Err(e) => {
            eprintln!("error: cannot load DFA table '{}': {}", cli.dfa.display(), e);
            process::exit(1);
        }
    };

    let grammar_text = match fs::read_to_string(&cli.grammar) {
        Ok(text) => text,
        Err(e) => {
            eprintln!(
                "error: cannot read grammar file '{}': {}",
                cli.grammar.display(),
                e
            );
            process::exit(1);
        }
    };
    let grammar = match Grammar::parse(&grammar_text) {
        Ok(grammar) => grammar,
        Err(e) => {
            eprintln!("error: bad grammar file '{}': {}", cli.grammar.display(), e);
            process::exit(1);
        }
    };
    let table = ParseTable::build(&grammar);
    if table.conflicted && !cli.check {
        eprintln!(
            "warning: the analysis table has {} conflict(s); shifts were preferred",
            table.conflicts.len()
        );
    }

    let driver = Driver {
        dfa,
        grammar,
        table,
        check: cli.check,
    };

    if cli.path.is_dir() {
        if let Err(e) = driver.compile_directory(&cli.path) {
            eprintln!("error: {}: {}", cli.path.display(), e);
            process::exit(1);
        }
    } else {
        match fs::read_to_string(&cli.path) {
            Ok(source) => driver.compile_source(&cli.path, &source),
            Err(e) => {
                eprintln!("error: cannot read '{}': {}", cli.path.display(), e);
                process::exit(1);
            }
        }
    }
}

struct Driver {
    dfa: Dfa,
    grammar: Grammar,
    table: ParseTable,
    check: bool,
}

impl Driver {
    /// Compile every `.src` file in `dir`, deleting stale sidecars first.
    fn compile_directory(&self, dir: &Path) -> std::io::Result<()> {
        let mut entries: Vec<PathBuf> = fs::read_dir(dir)?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .collect();
        entries.sort();

        for path in &entries {
            if path.is_file() && is_sidecar(path) {
                let _ = fs::remove_file(path);
            }
        }
        for path in &entries {
            if path.is_file() && path.extension().is_some_and(|e| e == "src") {
                match fs::read_to_string(path) {
                    Ok(source) => self.compile_source(path, &source),
                    Err(e) => eprintln!("error: cannot read '{}': {}", path.display(), e),
                }
            }
        }
        Ok(())
    }

    /// Run the pipeline over one source text, writing sidecars as stages
    /// complete and `.err` on the first failing stage.
    fn compile_source(&self, path: &Path, source: &str) {
        // 1. Scan
        let lexed = Lexer::new(&self.dfa).lex(source);
        if !lexed.diagnostics.is_empty() {
            self.write_errors(path, &lexed.diagnostics);
            return;
        }
        if !self.check {
            let lines: Vec<String> = lexed.tokens.iter().map(|t| t.to_string()).collect();
            self.write_sidecar(path, "tokens", &lines.join("\n"));
        }

        // 2. Parse
        let parsed = LrParser::new(&self.grammar, &self.table).parse(&lexed.tokens);
        if !parsed.diagnostics.is_empty() || parsed.tree.is_none() {
            self.write_errors(path, &parsed.diagnostics);
            return;
        }
        let Some(tree) = parsed.tree else { return };
        if !self.check {
            match serde_json::to_string_pretty(&tree) {
                Ok(json) => self.write_sidecar(path, "cst", &json),
                Err(e) => eprintln!("error: cannot serialize parse tree: {}", e),
            }
        }

        // 3. Build the AST
        let built = lightrv_check::build(&tree);
        if !built.diagnostics.is_empty() || built.program.is_none() {
            self.write_errors(path, &built.diagnostics);
            return;
        }
        let Some(mut program) = built.program else { return };

        // 4. Type check
        let checked = lightrv_check::check(&mut program);
        if !checked.diagnostics.is_empty() {
            self.write_errors(path, &checked.diagnostics);
            return;
        }
        if !self.check {
            self.write_sidecar(path, "ast", &lightrv_check::printer::render(&program));
        }

        // 5. Lower to IR
        let mut ir: IrProgram = lightrv_codegen::lower(&program, &checked.table);
        if !self.check {
            self.write_sidecar(path, "ir", &ir.render());
        }

        // 6. Allocate storage
        lightrv_codegen::allocate(&mut ir);
        if !self.check {
            self.write_sidecar(path, "alloc", &ir.render());
        }

        // 7. Emit assembly
        lightrv_codegen::emit(&mut ir);
        if !self.check {
            self.write_sidecar(path, "s", &lightrv_codegen::render(&ir));
        }
    }

    fn write_errors(&self, path: &Path, diagnostics: &[Diagnostic]) {
        let lines: Vec<String> = diagnostics.iter().map(Diagnostic::to_string).collect();
        self.write_sidecar(path, "err", &lines.join("\n"));
        for line in &lines {
            eprintln!("{}", line);
        }
    }

    fn write_sidecar(&self, path: &Path, extension: &str, content: impl Display) {
        let target = sidecar_path(path, extension);
        let mut text = content.to_string();
        if !text.ends_with('\n') {
            text.push('\n');
        }
        if let Err(e) = fs::write(&target, text) {
            eprintln!("error: cannot write '{}': {}", target.display(), e);
        }
    }
}

/// `foo/bar.src` -> `foo/bar.src.tokens` and friends.
fn sidecar_path(path: &Path, extension: &str) -> PathBuf {
    PathBuf::from(format!("{}.{}", path.display(), extension))
}

fn is_sidecar(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| SIDECAR_EXTENSIONS.contains(&e))
}
