//! Command implementations. Each returns the message to print on failure;
//! a failed compile renders exactly one diagnostic.

use flintc_compiler::{CompileError, GeneratorConfig, Generator, ParseSession};

fn read_source(file: &str) -> Result<String, String> {
    std::fs::read_to_string(file).map_err(|e| format!("{file}: {e}"))
}

fn render_error(error: CompileError, file: &str, source: &str) -> String {
    match error {
        CompileError::Parse(parse_error) => parse_error.render(source),
        other => format!("{file}: {other}"),
    }
}

pub fn check(file: &str) -> Result<(), String> {
    let source = read_source(file)?;
    flintc_compiler::compile(file, &source)
        .map(|_| println!("{file}: ok"))
        .map_err(|e| render_error(e, file, &source))
}

pub fn ast(file: &str, json: bool) -> Result<(), String> {
    let source = read_source(file)?;
    let mut session = ParseSession::new();
    session
        .parse_file(file, &source)
        .map_err(|e| e.render(&source))?;
    session.resolve_call_types();
    let file_node = session.files.last().expect("one file was just parsed");
    if json {
        let rendered = serde_json::to_string_pretty(file_node)
            .map_err(|e| format!("{file}: {e}"))?;
        println!("{rendered}");
    } else {
        println!("{file_node:#?}");
    }
    Ok(())
}

pub fn ir(file: &str) -> Result<(), String> {
    let source = read_source(file)?;
    let mut session = ParseSession::new();
    session
        .parse_file(file, &source)
        .map_err(|e| e.render(&source))?;
    session.resolve_call_types();
    let module = Generator::generate(&session, GeneratorConfig::default())
        .map_err(|e| format!("{file}: {e}"))?;
    flintc_ir::verify_module(&module).map_err(|e| format!("{file}: {e}"))?;
    print!("{}", flintc_ir::dump::dump_module(&module));
    Ok(())
}
